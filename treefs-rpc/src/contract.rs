use crate::error::ContractViolation;

/// Describes one method of a remote interface.
#[derive(Debug, Clone, Copy)]
pub struct MethodSpec {
    pub name: &'static str,
    /// Whether the method's error type admits a transport failure in
    /// addition to its own application errors. Every method of a remote
    /// interface must declare this; the typed glue realizes it with a
    /// `From<RpcError>` conversion on the interface error type.
    pub declares_remote_failure: bool,
}

/// Compile-time description of a remote interface: its name and the methods
/// a skeleton will dispatch for it.
///
/// Contracts are validated whenever a skeleton or stub is constructed over
/// them, so a call site can never reach the network through an interface
/// that does not account for network failure.
#[derive(Debug, Clone, Copy)]
pub struct ContractSpec {
    pub interface: &'static str,
    pub methods: &'static [MethodSpec],
}

impl ContractSpec {
    /// Checks that every method declares remote failure.
    pub fn validate(&self) -> Result<(), ContractViolation> {
        for method in self.methods {
            if !method.declares_remote_failure {
                return Err(ContractViolation {
                    interface: self.interface,
                    method: method.name,
                });
            }
        }
        Ok(())
    }

    /// Panicking form of [`validate`](Self::validate), used by skeleton and
    /// stub constructors.
    ///
    /// # Panics
    ///
    /// Panics if any method fails to declare remote failure. A malformed
    /// contract is a programming error, not a runtime condition.
    pub fn assert_valid(&self) {
        if let Err(violation) = self.validate() {
            panic!("malformed remote interface contract: {violation}");
        }
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.iter().any(|m| m.name == name)
    }
}
