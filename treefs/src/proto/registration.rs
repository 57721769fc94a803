//! Storage-facing remote contract of the naming server: the join handshake
//! run once when a storage server starts.

use std::sync::Arc;

use async_trait::async_trait;
use treefs_rpc::wire::{self, Response};
use treefs_rpc::{BindError, ContractSpec, MethodSpec, RpcAddr, RpcError, RpcTarget, Skeleton, Stub};

use crate::error::NamingError;
use crate::path::DfsPath;
use crate::proto::storage::{CommandStub, StorageStub};

/// Registration of storage servers with the naming server.
#[async_trait]
pub trait Registration: Send + Sync + 'static {
    /// Advertises a storage server's local file inventory.
    ///
    /// The naming server merges the advertised paths into the namespace and
    /// returns, in advertised order, every path that collided with content
    /// it already knows. The joining server must delete those files
    /// locally: the first registration wins ownership.
    ///
    /// Fails with [`NamingError::DuplicateRegistration`] if either stub
    /// already denotes a registered endpoint.
    async fn register(
        &self,
        storage: StorageStub,
        command: CommandStub,
        paths: Vec<DfsPath>,
    ) -> Result<Vec<DfsPath>, NamingError>;
}

pub static REGISTRATION_CONTRACT: ContractSpec = ContractSpec {
    interface: "treefs.Registration",
    methods: &[MethodSpec {
        name: "register",
        declares_remote_failure: true,
    }],
};

/// Client stub for the [`Registration`] interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistrationStub {
    stub: Stub,
}

impl RegistrationStub {
    pub fn new(addr: RpcAddr) -> Self {
        Self {
            stub: Stub::new(&REGISTRATION_CONTRACT, addr),
        }
    }

    pub fn for_skeleton(skeleton: &Skeleton) -> Result<Self, BindError> {
        Ok(Self {
            stub: Stub::for_skeleton(&REGISTRATION_CONTRACT, skeleton)?,
        })
    }

    pub fn addr(&self) -> &RpcAddr {
        self.stub.addr()
    }
}

impl std::fmt::Display for RegistrationStub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.stub)
    }
}

#[async_trait]
impl Registration for RegistrationStub {
    async fn register(
        &self,
        storage: StorageStub,
        command: CommandStub,
        paths: Vec<DfsPath>,
    ) -> Result<Vec<DfsPath>, NamingError> {
        self.stub.call("register", &(storage, command, paths)).await
    }
}

/// Server-side dispatch table for the [`Registration`] interface.
pub struct RegistrationDispatcher<T> {
    inner: Arc<T>,
}

impl<T> RegistrationDispatcher<T> {
    pub fn new(inner: Arc<T>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T: Registration> RpcTarget for RegistrationDispatcher<T> {
    fn contract(&self) -> &'static ContractSpec {
        &REGISTRATION_CONTRACT
    }

    async fn dispatch(&self, method: &str, body: &[u8]) -> Response {
        match method {
            "register" => match wire::decode::<(StorageStub, CommandStub, Vec<DfsPath>)>(body) {
                Ok((storage, command, paths)) => {
                    wire::reply(&self.inner.register(storage, command, paths).await)
                }
                Err(err) => Response::bad_request(err),
            },
            _ => Response::Fault(RpcError::UnknownMethod(method.to_string())),
        }
    }
}
