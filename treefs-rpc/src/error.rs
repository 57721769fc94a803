//! Error types for the RPC transport.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transport-level failure of a remote call.
///
/// Any method of any remote interface can fail with this, regardless of the
/// application errors the method itself declares. Transport faults are never
/// conflated with application errors: a remote method that throws has its
/// error carried back verbatim, while everything that goes wrong between the
/// two processes surfaces here.
///
/// Serializable so that faults raised on the skeleton side (unknown method,
/// undecodable arguments) travel back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum RpcError {
    /// The connection to the remote skeleton could not be opened.
    #[error("connection to remote skeleton failed: {0}")]
    Connect(String),
    /// The connection failed or closed before a full response arrived.
    #[error("connection failed mid-call: {0}")]
    Io(String),
    /// A frame could not be encoded or decoded.
    #[error("malformed frame: {0}")]
    Frame(String),
    /// The remote skeleton serves a different interface.
    #[error("remote skeleton does not serve interface `{0}`")]
    UnknownInterface(String),
    /// The remote skeleton does not know the requested method.
    #[error("unknown method `{0}`")]
    UnknownMethod(String),
    /// The remote skeleton could not decode the request arguments.
    #[error("request rejected by remote skeleton: {0}")]
    BadRequest(String),
}

/// A remote interface whose methods do not all declare remote failure.
///
/// Raised (or panicked over) at construction time only; see
/// [`ContractSpec::validate`](crate::ContractSpec::validate).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("interface `{interface}`: method `{method}` does not declare remote failure")]
pub struct ContractViolation {
    pub interface: &'static str,
    pub method: &'static str,
}

/// Failure to bind a stub to a skeleton.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// The stub's interface is not the one the skeleton serves.
    #[error("stub interface `{stub}` does not match skeleton interface `{skeleton}`")]
    ContractMismatch {
        stub: &'static str,
        skeleton: &'static str,
    },
    /// The skeleton has not been started, so it has no live address to bind to.
    #[error("skeleton for `{0}` is not started")]
    NotStarted(&'static str),
}
