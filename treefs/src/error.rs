//! Error types for the file system interfaces.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use treefs_rpc::{BindError, RpcError};

/// Errors returned by the naming server's Service and Registration
/// interfaces.
///
/// Serializable so a failure raised inside the naming server is carried back
/// to the remote caller with its identity intact. The `Rpc` variant is the
/// transport failure every remote interface must admit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum NamingError {
    /// The path, or a required ancestor, is not known to the namespace.
    #[error("path not found")]
    NotFound,
    /// One of the presented stubs already denotes a registered endpoint.
    #[error("storage endpoint is already registered")]
    DuplicateRegistration,
    /// A file cannot be allocated because no storage server has joined yet.
    #[error("no storage server is registered")]
    NoStorageServer,
    /// A storage call delegated by the naming server failed on the storage
    /// side; the namespace is left unchanged.
    #[error("delegated storage call failed: {0}")]
    Storage(String),
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// Errors returned by a storage server's Storage and Command interfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum StorageError {
    /// The path does not exist on this server, or names a directory where a
    /// file is required.
    #[error("file not found")]
    NotFound,
    /// Offset or length fall outside the bounds of the file.
    #[error("offset or length is outside the file bounds")]
    OutOfRange,
    #[error("i/o error: {0}")]
    Io(String),
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl StorageError {
    pub(crate) fn io(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Failure to bring a server online. Local to the process; never crosses
/// the wire.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("storage server is already registered with a naming server")]
    AlreadyStarted,
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error(transparent)]
    Naming(#[from] NamingError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
