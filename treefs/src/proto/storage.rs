//! Remote contracts implemented by every storage server: `Storage` for bulk
//! content access and `Command` for administrative calls issued by the
//! naming server.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use treefs_rpc::wire::{self, Response};
use treefs_rpc::{BindError, ContractSpec, MethodSpec, RpcAddr, RpcError, RpcTarget, Skeleton, Stub};

use crate::error::StorageError;
use crate::path::DfsPath;

/// Bulk content access to the files hosted by one storage server.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Length of a file in bytes.
    async fn size(&self, path: &DfsPath) -> Result<u64, StorageError>;

    /// Reads `length` bytes starting at `offset`.
    async fn read(&self, path: &DfsPath, offset: i64, length: u32) -> Result<Vec<u8>, StorageError>;

    /// Writes `data` at `offset`, extending the file if needed.
    async fn write(&self, path: &DfsPath, offset: i64, data: Vec<u8>) -> Result<(), StorageError>;
}

/// Administrative access to one storage server, used by the naming server
/// to allocate and remove physical files.
#[async_trait]
pub trait Command: Send + Sync + 'static {
    /// Creates an empty file. Returns `false` if the path is the root or
    /// the file already exists.
    async fn create(&self, path: &DfsPath) -> Result<bool, StorageError>;

    /// Deletes a file or directory subtree. Returns `false` if the path is
    /// the root or absent.
    async fn delete(&self, path: &DfsPath) -> Result<bool, StorageError>;
}

pub static STORAGE_CONTRACT: ContractSpec = ContractSpec {
    interface: "treefs.Storage",
    methods: &[
        MethodSpec {
            name: "size",
            declares_remote_failure: true,
        },
        MethodSpec {
            name: "read",
            declares_remote_failure: true,
        },
        MethodSpec {
            name: "write",
            declares_remote_failure: true,
        },
    ],
};

pub static COMMAND_CONTRACT: ContractSpec = ContractSpec {
    interface: "treefs.Command",
    methods: &[
        MethodSpec {
            name: "create",
            declares_remote_failure: true,
        },
        MethodSpec {
            name: "delete",
            declares_remote_failure: true,
        },
    ],
};

/// Client stub for the [`Storage`] interface.
///
/// Serializes as its remote address, so stubs can be exchanged through
/// registration and lookup calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "RpcAddr", from = "RpcAddr")]
pub struct StorageStub {
    stub: Stub,
}

impl StorageStub {
    pub fn new(addr: RpcAddr) -> Self {
        Self {
            stub: Stub::new(&STORAGE_CONTRACT, addr),
        }
    }

    pub fn for_skeleton(skeleton: &Skeleton) -> Result<Self, BindError> {
        Ok(Self {
            stub: Stub::for_skeleton(&STORAGE_CONTRACT, skeleton)?,
        })
    }

    pub fn for_skeleton_with_hostname(skeleton: &Skeleton, hostname: &str) -> Result<Self, BindError> {
        Ok(Self {
            stub: Stub::for_skeleton_with_hostname(&STORAGE_CONTRACT, skeleton, hostname)?,
        })
    }

    pub fn addr(&self) -> &RpcAddr {
        self.stub.addr()
    }
}

impl From<RpcAddr> for StorageStub {
    fn from(addr: RpcAddr) -> Self {
        Self::new(addr)
    }
}

impl From<StorageStub> for RpcAddr {
    fn from(stub: StorageStub) -> Self {
        stub.stub.addr().clone()
    }
}

impl std::fmt::Display for StorageStub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.stub)
    }
}

#[async_trait]
impl Storage for StorageStub {
    async fn size(&self, path: &DfsPath) -> Result<u64, StorageError> {
        self.stub.call("size", &(path,)).await
    }

    async fn read(&self, path: &DfsPath, offset: i64, length: u32) -> Result<Vec<u8>, StorageError> {
        self.stub.call("read", &(path, offset, length)).await
    }

    async fn write(&self, path: &DfsPath, offset: i64, data: Vec<u8>) -> Result<(), StorageError> {
        self.stub.call("write", &(path, offset, data)).await
    }
}

/// Client stub for the [`Command`] interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "RpcAddr", from = "RpcAddr")]
pub struct CommandStub {
    stub: Stub,
}

impl CommandStub {
    pub fn new(addr: RpcAddr) -> Self {
        Self {
            stub: Stub::new(&COMMAND_CONTRACT, addr),
        }
    }

    pub fn for_skeleton(skeleton: &Skeleton) -> Result<Self, BindError> {
        Ok(Self {
            stub: Stub::for_skeleton(&COMMAND_CONTRACT, skeleton)?,
        })
    }

    pub fn for_skeleton_with_hostname(skeleton: &Skeleton, hostname: &str) -> Result<Self, BindError> {
        Ok(Self {
            stub: Stub::for_skeleton_with_hostname(&COMMAND_CONTRACT, skeleton, hostname)?,
        })
    }

    pub fn addr(&self) -> &RpcAddr {
        self.stub.addr()
    }
}

impl From<RpcAddr> for CommandStub {
    fn from(addr: RpcAddr) -> Self {
        Self::new(addr)
    }
}

impl From<CommandStub> for RpcAddr {
    fn from(stub: CommandStub) -> Self {
        stub.stub.addr().clone()
    }
}

impl std::fmt::Display for CommandStub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.stub)
    }
}

#[async_trait]
impl Command for CommandStub {
    async fn create(&self, path: &DfsPath) -> Result<bool, StorageError> {
        self.stub.call("create", &(path,)).await
    }

    async fn delete(&self, path: &DfsPath) -> Result<bool, StorageError> {
        self.stub.call("delete", &(path,)).await
    }
}

/// Server-side dispatch table for the [`Storage`] interface.
pub struct StorageDispatcher<T> {
    inner: Arc<T>,
}

impl<T> StorageDispatcher<T> {
    pub fn new(inner: Arc<T>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T: Storage> RpcTarget for StorageDispatcher<T> {
    fn contract(&self) -> &'static ContractSpec {
        &STORAGE_CONTRACT
    }

    async fn dispatch(&self, method: &str, body: &[u8]) -> Response {
        match method {
            "size" => match wire::decode::<(DfsPath,)>(body) {
                Ok((path,)) => wire::reply(&self.inner.size(&path).await),
                Err(err) => Response::bad_request(err),
            },
            "read" => match wire::decode::<(DfsPath, i64, u32)>(body) {
                Ok((path, offset, length)) => {
                    wire::reply(&self.inner.read(&path, offset, length).await)
                }
                Err(err) => Response::bad_request(err),
            },
            "write" => match wire::decode::<(DfsPath, i64, Vec<u8>)>(body) {
                Ok((path, offset, data)) => {
                    wire::reply(&self.inner.write(&path, offset, data).await)
                }
                Err(err) => Response::bad_request(err),
            },
            _ => Response::Fault(RpcError::UnknownMethod(method.to_string())),
        }
    }
}

/// Server-side dispatch table for the [`Command`] interface.
pub struct CommandDispatcher<T> {
    inner: Arc<T>,
}

impl<T> CommandDispatcher<T> {
    pub fn new(inner: Arc<T>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T: Command> RpcTarget for CommandDispatcher<T> {
    fn contract(&self) -> &'static ContractSpec {
        &COMMAND_CONTRACT
    }

    async fn dispatch(&self, method: &str, body: &[u8]) -> Response {
        match method {
            "create" => match wire::decode::<(DfsPath,)>(body) {
                Ok((path,)) => wire::reply(&self.inner.create(&path).await),
                Err(err) => Response::bad_request(err),
            },
            "delete" => match wire::decode::<(DfsPath,)>(body) {
                Ok((path,)) => wire::reply(&self.inner.delete(&path).await),
                Err(err) => Response::bad_request(err),
            },
            _ => Response::Fault(RpcError::UnknownMethod(method.to_string())),
        }
    }
}
