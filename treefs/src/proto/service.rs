//! Client-facing remote contract of the naming server.

use std::sync::Arc;

use async_trait::async_trait;
use treefs_rpc::wire::{self, Response};
use treefs_rpc::{BindError, ContractSpec, MethodSpec, RpcAddr, RpcError, RpcTarget, Skeleton, Stub};

use crate::error::NamingError;
use crate::path::DfsPath;
use crate::proto::storage::StorageStub;

/// Metadata operations a client performs against the naming server.
///
/// The naming server answers all of these from its in-memory namespace; it
/// never touches file bytes itself. For content access a client asks for
/// the owning storage endpoint with [`get_storage`](Service::get_storage)
/// and talks to that server directly.
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Whether the path names a directory. Fails with
    /// [`NamingError::NotFound`] if the path is unknown.
    async fn is_directory(&self, path: &DfsPath) -> Result<bool, NamingError>;

    /// The de-duplicated names of the directory's immediate children.
    async fn list(&self, directory: &DfsPath) -> Result<Vec<String>, NamingError>;

    /// Creates a file, physically allocated on some registered storage
    /// server. Returns `false` without effect if the path is the root or
    /// already exists.
    async fn create_file(&self, path: &DfsPath) -> Result<bool, NamingError>;

    /// Creates a directory. Pure metadata; no storage server is involved.
    async fn create_directory(&self, path: &DfsPath) -> Result<bool, NamingError>;

    /// Deletes a file or directory subtree, delegating physical removal to
    /// the owning storage servers. The namespace is purged only when the
    /// delegated calls succeed.
    async fn delete(&self, path: &DfsPath) -> Result<bool, NamingError>;

    /// The storage endpoint hosting a file's content. Fails with
    /// [`NamingError::NotFound`] for unknown paths and for directories.
    async fn get_storage(&self, path: &DfsPath) -> Result<StorageStub, NamingError>;
}

pub static SERVICE_CONTRACT: ContractSpec = ContractSpec {
    interface: "treefs.Service",
    methods: &[
        MethodSpec {
            name: "is_directory",
            declares_remote_failure: true,
        },
        MethodSpec {
            name: "list",
            declares_remote_failure: true,
        },
        MethodSpec {
            name: "create_file",
            declares_remote_failure: true,
        },
        MethodSpec {
            name: "create_directory",
            declares_remote_failure: true,
        },
        MethodSpec {
            name: "delete",
            declares_remote_failure: true,
        },
        MethodSpec {
            name: "get_storage",
            declares_remote_failure: true,
        },
    ],
};

/// Client stub for the [`Service`] interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceStub {
    stub: Stub,
}

impl ServiceStub {
    pub fn new(addr: RpcAddr) -> Self {
        Self {
            stub: Stub::new(&SERVICE_CONTRACT, addr),
        }
    }

    pub fn for_skeleton(skeleton: &Skeleton) -> Result<Self, BindError> {
        Ok(Self {
            stub: Stub::for_skeleton(&SERVICE_CONTRACT, skeleton)?,
        })
    }

    pub fn addr(&self) -> &RpcAddr {
        self.stub.addr()
    }
}

impl std::fmt::Display for ServiceStub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.stub)
    }
}

#[async_trait]
impl Service for ServiceStub {
    async fn is_directory(&self, path: &DfsPath) -> Result<bool, NamingError> {
        self.stub.call("is_directory", &(path,)).await
    }

    async fn list(&self, directory: &DfsPath) -> Result<Vec<String>, NamingError> {
        self.stub.call("list", &(directory,)).await
    }

    async fn create_file(&self, path: &DfsPath) -> Result<bool, NamingError> {
        self.stub.call("create_file", &(path,)).await
    }

    async fn create_directory(&self, path: &DfsPath) -> Result<bool, NamingError> {
        self.stub.call("create_directory", &(path,)).await
    }

    async fn delete(&self, path: &DfsPath) -> Result<bool, NamingError> {
        self.stub.call("delete", &(path,)).await
    }

    async fn get_storage(&self, path: &DfsPath) -> Result<StorageStub, NamingError> {
        self.stub.call("get_storage", &(path,)).await
    }
}

/// Server-side dispatch table for the [`Service`] interface.
pub struct ServiceDispatcher<T> {
    inner: Arc<T>,
}

impl<T> ServiceDispatcher<T> {
    pub fn new(inner: Arc<T>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T: Service> RpcTarget for ServiceDispatcher<T> {
    fn contract(&self) -> &'static ContractSpec {
        &SERVICE_CONTRACT
    }

    async fn dispatch(&self, method: &str, body: &[u8]) -> Response {
        match method {
            "is_directory" => match wire::decode::<(DfsPath,)>(body) {
                Ok((path,)) => wire::reply(&self.inner.is_directory(&path).await),
                Err(err) => Response::bad_request(err),
            },
            "list" => match wire::decode::<(DfsPath,)>(body) {
                Ok((directory,)) => wire::reply(&self.inner.list(&directory).await),
                Err(err) => Response::bad_request(err),
            },
            "create_file" => match wire::decode::<(DfsPath,)>(body) {
                Ok((path,)) => wire::reply(&self.inner.create_file(&path).await),
                Err(err) => Response::bad_request(err),
            },
            "create_directory" => match wire::decode::<(DfsPath,)>(body) {
                Ok((path,)) => wire::reply(&self.inner.create_directory(&path).await),
                Err(err) => Response::bad_request(err),
            },
            "delete" => match wire::decode::<(DfsPath,)>(body) {
                Ok((path,)) => wire::reply(&self.inner.delete(&path).await),
                Err(err) => Response::bad_request(err),
            },
            "get_storage" => match wire::decode::<(DfsPath,)>(body) {
                Ok((path,)) => wire::reply(&self.inner.get_storage(&path).await),
                Err(err) => Response::bad_request(err),
            },
            _ => Response::Fault(RpcError::UnknownMethod(method.to_string())),
        }
    }
}
