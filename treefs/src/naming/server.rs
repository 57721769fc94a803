//! The naming server: single authority for path existence and shape.
//!
//! All operations answer from the in-memory [`Namespace`]; content-affecting
//! operations additionally delegate to the owning storage endpoints through
//! their Command stubs. Every read-then-write sequence (create, delete,
//! register) holds the namespace write lock across the whole sequence,
//! delegated remote call included, so interleaved check-then-mutate can
//! never corrupt the parent-presence invariant. Pure lookups share the read
//! lock and never observe a partially updated namespace.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use treefs_rpc::{RpcAddr, RpcError, Skeleton};

use crate::error::{NamingError, StorageError};
use crate::naming::namespace::{Endpoint, Namespace, Node};
use crate::path::DfsPath;
use crate::proto::{
    Command, CommandStub, Registration, RegistrationDispatcher, Service, ServiceDispatcher,
    StorageStub,
};

/// Maps a failed delegated storage call onto the naming interface: transport
/// faults stay transport faults, storage-side failures are reported as such.
fn delegate_error(err: StorageError) -> NamingError {
    match err {
        StorageError::Rpc(rpc) => NamingError::Rpc(rpc),
        other => NamingError::Storage(other.to_string()),
    }
}

/// The shared state both remote interfaces operate on.
struct NamingNode {
    namespace: RwLock<Namespace>,
}

#[async_trait]
impl Service for NamingNode {
    async fn is_directory(&self, path: &DfsPath) -> Result<bool, NamingError> {
        self.namespace.read().await.is_directory(path)
    }

    async fn list(&self, directory: &DfsPath) -> Result<Vec<String>, NamingError> {
        self.namespace.read().await.children(directory)
    }

    async fn create_file(&self, path: &DfsPath) -> Result<bool, NamingError> {
        if path.is_root() {
            return Ok(false);
        }
        let mut ns = self.namespace.write().await;
        let Some(parent) = path.parent() else {
            return Ok(false);
        };
        if !ns.is_directory(&parent)? {
            return Err(NamingError::NotFound);
        }
        if ns.contains(path) {
            return Ok(false);
        }
        let endpoint = ns.first_endpoint().ok_or(NamingError::NoStorageServer)?;
        let created = endpoint
            .command
            .create(path)
            .await
            .map_err(delegate_error)?;
        if !created {
            warn!(%path, endpoint = %endpoint.command, "storage endpoint reported the file as already present");
        }
        ns.insert_file(path.clone(), endpoint);
        debug!(%path, "file created");
        Ok(true)
    }

    async fn create_directory(&self, path: &DfsPath) -> Result<bool, NamingError> {
        if path.is_root() {
            return Ok(false);
        }
        let mut ns = self.namespace.write().await;
        let Some(parent) = path.parent() else {
            return Ok(false);
        };
        if !ns.is_directory(&parent)? {
            return Err(NamingError::NotFound);
        }
        if ns.contains(path) {
            return Ok(false);
        }
        ns.insert_directory(path.clone());
        debug!(%path, "directory created");
        Ok(true)
    }

    async fn delete(&self, path: &DfsPath) -> Result<bool, NamingError> {
        if path.is_root() {
            return Ok(false);
        }
        let mut ns = self.namespace.write().await;
        if !ns.contains(path) {
            let parent_known = path.parent().is_some_and(|parent| ns.contains(&parent));
            return if parent_known {
                Ok(false)
            } else {
                Err(NamingError::NotFound)
            };
        }
        let node = ns.node(path).cloned();
        match node {
            Some(Node::File(endpoint)) => {
                let removed = endpoint
                    .command
                    .delete(path)
                    .await
                    .map_err(delegate_error)?;
                if removed {
                    ns.remove(path);
                    debug!(%path, "file deleted");
                }
                Ok(removed)
            }
            Some(Node::Directory) => {
                for command in ns.commands_under(path) {
                    let removed = command.delete(path).await.map_err(delegate_error)?;
                    if !removed {
                        warn!(%path, endpoint = %command, "delegated delete refused; namespace kept");
                        return Ok(false);
                    }
                }
                ns.remove_subtree(path);
                debug!(%path, "directory deleted");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_storage(&self, path: &DfsPath) -> Result<StorageStub, NamingError> {
        let ns = self.namespace.read().await;
        match ns.node(path) {
            Some(Node::File(endpoint)) => Ok(endpoint.storage.clone()),
            _ => Err(NamingError::NotFound),
        }
    }
}

#[async_trait]
impl Registration for NamingNode {
    async fn register(
        &self,
        storage: StorageStub,
        command: CommandStub,
        paths: Vec<DfsPath>,
    ) -> Result<Vec<DfsPath>, NamingError> {
        let endpoint = Endpoint { storage, command };
        let mut ns = self.namespace.write().await;
        ns.register_endpoint(&endpoint)?;
        let collisions = ns.adopt(&paths, &endpoint);
        info!(
            endpoint = %endpoint.storage,
            advertised = paths.len(),
            collided = collisions.len(),
            "storage endpoint registered"
        );
        Ok(collisions)
    }
}

/// The naming server process: one namespace exposed through two skeletons,
/// `Service` for clients and `Registration` for joining storage servers.
pub struct NamingServer {
    service_skeleton: Skeleton,
    registration_skeleton: Skeleton,
}

impl NamingServer {
    /// Creates the server, not yet started, with its two interfaces bound
    /// to the given addresses.
    pub fn new(service_addr: RpcAddr, registration_addr: RpcAddr) -> Self {
        let node = Arc::new(NamingNode {
            namespace: RwLock::new(Namespace::new()),
        });
        let service_skeleton = Skeleton::with_address(
            Arc::new(ServiceDispatcher::new(node.clone())),
            service_addr,
        );
        let registration_skeleton = Skeleton::with_address(
            Arc::new(RegistrationDispatcher::new(node)),
            registration_addr,
        );
        Self {
            service_skeleton,
            registration_skeleton,
        }
    }

    /// Starts both skeletons; afterwards the server is remotely reachable.
    pub async fn start(&self) -> Result<(), RpcError> {
        self.service_skeleton.start().await?;
        self.registration_skeleton.start().await?;
        info!(
            service = %self.service_skeleton.address(),
            registration = %self.registration_skeleton.address(),
            "naming server started"
        );
        Ok(())
    }

    /// Stops both skeletons; requests already being serviced finish.
    pub async fn stop(&self) {
        self.service_skeleton.stop().await;
        self.registration_skeleton.stop().await;
        info!("naming server stopped");
    }

    pub fn service_addr(&self) -> RpcAddr {
        self.service_skeleton.address()
    }

    pub fn registration_addr(&self) -> RpcAddr {
        self.registration_skeleton.address()
    }
}
