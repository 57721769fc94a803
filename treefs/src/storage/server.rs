//! The storage server: hosts file content beneath a local root directory
//! and joins the file system by registering its inventory with the naming
//! server.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use treefs_rpc::{RpcAddr, Skeleton};

use crate::error::{ServerError, StorageError};
use crate::path::DfsPath;
use crate::proto::{
    Command, CommandDispatcher, CommandStub, Registration, RegistrationStub, Storage,
    StorageDispatcher, StorageStub,
};
use crate::storage::store::FileStore;

/// The target object both storage interfaces dispatch into.
struct StorageNode {
    store: FileStore,
}

#[async_trait]
impl Storage for StorageNode {
    async fn size(&self, path: &DfsPath) -> Result<u64, StorageError> {
        self.store.size(path).await
    }

    async fn read(&self, path: &DfsPath, offset: i64, length: u32) -> Result<Vec<u8>, StorageError> {
        self.store.read(path, offset, length).await
    }

    async fn write(&self, path: &DfsPath, offset: i64, data: Vec<u8>) -> Result<(), StorageError> {
        self.store.write(path, offset, &data).await
    }
}

#[async_trait]
impl Command for StorageNode {
    async fn create(&self, path: &DfsPath) -> Result<bool, StorageError> {
        self.store.create(path).await
    }

    async fn delete(&self, path: &DfsPath) -> Result<bool, StorageError> {
        self.store.delete(path).await
    }
}

/// A storage server process: two skeletons (bulk `Storage` access and
/// administrative `Command` access) over one local file store.
pub struct StorageServer {
    node: Arc<StorageNode>,
    storage_skeleton: Skeleton,
    command_skeleton: Skeleton,
    registered: AtomicBool,
}

impl StorageServer {
    /// Creates a storage server over a directory of the local file system.
    /// The server is not started and nothing is registered yet.
    pub fn new(root: PathBuf) -> Self {
        let node = Arc::new(StorageNode {
            store: FileStore::new(root),
        });
        let storage_skeleton = Skeleton::new(Arc::new(StorageDispatcher::new(node.clone())));
        let command_skeleton = Skeleton::new(Arc::new(CommandDispatcher::new(node.clone())));
        Self {
            node,
            storage_skeleton,
            command_skeleton,
            registered: AtomicBool::new(false),
        }
    }

    /// Starts both skeletons and registers with the naming server.
    ///
    /// `hostname` is the externally routable name of this host; it becomes
    /// the advertised address of both stubs handed to the naming server.
    /// Every duplicate path the naming server reports back is deleted from
    /// the local root, directories left empty included: the previously
    /// registered owner keeps those files.
    pub async fn start(&self, hostname: &str, naming: &RegistrationStub) -> Result<(), ServerError> {
        if self.registered.load(Ordering::Acquire) {
            return Err(ServerError::AlreadyStarted);
        }
        self.storage_skeleton.start().await?;
        self.command_skeleton.start().await?;

        let storage_stub = StorageStub::for_skeleton_with_hostname(&self.storage_skeleton, hostname)?;
        let command_stub = CommandStub::for_skeleton_with_hostname(&self.command_skeleton, hostname)?;

        let inventory = self.node.store.scan().await?;
        info!(
            root = %self.node.store.root().display(),
            files = inventory.len(),
            naming = %naming,
            "registering with naming server"
        );
        let duplicates = naming.register(storage_stub, command_stub, inventory).await?;
        for path in &duplicates {
            debug!(%path, "deleting duplicate kept by an earlier registration");
            self.node.store.remove_duplicate(path).await?;
        }
        self.registered.store(true, Ordering::Release);
        info!(
            storage = %self.storage_skeleton.address(),
            command = %self.command_skeleton.address(),
            duplicates = duplicates.len(),
            "storage server online"
        );
        Ok(())
    }

    /// Stops both skeletons; requests already being serviced finish.
    pub async fn stop(&self) {
        self.storage_skeleton.stop().await;
        self.command_skeleton.stop().await;
        info!("storage server stopped");
    }

    /// Advertised address of the bulk content interface.
    pub fn storage_addr(&self) -> RpcAddr {
        self.storage_skeleton.address()
    }

    /// Advertised address of the administrative interface.
    pub fn command_addr(&self) -> RpcAddr {
        self.command_skeleton.address()
    }
}
