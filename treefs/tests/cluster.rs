//! End-to-end tests: a naming server on ephemeral ports, storage endpoints
//! joining through the registration protocol, and clients driving the
//! Service interface over the real transport.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use treefs::error::{NamingError, StorageError};
use treefs::naming::NamingServer;
use treefs::path::DfsPath;
use treefs::proto::{
    Command, CommandDispatcher, CommandStub, Registration, RegistrationStub, Service, ServiceStub,
    Storage, StorageDispatcher, StorageStub,
};
use treefs::storage::StorageServer;
use treefs_rpc::{RpcAddr, Skeleton};

fn p(s: &str) -> DfsPath {
    DfsPath::parse(s).unwrap()
}

async fn naming_cluster() -> (NamingServer, ServiceStub, RegistrationStub) {
    let server = NamingServer::new(RpcAddr::new("127.0.0.1", 0), RpcAddr::new("127.0.0.1", 0));
    server.start().await.unwrap();
    let service = ServiceStub::new(server.service_addr());
    let registration = RegistrationStub::new(server.registration_addr());
    (server, service, registration)
}

/// In-memory storage endpoint that records the administrative calls it
/// receives, so tests can observe what the naming server delegates.
#[derive(Default)]
struct MockStorage {
    creates: AtomicUsize,
    deletes: AtomicUsize,
    /// `delete` answers `false` (refused, not an error).
    refuse_deletes: AtomicBool,
    /// `delete` fails with an I/O error.
    fail_deletes: AtomicBool,
}

#[async_trait]
impl Storage for MockStorage {
    async fn size(&self, _path: &DfsPath) -> Result<u64, StorageError> {
        Ok(0)
    }

    async fn read(&self, _path: &DfsPath, _offset: i64, _length: u32) -> Result<Vec<u8>, StorageError> {
        Ok(Vec::new())
    }

    async fn write(&self, _path: &DfsPath, _offset: i64, _data: Vec<u8>) -> Result<(), StorageError> {
        Ok(())
    }
}

#[async_trait]
impl Command for MockStorage {
    async fn create(&self, path: &DfsPath) -> Result<bool, StorageError> {
        if path.is_root() {
            return Ok(false);
        }
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn delete(&self, path: &DfsPath) -> Result<bool, StorageError> {
        if path.is_root() {
            return Ok(false);
        }
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::Io("disk unavailable".to_string()));
        }
        if self.refuse_deletes.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

struct MockEndpoint {
    mock: Arc<MockStorage>,
    storage_skeleton: Skeleton,
    command_skeleton: Skeleton,
    storage_stub: StorageStub,
    command_stub: CommandStub,
}

impl MockEndpoint {
    async fn started() -> Self {
        let mock = Arc::new(MockStorage::default());
        let storage_skeleton = Skeleton::with_address(
            Arc::new(StorageDispatcher::new(mock.clone())),
            RpcAddr::new("127.0.0.1", 0),
        );
        let command_skeleton = Skeleton::with_address(
            Arc::new(CommandDispatcher::new(mock.clone())),
            RpcAddr::new("127.0.0.1", 0),
        );
        storage_skeleton.start().await.unwrap();
        command_skeleton.start().await.unwrap();
        let storage_stub = StorageStub::for_skeleton(&storage_skeleton).unwrap();
        let command_stub = CommandStub::for_skeleton(&command_skeleton).unwrap();
        Self {
            mock,
            storage_skeleton,
            command_skeleton,
            storage_stub,
            command_stub,
        }
    }

    async fn register(&self, naming: &RegistrationStub, paths: &[DfsPath]) -> Vec<DfsPath> {
        naming
            .register(
                self.storage_stub.clone(),
                self.command_stub.clone(),
                paths.to_vec(),
            )
            .await
            .unwrap()
    }

    async fn shutdown(self) {
        self.storage_skeleton.stop().await;
        self.command_skeleton.stop().await;
    }
}

#[tokio::test]
async fn disjoint_registrations_merge_into_a_union() {
    let (server, service, registration) = naming_cluster().await;
    let first = MockEndpoint::started().await;
    let second = MockEndpoint::started().await;

    assert!(first
        .register(&registration, &[p("/a/x"), p("/a/y")])
        .await
        .is_empty());
    assert!(second.register(&registration, &[p("/b/z")]).await.is_empty());

    let mut roots = service.list(&DfsPath::root()).await.unwrap();
    roots.sort();
    assert_eq!(roots, vec!["a", "b"]);
    assert!(service.is_directory(&p("/a")).await.unwrap());
    assert!(!service.is_directory(&p("/a/x")).await.unwrap());

    assert_eq!(
        service.get_storage(&p("/a/x")).await.unwrap(),
        first.storage_stub
    );
    assert_eq!(
        service.get_storage(&p("/b/z")).await.unwrap(),
        second.storage_stub
    );

    first.shutdown().await;
    second.shutdown().await;
    server.stop().await;
}

#[tokio::test]
async fn second_registration_loses_collisions_to_the_first() {
    let (server, service, registration) = naming_cluster().await;
    let first = MockEndpoint::started().await;
    let second = MockEndpoint::started().await;

    assert!(first
        .register(&registration, &[p("/shared/file")])
        .await
        .is_empty());
    let collisions = second
        .register(&registration, &[p("/shared/file"), p("/fresh")])
        .await;

    assert_eq!(collisions, vec![p("/shared/file")]);
    assert_eq!(
        service.get_storage(&p("/shared/file")).await.unwrap(),
        first.storage_stub
    );
    assert_eq!(
        service.get_storage(&p("/fresh")).await.unwrap(),
        second.storage_stub
    );

    first.shutdown().await;
    second.shutdown().await;
    server.stop().await;
}

#[tokio::test]
async fn an_endpoint_cannot_register_twice() {
    let (server, _service, registration) = naming_cluster().await;
    let endpoint = MockEndpoint::started().await;

    endpoint.register(&registration, &[p("/f")]).await;
    let outcome = registration
        .register(
            endpoint.storage_stub.clone(),
            endpoint.command_stub.clone(),
            Vec::new(),
        )
        .await;
    assert_eq!(outcome.unwrap_err(), NamingError::DuplicateRegistration);

    endpoint.shutdown().await;
    server.stop().await;
}

#[tokio::test]
async fn create_file_requires_an_existing_parent_directory() {
    let (server, service, registration) = naming_cluster().await;
    let endpoint = MockEndpoint::started().await;
    endpoint.register(&registration, &[]).await;

    assert_eq!(
        service.create_file(&p("/a/b")).await.unwrap_err(),
        NamingError::NotFound
    );

    assert!(service.create_directory(&p("/a")).await.unwrap());
    assert!(service.create_file(&p("/a/b")).await.unwrap());
    assert!(!service.create_file(&p("/a/b")).await.unwrap());
    assert_eq!(endpoint.mock.creates.load(Ordering::SeqCst), 1);

    assert_eq!(
        service.get_storage(&p("/a/b")).await.unwrap(),
        endpoint.storage_stub
    );

    // A file is not a valid parent.
    assert_eq!(
        service.create_file(&p("/a/b/c")).await.unwrap_err(),
        NamingError::NotFound
    );

    endpoint.shutdown().await;
    server.stop().await;
}

#[tokio::test]
async fn create_file_without_any_storage_server_fails() {
    let (server, service, _registration) = naming_cluster().await;

    // Directories are pure metadata and need no storage server.
    assert!(service.create_directory(&p("/d")).await.unwrap());
    assert_eq!(
        service.create_file(&p("/d/f")).await.unwrap_err(),
        NamingError::NoStorageServer
    );

    server.stop().await;
}

#[tokio::test]
async fn concurrent_creates_admit_exactly_one_winner() {
    let (server, service, registration) = naming_cluster().await;
    let endpoint = MockEndpoint::started().await;
    endpoint.register(&registration, &[]).await;

    assert!(service.create_directory(&p("/dir")).await.unwrap());

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let client = ServiceStub::new(server.service_addr());
        tasks.push(tokio::spawn(async move {
            client.create_file(&p("/dir/file")).await.unwrap()
        }));
    }
    let mut winners = 0;
    for task in tasks {
        if task.await.unwrap() {
            winners += 1;
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(endpoint.mock.creates.load(Ordering::SeqCst), 1);

    endpoint.shutdown().await;
    server.stop().await;
}

#[tokio::test]
async fn delete_purges_the_namespace_only_on_success() {
    let (server, service, registration) = naming_cluster().await;
    let endpoint = MockEndpoint::started().await;
    endpoint.register(&registration, &[p("/a/b")]).await;

    // Refused delete (false): namespace unchanged.
    endpoint.mock.refuse_deletes.store(true, Ordering::SeqCst);
    assert!(!service.delete(&p("/a/b")).await.unwrap());
    assert_eq!(service.list(&p("/a")).await.unwrap(), vec!["b"]);

    // Failing delete: the failure surfaces and the namespace is unchanged.
    endpoint.mock.refuse_deletes.store(false, Ordering::SeqCst);
    endpoint.mock.fail_deletes.store(true, Ordering::SeqCst);
    match service.delete(&p("/a/b")).await.unwrap_err() {
        NamingError::Storage(_) => {}
        other => panic!("expected a delegated storage failure, got {other:?}"),
    }
    assert_eq!(service.list(&p("/a")).await.unwrap(), vec!["b"]);

    // Working delete: the file disappears from every map.
    endpoint.mock.fail_deletes.store(false, Ordering::SeqCst);
    assert!(service.delete(&p("/a/b")).await.unwrap());
    assert_eq!(
        service.get_storage(&p("/a/b")).await.unwrap_err(),
        NamingError::NotFound
    );
    assert_eq!(
        service.is_directory(&p("/a/b")).await.unwrap_err(),
        NamingError::NotFound
    );
    assert_eq!(service.list(&p("/a")).await.unwrap(), Vec::<String>::new());
    assert_eq!(endpoint.mock.deletes.load(Ordering::SeqCst), 1);

    endpoint.shutdown().await;
    server.stop().await;
}

#[tokio::test]
async fn deleting_a_directory_reaches_every_owner_beneath_it() {
    let (server, service, registration) = naming_cluster().await;
    let first = MockEndpoint::started().await;
    let second = MockEndpoint::started().await;
    first.register(&registration, &[p("/dir/a")]).await;
    second.register(&registration, &[p("/dir/b")]).await;

    assert!(service.delete(&p("/dir")).await.unwrap());
    assert_eq!(first.mock.deletes.load(Ordering::SeqCst), 1);
    assert_eq!(second.mock.deletes.load(Ordering::SeqCst), 1);
    assert_eq!(
        service.is_directory(&p("/dir")).await.unwrap_err(),
        NamingError::NotFound
    );

    first.shutdown().await;
    second.shutdown().await;
    server.stop().await;
}

#[tokio::test]
async fn root_operations_are_no_ops() {
    let (server, service, _registration) = naming_cluster().await;

    assert!(service.is_directory(&DfsPath::root()).await.unwrap());
    assert!(!service.create_file(&DfsPath::root()).await.unwrap());
    assert!(!service.create_directory(&DfsPath::root()).await.unwrap());
    assert!(!service.delete(&DfsPath::root()).await.unwrap());

    server.stop().await;
}

#[tokio::test]
async fn delete_distinguishes_absent_targets_from_absent_parents() {
    let (server, service, _registration) = naming_cluster().await;
    service.create_directory(&p("/known")).await.unwrap();

    // Known parent, absent target: a no-op.
    assert!(!service.delete(&p("/known/ghost")).await.unwrap());
    // Unknown parent: an error.
    assert_eq!(
        service.delete(&p("/ghost/deeper")).await.unwrap_err(),
        NamingError::NotFound
    );

    server.stop().await;
}

#[tokio::test]
async fn lookups_reject_files_and_unknown_paths() {
    let (server, service, registration) = naming_cluster().await;
    let endpoint = MockEndpoint::started().await;
    endpoint.register(&registration, &[p("/f")]).await;

    assert_eq!(
        service.list(&p("/f")).await.unwrap_err(),
        NamingError::NotFound
    );
    assert_eq!(
        service.list(&p("/ghost")).await.unwrap_err(),
        NamingError::NotFound
    );
    assert_eq!(
        service.get_storage(&DfsPath::root()).await.unwrap_err(),
        NamingError::NotFound
    );

    endpoint.shutdown().await;
    server.stop().await;
}

#[tokio::test]
async fn storage_server_serves_registered_content_end_to_end() {
    let (server, service, registration) = naming_cluster().await;

    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(root.path().join("docs")).unwrap();
    std::fs::write(root.path().join("docs/report.txt"), b"hello").unwrap();

    let storage = StorageServer::new(root.path().to_path_buf());
    storage.start("127.0.0.1", &registration).await.unwrap();

    // The scanned inventory is in the namespace, ancestors included.
    assert!(service.is_directory(&p("/docs")).await.unwrap());
    let remote = service.get_storage(&p("/docs/report.txt")).await.unwrap();
    assert_eq!(remote, StorageStub::new(storage.storage_addr()));

    // Content access goes directly to the storage server.
    assert_eq!(remote.size(&p("/docs/report.txt")).await.unwrap(), 5);
    assert_eq!(
        remote.read(&p("/docs/report.txt"), 0, 5).await.unwrap(),
        b"hello"
    );
    remote
        .write(&p("/docs/report.txt"), 0, b"HELLO".to_vec())
        .await
        .unwrap();
    assert_eq!(
        remote.read(&p("/docs/report.txt"), 0, 5).await.unwrap(),
        b"HELLO"
    );
    assert_eq!(
        remote
            .read(&p("/docs/report.txt"), 3, 100)
            .await
            .unwrap_err(),
        StorageError::OutOfRange
    );

    // Creating a file through the naming server allocates it on disk.
    assert!(service.create_file(&p("/docs/new.bin")).await.unwrap());
    assert!(root.path().join("docs/new.bin").exists());

    // Deleting a directory removes it from disk and namespace alike.
    assert!(service.delete(&p("/docs")).await.unwrap());
    assert!(!root.path().join("docs").exists());
    assert_eq!(
        service.is_directory(&p("/docs")).await.unwrap_err(),
        NamingError::NotFound
    );

    storage.stop().await;
    server.stop().await;
}

#[tokio::test]
async fn a_joining_server_deletes_the_duplicates_it_lost() {
    let (server, service, registration) = naming_cluster().await;

    let first_root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(first_root.path().join("docs")).unwrap();
    std::fs::write(first_root.path().join("docs/report.txt"), b"original").unwrap();

    let second_root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(second_root.path().join("docs")).unwrap();
    std::fs::write(second_root.path().join("docs/report.txt"), b"copy").unwrap();
    std::fs::write(second_root.path().join("unique.txt"), b"mine").unwrap();

    let first = StorageServer::new(first_root.path().to_path_buf());
    first.start("127.0.0.1", &registration).await.unwrap();
    let second = StorageServer::new(second_root.path().to_path_buf());
    second.start("127.0.0.1", &registration).await.unwrap();

    // The duplicate is gone from the second server's disk, its now-empty
    // directory pruned; the unique file joined the namespace.
    assert!(!second_root.path().join("docs/report.txt").exists());
    assert!(!second_root.path().join("docs").exists());
    assert!(second_root.path().join("unique.txt").exists());

    assert_eq!(
        service.get_storage(&p("/docs/report.txt")).await.unwrap(),
        StorageStub::new(first.storage_addr())
    );
    let unique = service.get_storage(&p("/unique.txt")).await.unwrap();
    assert_eq!(unique, StorageStub::new(second.storage_addr()));
    assert_eq!(unique.read(&p("/unique.txt"), 0, 4).await.unwrap(), b"mine");

    first.stop().await;
    second.stop().await;
    server.stop().await;
}

#[tokio::test]
async fn a_storage_server_cannot_start_twice() {
    let (server, _service, registration) = naming_cluster().await;
    let root = tempfile::tempdir().unwrap();
    let storage = StorageServer::new(root.path().to_path_buf());

    storage.start("127.0.0.1", &registration).await.unwrap();
    let second_start = storage.start("127.0.0.1", &registration).await;
    assert!(second_start.is_err());

    storage.stop().await;
    server.stop().await;
}
