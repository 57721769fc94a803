//! Remote interface contracts of the file system: the naming server's
//! `Service` and `Registration`, and the storage server's `Storage` and
//! `Command`. Each interface comes with a typed client stub and a server
//! dispatch table over the RPC transport.

pub mod registration;
pub mod service;
pub mod storage;

pub use registration::{Registration, RegistrationDispatcher, RegistrationStub, REGISTRATION_CONTRACT};
pub use service::{Service, ServiceDispatcher, ServiceStub, SERVICE_CONTRACT};
pub use storage::{
    Command, CommandDispatcher, CommandStub, Storage, StorageDispatcher, StorageStub,
    COMMAND_CONTRACT, STORAGE_CONTRACT,
};
