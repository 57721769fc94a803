//! The naming server and the well-known addresses it is reachable at.
//!
//! Stubs for the naming server are typically created directly from a
//! network address: clients and storage servers only know its hostname.
//! The helpers here pair a hostname with the well-known ports.

pub mod namespace;
pub mod server;

pub use namespace::{Endpoint, Namespace, Node};
pub use server::NamingServer;

use treefs_rpc::RpcAddr;

use crate::proto::{RegistrationStub, ServiceStub};

/// Well-known port of the client-facing `Service` interface.
pub const SERVICE_PORT: u16 = 6000;

/// Well-known port of the storage-facing `Registration` interface.
pub const REGISTRATION_PORT: u16 = 6001;

/// Stub for the `Service` interface of the naming server on `host`.
pub fn service(host: &str) -> ServiceStub {
    ServiceStub::new(RpcAddr::new(host, SERVICE_PORT))
}

/// Stub for the `Registration` interface of the naming server on `host`.
pub fn registration(host: &str) -> RegistrationStub {
    RegistrationStub::new(RpcAddr::new(host, REGISTRATION_PORT))
}
