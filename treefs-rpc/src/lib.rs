//! # treefs RPC transport
//!
//! A small skeleton/stub RPC substrate over TCP, built for the treefs
//! distributed file system.
//!
//! ## Model
//!
//! - A [`Skeleton`] binds an interface implementation (via [`RpcTarget`])
//!   to a listening address and services each accepted connection on its
//!   own task: exactly one request and one response per connection.
//! - A [`Stub`] is an immutable `{contract, address}` handle; every
//!   interface method call performs one blocking round trip. Identity
//!   operations never touch the network.
//! - Application errors raised by a remote method are encoded, carried
//!   back and re-raised on the caller side with their identity intact;
//!   everything that goes wrong in the transport itself surfaces as
//!   [`RpcError`] instead.
//!
//! ## Contracts
//!
//! Every interface used with the substrate carries a [`ContractSpec`]
//! declaring, per method, that the method accounts for remote failure.
//! Constructing a skeleton or stub over a contract that violates this is a
//! construction-time panic: a call site can never reach the network through
//! an interface that does not admit a transport fault.

pub mod addr;
pub mod contract;
pub mod error;
pub mod skeleton;
pub mod stub;
pub mod wire;

pub use addr::RpcAddr;
pub use contract::{ContractSpec, MethodSpec};
pub use error::{BindError, ContractViolation, RpcError};
pub use skeleton::{RpcTarget, Skeleton, SkeletonEvents};
pub use stub::Stub;
