//! Client-side half of the transport: a stub performs one network round
//! trip per interface method call.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::net::TcpStream;
use tracing::trace;

use crate::addr::RpcAddr;
use crate::contract::ContractSpec;
use crate::error::{BindError, RpcError};
use crate::skeleton::Skeleton;
use crate::wire::{self, Request, Response};

/// Client-side handle to a remote interface.
///
/// A stub is an immutable `{contract, address}` pair. Identity operations
/// (equality, hashing, rendering) are answered locally and never touch the
/// network; every interface method call opens a fresh connection, sends one
/// request and blocks the calling task until the one response arrives.
///
/// Two stubs are equal iff they carry the same interface and the same remote
/// address, and would therefore reach the same skeleton.
#[derive(Clone)]
pub struct Stub {
    contract: &'static ContractSpec,
    addr: RpcAddr,
}

impl Stub {
    /// Creates a stub directly from a remote address, with no skeleton
    /// object in reach. Used when bootstrapping against a well-known port.
    ///
    /// # Panics
    ///
    /// Panics if the contract is malformed; see
    /// [`ContractSpec::assert_valid`].
    pub fn new(contract: &'static ContractSpec, addr: RpcAddr) -> Self {
        contract.assert_valid();
        Self { contract, addr }
    }

    /// Creates a stub bound to a started skeleton, inheriting its advertised
    /// address.
    pub fn for_skeleton(contract: &'static ContractSpec, skeleton: &Skeleton) -> Result<Self, BindError> {
        if contract.interface != skeleton.contract().interface {
            return Err(BindError::ContractMismatch {
                stub: contract.interface,
                skeleton: skeleton.contract().interface,
            });
        }
        if !skeleton.is_started() {
            return Err(BindError::NotStarted(contract.interface));
        }
        Ok(Self::new(contract, skeleton.address()))
    }

    /// Like [`for_skeleton`](Self::for_skeleton), but first rewrites the
    /// skeleton's advertised hostname. Used when the listening address is
    /// not externally routable.
    pub fn for_skeleton_with_hostname(
        contract: &'static ContractSpec,
        skeleton: &Skeleton,
        hostname: &str,
    ) -> Result<Self, BindError> {
        skeleton.set_hostname(hostname);
        Self::for_skeleton(contract, skeleton)
    }

    pub fn contract(&self) -> &'static ContractSpec {
        self.contract
    }

    pub fn addr(&self) -> &RpcAddr {
        &self.addr
    }

    /// Performs one remote call.
    ///
    /// Returns the decoded result, re-raises the decoded application error
    /// if the remote method failed, or yields the transport failure
    /// (converted into the interface's error type) if the connection could
    /// not be opened, closed unexpectedly, or the skeleton could not
    /// dispatch the request.
    pub async fn call<A, R, E>(&self, method: &'static str, args: &A) -> Result<R, E>
    where
        A: Serialize + Sync,
        R: DeserializeOwned,
        E: DeserializeOwned + From<RpcError>,
    {
        match self.round_trip(method, args).await {
            Ok(Response::Ok(bytes)) => wire::decode::<R>(&bytes).map_err(E::from),
            Ok(Response::AppError(bytes)) => match wire::decode::<E>(&bytes) {
                Ok(app_err) => Err(app_err),
                Err(frame_err) => Err(E::from(frame_err)),
            },
            Ok(Response::Fault(err)) => Err(E::from(err)),
            Err(err) => Err(E::from(err)),
        }
    }

    async fn round_trip<A: Serialize>(&self, method: &'static str, args: &A) -> Result<Response, RpcError> {
        let body = wire::encode(args)?;
        let request = Request {
            interface: self.contract.interface.to_string(),
            method: method.to_string(),
            body,
        };
        let payload = wire::encode(&request)?;

        trace!(interface = self.contract.interface, method, addr = %self.addr, "remote call");
        let mut stream = TcpStream::connect((self.addr.host.as_str(), self.addr.port))
            .await
            .map_err(|e| RpcError::Connect(e.to_string()))?;
        wire::write_frame(&mut stream, &payload)
            .await
            .map_err(|e| RpcError::Io(e.to_string()))?;
        let frame = wire::read_frame(&mut stream)
            .await
            .map_err(|e| RpcError::Io(e.to_string()))?;
        wire::decode::<Response>(&frame)
    }
}

impl PartialEq for Stub {
    fn eq(&self, other: &Self) -> bool {
        self.contract.interface == other.contract.interface && self.addr == other.addr
    }
}

impl Eq for Stub {}

impl Hash for Stub {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.contract.interface.hash(state);
        self.addr.hash(state);
    }
}

impl fmt::Display for Stub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr)
    }
}

impl fmt::Debug for Stub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stub")
            .field("interface", &self.contract.interface)
            .field("addr", &self.addr)
            .finish()
    }
}
