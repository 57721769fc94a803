//! Server-side half of the transport: a skeleton binds an interface
//! implementation to a listening TCP address.

use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};

use crate::addr::RpcAddr;
use crate::contract::ContractSpec;
use crate::error::RpcError;
use crate::wire::{self, Request, Response};

/// Server-side dispatch half of a remote interface.
///
/// A dispatcher decodes the argument tuple for a named method, invokes the
/// matching method on its target object, and encodes the outcome. Each
/// interface provides one concrete implementation with an explicit match
/// over its method names.
#[async_trait]
pub trait RpcTarget: Send + Sync + 'static {
    fn contract(&self) -> &'static ContractSpec;

    async fn dispatch(&self, method: &str, body: &[u8]) -> Response;
}

/// Failure hooks for a running skeleton.
///
/// Implementations plug in their own reporting; the defaults log through
/// `tracing` and stop accepting on a listener error.
pub trait SkeletonEvents: Send + Sync {
    /// Called when the accept loop itself fails. Return `true` to keep
    /// accepting connections, `false` to shut the listener down.
    fn listen_error(&self, err: &std::io::Error) -> bool {
        error!(error = %err, "skeleton accept loop failed");
        false
    }

    /// Called when handling a single connection fails. Never affects the
    /// skeleton's run state.
    fn service_error(&self, err: &RpcError) {
        warn!(error = %err, "request handling failed");
    }
}

struct DefaultEvents;

impl SkeletonEvents for DefaultEvents {}

// Ports handed to skeletons that do not need a well-known address.
static NEXT_AUTO_PORT: AtomicU16 = AtomicU16::new(52000);

/// Multithreaded TCP server for one remote interface.
///
/// A skeleton accepts connections from stubs, services each connection on
/// its own task (exactly one request and one response per connection), and
/// forwards decoded calls to the target object it was constructed over.
/// Stopping closes the listener; in-flight connections are allowed to
/// finish, and the skeleton may be started again afterwards.
pub struct Skeleton {
    target: Arc<dyn RpcTarget>,
    contract: &'static ContractSpec,
    events: Arc<dyn SkeletonEvents>,
    advertised: Mutex<RpcAddr>,
    started: AtomicBool,
    lifecycle: tokio::sync::Mutex<Lifecycle>,
}

#[derive(Default)]
struct Lifecycle {
    shutdown: Option<watch::Sender<bool>>,
    accept_task: Option<JoinHandle<()>>,
}

impl Skeleton {
    /// Creates a skeleton with an auto-assigned port, for transport
    /// instances that do not need a well-known address.
    ///
    /// # Panics
    ///
    /// Panics if the target's contract is malformed (a method not declaring
    /// remote failure); see [`ContractSpec::assert_valid`].
    pub fn new(target: Arc<dyn RpcTarget>) -> Self {
        let port = NEXT_AUTO_PORT.fetch_add(1, Ordering::Relaxed);
        Self::with_address(target, RpcAddr::new("127.0.0.1", port))
    }

    /// Creates a skeleton bound to the given address. Port 0 requests a
    /// system-chosen port at [`start`](Self::start) time.
    ///
    /// # Panics
    ///
    /// Panics if the target's contract is malformed.
    pub fn with_address(target: Arc<dyn RpcTarget>, addr: RpcAddr) -> Self {
        let contract = target.contract();
        contract.assert_valid();
        Self {
            target,
            contract,
            events: Arc::new(DefaultEvents),
            advertised: Mutex::new(addr),
            started: AtomicBool::new(false),
            lifecycle: tokio::sync::Mutex::new(Lifecycle::default()),
        }
    }

    /// Replaces the failure hooks.
    pub fn with_events(mut self, events: Arc<dyn SkeletonEvents>) -> Self {
        self.events = events;
        self
    }

    pub fn contract(&self) -> &'static ContractSpec {
        self.contract
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// The address stubs should connect to. Reflects the real port once the
    /// skeleton has been started with port 0.
    pub fn address(&self) -> RpcAddr {
        self.advertised.lock().unwrap().clone()
    }

    /// Rewrites the advertised hostname, keeping the port. Used when the
    /// bind address is not externally routable.
    pub fn set_hostname(&self, host: &str) {
        self.advertised.lock().unwrap().host = host.to_string();
    }

    /// Binds the listener and spawns the accept loop. Idempotent while
    /// started; returns the advertised address.
    pub async fn start(&self) -> Result<RpcAddr, RpcError> {
        let mut lifecycle = self.lifecycle.lock().await;
        if self.started.load(Ordering::Acquire) {
            return Ok(self.address());
        }
        let port = self.advertised.lock().unwrap().port;
        let listener = TcpListener::bind(("0.0.0.0", port))
            .await
            .map_err(|e| RpcError::Io(e.to_string()))?;
        let local = listener
            .local_addr()
            .map_err(|e| RpcError::Io(e.to_string()))?;
        self.advertised.lock().unwrap().port = local.port();

        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(accept_loop(
            listener,
            self.target.clone(),
            self.events.clone(),
            rx,
        ));
        lifecycle.shutdown = Some(tx);
        lifecycle.accept_task = Some(task);
        self.started.store(true, Ordering::Release);
        debug!(interface = self.contract.interface, addr = %self.address(), "skeleton started");
        Ok(self.address())
    }

    /// Closes the listener. Connections already being serviced run to
    /// completion; the skeleton may be started again.
    pub async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        if !self.started.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(shutdown) = lifecycle.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(task) = lifecycle.accept_task.take() {
            let _ = task.await;
        }
        debug!(interface = self.contract.interface, "skeleton stopped");
    }
}

async fn accept_loop(
    listener: TcpListener,
    target: Arc<dyn RpcTarget>,
    events: Arc<dyn SkeletonEvents>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    trace!(%peer, "accepted connection");
                    let target = target.clone();
                    let events = events.clone();
                    tokio::spawn(async move {
                        if let Err(err) = serve_connection(target, stream).await {
                            events.service_error(&err);
                        }
                    });
                }
                Err(err) => {
                    if !events.listen_error(&err) {
                        break;
                    }
                }
            },
        }
    }
}

async fn serve_connection(target: Arc<dyn RpcTarget>, mut stream: TcpStream) -> Result<(), RpcError> {
    let frame = wire::read_frame(&mut stream)
        .await
        .map_err(|e| RpcError::Io(e.to_string()))?;
    let response = match wire::decode::<Request>(&frame) {
        Ok(request) => {
            let contract = target.contract();
            if request.interface != contract.interface {
                Response::Fault(RpcError::UnknownInterface(request.interface))
            } else if !contract.has_method(&request.method) {
                Response::Fault(RpcError::UnknownMethod(request.method))
            } else {
                target.dispatch(&request.method, &request.body).await
            }
        }
        Err(err) => Response::Fault(err),
    };
    let payload = wire::encode(&response)?;
    wire::write_frame(&mut stream, &payload)
        .await
        .map_err(|e| RpcError::Io(e.to_string()))
}
