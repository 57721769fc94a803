//! # treefs
//!
//! A distributed file system centered on a single naming server. The naming
//! server maintains the directory tree and maps each file path to the
//! storage server hosting its content; it stores no file data itself.
//! Storage servers hold file bytes beneath a local root directory and join
//! the system by registering their inventory, with the naming server
//! reporting back any paths already owned elsewhere so duplicates are
//! resolved in favor of the first registration.
//!
//! All cross-process calls go through the skeleton/stub transport in the
//! `treefs-rpc` crate: clients reach the naming server's `Service`
//! interface at a well-known address, storage servers call back into
//! `Registration` at startup, and content access goes directly to the
//! owning storage server through the stub returned by `get_storage`.
//!
//! ## Example: joining and reading
//!
//! ```no_run
//! use treefs::naming;
//! use treefs::proto::{Service, Storage};
//! use treefs::DfsPath;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = naming::service("127.0.0.1");
//! let path = DfsPath::parse("/docs/report.txt")?;
//! let storage = service.get_storage(&path).await?;
//! let head = storage.read(&path, 0, 64).await?;
//! # let _ = head;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod naming;
pub mod path;
pub mod proto;
pub mod storage;

pub use error::{NamingError, ServerError, StorageError};
pub use path::DfsPath;
