//! # sitekit
//!
//! Fluent builders over a web server's management store.
//!
//! Deployment scripts use this crate to declaratively create, update and
//! delete sites, application pools, bindings and virtual directories
//! without editing the server's configuration store by hand:
//! - Creation is an **upsert**: an existing resource with the same key is
//!   deleted (and the deletion committed) before a fresh one is created, so
//!   repeated runs of the same script converge on the same state.
//! - Every setter broadcasts to the builder's current selection and is
//!   idempotent under re-application; deleting something that is not there
//!   is a logged no-op.
//! - Nothing is durable until `commit`; dropping the session commits as a
//!   release guarantee.
//!
//! The store itself is external and reached through the [`ConfigStore`]
//! trait; [`MemoryBackend`] is the in-memory implementation used by tests
//! and manifest validation.
//!
//! ## Example
//!
//! ```
//! use sitekit::{MemoryBackend, PoolSettings, ServerConfig};
//!
//! # fn main() -> sitekit::Result<()> {
//! let backend = MemoryBackend::new();
//! let mut server = ServerConfig::new(backend.connect());
//!
//! server
//!     .add_pool("main", &PoolSettings::default())?
//!     .with_queue_length(2000)
//!     .commit()?;
//!
//! server
//!     .add_site("example", 1, 8080)?
//!     .add_binding(8081, "example.local", false)
//!     .add_application("/", "/srv/www/example", "main")
//!     .commit()?;
//!
//! drop(server);
//! assert_eq!(backend.snapshot().sites.len(), 1);
//! assert_eq!(backend.pool("main").unwrap().queue_length, 2000);
//! # Ok(())
//! # }
//! ```

mod cert;
mod encrypt;
mod error;
mod model;
mod pool;
mod server;
mod site;
mod store;
mod tokens;

pub use cert::{Certificate, CertificateStore, MemoryCertStore};
pub use encrypt::{ToolVersion, encrypt_section};
pub use error::{Error, Result};
pub use model::{
    AppPool, Application, Binding, DEFAULT_POOL, IdentityType, LogField, LogSettings,
    PipelineMode, PoolSettings, ProcessModel, Recycling, Site, VirtualDirectory,
};
pub use pool::PoolBuilder;
pub use server::ServerConfig;
pub use site::SiteBuilder;
pub use store::{ConfigStore, MemoryBackend, MemoryStore, StoreState};
pub use tokens::{TokenMap, substitute};
