//! Management-store abstraction
//!
//! The server's configuration store is an external system. Builders talk to
//! it through [`ConfigStore`], which models one open management handle:
//! collections of sites and application pools with add/remove/lookup, and a
//! `commit` that durably applies everything buffered in the handle's working
//! view. Keeping the seam here lets the reconciliation logic run unchanged
//! against the in-memory backend in tests and `check` runs.

use crate::error::Result;
use crate::model::{AppPool, Site};

pub mod memory;

pub use memory::{MemoryBackend, MemoryStore, StoreState};

/// One open handle to the server's configuration store.
///
/// All mutation buffers inside the handle; nothing is durable, or visible
/// to an independent reader, until [`commit`](ConfigStore::commit) succeeds.
pub trait ConfigStore {
    /// All sites in the working view
    fn sites(&self) -> &[Site];

    fn site_by_name(&self, name: &str) -> Option<&Site>;

    fn site_by_id_mut(&mut self, id: u64) -> Option<&mut Site>;

    /// Add a site; fails if the name or id is already taken
    fn add_site(&mut self, site: Site) -> Result<()>;

    /// Remove a site by name. Returns whether one was removed.
    fn remove_site(&mut self, name: &str) -> bool;

    /// All application pools in the working view
    fn pools(&self) -> &[AppPool];

    fn pool_by_name(&self, name: &str) -> Option<&AppPool>;

    fn pool_by_name_mut(&mut self, name: &str) -> Option<&mut AppPool>;

    /// Add a pool; fails if the name is already taken
    fn add_pool(&mut self, pool: AppPool) -> Result<()>;

    /// Remove a pool by name. Returns whether one was removed.
    fn remove_pool(&mut self, name: &str) -> bool;

    /// Durably apply every buffered change in this handle
    fn commit(&mut self) -> Result<()>;
}
