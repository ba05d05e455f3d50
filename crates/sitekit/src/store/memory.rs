//! In-memory store backend
//!
//! [`MemoryBackend`] plays the role of the server's durable configuration
//! store; [`MemoryStore`] is one management handle connected to it. A handle
//! clones the committed state into its working view at connect time, so two
//! handles never observe each other's uncommitted changes. Tests and
//! `webrig check` run entirely against this backend.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::model::{AppPool, Site};
use crate::store::ConfigStore;

/// Durable store contents: what a fresh handle sees at connect time
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub sites: Vec<Site>,
    pub pools: Vec<AppPool>,
}

#[derive(Debug, Default)]
struct Shared {
    state: StoreState,
    reject_commits: Option<String>,
}

/// The durable side of the in-memory store. Cloning the backend shares the
/// same underlying state, like two management sessions against one server.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    shared: Rc<RefCell<Shared>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a handle whose working view starts from the committed state
    pub fn connect(&self) -> MemoryStore {
        MemoryStore {
            backend: self.clone(),
            working: self.shared.borrow().state.clone(),
        }
    }

    /// A fresh, independent read of the committed state
    pub fn snapshot(&self) -> StoreState {
        self.shared.borrow().state.clone()
    }

    /// Committed site by name, if any
    pub fn site(&self, name: &str) -> Option<Site> {
        self.shared
            .borrow()
            .state
            .sites
            .iter()
            .find(|s| s.name == name)
            .cloned()
    }

    /// Committed pool by name, if any
    pub fn pool(&self, name: &str) -> Option<AppPool> {
        self.shared
            .borrow()
            .state
            .pools
            .iter()
            .find(|p| p.name == name)
            .cloned()
    }

    /// Make every subsequent commit fail with `reason`, simulating a store
    /// that refuses changes (e.g. a resource still referenced elsewhere)
    pub fn reject_commits(&self, reason: &str) {
        self.shared.borrow_mut().reject_commits = Some(reason.to_string());
    }

    /// Accept commits again
    pub fn accept_commits(&self) {
        self.shared.borrow_mut().reject_commits = None;
    }
}

/// One open management handle against a [`MemoryBackend`]
#[derive(Debug)]
pub struct MemoryStore {
    backend: MemoryBackend,
    working: StoreState,
}

impl ConfigStore for MemoryStore {
    fn sites(&self) -> &[Site] {
        &self.working.sites
    }

    fn site_by_name(&self, name: &str) -> Option<&Site> {
        self.working.sites.iter().find(|s| s.name == name)
    }

    fn site_by_id_mut(&mut self, id: u64) -> Option<&mut Site> {
        self.working.sites.iter_mut().find(|s| s.id == id)
    }

    fn add_site(&mut self, site: Site) -> Result<()> {
        if self
            .working
            .sites
            .iter()
            .any(|s| s.id == site.id || s.name == site.name)
        {
            return Err(Error::DuplicateSite {
                name: site.name,
                id: site.id,
            });
        }
        self.working.sites.push(site);
        Ok(())
    }

    fn remove_site(&mut self, name: &str) -> bool {
        let before = self.working.sites.len();
        self.working.sites.retain(|s| s.name != name);
        self.working.sites.len() < before
    }

    fn pools(&self) -> &[AppPool] {
        &self.working.pools
    }

    fn pool_by_name(&self, name: &str) -> Option<&AppPool> {
        self.working.pools.iter().find(|p| p.name == name)
    }

    fn pool_by_name_mut(&mut self, name: &str) -> Option<&mut AppPool> {
        self.working.pools.iter_mut().find(|p| p.name == name)
    }

    fn add_pool(&mut self, pool: AppPool) -> Result<()> {
        if self.working.pools.iter().any(|p| p.name == pool.name) {
            return Err(Error::DuplicatePool(pool.name));
        }
        self.working.pools.push(pool);
        Ok(())
    }

    fn remove_pool(&mut self, name: &str) -> bool {
        let before = self.working.pools.len();
        self.working.pools.retain(|p| p.name != name);
        self.working.pools.len() < before
    }

    fn commit(&mut self) -> Result<()> {
        let mut shared = self.backend.shared.borrow_mut();
        if let Some(reason) = &shared.reject_commits {
            return Err(Error::CommitRejected(reason.clone()));
        }
        shared.state = self.working.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PoolSettings;

    #[test]
    fn mutation_invisible_until_commit() {
        let backend = MemoryBackend::new();
        let mut store = backend.connect();

        store.add_site(Site::new("test", 1, 8080)).unwrap();
        assert!(backend.snapshot().sites.is_empty());

        store.commit().unwrap();
        assert_eq!(backend.snapshot().sites.len(), 1);
    }

    #[test]
    fn fresh_handle_starts_from_committed_state() {
        let backend = MemoryBackend::new();
        let mut first = backend.connect();
        first.add_site(Site::new("a", 1, 80)).unwrap();

        // Second handle connected before the first commits sees nothing.
        let second = backend.connect();
        assert!(second.sites().is_empty());

        first.commit().unwrap();
        let third = backend.connect();
        assert_eq!(third.sites().len(), 1);
    }

    #[test]
    fn duplicate_site_id_is_rejected() {
        let backend = MemoryBackend::new();
        let mut store = backend.connect();
        store.add_site(Site::new("a", 1, 80)).unwrap();
        let err = store.add_site(Site::new("b", 1, 81)).unwrap_err();
        assert!(matches!(err, Error::DuplicateSite { id: 1, .. }));
    }

    #[test]
    fn duplicate_pool_name_is_rejected() {
        let backend = MemoryBackend::new();
        let mut store = backend.connect();
        store
            .add_pool(AppPool::new("main", &PoolSettings::default()))
            .unwrap();
        let err = store
            .add_pool(AppPool::new("main", &PoolSettings::default()))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicatePool(name) if name == "main"));
    }

    #[test]
    fn rejected_commit_leaves_durable_state_unchanged() {
        let backend = MemoryBackend::new();
        let mut store = backend.connect();
        store.add_site(Site::new("test", 1, 8080)).unwrap();

        backend.reject_commits("site is referenced by a share");
        let err = store.commit().unwrap_err();
        assert!(matches!(err, Error::CommitRejected(_)));
        assert!(backend.snapshot().sites.is_empty());

        backend.accept_commits();
        store.commit().unwrap();
        assert_eq!(backend.snapshot().sites.len(), 1);
    }

    #[test]
    fn remove_reports_whether_anything_was_removed() {
        let backend = MemoryBackend::new();
        let mut store = backend.connect();
        store.add_site(Site::new("test", 1, 8080)).unwrap();
        assert!(store.remove_site("test"));
        assert!(!store.remove_site("test"));
        assert!(!store.remove_pool("nope"));
    }
}
