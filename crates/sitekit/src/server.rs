//! Session facade over the management store
//!
//! A [`ServerConfig`] is one configuration batch: it owns the store handle
//! and the token map, hands out site and pool builders against that handle,
//! and commits whatever is still buffered when it goes out of scope. The
//! drop-time commit is the release guarantee; `close` is the explicit form
//! that surfaces the commit error.

use std::process::ExitStatus;

use log::error;

use crate::encrypt::{self, ToolVersion};
use crate::error::Result;
use crate::model::PoolSettings;
use crate::pool::PoolBuilder;
use crate::site::SiteBuilder;
use crate::store::ConfigStore;
use crate::tokens::TokenMap;

pub struct ServerConfig<S: ConfigStore> {
    store: S,
    tokens: TokenMap,
}

impl<S: ConfigStore> ServerConfig<S> {
    pub fn new(store: S) -> Self {
        Self::with_tokens(store, TokenMap::new())
    }

    /// A session whose builders resolve `{Token}` placeholders against
    /// `tokens`
    pub fn with_tokens(store: S, tokens: TokenMap) -> Self {
        Self { store, tokens }
    }

    /// Create-or-replace a site and open a builder targeting it
    pub fn add_site(&mut self, name: &str, id: u64, port: u16) -> Result<SiteBuilder<'_, S>> {
        let Self { store, tokens } = self;
        SiteBuilder::new(store, tokens).upsert(name, id, port)
    }

    /// Open a builder targeting an existing site; a miss leaves the
    /// builder's selection empty
    pub fn site(&mut self, name: &str) -> SiteBuilder<'_, S> {
        let Self { store, tokens } = self;
        SiteBuilder::new(store, tokens).select(name)
    }

    pub fn site_exists(&self, name: &str) -> bool {
        self.store.site_by_name(name).is_some()
    }

    /// Create-or-replace an application pool and open a builder targeting it
    pub fn add_pool(&mut self, name: &str, settings: &PoolSettings) -> Result<PoolBuilder<'_, S>> {
        PoolBuilder::new(&mut self.store).upsert(name, settings)
    }

    /// Open a builder targeting an existing pool
    pub fn pool(&mut self, name: &str) -> PoolBuilder<'_, S> {
        PoolBuilder::new(&mut self.store).select(name)
    }

    /// Encrypt a settings section for a site via the platform tool
    pub fn encrypt_section(
        &self,
        site_id: u64,
        section: &str,
        tool: ToolVersion,
    ) -> Result<ExitStatus> {
        encrypt::encrypt_section(site_id, section, tool)
    }

    /// Read access to the underlying handle
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Flush everything buffered in the handle to the store
    pub fn commit(&mut self) -> Result<()> {
        self.store.commit()
    }

    /// Commit and end the session, surfacing the commit error
    pub fn close(mut self) -> Result<()> {
        self.store.commit()
    }
}

impl<S: ConfigStore> Drop for ServerConfig<S> {
    fn drop(&mut self) {
        if let Err(err) = self.store.commit() {
            error!("commit on session release failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PoolSettings;
    use crate::store::{MemoryBackend, MemoryStore};

    fn server(backend: &MemoryBackend) -> ServerConfig<MemoryStore> {
        ServerConfig::new(backend.connect())
    }

    #[test]
    fn site_exists_reflects_working_view() {
        let backend = MemoryBackend::new();
        let mut config = server(&backend);
        assert!(!config.site_exists("test"));

        config.add_site("test", 563, 8887).unwrap();
        assert!(config.site_exists("test"));
    }

    #[test]
    fn mutations_are_invisible_until_commit() {
        let backend = MemoryBackend::new();
        let mut config = server(&backend);

        config.add_site("test", 563, 8887).unwrap();
        config
            .add_pool("test", &PoolSettings::default())
            .unwrap()
            .with_queue_length(42);
        assert!(backend.snapshot().sites.is_empty());
        assert!(backend.snapshot().pools.is_empty());

        config.commit().unwrap();
        let snapshot = backend.snapshot();
        assert_eq!(snapshot.sites.len(), 1);
        assert_eq!(snapshot.pools[0].queue_length, 42);
    }

    #[test]
    fn dropping_the_session_commits() {
        let backend = MemoryBackend::new();
        {
            let mut config = server(&backend);
            config.add_site("test", 563, 8887).unwrap();
        }
        assert_eq!(backend.snapshot().sites.len(), 1);
    }

    #[test]
    fn close_surfaces_commit_failure() {
        let backend = MemoryBackend::new();
        let mut config = server(&backend);
        config.add_site("test", 563, 8887).unwrap();

        backend.reject_commits("store is read-only");
        assert!(config.close().is_err());
        assert!(backend.snapshot().sites.is_empty());
    }
}
