//! Fluent application pool configuration
//!
//! Same reconciliation protocol as sites, keyed by pool name: delete any
//! existing pool (committing the removal), create fresh from the
//! creation-time settings, then broadcast setters to the selected pools.

use std::time::Duration;

use chrono::NaiveTime;
use log::{info, warn};

use crate::error::Result;
use crate::model::{AppPool, IdentityType, PoolSettings};
use crate::store::ConfigStore;

/// Builder over the currently selected application pools
pub struct PoolBuilder<'a, S: ConfigStore> {
    store: &'a mut S,
    current: Vec<String>,
}

impl<'a, S: ConfigStore> PoolBuilder<'a, S> {
    pub(crate) fn new(store: &'a mut S) -> Self {
        Self {
            store,
            current: Vec::new(),
        }
    }

    /// Delete-if-present, then create fresh from `settings`. The removal is
    /// committed on its own before the replacement pool is added.
    pub(crate) fn upsert(mut self, name: &str, settings: &PoolSettings) -> Result<Self> {
        if self.store.remove_pool(name) {
            self.store.commit()?;
        }
        self.store.add_pool(AppPool::new(name, settings))?;
        self.current.push(name.to_string());
        info!("added application pool {name}");
        Ok(self)
    }

    /// Add an existing pool to the selection. A miss is a logged no-op.
    pub fn select(mut self, name: &str) -> Self {
        if self.store.pool_by_name(name).is_some() {
            if !self.current.iter().any(|n| n == name) {
                self.current.push(name.to_string());
            }
        } else {
            warn!("application pool {name:?} does not exist; nothing selected");
        }
        self
    }

    pub fn with_queue_length(self, queue_length: u32) -> Self {
        for name in &self.current {
            let Some(pool) = self.store.pool_by_name_mut(name) else {
                continue;
            };
            pool.queue_length = queue_length;
        }
        self
    }

    pub fn with_rapid_fail_protection(self, enabled: bool) -> Self {
        for name in &self.current {
            let Some(pool) = self.store.pool_by_name_mut(name) else {
                continue;
            };
            pool.rapid_fail_protection = enabled;
        }
        self
    }

    /// Worker-process idle timeout and health pinging
    pub fn with_process_model(self, idle_timeout: Duration, pinging_enabled: bool) -> Self {
        for name in &self.current {
            let Some(pool) = self.store.pool_by_name_mut(name) else {
                continue;
            };
            pool.process_model.idle_timeout = idle_timeout;
            pool.process_model.pinging_enabled = pinging_enabled;
        }
        self
    }

    /// Restart the worker process every `interval`
    pub fn with_periodic_restart(self, interval: Duration) -> Self {
        for name in &self.current {
            let Some(pool) = self.store.pool_by_name_mut(name) else {
                continue;
            };
            pool.recycling.periodic_restart = interval;
        }
        self
    }

    /// Add a fixed time of day to the restart schedule. An already
    /// scheduled time is skipped.
    pub fn restart_at(self, time: NaiveTime) -> Self {
        for name in &self.current {
            let Some(pool) = self.store.pool_by_name_mut(name) else {
                continue;
            };
            if !pool.recycling.schedule.contains(&time) {
                pool.recycling.schedule.push(time);
            }
        }
        self
    }

    /// Run-as credentials. Only effective on pools whose identity is
    /// [`IdentityType::SpecificUser`]; other identities are left untouched.
    pub fn with_credentials(self, username: &str, password: &str) -> Self {
        for name in &self.current {
            let Some(pool) = self.store.pool_by_name_mut(name) else {
                continue;
            };
            if pool.identity == IdentityType::SpecificUser {
                pool.process_model.username = Some(username.to_string());
                pool.process_model.password = Some(password.to_string());
            }
        }
        self
    }

    /// Flush everything buffered in the handle to the store
    pub fn commit(self) -> Result<Self> {
        self.store.commit()?;
        Ok(self)
    }
}
