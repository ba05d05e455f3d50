//! Fluent site configuration
//!
//! A [`SiteBuilder`] targets the set of sites selected so far (usually one)
//! and broadcasts every setter to all of them. Creation goes through the
//! upsert protocol: an existing site with the same name is removed and the
//! removal committed before the replacement is added, so re-running a
//! deployment script always produces a freshly constructed site.

use std::path::Path;

use log::{info, warn};

use crate::cert::CertificateStore;
use crate::error::{Error, Result};
use crate::model::{Application, Binding, LogField, Site, VirtualDirectory};
use crate::store::ConfigStore;
use crate::tokens::{TokenMap, substitute};

/// Builder over the currently selected sites
#[derive(Debug)]
pub struct SiteBuilder<'a, S: ConfigStore> {
    store: &'a mut S,
    tokens: &'a TokenMap,
    current: Vec<u64>,
}

impl<'a, S: ConfigStore> SiteBuilder<'a, S> {
    pub(crate) fn new(store: &'a mut S, tokens: &'a TokenMap) -> Self {
        Self {
            store,
            tokens,
            current: Vec::new(),
        }
    }

    /// Delete-if-present, then create fresh. The removal is committed on
    /// its own before the replacement site is added.
    pub(crate) fn upsert(mut self, name: &str, id: u64, port: u16) -> Result<Self> {
        if self.store.remove_site(name) {
            self.store.commit()?;
        }
        self.store.add_site(Site::new(name, id, port))?;
        self.current.push(id);
        info!("added site {name} (id {id}, port {port})");
        Ok(self)
    }

    /// Add an existing site to the selection. A miss is a logged no-op.
    pub fn select(mut self, name: &str) -> Self {
        match self.store.site_by_name(name) {
            Some(site) => {
                let id = site.id;
                if !self.current.contains(&id) {
                    self.current.push(id);
                }
            }
            None => warn!("site {name:?} does not exist; nothing selected"),
        }
        self
    }

    /// Add an http/https binding. Adding an identical binding twice keeps
    /// exactly one entry.
    pub fn add_binding(self, port: u16, hostname: &str, https: bool) -> Self {
        let information = Binding::information(port, hostname);
        let protocol = if https { "https" } else { "http" };
        for &id in &self.current {
            let Some(site) = self.store.site_by_id_mut(id) else {
                continue;
            };
            if site.has_binding(&information) {
                info!("binding {information} for {site} already exists");
            } else {
                site.bindings
                    .push(Binding::new(information.clone(), protocol));
                info!("added binding {information} for {site}");
            }
        }
        self
    }

    /// Delete a binding by port and hostname. A miss is a logged no-op.
    pub fn delete_binding(self, port: u16, hostname: &str) -> Self {
        let information = Binding::information(port, hostname);
        for &id in &self.current {
            let Some(site) = self.store.site_by_id_mut(id) else {
                continue;
            };
            if let Some(index) = site
                .bindings
                .iter()
                .position(|b| b.information == information)
            {
                site.bindings.remove(index);
                info!("deleted binding {information} for {site}");
            } else {
                warn!("binding {information} for {site} does not exist");
            }
        }
        self
    }

    /// Add a binding from a raw binding-information string, replacing any
    /// existing binding with the same information.
    pub fn add_non_http_binding(self, information: &str, protocol: &str) -> Self {
        for &id in &self.current {
            let Some(site) = self.store.site_by_id_mut(id) else {
                continue;
            };
            let before = site.bindings.len();
            site.bindings.retain(|b| b.information != information);
            if site.bindings.len() < before {
                info!("replaced binding {information} for {site}");
            }
            site.bindings.push(Binding::new(information, protocol));
            info!("added binding {information} ({protocol}) for {site}");
        }
        self
    }

    /// Delete a binding matching the exact raw binding-information string
    /// and protocol. A miss is a logged no-op.
    pub fn delete_non_http_binding(self, information: &str, protocol: &str) -> Self {
        for &id in &self.current {
            let Some(site) = self.store.site_by_id_mut(id) else {
                continue;
            };
            if let Some(index) = site
                .bindings
                .iter()
                .position(|b| b.information == information && b.protocol == protocol)
            {
                site.bindings.remove(index);
                info!("deleted binding {information} for {site}");
            } else {
                warn!("binding {information} ({protocol}) for {site} does not exist");
            }
        }
        self
    }

    /// Enable a protocol token on every application of each selected site
    /// that carries a binding for `port`/`hostname`. Already-enabled tokens
    /// are skipped.
    pub fn add_protocol(self, port: u16, hostname: &str, protocol: &str) -> Self {
        let information = Binding::information(port, hostname);
        for &id in &self.current {
            let Some(site) = self.store.site_by_id_mut(id) else {
                continue;
            };
            if !site.has_binding(&information) {
                continue;
            }
            let label = site.to_string();
            for application in &mut site.applications {
                if application.enable_protocol(protocol) {
                    info!(
                        "enabled protocol {protocol} on {} for {label}",
                        application.path
                    );
                } else {
                    info!("protocol {protocol} for {label} already enabled");
                }
            }
        }
        self
    }

    /// Remove a protocol token from every application of each selected site
    /// that carries a binding for `port`/`hostname`. A non-present token is
    /// a logged no-op.
    pub fn delete_protocol(self, port: u16, hostname: &str, protocol: &str) -> Self {
        let information = Binding::information(port, hostname);
        for &id in &self.current {
            let Some(site) = self.store.site_by_id_mut(id) else {
                continue;
            };
            if !site.has_binding(&information) {
                continue;
            }
            let label = site.to_string();
            let mut removed = false;
            for application in &mut site.applications {
                if application.disable_protocol(protocol) {
                    info!(
                        "removed protocol {protocol} from {} for {label}",
                        application.path
                    );
                    removed = true;
                }
            }
            if !removed {
                warn!("protocol {protocol} for {label} is not enabled");
            }
        }
        self
    }

    /// Mount an application, replacing any application at the same path.
    /// `{Token}` placeholders in the physical path are resolved against the
    /// session's settings map.
    pub fn add_application(self, path: &str, physical_path: &str, pool: &str) -> Self {
        let physical = substitute(physical_path, self.tokens);
        for &id in &self.current {
            let Some(site) = self.store.site_by_id_mut(id) else {
                continue;
            };
            site.applications.retain(|a| a.path != path);
            let mut application = Application::new(path, &physical);
            application.pool = pool.to_string();
            site.applications.push(application);
        }
        info!("added application {path} running under {pool} app pool");
        self
    }

    /// Unmount an application. A miss is a logged no-op; the application's
    /// virtual directories go with it.
    pub fn delete_application(self, path: &str) -> Self {
        for &id in &self.current {
            let Some(site) = self.store.site_by_id_mut(id) else {
                continue;
            };
            let before = site.applications.len();
            site.applications.retain(|a| a.path != path);
            if site.applications.len() < before {
                info!("deleted application {path} from {site}");
            } else {
                warn!("application {path} for {site} does not exist");
            }
        }
        self
    }

    /// Add a virtual directory under the root application
    pub fn add_virtual_directory(self, path: &str, physical_path: &str) -> Result<Self> {
        self.add_virtual_directory_under("/", path, physical_path)
    }

    /// Add a virtual directory under a specific application. Re-applying
    /// with the same path updates the physical path in place.
    pub fn add_virtual_directory_under(
        self,
        application: &str,
        path: &str,
        physical_path: &str,
    ) -> Result<Self> {
        let physical = substitute(physical_path, self.tokens);
        for &id in &self.current {
            let Some(site) = self.store.site_by_id_mut(id) else {
                continue;
            };
            let site_name = site.name.clone();
            let app = site
                .application_mut(application)
                .ok_or_else(|| Error::ApplicationNotFound {
                    site: site_name,
                    path: application.to_string(),
                })?;
            match app
                .virtual_directories
                .iter_mut()
                .find(|v| v.path == path)
            {
                Some(existing) => existing.physical_path = physical.clone(),
                None => app.virtual_directories.push(VirtualDirectory {
                    path: path.to_string(),
                    physical_path: physical.clone(),
                }),
            }
        }
        info!("added virtual directory {path}");
        Ok(self)
    }

    /// Delete a virtual directory under the root application
    pub fn delete_virtual_directory(self, path: &str) -> Self {
        self.delete_virtual_directory_under("/", path)
    }

    /// Delete a virtual directory under a specific application. A missing
    /// application or directory is a logged no-op.
    pub fn delete_virtual_directory_under(self, application: &str, path: &str) -> Self {
        for &id in &self.current {
            let Some(site) = self.store.site_by_id_mut(id) else {
                continue;
            };
            let label = site.to_string();
            let Some(app) = site.application_mut(application) else {
                warn!("application {application} for {label} does not exist");
                continue;
            };
            if let Some(index) = app.virtual_directories.iter().position(|v| v.path == path) {
                app.virtual_directories.remove(index);
                info!("removed virtual directory {path} from {label}");
            } else {
                warn!("virtual directory {path} for {label} does not exist");
            }
        }
        self
    }

    /// Install a certificate and bind it on `port`. The certificate must be
    /// resident in the trust store before any binding references its hash,
    /// so a load or install failure aborts with the binding table untouched.
    pub fn with_secure_binding<C: CertificateStore>(
        self,
        certs: &mut C,
        port: u16,
        archive: &Path,
        password: &str,
    ) -> Result<Self> {
        let certificate = certs.load(archive, password)?;
        certs.install(&certificate)?;

        let information = Binding::information(port, "");
        for &id in &self.current {
            let Some(site) = self.store.site_by_id_mut(id) else {
                continue;
            };
            site.bindings.retain(|b| b.information != information);
            let mut binding = Binding::new(information.clone(), "https");
            binding.certificate_hash = Some(certificate.thumbprint.clone());
            site.bindings.push(binding);
            info!("installed secure binding {information} for {site}");
        }
        info!(
            "installed certificate {} on port {port}",
            archive.display()
        );
        Ok(self)
    }

    pub fn with_logging(self, enabled: bool) -> Self {
        for &id in &self.current {
            let Some(site) = self.store.site_by_id_mut(id) else {
                continue;
            };
            site.log.enabled = enabled;
        }
        self
    }

    /// Set logging and extend the recorded fields (existing fields stay)
    pub fn with_log_fields(self, enabled: bool, extra: &[LogField]) -> Self {
        for &id in &self.current {
            let Some(site) = self.store.site_by_id_mut(id) else {
                continue;
            };
            site.log.enabled = enabled;
            for field in extra {
                if !site.log.fields.contains(field) {
                    site.log.fields.push(*field);
                }
            }
        }
        self
    }

    pub fn with_log_directory(self, directory: &str) -> Self {
        for &id in &self.current {
            let Some(site) = self.store.site_by_id_mut(id) else {
                continue;
            };
            site.log.directory = Some(directory.to_string());
        }
        self
    }

    /// Flush everything buffered in the handle to the store
    pub fn commit(self) -> Result<Self> {
        self.store.commit()?;
        Ok(self)
    }
}
