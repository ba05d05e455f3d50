//! Resource model for the management store
//!
//! These types mirror what the server's configuration store holds: sites
//! with bindings and applications, and application pools with their process
//! and recycling settings. Instances live inside a [`ConfigStore`] working
//! view and become durable only on commit.
//!
//! [`ConfigStore`]: crate::store::ConfigStore

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Pool name a new application runs under until one is assigned
pub const DEFAULT_POOL: &str = "DefaultAppPool";

// ============================================================================
// Sites
// ============================================================================

/// A web site: bindings plus a tree of applications
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub id: u64,
    pub name: String,
    pub server_auto_start: bool,
    pub bindings: Vec<Binding>,
    pub applications: Vec<Application>,
    pub log: LogSettings,
}

impl Site {
    /// Create a site the way the store provisions one: a primary http
    /// binding on `port` and a root application mounted at `/`.
    pub fn new(name: &str, id: u64, port: u16) -> Self {
        Self {
            id,
            name: name.to_string(),
            server_auto_start: true,
            bindings: vec![Binding::http(port, "")],
            applications: vec![Application::new("/", "")],
            log: LogSettings::default(),
        }
    }

    /// Find a binding by its binding-information string
    pub fn binding(&self, information: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.information == information)
    }

    /// Find the first binding that speaks `protocol`
    pub fn binding_by_protocol(&self, protocol: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.protocol == protocol)
    }

    pub fn has_binding(&self, information: &str) -> bool {
        self.binding(information).is_some()
    }

    /// Find an application by its mount path
    pub fn application(&self, path: &str) -> Option<&Application> {
        self.applications.iter().find(|a| a.path == path)
    }

    pub fn application_mut(&mut self, path: &str) -> Option<&mut Application> {
        self.applications.iter_mut().find(|a| a.path == path)
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (id {})", self.name, self.id)
    }
}

/// An endpoint mapping for a site, identified by its information string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Binding-information string, e.g. `*:8080:example.local`
    pub information: String,
    pub protocol: String,
    /// Thumbprint of the installed certificate, for https bindings
    pub certificate_hash: Option<String>,
}

impl Binding {
    pub fn new(information: impl Into<String>, protocol: impl Into<String>) -> Self {
        Self {
            information: information.into(),
            protocol: protocol.into(),
            certificate_hash: None,
        }
    }

    /// A plain http binding on any address
    pub fn http(port: u16, hostname: &str) -> Self {
        Self::new(Self::information(port, hostname), "http")
    }

    /// Canonical information string: `*` is the address wildcard
    pub fn information(port: u16, hostname: &str) -> String {
        format!("*:{port}:{hostname}")
    }
}

/// An application mounted under a site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    /// Mount path, e.g. `/` or `/api`
    pub path: String,
    /// Name of the application pool the app runs under
    pub pool: String,
    /// Comma-joined list of enabled protocol tokens, e.g. `http,net.pipe`
    pub enabled_protocols: String,
    pub virtual_directories: Vec<VirtualDirectory>,
}

impl Application {
    /// Create an application with its root virtual directory
    pub fn new(path: &str, physical_path: &str) -> Self {
        Self {
            path: path.to_string(),
            pool: DEFAULT_POOL.to_string(),
            enabled_protocols: "http".to_string(),
            virtual_directories: vec![VirtualDirectory {
                path: "/".to_string(),
                physical_path: physical_path.to_string(),
            }],
        }
    }

    pub fn virtual_directory(&self, path: &str) -> Option<&VirtualDirectory> {
        self.virtual_directories.iter().find(|v| v.path == path)
    }

    /// Append a protocol token unless it is already enabled.
    /// Returns whether the list changed.
    pub fn enable_protocol(&mut self, token: &str) -> bool {
        let mut tokens = self.protocol_tokens();
        if tokens.iter().any(|t| t == token) {
            return false;
        }
        tokens.push(token.to_string());
        self.enabled_protocols = tokens.join(",");
        true
    }

    /// Remove the first matching protocol token. Returns whether one was
    /// removed; a non-present token leaves the list unchanged.
    pub fn disable_protocol(&mut self, token: &str) -> bool {
        let mut tokens = self.protocol_tokens();
        let Some(index) = tokens.iter().position(|t| t == token) else {
            return false;
        };
        tokens.remove(index);
        self.enabled_protocols = tokens.join(",");
        true
    }

    fn protocol_tokens(&self) -> Vec<String> {
        if self.enabled_protocols.is_empty() {
            Vec::new()
        } else {
            self.enabled_protocols
                .split(',')
                .map(ToString::to_string)
                .collect()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualDirectory {
    pub path: String,
    pub physical_path: String,
}

/// Per-site request log settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub enabled: bool,
    pub directory: Option<String>,
    pub fields: Vec<LogField>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
            fields: vec![
                LogField::Date,
                LogField::Time,
                LogField::ClientIp,
                LogField::Method,
                LogField::UriStem,
                LogField::HttpStatus,
            ],
        }
    }
}

/// Fields the site log file records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogField {
    Date,
    Time,
    ClientIp,
    UserName,
    Method,
    UriStem,
    UriQuery,
    HttpStatus,
    BytesSent,
    BytesReceived,
    TimeTaken,
    Referer,
    UserAgent,
}

// ============================================================================
// Application pools
// ============================================================================

/// An application pool and its process/recycling configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPool {
    pub name: String,
    /// Runtime version tag, e.g. `v2.0` or `v4.0`
    pub runtime_version: String,
    pub pipeline_mode: PipelineMode,
    pub identity: IdentityType,
    pub queue_length: u32,
    pub rapid_fail_protection: bool,
    pub process_model: ProcessModel,
    pub recycling: Recycling,
}

impl AppPool {
    /// Create a pool from its creation-time settings; everything else
    /// starts at the store defaults.
    pub fn new(name: &str, settings: &PoolSettings) -> Self {
        Self {
            name: name.to_string(),
            runtime_version: settings.runtime_version.clone(),
            pipeline_mode: settings.pipeline_mode,
            identity: settings.identity,
            queue_length: 1000,
            rapid_fail_protection: true,
            process_model: ProcessModel::default(),
            recycling: Recycling {
                private_memory_kb: settings.private_memory_kb,
                ..Recycling::default()
            },
        }
    }
}

/// Attributes fixed at pool creation time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    pub runtime_version: String,
    pub pipeline_mode: PipelineMode,
    pub identity: IdentityType,
    /// Private memory limit in KB; 0 means unlimited
    pub private_memory_kb: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            runtime_version: "v4.0".to_string(),
            pipeline_mode: PipelineMode::Integrated,
            identity: IdentityType::ApplicationPoolIdentity,
            private_memory_kb: 0,
        }
    }
}

/// Worker-process settings for a pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessModel {
    pub idle_timeout: Duration,
    pub pinging_enabled: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for ProcessModel {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(20 * 60),
            pinging_enabled: true,
            username: None,
            password: None,
        }
    }
}

/// Recycling settings for a pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recycling {
    /// Restart the worker process after this interval
    pub periodic_restart: Duration,
    /// Additional fixed times of day to restart at
    pub schedule: Vec<NaiveTime>,
    /// Private memory limit in KB; 0 means unlimited
    pub private_memory_kb: u64,
}

impl Default for Recycling {
    fn default() -> Self {
        Self {
            periodic_restart: Duration::from_secs(1740 * 60),
            schedule: Vec::new(),
            private_memory_kb: 0,
        }
    }
}

/// Request pipeline mode for a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineMode {
    #[default]
    Integrated,
    Classic,
}

impl FromStr for PipelineMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("integrated") {
            Ok(Self::Integrated)
        } else if s.eq_ignore_ascii_case("classic") {
            Ok(Self::Classic)
        } else {
            Err(Error::InvalidPipelineMode(s.to_string()))
        }
    }
}

/// Account the pool's worker process runs as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityType {
    LocalSystem,
    LocalService,
    NetworkService,
    SpecificUser,
    #[default]
    ApplicationPoolIdentity,
}

impl FromStr for IdentityType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "localsystem" => Ok(Self::LocalSystem),
            "localservice" => Ok(Self::LocalService),
            "networkservice" => Ok(Self::NetworkService),
            "specificuser" => Ok(Self::SpecificUser),
            "applicationpoolidentity" => Ok(Self::ApplicationPoolIdentity),
            _ => Err(Error::InvalidIdentityType(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_site_has_primary_binding_and_root_application() {
        let site = Site::new("test", 563, 8887);
        assert_eq!(site.bindings[0].information, "*:8887:");
        assert_eq!(site.bindings[0].protocol, "http");
        assert!(site.server_auto_start);

        let app = site.application("/").unwrap();
        assert_eq!(app.enabled_protocols, "http");
        assert_eq!(app.pool, DEFAULT_POOL);
        assert_eq!(app.virtual_directory("/").unwrap().physical_path, "");
    }

    #[test]
    fn enable_protocol_appends_once() {
        let mut app = Application::new("/", "");
        assert!(app.enable_protocol("net.pipe"));
        assert_eq!(app.enabled_protocols, "http,net.pipe");
        assert!(!app.enable_protocol("net.pipe"));
        assert_eq!(app.enabled_protocols, "http,net.pipe");
    }

    #[test]
    fn disable_protocol_removes_first_match_only() {
        let mut app = Application::new("/", "");
        app.enable_protocol("net.pipe");
        assert!(app.disable_protocol("http"));
        assert_eq!(app.enabled_protocols, "net.pipe");
        assert!(!app.disable_protocol("net.tcp"));
        assert_eq!(app.enabled_protocols, "net.pipe");
    }

    #[test]
    fn disable_last_protocol_leaves_empty_list() {
        let mut app = Application::new("/", "");
        assert!(app.disable_protocol("http"));
        assert_eq!(app.enabled_protocols, "");
        assert!(!app.disable_protocol("http"));
    }

    #[test]
    fn pipeline_mode_parse_rejects_unknown() {
        assert_eq!(
            "Integrated".parse::<PipelineMode>().unwrap(),
            PipelineMode::Integrated
        );
        assert!("fastcgi".parse::<PipelineMode>().is_err());
    }

    #[test]
    fn identity_parse_accepts_kebab_and_pascal() {
        assert_eq!(
            "network-service".parse::<IdentityType>().unwrap(),
            IdentityType::NetworkService
        );
        assert_eq!(
            "SpecificUser".parse::<IdentityType>().unwrap(),
            IdentityType::SpecificUser
        );
        assert!("root".parse::<IdentityType>().is_err());
    }

    #[test]
    fn pool_defaults() {
        let pool = AppPool::new("test", &PoolSettings::default());
        assert_eq!(pool.queue_length, 1000);
        assert!(pool.rapid_fail_protection);
        assert!(pool.process_model.pinging_enabled);
        assert_eq!(pool.recycling.private_memory_kb, 0);
    }
}
