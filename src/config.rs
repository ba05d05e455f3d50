//! Deployment manifest schema
//!
//! A manifest is a TOML file declaring the pools and sites a deployment
//! should converge the server to, plus a `[settings]` table whose keys are
//! available as `{Token}` placeholders in physical paths.

use anyhow::{Context, Result, bail};
use chrono::NaiveTime;
use serde::Deserialize;
use sitekit::{IdentityType, PipelineMode, PoolSettings};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the default manifest location
pub const ENV_MANIFEST: &str = "WEBRIG_MANIFEST";

// ============================================================================
// Manifest
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct Manifest {
    /// Token map for `{Token}` substitution in physical paths
    #[serde(default)]
    pub settings: HashMap<String, String>,

    #[serde(default)]
    pub pools: Vec<PoolManifest>,

    #[serde(default)]
    pub sites: Vec<SiteManifest>,
}

impl Manifest {
    /// Load a manifest from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read manifest: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse manifest TOML
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid TOML format in deployment manifest")
    }

    /// Validate internal consistency before anything touches a store
    pub fn validate(&self) -> Result<()> {
        let mut pool_names = HashSet::new();
        for pool in &self.pools {
            if !pool_names.insert(pool.name.as_str()) {
                bail!("Duplicate pool {:?} in manifest", pool.name);
            }
            pool.restart_times()
                .with_context(|| format!("Invalid restart schedule for pool {:?}", pool.name))?;
        }

        let mut site_names = HashSet::new();
        let mut site_ids = HashSet::new();
        for site in &self.sites {
            if !site_names.insert(site.name.as_str()) {
                bail!("Duplicate site {:?} in manifest", site.name);
            }
            if !site_ids.insert(site.site_id()) {
                bail!("Duplicate site id {} in manifest", site.site_id());
            }
            for vdir in &site.virtual_directories {
                let known = vdir.application == "/"
                    || site.applications.iter().any(|a| a.path == vdir.application);
                if !known {
                    bail!(
                        "Site {:?}: virtual directory {:?} references unknown application {:?}",
                        site.name,
                        vdir.path,
                        vdir.application
                    );
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Pools
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PoolManifest {
    pub name: String,

    #[serde(default = "default_runtime_version")]
    pub runtime_version: String,

    #[serde(default)]
    pub pipeline_mode: PipelineMode,

    #[serde(default)]
    pub identity: IdentityType,

    /// Private memory limit in KB; 0 means unlimited
    #[serde(default)]
    pub private_memory_kb: u64,

    #[serde(default)]
    pub queue_length: Option<u32>,

    #[serde(default)]
    pub rapid_fail_protection: Option<bool>,

    #[serde(default)]
    pub idle_timeout_minutes: Option<u64>,

    /// Paired with the idle timeout when one is given
    #[serde(default = "default_true")]
    pub pinging_enabled: bool,

    #[serde(default)]
    pub restart_interval_minutes: Option<u64>,

    /// Fixed restart times of day, `HH:MM`
    #[serde(default)]
    pub restart_schedule: Vec<String>,

    #[serde(default)]
    pub credentials: Option<Credentials>,
}

impl PoolManifest {
    /// Creation-time settings for the upsert
    pub fn settings(&self) -> PoolSettings {
        PoolSettings {
            runtime_version: self.runtime_version.clone(),
            pipeline_mode: self.pipeline_mode,
            identity: self.identity,
            private_memory_kb: self.private_memory_kb,
        }
    }

    /// Parsed restart schedule
    pub fn restart_times(&self) -> Result<Vec<NaiveTime>> {
        self.restart_schedule
            .iter()
            .map(|t| {
                NaiveTime::parse_from_str(t, "%H:%M")
                    .with_context(|| format!("Invalid time of day {t:?} (expected HH:MM)"))
            })
            .collect()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

// ============================================================================
// Sites
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SiteManifest {
    pub name: String,

    /// Distinct numeric id; defaults to the primary port
    #[serde(default)]
    pub id: Option<u64>,

    /// Primary http port
    pub port: u16,

    #[serde(default)]
    pub bindings: Vec<BindingManifest>,

    #[serde(default)]
    pub non_http_bindings: Vec<RawBindingManifest>,

    #[serde(default)]
    pub applications: Vec<ApplicationManifest>,

    #[serde(default)]
    pub virtual_directories: Vec<VirtualDirectoryManifest>,

    #[serde(default)]
    pub protocols: Vec<ProtocolManifest>,

    #[serde(default)]
    pub logging: Option<bool>,

    #[serde(default)]
    pub log_directory: Option<String>,

    #[serde(default)]
    pub tls: Option<TlsManifest>,
}

impl SiteManifest {
    pub fn site_id(&self) -> u64 {
        self.id.unwrap_or(u64::from(self.port))
    }
}

#[derive(Debug, Deserialize)]
pub struct BindingManifest {
    pub port: u16,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub https: bool,
}

#[derive(Debug, Deserialize)]
pub struct RawBindingManifest {
    pub information: String,
    pub protocol: String,
}

#[derive(Debug, Deserialize)]
pub struct ApplicationManifest {
    pub path: String,
    pub physical_path: String,
    pub pool: String,
}

#[derive(Debug, Deserialize)]
pub struct VirtualDirectoryManifest {
    /// Application the directory mounts under
    #[serde(default = "default_application")]
    pub application: String,
    pub path: String,
    pub physical_path: String,
}

#[derive(Debug, Deserialize)]
pub struct ProtocolManifest {
    pub port: u16,
    #[serde(default)]
    pub hostname: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct TlsManifest {
    pub port: u16,
    /// Certificate archive (pfx) to import
    pub certificate: String,
    #[serde(default)]
    pub password: String,
}

// ============================================================================
// Paths
// ============================================================================

/// Default manifest location: `WEBRIG_MANIFEST` env override, then
/// `~/.config/webrig/deploy.toml`
pub fn default_manifest_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(ENV_MANIFEST) {
        return Ok(PathBuf::from(expand(&path)));
    }
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("webrig").join("deploy.toml"))
}

/// Expand `~` and environment variables in a path string
pub fn expand(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or(std::borrow::Cow::Borrowed(path))
        .into_owned()
}

fn default_runtime_version() -> String {
    "v4.0".to_string()
}

fn default_true() -> bool {
    true
}

fn default_application() -> String {
    "/".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[settings]
WebRoot = "/srv/www"

[[pools]]
name = "main"
runtime_version = "v2.0"
pipeline_mode = "classic"
identity = "network-service"
private_memory_kb = 666
queue_length = 2000
restart_schedule = ["03:00"]

[[sites]]
name = "example"
id = 563
port = 8887
bindings = [{ port = 4887, hostname = "example.local", https = false }]
applications = [{ path = "/", physical_path = "{WebRoot}/example", pool = "main" }]
virtual_directories = [{ path = "/static", physical_path = "{WebRoot}/static" }]
protocols = [{ port = 4887, hostname = "example.local", name = "net.pipe" }]
log_directory = "/var/log/example"
"#;

    #[test]
    fn parses_sample_manifest() {
        let manifest = Manifest::parse(SAMPLE).unwrap();
        manifest.validate().unwrap();

        assert_eq!(manifest.settings["WebRoot"], "/srv/www");
        let pool = &manifest.pools[0];
        assert_eq!(pool.pipeline_mode, PipelineMode::Classic);
        assert_eq!(pool.identity, IdentityType::NetworkService);
        assert_eq!(pool.settings().private_memory_kb, 666);
        assert_eq!(
            pool.restart_times().unwrap(),
            vec![NaiveTime::from_hms_opt(3, 0, 0).unwrap()]
        );

        let site = &manifest.sites[0];
        assert_eq!(site.site_id(), 563);
        assert_eq!(site.virtual_directories[0].application, "/");
    }

    #[test]
    fn site_id_defaults_to_port() {
        let manifest = Manifest::parse("[[sites]]\nname = \"a\"\nport = 8080\n").unwrap();
        assert_eq!(manifest.sites[0].site_id(), 8080);
    }

    #[test]
    fn pool_defaults() {
        let manifest = Manifest::parse("[[pools]]\nname = \"main\"\n").unwrap();
        let pool = &manifest.pools[0];
        assert_eq!(pool.runtime_version, "v4.0");
        assert_eq!(pool.pipeline_mode, PipelineMode::Integrated);
        assert_eq!(pool.identity, IdentityType::ApplicationPoolIdentity);
        assert_eq!(pool.private_memory_kb, 0);
        assert!(pool.pinging_enabled);
    }

    #[test]
    fn rejects_duplicate_pool_names() {
        let manifest =
            Manifest::parse("[[pools]]\nname = \"main\"\n\n[[pools]]\nname = \"main\"\n").unwrap();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_site_ids() {
        let manifest = Manifest::parse(
            "[[sites]]\nname = \"a\"\nport = 8080\n\n[[sites]]\nname = \"b\"\nid = 8080\nport = 9090\n",
        )
        .unwrap();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn rejects_unknown_application_reference() {
        let manifest = Manifest::parse(
            "[[sites]]\nname = \"a\"\nport = 8080\nvirtual_directories = [{ application = \"/api\", path = \"/v\", physical_path = \"/srv\" }]\n",
        )
        .unwrap();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn rejects_bad_schedule_time() {
        let manifest =
            Manifest::parse("[[pools]]\nname = \"main\"\nrestart_schedule = [\"25:99\"]\n")
                .unwrap();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn rejects_unknown_identity() {
        assert!(Manifest::parse("[[pools]]\nname = \"main\"\nidentity = \"root\"\n").is_err());
    }
}
