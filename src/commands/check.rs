//! Validate a deployment manifest
//!
//! `webrig check` replays the manifest through the site and pool builders
//! against a fresh in-memory store, then reports what a deployment run
//! would configure. Nothing is persisted; the server is never touched.

use anyhow::{Context, Result};
use colored::Colorize;
use log::warn;
use std::path::PathBuf;
use std::time::Duration;

use sitekit::{MemoryBackend, MemoryCertStore, MemoryStore, ServerConfig};

use crate::config::{self, Manifest, PoolManifest, SiteManifest};

pub fn run(manifest_path: Option<PathBuf>) -> Result<()> {
    let path = match manifest_path {
        Some(path) => path,
        None => config::default_manifest_path()?,
    };
    println!("  {} Checking {}", "→".cyan(), path.display());

    let manifest = Manifest::load(&path)?;
    manifest.validate()?;

    let backend = MemoryBackend::new();
    let mut certs = MemoryCertStore::new();
    apply(&manifest, &backend, &mut certs)
        .with_context(|| format!("Manifest {} does not apply", path.display()))?;

    print_summary(&backend);
    Ok(())
}

/// Replay the whole manifest through one configuration session
pub fn apply(
    manifest: &Manifest,
    backend: &MemoryBackend,
    certs: &mut MemoryCertStore,
) -> Result<()> {
    let mut server = ServerConfig::with_tokens(backend.connect(), manifest.settings.clone());

    for pool in &manifest.pools {
        apply_pool(&mut server, pool)?;
    }
    for site in &manifest.sites {
        apply_site(&mut server, site, certs)?;
    }

    server.close()?;
    Ok(())
}

fn apply_pool(server: &mut ServerConfig<MemoryStore>, pool: &PoolManifest) -> Result<()> {
    let times = pool.restart_times()?;
    let mut builder = server.add_pool(&pool.name, &pool.settings())?;

    if let Some(queue_length) = pool.queue_length {
        builder = builder.with_queue_length(queue_length);
    }
    if let Some(enabled) = pool.rapid_fail_protection {
        builder = builder.with_rapid_fail_protection(enabled);
    }
    if let Some(minutes) = pool.idle_timeout_minutes {
        builder = builder.with_process_model(Duration::from_secs(minutes * 60), pool.pinging_enabled);
    }
    if let Some(minutes) = pool.restart_interval_minutes {
        builder = builder.with_periodic_restart(Duration::from_secs(minutes * 60));
    }
    for time in times {
        builder = builder.restart_at(time);
    }
    if let Some(credentials) = &pool.credentials {
        builder = builder.with_credentials(&credentials.username, &credentials.password);
    }

    builder.commit()?;
    Ok(())
}

fn apply_site(
    server: &mut ServerConfig<MemoryStore>,
    site: &SiteManifest,
    certs: &mut MemoryCertStore,
) -> Result<()> {
    let mut builder = server.add_site(&site.name, site.site_id(), site.port)?;

    for binding in &site.bindings {
        builder = builder.add_binding(binding.port, &binding.hostname, binding.https);
    }
    for raw in &site.non_http_bindings {
        builder = builder.add_non_http_binding(&raw.information, &raw.protocol);
    }
    for app in &site.applications {
        builder = builder.add_application(&app.path, &config::expand(&app.physical_path), &app.pool);
    }
    for vdir in &site.virtual_directories {
        builder = builder.add_virtual_directory_under(
            &vdir.application,
            &vdir.path,
            &config::expand(&vdir.physical_path),
        )?;
    }
    for protocol in &site.protocols {
        builder = builder.add_protocol(protocol.port, &protocol.hostname, &protocol.name);
    }
    if let Some(enabled) = site.logging {
        builder = builder.with_logging(enabled);
    }
    if let Some(directory) = &site.log_directory {
        builder = builder.with_log_directory(directory);
    }
    if let Some(tls) = &site.tls {
        let archive = PathBuf::from(config::expand(&tls.certificate));
        if archive.exists() {
            builder = builder.with_secure_binding(certs, tls.port, &archive, &tls.password)?;
        } else {
            warn!(
                "certificate {} not found; skipping secure binding for {}",
                archive.display(),
                site.name
            );
        }
    }

    builder.commit()?;
    Ok(())
}

fn print_summary(backend: &MemoryBackend) {
    let snapshot = backend.snapshot();

    println!();
    println!("  {} Manifest applies cleanly", "✓".green().bold());

    if !snapshot.pools.is_empty() {
        println!("    • {} application pools", snapshot.pools.len());
        for pool in &snapshot.pools {
            println!(
                "      {} ({}, queue {})",
                pool.name, pool.runtime_version, pool.queue_length
            );
        }
    }
    if !snapshot.sites.is_empty() {
        println!("    • {} sites", snapshot.sites.len());
        for site in &snapshot.sites {
            println!(
                "      {} - {} bindings, {} applications",
                site,
                site.bindings.len(),
                site.applications.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn check(content: &str) -> MemoryBackend {
        let manifest = Manifest::parse(content).unwrap();
        manifest.validate().unwrap();
        let backend = MemoryBackend::new();
        let mut certs = MemoryCertStore::new();
        apply(&manifest, &backend, &mut certs).unwrap();
        backend
    }

    #[test]
    fn applies_pools_and_sites() {
        let backend = check(
            r#"
[settings]
WebRoot = "/srv/www"

[[pools]]
name = "main"
runtime_version = "v2.0"
queue_length = 2000
restart_schedule = ["03:00"]

[[sites]]
name = "example"
id = 563
port = 8887
bindings = [{ port = 4887, hostname = "example.local" }]
applications = [{ path = "/", physical_path = "{WebRoot}/example", pool = "main" }]
virtual_directories = [{ path = "/static", physical_path = "{WebRoot}/static" }]
"#,
        );

        let pool = backend.pool("main").unwrap();
        assert_eq!(pool.queue_length, 2000);
        assert_eq!(pool.recycling.schedule.len(), 1);

        let site = backend.site("example").unwrap();
        assert_eq!(site.id, 563);
        assert!(site.has_binding("*:4887:example.local"));
        let app = site.application("/").unwrap();
        assert_eq!(app.pool, "main");
        assert_eq!(
            app.virtual_directory("/static").unwrap().physical_path,
            "/srv/www/static"
        );
    }

    #[test]
    fn missing_certificate_skips_secure_binding() {
        let backend = check(
            r#"
[[sites]]
name = "example"
port = 8887
tls = { port = 4887, certificate = "/nonexistent/site.pfx", password = "pw" }
"#,
        );

        let site = backend.site("example").unwrap();
        assert!(site.binding_by_protocol("https").is_none());
    }

    #[test]
    fn present_certificate_installs_secure_binding() {
        let mut archive = tempfile::NamedTempFile::new().unwrap();
        archive.write_all(b"pfx bytes").unwrap();

        let content = format!(
            "[[sites]]\nname = \"example\"\nport = 8887\ntls = {{ port = 4887, certificate = {:?}, password = \"pw\" }}\n",
            archive.path().to_string_lossy()
        );
        let manifest = Manifest::parse(&content).unwrap();
        let backend = MemoryBackend::new();
        let mut certs = MemoryCertStore::new();
        apply(&manifest, &backend, &mut certs).unwrap();

        let site = backend.site("example").unwrap();
        let binding = site.binding_by_protocol("https").unwrap();
        assert_eq!(binding.information, "*:4887:");
        assert!(certs.contains(binding.certificate_hash.as_deref().unwrap()));
    }

    #[test]
    fn reapplying_manifest_converges() {
        let content = r#"
[[pools]]
name = "main"

[[sites]]
name = "example"
port = 8887
"#;
        let manifest = Manifest::parse(content).unwrap();
        let backend = MemoryBackend::new();
        let mut certs = MemoryCertStore::new();
        apply(&manifest, &backend, &mut certs).unwrap();
        apply(&manifest, &backend, &mut certs).unwrap();

        let snapshot = backend.snapshot();
        assert_eq!(snapshot.pools.len(), 1);
        assert_eq!(snapshot.sites.len(), 1);
    }

    #[test]
    fn unknown_pipeline_mode_fails_at_parse() {
        assert!(Manifest::parse("[[pools]]\nname = \"x\"\npipeline_mode = \"turbo\"\n").is_err());
    }
}
