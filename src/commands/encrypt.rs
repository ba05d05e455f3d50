//! Encrypt a configuration section via the platform tool

use anyhow::{Context, Result};
use colored::Colorize;
use sitekit::ToolVersion;

pub fn run(site_id: u64, section: &str, net2: bool) -> Result<()> {
    let tool = if net2 {
        ToolVersion::Net2
    } else {
        ToolVersion::Net4
    };

    let status = sitekit::encrypt_section(site_id, section, tool)
        .context("Failed to run the section encryption tool")?;

    if status.success() {
        println!(
            "  {} Encrypted section {section} for site {site_id}",
            "✓".green()
        );
    } else {
        println!("  {} Encryption tool exited with {status}", "⚠".yellow());
    }
    Ok(())
}
