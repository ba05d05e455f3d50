//! Settings-section encryption via the platform tool
//!
//! Encrypting a configuration section shells out to the server platform's
//! `aspnet_regiis` tool; the caller picks which runtime's tool to run. The
//! exit status is returned rather than checked here: a non-success exit is
//! logged but not treated as a failure of the deployment batch.

use std::process::{Command, ExitStatus};

use log::{info, warn};

use crate::error::Result;

const TOOL_NET2: &str = r"C:\Windows\Microsoft.NET\Framework\v2.0.50727\aspnet_regiis";
const TOOL_NET4: &str = r"C:\Windows\Microsoft.NET\Framework\v4.0.30319\aspnet_regiis";

/// Which runtime's encryption tool to invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolVersion {
    Net2,
    #[default]
    Net4,
}

impl ToolVersion {
    fn path(self) -> &'static str {
        match self {
            Self::Net2 => TOOL_NET2,
            Self::Net4 => TOOL_NET4,
        }
    }
}

/// Encrypt `section` of the given site's configuration with the RSA
/// protected-configuration provider. Returns the tool's exit status;
/// spawning failures (tool not present) surface as errors.
pub fn encrypt_section(site_id: u64, section: &str, tool: ToolVersion) -> Result<ExitStatus> {
    let args = section_args(site_id, section);
    info!(
        "encrypting configuration section {section} for site {site_id}: {} {}",
        tool.path(),
        args.join(" ")
    );
    let status = Command::new(tool.path()).args(&args).status()?;
    if !status.success() {
        warn!("section encryption tool exited with {status}");
    }
    Ok(status)
}

fn section_args(site_id: u64, section: &str) -> Vec<String> {
    vec![
        "-pe".to_string(),
        section.to_string(),
        "-app".to_string(),
        "/".to_string(),
        "-prov".to_string(),
        "RsaProtectedConfigurationProvider".to_string(),
        "-site".to_string(),
        site_id.to_string(),
    ]
}
