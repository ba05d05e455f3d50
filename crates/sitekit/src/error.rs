//! Error types for the sitekit crate

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reconfiguring the server
#[derive(Error, Debug)]
pub enum Error {
    /// The store refused to commit the buffered changes
    #[error("commit rejected by the configuration store: {0}")]
    CommitRejected(String),

    /// A site with the same name or numeric id already exists
    #[error("a site named {name:?} or with id {id} already exists")]
    DuplicateSite { name: String, id: u64 },

    /// An application pool with the same name already exists
    #[error("an application pool named {0:?} already exists")]
    DuplicatePool(String),

    /// A sub-resource operation targeted an application that is not mounted
    #[error("site {site:?} has no application mounted at {path:?}")]
    ApplicationNotFound { site: String, path: String },

    /// Failed to read a certificate archive
    #[error("failed to read certificate {}: {source}", .path.display())]
    CertificateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unrecognized pipeline mode name
    #[error("unrecognized pipeline mode {0:?}")]
    InvalidPipelineMode(String),

    /// Unrecognized process identity name
    #[error("unrecognized process identity {0:?}")]
    InvalidIdentityType(String),
}

/// Result type for sitekit operations
pub type Result<T> = std::result::Result<T, Error>;
