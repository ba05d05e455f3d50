//! `{Token}` substitution for physical paths
//!
//! Deployment manifests reference machine-specific roots through tokens
//! (`{WebRoot}\mysite`). The map is always passed in explicitly; there is
//! no ambient process-wide settings lookup.

use std::collections::HashMap;

/// Settings map used to resolve `{Token}` placeholders
pub type TokenMap = HashMap<String, String>;

/// Replace every `{Key}` occurrence in `path` with its mapped value.
/// Unknown tokens are left intact.
pub fn substitute(path: &str, tokens: &TokenMap) -> String {
    let mut resolved = path.to_string();
    for (key, value) in tokens {
        resolved = resolved.replace(&format!("{{{key}}}"), value);
    }
    resolved
}
