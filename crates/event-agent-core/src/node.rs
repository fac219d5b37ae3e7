//! Node identity
//!
//! Several gateway processes can share one bus. Each one carries a slugified
//! node id that tags every outbound envelope and filters addressed commands.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Slugified identifier of this gateway process
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeIdentity(String);

impl NodeIdentity {
    /// Slugify `raw` into a node identity
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(slugify(raw.as_ref()))
    }

    /// Default identity derived from the host name, e.g. `fs_node_pbx_01`
    pub fn from_hostname() -> Self {
        let host = std::env::var("HOSTNAME")
            .ok()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| "localhost".to_string());
        Self::new(format!("fs-node-{}", host.trim()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a request addressed to `target` is meant for this node.
    ///
    /// Empty targets are broadcasts.
    pub fn accepts(&self, target: &str) -> bool {
        target.is_empty() || target == self.0
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NodeIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lowercase ASCII letters, keep digits and `_`, replace everything else with `_`
pub fn slugify(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
