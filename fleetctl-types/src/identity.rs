//! Node identity: the `(name, id)` tuple every joining node supplies, and
//! the charset restriction that keeps `name` safe to interpolate into a
//! SQL identifier (spec.md §4.2, §6, §9).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A node as supplied on the registration request.
///
/// `name` is the cluster-visible hostname; `id` is an opaque node-supplied
/// identifier. The string form `"{name}:{id}"` is the canonical key used
/// for the per-replica registration cooldown map (§4.7).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeDetails {
    pub name: String,
    pub id: String,
}

impl NodeDetails {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }

    /// The canonical cooldown/dedupe key for this request.
    pub fn cooldown_key(&self) -> String {
        format!("{}:{}", self.name, self.id)
    }
}

impl fmt::Display for NodeDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.id)
    }
}

/// A node name failed the identifier-safety charset check.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("node name {0:?} is not safe for identifier interpolation (must match ^[A-Za-z0-9_]+$)")]
pub struct NodeNameError(pub String);

/// Validate a node name against `^[A-Za-z0-9_]+$` (spec.md §4.2, §9).
///
/// Node names flow into table identifiers (`nodes_usage_details_<name>`),
/// so this check is load-bearing against SQL injection, not cosmetic.
pub fn validate_node_name(name: &str) -> Result<(), NodeNameError> {
    if !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Ok(())
    } else {
        Err(NodeNameError(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_alphanumeric_and_underscore() {
        assert!(validate_node_name("worker_01").is_ok());
        assert!(validate_node_name("Node1").is_ok());
    }

    #[test]
    fn rejects_empty_and_unsafe_names() {
        assert!(validate_node_name("").is_err());
        assert!(validate_node_name("worker-01").is_err());
        assert!(validate_node_name("worker; DROP TABLE nodes_usage;--").is_err());
        assert!(validate_node_name("worker'01").is_err());
    }

    #[test]
    fn cooldown_key_combines_name_and_id() {
        let n = NodeDetails::new("alpha", "1");
        assert_eq!(n.cooldown_key(), "alpha:1");
    }
}
