//! The resolved identity of the current source state.

use serde::{Deserialize, Serialize};

/// Identity of the checkout a run operates on.
///
/// Resolved once per run and immutable afterwards. The full `commit` id
/// is the rebuild-decision key; `short_commit` exists for display only
/// and must never be used in equality comparisons.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Revision {
    /// Full commit identifier.
    pub commit: String,

    /// Abbreviated commit identifier, for logs and reports.
    pub short_commit: String,

    /// Commit author name.
    pub author: String,

    /// Commit subject line.
    pub message: String,

    /// Branch name with any remote prefix stripped.
    pub branch: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revision_roundtrips_through_json() {
        let rev = Revision {
            commit: "deadbeefdeadbeefdeadbeefdeadbeefdeadbeef".to_string(),
            short_commit: "deadbee".to_string(),
            author: "jenkins".to_string(),
            message: "bump app2".to_string(),
            branch: "main".to_string(),
        };
        let raw = serde_json::to_string(&rev).unwrap();
        let back: Revision = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, rev);
    }
}
