//! Policy-based recipient resolution.
//!
//! Every comment and comment thread carries its own `policies` list. That
//! list is the only source of truth for who may see a change, and it is
//! consulted afresh for every event.
//!
//! Resolution is first-match: the first policy whose permission matches
//! contributes its users and the scan stops there. Later policies with the
//! same permission are ignored, they are not unioned in.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Permission required to receive comment events.
pub const READ_COMMENTS: &str = "read:comments";

/// Permission required to receive comment thread events.
pub const READ_COMMENT_THREADS: &str = "read:commentThreads";

/// An embedded access-control entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub permission: String,
    #[serde(default)]
    pub users: Vec<String>,
}

impl Policy {
    pub fn new(permission: impl Into<String>, users: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            permission: permission.into(),
            users: users.into_iter().map(Into::into).collect(),
        }
    }
}

/// Computes the set of emails entitled to `permission`.
///
/// An empty result means nobody is entitled and the caller must not emit.
pub fn resolve_recipients(policies: &[Policy], permission: &str) -> HashSet<String> {
    policies
        .iter()
        .find(|policy| policy.permission == permission)
        .map(|policy| policy.users.iter().cloned().collect())
        .unwrap_or_default()
}

/// Reads the `policies` array of a document.
///
/// Entries that do not have the policy shape are skipped; a missing or
/// non-array field yields no policies.
pub fn policies_from(value: Option<&Value>) -> Vec<Policy> {
    match value {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_matching_policy_wins() {
        let policies = vec![
            Policy::new(READ_COMMENTS, ["a@x.com"]),
            Policy::new(READ_COMMENTS, ["b@x.com"]),
        ];

        let recipients = resolve_recipients(&policies, READ_COMMENTS);

        assert_eq!(recipients, HashSet::from(["a@x.com".to_string()]));
    }

    #[test]
    fn non_matching_policies_are_skipped() {
        let policies = vec![
            Policy::new("manage:comments", ["admin@x.com"]),
            Policy::new(READ_COMMENT_THREADS, ["u1@x.com", "u2@x.com"]),
        ];

        let recipients = resolve_recipients(&policies, READ_COMMENT_THREADS);

        assert_eq!(recipients.len(), 2);
        assert!(recipients.contains("u1@x.com"));
        assert!(recipients.contains("u2@x.com"));
        assert!(!recipients.contains("admin@x.com"));
    }

    #[test]
    fn no_matching_policy_yields_empty_set() {
        let policies = vec![Policy::new("manage:comments", ["admin@x.com"])];
        assert!(resolve_recipients(&policies, READ_COMMENTS).is_empty());
        assert!(resolve_recipients(&[], READ_COMMENTS).is_empty());
    }

    #[test]
    fn first_match_with_no_users_stops_the_scan() {
        let policies = vec![
            Policy::new(READ_COMMENTS, Vec::<String>::new()),
            Policy::new(READ_COMMENTS, ["late@x.com"]),
        ];
        assert!(resolve_recipients(&policies, READ_COMMENTS).is_empty());
    }

    #[test]
    fn duplicate_users_collapse() {
        let policies = vec![Policy::new(READ_COMMENTS, ["a@x.com", "a@x.com"])];
        assert_eq!(resolve_recipients(&policies, READ_COMMENTS).len(), 1);
    }

    #[test]
    fn policies_parsed_from_document_field() {
        let value = json!([
            {"permission": "read:comments", "users": ["a@x.com"]},
            {"permission": "manage:comments"},
            "garbage",
        ]);

        let policies = policies_from(Some(&value));

        assert_eq!(policies.len(), 2);
        assert_eq!(policies[0], Policy::new(READ_COMMENTS, ["a@x.com"]));
        assert!(policies[1].users.is_empty());
    }

    #[test]
    fn missing_or_malformed_policies_field_yields_nothing() {
        assert!(policies_from(None).is_empty());
        assert!(policies_from(Some(&json!({"permission": "read:comments"}))).is_empty());
    }
}
