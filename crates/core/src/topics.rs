//! Change-notification topic derivation.
//!
//! Every mutation publishes on several topics so subscribers can listen at
//! any granularity:
//!
//! ```text
//! loan_tag.create
//! loan_tag.create.<id>
//! loan_tag.create.branch.<branch_id>
//! loan_tag.create.organization.<organization_id>
//! loan_tag.create.loan_transaction.<loan_transaction_id>
//! ```

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// Scope axis name for the branch topic.
pub const SCOPE_BRANCH: &str = "branch";

/// Scope axis name for the organization topic.
pub const SCOPE_ORGANIZATION: &str = "organization";

/// The mutation that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the topic list for one mutation of one entity.
///
/// `scopes` are `(axis, id)` pairs emitted in the order given; entities list
/// branch, then organization, then their owner (if any).
pub fn entity_topics(kind: &str, action: Action, id: DbId, scopes: &[(&str, DbId)]) -> Vec<String> {
    let base = format!("{kind}.{action}");
    let mut topics = vec![format!("{base}.{id}")];
    topics.extend(
        scopes
            .iter()
            .map(|(axis, scope_id)| format!("{base}.{axis}.{scope_id}")),
    );
    topics.insert(0, base);
    topics
}

/// Whether `topic` is one of the topics of an event.
pub fn has_topic(topics: &[String], topic: &str) -> bool {
    topics.iter().any(|t| t == topic)
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn bare_and_id_topics_come_first() {
        let id = Uuid::nil();
        let topics = entity_topics("organization", Action::Create, id, &[]);
        assert_eq!(
            topics,
            vec![
                "organization.create".to_string(),
                format!("organization.create.{id}"),
            ]
        );
    }

    #[test]
    fn scopes_are_appended_in_order() {
        let id = Uuid::from_u128(1);
        let branch = Uuid::from_u128(2);
        let org = Uuid::from_u128(3);
        let topics = entity_topics(
            "member_type",
            Action::Delete,
            id,
            &[(SCOPE_BRANCH, branch), (SCOPE_ORGANIZATION, org)],
        );
        assert_eq!(topics.len(), 4);
        assert_eq!(topics[2], format!("member_type.delete.branch.{branch}"));
        assert_eq!(topics[3], format!("member_type.delete.organization.{org}"));
    }

    #[test]
    fn action_strings() {
        assert_eq!(Action::Create.as_str(), "create");
        assert_eq!(Action::Update.to_string(), "update");
        assert_eq!(Action::Delete.as_str(), "delete");
    }

    #[test]
    fn has_topic_matches_exactly() {
        let topics = vec!["a.create".to_string(), "a.create.x".to_string()];
        assert!(has_topic(&topics, "a.create"));
        assert!(!has_topic(&topics, "a.create.y"));
    }
}
