//! Contracts the matcher consumes from the surrounding application.

use serde::Serialize;

use crate::decision::MatchDecision;
use crate::types::EnrolledTemplate;

/// Read access to enrolled templates.
///
/// `all_enrolled_templates` is one consistent snapshot for a matching pass,
/// in a stable order, and never contains a user without a template.
pub trait TemplateRepository {
    fn all_enrolled_templates(&self) -> Vec<EnrolledTemplate>;

    fn template(&self, user_id: &str) -> Option<EnrolledTemplate>;
}

/// Account activation lookup, consulted by the caller after a decision.
pub trait AccountStatus {
    fn is_active(&self, user_id: &str) -> bool;
}

impl<F> AccountStatus for F
where
    F: Fn(&str) -> bool,
{
    fn is_active(&self, user_id: &str) -> bool {
        self(user_id)
    }
}

/// What the caller does with a decision once account status is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "admission", content = "user_id", rename_all = "camelCase")]
pub enum Admission {
    /// Identity matched and the account is active: hand off to session issuance.
    Admitted(String),
    /// Identity matched but the account is deactivated.
    Inactive(String),
    NotAuthenticated,
}

/// Apply account status to a decision. The decision itself is unchanged.
pub fn admit<A: AccountStatus + ?Sized>(decision: &MatchDecision, accounts: &A) -> Admission {
    match decision.user_id() {
        Some(user_id) if accounts.is_active(user_id) => Admission::Admitted(user_id.to_string()),
        Some(user_id) => {
            tracing::warn!(user = user_id, "face matched a deactivated account");
            Admission::Inactive(user_id.to_string())
        }
        None => Admission::NotAuthenticated,
    }
}

/// Templates held in memory, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTemplates {
    templates: Vec<EnrolledTemplate>,
}

impl InMemoryTemplates {
    pub fn new(templates: Vec<EnrolledTemplate>) -> Self {
        Self { templates }
    }
}

impl FromIterator<EnrolledTemplate> for InMemoryTemplates {
    fn from_iter<I: IntoIterator<Item = EnrolledTemplate>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl TemplateRepository for InMemoryTemplates {
    fn all_enrolled_templates(&self) -> Vec<EnrolledTemplate> {
        self.templates.iter().filter(|t| !t.is_empty()).cloned().collect()
    }

    fn template(&self, user_id: &str) -> Option<EnrolledTemplate> {
        self.templates
            .iter()
            .find(|t| t.user_id == user_id && !t.is_empty())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{decide, RejectReason};

    #[test]
    fn test_in_memory_excludes_empty_templates() {
        let repo = InMemoryTemplates::new(vec![
            EnrolledTemplate::new("empty"),
            EnrolledTemplate::new("enrolled").with_descriptor(vec![0.1]),
        ]);
        let all = repo.all_enrolled_templates();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].user_id, "enrolled");
        assert!(repo.template("empty").is_none());
        assert!(repo.template("enrolled").is_some());
    }

    #[test]
    fn test_admit_active_account() {
        let decision = decide(0.9, Some("alice"));
        assert_eq!(admit(&decision, &|_: &str| true), Admission::Admitted("alice".into()));
    }

    #[test]
    fn test_inactive_account_keeps_decision() {
        let decision = decide(0.9, Some("alice"));
        assert_eq!(admit(&decision, &|_: &str| false), Admission::Inactive("alice".into()));
        assert!(decision.is_authenticated());
    }

    #[test]
    fn test_rejected_not_admitted() {
        let decision = MatchDecision::rejected(RejectReason::NoMatch);
        assert_eq!(admit(&decision, &|_: &str| true), Admission::NotAuthenticated);
    }
}
