use serde::{Deserialize, Serialize};

/// The outcome of evaluating a URL against TDM reservation signals.
///
/// `Unknown` is an internal value: it means "this rule/source has nothing to
/// say about the URL" and prompts fallback to the next rule or signal source.
/// The top-level [`DecisionResolver`](crate::DecisionResolver) never returns
/// it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "policy", rename_all = "snake_case")]
pub enum Decision {
    /// Mining is freely permitted for the matched scope.
    Allowed,
    /// Mining is reserved with no stated alternative policy.
    Disallowed,
    /// Mining is reserved, subject to the terms at the given policy URI.
    DisallowedWithPolicy(String),
    /// No applicable information; try the next rule or source.
    Unknown,
}

impl Decision {
    /// True for any conclusive outcome (everything except `Unknown`).
    pub fn is_conclusive(&self) -> bool {
        !matches!(self, Decision::Unknown)
    }

    /// True when the decision permits mining.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    /// The policy URI, when the decision carries one.
    pub fn policy(&self) -> Option<&str> {
        match self {
            Decision::DisallowedWithPolicy(uri) => Some(uri),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conclusiveness() {
        assert!(Decision::Allowed.is_conclusive());
        assert!(Decision::Disallowed.is_conclusive());
        assert!(Decision::DisallowedWithPolicy("https://h/p".into()).is_conclusive());
        assert!(!Decision::Unknown.is_conclusive());
    }

    #[test]
    fn policy_accessor() {
        let d = Decision::DisallowedWithPolicy("https://host/policy".into());
        assert_eq!(d.policy(), Some("https://host/policy"));
        assert_eq!(Decision::Disallowed.policy(), None);
        assert!(!d.is_allowed());
        assert!(Decision::Allowed.is_allowed());
    }

    #[test]
    fn serializes_with_policy_payload() {
        let json =
            serde_json::to_string(&Decision::DisallowedWithPolicy("https://h/p".into())).unwrap();
        assert!(json.contains("disallowed_with_policy"));
        assert!(json.contains("https://h/p"));
    }
}
