use crate::decision::Decision;
use crate::pattern::PatternMatcher;

/// Reservation value of a rule. The wire format uses the integers 0 and 1;
/// anything else is rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// Mining freely permitted for the matched scope.
    Open,
    /// Mining reserved, possibly subject to a policy.
    Reserved,
}

impl Reservation {
    /// Map a wire value onto a reservation, rejecting out-of-range values.
    pub fn from_wire(value: i64) -> Option<Self> {
        match value {
            0 => Some(Reservation::Open),
            1 => Some(Reservation::Reserved),
            _ => None,
        }
    }
}

/// One reservation rule from a rules document: a compiled location pattern,
/// a reservation flag, and an optional policy URI.
///
/// Immutable after construction. The policy is only meaningful when the
/// reservation is [`Reserved`](Reservation::Reserved); [`Rule::new`] drops it
/// otherwise.
#[derive(Debug)]
pub struct Rule {
    matcher: PatternMatcher,
    reservation: Reservation,
    policy: Option<String>,
}

impl Rule {
    /// Build a rule from validated parts. An empty policy string is treated
    /// as absent, and a policy on an open rule is ignored.
    pub fn new(pattern: &str, reservation: Reservation, policy: Option<String>) -> Self {
        let policy = match reservation {
            Reservation::Reserved => policy.filter(|p| !p.is_empty()),
            Reservation::Open => None,
        };
        Self {
            matcher: PatternMatcher::new(pattern),
            reservation,
            policy,
        }
    }

    /// The pattern as declared in the source document.
    pub fn pattern(&self) -> &str {
        self.matcher.raw()
    }

    /// Specificity of the underlying pattern (character length).
    pub fn specificity(&self) -> usize {
        self.matcher.specificity()
    }

    /// Per-rule decision for an already-canonicalized path.
    ///
    /// `Unknown` when the pattern does not match; otherwise the decision the
    /// reservation flag and policy dictate.
    pub fn decision(&self, canonical_path: &str) -> Decision {
        if !self.matcher.matches_canonical(canonical_path) {
            return Decision::Unknown;
        }
        match (self.reservation, &self.policy) {
            (Reservation::Open, _) => Decision::Allowed,
            (Reservation::Reserved, Some(policy)) => {
                Decision::DisallowedWithPolicy(policy.clone())
            }
            (Reservation::Reserved, None) => Decision::Disallowed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservation_wire_values() {
        assert_eq!(Reservation::from_wire(0), Some(Reservation::Open));
        assert_eq!(Reservation::from_wire(1), Some(Reservation::Reserved));
        assert_eq!(Reservation::from_wire(2), None);
        assert_eq!(Reservation::from_wire(-1), None);
    }

    #[test]
    fn open_rule_allows_matching_path() {
        let rule = Rule::new("/public/*", Reservation::Open, None);
        assert_eq!(rule.decision("/public/data"), Decision::Allowed);
        assert_eq!(rule.decision("/private/data"), Decision::Unknown);
    }

    #[test]
    fn reserved_rule_without_policy_disallows() {
        let rule = Rule::new("/private/*", Reservation::Reserved, None);
        assert_eq!(rule.decision("/private/data.txt"), Decision::Disallowed);
    }

    #[test]
    fn reserved_rule_with_policy_carries_it() {
        let rule = Rule::new(
            "/exact$",
            Reservation::Reserved,
            Some("https://host/policy".into()),
        );
        assert_eq!(
            rule.decision("/exact"),
            Decision::DisallowedWithPolicy("https://host/policy".into())
        );
        assert_eq!(rule.decision("/exact/more"), Decision::Unknown);
    }

    #[test]
    fn policy_on_open_rule_is_ignored() {
        let rule = Rule::new("/x", Reservation::Open, Some("https://h/p".into()));
        assert_eq!(rule.decision("/x"), Decision::Allowed);
    }

    #[test]
    fn empty_policy_is_treated_as_absent() {
        let rule = Rule::new("/x", Reservation::Reserved, Some(String::new()));
        assert_eq!(rule.decision("/x"), Decision::Disallowed);
    }
}
