//! The three TDMRep signal channels behind one uniform seam, and the
//! resolver that applies them in protocol preference order.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::decision::Decision;
use crate::ruleset::RuleSet;

/// Field name carrying the reservation value, in headers and meta tags alike.
pub const RESERVATION_FIELD: &str = "tdm-reservation";
/// Field name carrying the policy URI.
pub const POLICY_FIELD: &str = "tdm-policy";

// ---------------------------------------------------------------------------
// SignalSource
// ---------------------------------------------------------------------------

/// One channel of reservation information.
///
/// Sources are pure: `evaluate` performs no I/O and may be called any number
/// of times. A source that has nothing to say returns [`Decision::Unknown`],
/// which the resolver treats as "consult the next source".
pub trait SignalSource {
    fn evaluate(&self) -> Decision;

    /// Channel name used in logs.
    fn channel(&self) -> &'static str;
}

/// The well-known rules document channel: delegates to
/// [`RuleSet::resolve`] for a fixed target URL.
pub struct DocumentSource<'a> {
    rules: &'a RuleSet,
    url: &'a str,
}

impl<'a> DocumentSource<'a> {
    pub fn new(rules: &'a RuleSet, url: &'a str) -> Self {
        Self { rules, url }
    }
}

impl SignalSource for DocumentSource<'_> {
    fn evaluate(&self) -> Decision {
        self.rules.resolve(self.url)
    }

    fn channel(&self) -> &'static str {
        "well-known document"
    }
}

/// The HTTP response-header channel.
pub struct HeaderSource {
    fields: HashMap<String, String>,
}

impl HeaderSource {
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self { fields }
    }
}

impl SignalSource for HeaderSource {
    fn evaluate(&self) -> Decision {
        decide_from_fields(&self.fields)
    }

    fn channel(&self) -> &'static str {
        "http headers"
    }
}

/// The HTML `<meta>`-tag channel. Same two fields, same value semantics as
/// the header channel.
pub struct MetaSource {
    fields: HashMap<String, String>,
}

impl MetaSource {
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self { fields }
    }
}

impl SignalSource for MetaSource {
    fn evaluate(&self) -> Decision {
        decide_from_fields(&self.fields)
    }

    fn channel(&self) -> &'static str {
        "html meta"
    }
}

/// Shared header/meta value logic.
///
/// Field names compare case-insensitively (HTTP header semantics). A
/// reservation of `0` allows, `1` reserves (with the policy attached when one
/// is present and non-empty), and anything else is inconclusive.
fn decide_from_fields(fields: &HashMap<String, String>) -> Decision {
    let reservation = lookup(fields, RESERVATION_FIELD).map(str::trim);
    let policy = lookup(fields, POLICY_FIELD)
        .map(str::trim)
        .filter(|p| !p.is_empty());

    match reservation {
        Some("0") => Decision::Allowed,
        Some("1") => match policy {
            Some(uri) => Decision::DisallowedWithPolicy(uri.to_string()),
            None => Decision::Disallowed,
        },
        _ => Decision::Unknown,
    }
}

fn lookup<'a>(fields: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

// ---------------------------------------------------------------------------
// DecisionResolver
// ---------------------------------------------------------------------------

/// Applies signal sources in caller order and returns the first conclusive
/// decision.
///
/// The protocol preference order is: rules document, then HTTP headers, then
/// HTML meta. When every source is inconclusive (or none are supplied) the
/// result is [`Decision::Allowed`]: the protocol's default posture is
/// permissive absent any explicit restriction signal. That default is a
/// deliberate policy choice and callers must not remap it.
pub struct DecisionResolver;

impl DecisionResolver {
    /// Resolve the final decision. Never returns [`Decision::Unknown`].
    pub fn resolve(sources: &[&dyn SignalSource]) -> Decision {
        for source in sources {
            let decision = source.evaluate();
            if decision.is_conclusive() {
                debug!(channel = source.channel(), ?decision, "conclusive signal");
                return decision;
            }
            trace!(channel = source.channel(), "source inconclusive");
        }

        debug!("no conclusive signal from any source, defaulting to allowed");
        Decision::Allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // -- Header / meta value logic --

    #[test]
    fn header_reservation_zero_allows() {
        let src = HeaderSource::new(fields(&[("tdm-reservation", "0")]));
        assert_eq!(src.evaluate(), Decision::Allowed);
    }

    #[test]
    fn header_reservation_one_without_policy_disallows() {
        let src = HeaderSource::new(fields(&[("tdm-reservation", "1")]));
        assert_eq!(src.evaluate(), Decision::Disallowed);
    }

    #[test]
    fn header_reservation_one_with_policy() {
        let src = HeaderSource::new(fields(&[
            ("tdm-reservation", "1"),
            ("tdm-policy", "https://host/policy"),
        ]));
        assert_eq!(
            src.evaluate(),
            Decision::DisallowedWithPolicy("https://host/policy".into())
        );
    }

    #[test]
    fn header_empty_policy_is_plain_disallow() {
        let src = HeaderSource::new(fields(&[("tdm-reservation", "1"), ("tdm-policy", "  ")]));
        assert_eq!(src.evaluate(), Decision::Disallowed);
    }

    #[test]
    fn absent_or_out_of_range_reservation_is_inconclusive() {
        assert_eq!(HeaderSource::new(fields(&[])).evaluate(), Decision::Unknown);
        assert_eq!(
            HeaderSource::new(fields(&[("tdm-reservation", "2")])).evaluate(),
            Decision::Unknown
        );
        assert_eq!(
            HeaderSource::new(fields(&[("tdm-reservation", "yes")])).evaluate(),
            Decision::Unknown
        );
    }

    #[test]
    fn header_names_are_case_insensitive() {
        let src = HeaderSource::new(fields(&[("TDM-Reservation", "1")]));
        assert_eq!(src.evaluate(), Decision::Disallowed);
    }

    #[test]
    fn reservation_value_is_trimmed() {
        let src = HeaderSource::new(fields(&[("tdm-reservation", " 1 ")]));
        assert_eq!(src.evaluate(), Decision::Disallowed);
    }

    #[test]
    fn meta_source_mirrors_header_logic() {
        let src = MetaSource::new(fields(&[
            ("tdm-reservation", "1"),
            ("tdm-policy", "https://host/terms"),
        ]));
        assert_eq!(
            src.evaluate(),
            Decision::DisallowedWithPolicy("https://host/terms".into())
        );
        assert_eq!(
            MetaSource::new(fields(&[("tdm-reservation", "0")])).evaluate(),
            Decision::Allowed
        );
    }

    // -- Resolver --

    #[test]
    fn empty_source_list_defaults_to_allowed() {
        assert_eq!(DecisionResolver::resolve(&[]), Decision::Allowed);
    }

    #[test]
    fn all_inconclusive_defaults_to_allowed() {
        let a = HeaderSource::new(fields(&[]));
        let b = MetaSource::new(fields(&[]));
        assert_eq!(DecisionResolver::resolve(&[&a, &b]), Decision::Allowed);
    }

    #[test]
    fn first_conclusive_source_wins() {
        let header = HeaderSource::new(fields(&[("tdm-reservation", "0")]));
        let meta = MetaSource::new(fields(&[("tdm-reservation", "1")]));
        assert_eq!(
            DecisionResolver::resolve(&[&header, &meta]),
            Decision::Allowed
        );
        // Reversed order, reversed outcome.
        assert_eq!(
            DecisionResolver::resolve(&[&meta, &header]),
            Decision::Disallowed
        );
    }

    #[test]
    fn inconclusive_document_falls_back_to_headers() {
        let (rules, _) = RuleSet::from_json(&json!([
            { "location": "/private/*", "tdm-reservation": 1 },
        ]))
        .unwrap();
        let doc = DocumentSource::new(&rules, "https://example.com/public/page");
        let header = HeaderSource::new(fields(&[("tdm-reservation", "1")]));

        assert_eq!(doc.evaluate(), Decision::Unknown);
        assert_eq!(
            DecisionResolver::resolve(&[&doc, &header]),
            Decision::Disallowed
        );
    }

    #[test]
    fn conclusive_document_shadows_later_sources() {
        let (rules, _) = RuleSet::from_json(&json!([
            { "location": "/private/*", "tdm-reservation": 1, "tdm-policy": "https://h/p" },
        ]))
        .unwrap();
        let doc = DocumentSource::new(&rules, "https://example.com/private/a");
        let header = HeaderSource::new(fields(&[("tdm-reservation", "0")]));

        assert_eq!(
            DecisionResolver::resolve(&[&doc, &header]),
            Decision::DisallowedWithPolicy("https://h/p".into())
        );
    }
}
