use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use url::Url;

use crate::decision::Decision;
use crate::pattern::normalize_path;
use crate::rule::{Reservation, Rule};
use crate::schema::{decode_document, RawRule};

// ---------------------------------------------------------------------------
// Parse diagnostics
// ---------------------------------------------------------------------------

/// Why a single rules-document entry was skipped during parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    #[error("entry could not be decoded: {0}")]
    Undecodable(String),

    #[error("entry has no location pattern")]
    MissingLocation,

    #[error("entry has no tdm-reservation value")]
    MissingReservation,

    #[error("tdm-reservation must be 0 or 1, got {0}")]
    InvalidReservation(i64),
}

/// A skipped entry: its position in the source document and the reason.
/// Skips never abort the parse; the remaining entries are still used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDiagnostic {
    /// Zero-based index of the entry in the document array.
    pub index: usize,
    pub reason: SkipReason,
}

/// Error for a rules document whose top level is not a JSON array.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct DocumentError(String);

// ---------------------------------------------------------------------------
// RuleSet
// ---------------------------------------------------------------------------

/// An ordered collection of reservation rules parsed from one `tdmrep.json`
/// document.
///
/// Rules keep their document order; that order is the tie-breaker when two
/// matching patterns have equal specificity. A re-fetch produces a whole new
/// `RuleSet` rather than mutating this one.
#[derive(Debug)]
pub struct RuleSet {
    rules: Vec<Rule>,
    fetched_at: DateTime<Utc>,
}

impl RuleSet {
    /// Build a rule set from pre-decoded entries, skipping malformed ones.
    ///
    /// Each skipped entry is logged at `warn` and reported in the returned
    /// diagnostics. Entry order is preserved for the surviving rules.
    pub fn parse<I>(entries: I) -> (Self, Vec<ParseDiagnostic>)
    where
        I: IntoIterator<Item = Result<RawRule, String>>,
    {
        let mut rules = Vec::new();
        let mut diagnostics = Vec::new();

        for (index, entry) in entries.into_iter().enumerate() {
            match validate(entry) {
                Ok(rule) => rules.push(rule),
                Err(reason) => {
                    warn!(index, %reason, "skipping malformed tdmrep.json entry");
                    diagnostics.push(ParseDiagnostic { index, reason });
                }
            }
        }

        debug!(
            rules = rules.len(),
            skipped = diagnostics.len(),
            "parsed rules document"
        );

        (
            Self {
                rules,
                fetched_at: Utc::now(),
            },
            diagnostics,
        )
    }

    /// Decode a JSON rules document and parse it.
    ///
    /// Fails only when the document's top level is not an array; malformed
    /// elements inside the array become diagnostics as in [`parse`](Self::parse).
    pub fn from_json(
        document: &serde_json::Value,
    ) -> Result<(Self, Vec<ParseDiagnostic>), DocumentError> {
        let entries = decode_document(document).map_err(DocumentError)?;
        Ok(Self::parse(entries))
    }

    /// Number of usable rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// When this document was parsed. Advisory metadata for the caller's own
    /// re-fetch scheduling; the engine applies no expiry of its own.
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Resolve the decision for `url` against this rule set.
    ///
    /// Only the path component takes part in matching; scheme, host, query,
    /// and fragment are discarded. When several rules match, the one with the
    /// longest pattern wins; equal lengths fall back to document order. When
    /// none match the result is [`Decision::Unknown`] and the caller should
    /// consult the next signal source.
    pub fn resolve(&self, url: &str) -> Decision {
        let canonical = normalize_path(&extract_path(url));

        let mut best: Option<(usize, Decision)> = None;
        for rule in &self.rules {
            let decision = rule.decision(&canonical);
            if !decision.is_conclusive() {
                continue;
            }
            match &best {
                // First-declared wins ties, so only a strictly longer
                // pattern displaces the current best.
                Some((specificity, _)) if *specificity >= rule.specificity() => {}
                _ => best = Some((rule.specificity(), decision)),
            }
        }

        match best {
            Some((_, decision)) => decision,
            None => Decision::Unknown,
        }
    }
}

/// Validate one decoded entry into a [`Rule`].
fn validate(entry: Result<RawRule, String>) -> Result<Rule, SkipReason> {
    let raw = entry.map_err(SkipReason::Undecodable)?;

    let location = match raw.location {
        Some(loc) if !loc.is_empty() => loc,
        _ => return Err(SkipReason::MissingLocation),
    };
    let wire = raw.reservation.ok_or(SkipReason::MissingReservation)?;
    let reservation =
        Reservation::from_wire(wire).ok_or(SkipReason::InvalidReservation(wire))?;

    Ok(Rule::new(&location, reservation, raw.policy))
}

/// Reduce `url` to its path component. Absolute URLs are parsed with the
/// `url` crate; anything else is treated as a bare path with any query or
/// fragment chopped off.
fn extract_path(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => {
            let end = url.find(['?', '#']).unwrap_or(url.len());
            url[..end].to_string()
        }
    }
}
