//! # tdm-engine
//!
//! Rule representation and matching engine for the TDM Reservation Protocol
//! (TDMRep). Given a URL and the reservation signals a host publishes — a
//! `/.well-known/tdmrep.json` rules document, `tdm-reservation`/`tdm-policy`
//! response headers, or the equivalent HTML meta tags — this crate decides
//! whether automated text-and-data-mining access is permitted.
//!
//! The engine performs no I/O: callers hand it already-decoded rule data and
//! header/meta maps (see the `tdm-fetch` crate for the transport side) and
//! get back a [`Decision`]. Everything is immutable after construction, so a
//! [`RuleSet`] can be shared across worker tasks freely.
//!
//! ## Quick start
//!
//! ```rust
//! use tdm_engine::{Decision, DecisionResolver, DocumentSource, RuleSet, SignalSource};
//!
//! let document = serde_json::json!([
//!     { "location": "/private/*", "tdm-reservation": 1 }
//! ]);
//! let (rules, diagnostics) = RuleSet::from_json(&document).unwrap();
//! assert!(diagnostics.is_empty());
//!
//! let source = DocumentSource::new(&rules, "https://example.com/private/data.txt");
//! let decision = DecisionResolver::resolve(&[&source]);
//! assert_eq!(decision, Decision::Disallowed);
//! ```

mod decision;
pub mod pattern;
mod rule;
mod ruleset;
mod schema;
mod source;

// Re-export the primary public API at the crate root.
pub use decision::Decision;
pub use pattern::PatternMatcher;
pub use rule::{Reservation, Rule};
pub use ruleset::{DocumentError, ParseDiagnostic, RuleSet, SkipReason};
pub use schema::{decode_document, RawRule};
pub use source::{
    DecisionResolver, DocumentSource, HeaderSource, MetaSource, SignalSource, POLICY_FIELD,
    RESERVATION_FIELD,
};
