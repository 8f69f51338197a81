//! # tdm-fetch
//!
//! Transport side of the TDMRep checker: fetches the well-known
//! `tdmrep.json` document, response headers, and HTML meta tags for a URL,
//! and decodes them into the shapes `tdm-engine` consumes.
//!
//! The engine itself never performs I/O; this crate is the collaborator that
//! feeds it. Per the protocol's error model, every fetch failure here is
//! translated into "source absent" (`None`) rather than an error, so the
//! decision engine's permissive default can do its job.

pub mod client;
pub mod meta;

pub use client::{well_known_url, FetchConfig, Fetcher, WELL_KNOWN_PATH};
pub use meta::{MetaError, MetaExtractor};
