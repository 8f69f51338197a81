//! Location-pattern matching for TDMRep rules.
//!
//! A location pattern is a URL path expression in which `*` matches any run
//! of characters (including none) and a trailing `$` anchors the match to the
//! end of the path. Everything else is literal. Patterns without wildcards
//! are plain prefix checks and never touch the regex engine.

use regex::Regex;

// ---------------------------------------------------------------------------
// Percent-encoding canonicalization
// ---------------------------------------------------------------------------

/// Bytes that stay raw in a canonicalized path. `$` is kept so that a
/// literal mid-pattern `$` still lines up with the path spelling.
const PATH_KEEP: &[u8] = b"/$";

/// Bytes that stay raw in a canonicalized pattern: `/`, the `*` wildcard,
/// and `$` (an anchor only in trailing position, literal elsewhere).
const PATTERN_KEEP: &[u8] = b"/*$";

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn push_escaped(out: &mut String, b: u8) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    out.push('%');
    out.push(HEX[(b >> 4) as usize] as char);
    out.push(HEX[(b & 0x0F) as usize] as char);
}

/// Rewrite `input` into a canonical percent-encoded form so that two
/// spellings differing only in escaping compare equal:
///
/// * escapes of unreserved characters are decoded back to the literal;
/// * all other valid escapes are re-emitted with uppercase hex;
/// * a `%` that does not start a valid escape is kept literal;
/// * raw bytes outside the unreserved and `keep` sets are percent-encoded.
///
/// Escaped forms of `keep` bytes (e.g. `%2F`) stay escaped — decoding them
/// would change the path structure.
fn canonicalize(input: &str, keep: &[u8]) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                let decoded = (hi << 4) | lo;
                if is_unreserved(decoded) {
                    out.push(decoded as char);
                } else {
                    push_escaped(&mut out, decoded);
                }
                i += 3;
                continue;
            }
        }
        if b == b'%' || is_unreserved(b) || keep.contains(&b) {
            out.push(b as char);
        } else {
            push_escaped(&mut out, b);
        }
        i += 1;
    }

    out
}

/// Canonicalize a candidate URL path for matching.
///
/// The input must already be a bare path (no scheme/host/query/fragment —
/// see [`RuleSet::resolve`](crate::RuleSet::resolve) for the URL-level
/// stripping). An empty path canonicalizes to `/`.
pub fn normalize_path(path: &str) -> String {
    let normalized = canonicalize(path, PATH_KEEP);
    if normalized.is_empty() {
        "/".to_string()
    } else {
        normalized
    }
}

/// Canonicalize a location pattern, preserving `/`, `*`, and `$`.
fn normalize_pattern(pattern: &str) -> String {
    canonicalize(pattern, PATTERN_KEEP)
}

/// Collapse every run of consecutive `*` into a single `*`; redundant
/// wildcards are semantically identical to one.
fn collapse_wildcards(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut prev_star = false;
    for ch in pattern.chars() {
        if ch == '*' {
            if !prev_star {
                out.push(ch);
            }
            prev_star = true;
        } else {
            out.push(ch);
            prev_star = false;
        }
    }
    out
}

// ---------------------------------------------------------------------------
// PatternMatcher
// ---------------------------------------------------------------------------

/// How a normalized pattern is evaluated against a path.
#[derive(Debug)]
enum Compiled {
    /// No wildcard, no anchor: the path must start with the pattern.
    Prefix,
    /// No wildcard, trailing `$`: the path must equal the anchor-stripped
    /// pattern exactly.
    Exact(String),
    /// At least one `*`: anchored regex, preceded by a literal-prefix fast
    /// reject so non-candidates never reach the regex engine.
    Wildcard { prefix: String, regex: Regex },
}

/// A compiled location pattern.
///
/// Compilation happens eagerly at construction and is a pure function of the
/// pattern string, so a `PatternMatcher` is immutable and freely shareable
/// across threads afterwards.
#[derive(Debug)]
pub struct PatternMatcher {
    raw: String,
    normalized: String,
    compiled: Compiled,
}

impl PatternMatcher {
    /// Compile `pattern` into a reusable matcher.
    pub fn new(pattern: &str) -> Self {
        let normalized = collapse_wildcards(&normalize_pattern(pattern));

        let compiled = if normalized.contains('*') {
            let prefix = normalized[..normalized.find('*').unwrap_or(0)].to_string();
            let regex = build_wildcard_regex(&normalized);
            Compiled::Wildcard { prefix, regex }
        } else if let Some(body) = normalized.strip_suffix('$') {
            Compiled::Exact(body.to_string())
        } else {
            Compiled::Prefix
        };

        Self {
            raw: pattern.to_string(),
            normalized,
            compiled,
        }
    }

    /// The pattern string as it appeared in the source document.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Precedence measure: character length of the original pattern string.
    /// Longer patterns are more specific and win over shorter ones.
    pub fn specificity(&self) -> usize {
        self.raw.chars().count()
    }

    /// Check `path` against the pattern. The path is canonicalized before
    /// comparison; use [`matches_canonical`](Self::matches_canonical) when
    /// the caller has already normalized it.
    pub fn matches(&self, path: &str) -> bool {
        self.matches_canonical(&normalize_path(path))
    }

    /// Check an already-canonicalized path against the pattern.
    pub fn matches_canonical(&self, path: &str) -> bool {
        match &self.compiled {
            Compiled::Prefix => path.starts_with(&self.normalized),
            Compiled::Exact(exact) => path == exact,
            Compiled::Wildcard { prefix, regex } => {
                // Cheap literal check first; most paths fail here.
                if !path.starts_with(prefix.as_str()) {
                    return false;
                }
                regex.is_match(path)
            }
        }
    }
}

/// Translate a normalized, wildcard-bearing pattern into an anchored regex:
/// literal segments are escaped, each `*` becomes a non-greedy `.*?`, and a
/// trailing `$` becomes an end-of-string anchor.
fn build_wildcard_regex(normalized: &str) -> Regex {
    let (body, anchored) = match normalized.strip_suffix('$') {
        Some(body) => (body, true),
        None => (normalized, false),
    };

    let mut expr = String::with_capacity(body.len() * 2);
    expr.push('^');
    for (i, segment) in body.split('*').enumerate() {
        if i > 0 {
            expr.push_str(".*?");
        }
        expr.push_str(&regex::escape(segment));
    }
    if anchored {
        expr.push('$');
    }

    // Every literal segment is escaped, so the expression is always valid.
    Regex::new(&expr).unwrap_or_else(|e| {
        tracing::error!(pattern = normalized, error = %e, "wildcard regex failed to compile");
        Regex::new("$^").expect("never-matching regex")
    })
}
