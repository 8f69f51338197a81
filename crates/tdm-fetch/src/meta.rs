//! Extraction of `<meta name=... content=...>` pairs from an HTML document
//! head, without pulling a full HTML tree parser into the build.

use std::collections::HashMap;

use regex::Regex;

/// Errors that can occur while constructing a [`MetaExtractor`].
#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    #[error("failed to compile meta-extraction regex: {0}")]
    RegexCompile(#[from] regex::Error),
}

/// Compiled regexes for pulling meta tags out of an HTML head.
///
/// Tolerant of attribute order, single/double/absent quoting, and missing
/// `</head>` markup: when no explicit `<head>` section is found the whole
/// document is scanned, mirroring what a recovering HTML parser would do.
pub struct MetaExtractor {
    head: Regex,
    tag: Regex,
    name_attr: Regex,
    content_attr: Regex,
}

impl MetaExtractor {
    pub fn new() -> Result<Self, MetaError> {
        Ok(Self {
            head: Regex::new(r"(?is)<head\b[^>]*>(.*?)</head>")?,
            tag: Regex::new(r"(?is)<meta\b[^>]*>")?,
            name_attr: Regex::new(r#"(?is)\bname\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)?,
            content_attr: Regex::new(
                r#"(?is)\bcontent\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#,
            )?,
        })
    }

    /// Collect every `name`/`content` pair from meta tags in the document
    /// head. Later duplicates overwrite earlier ones.
    pub fn extract(&self, html: &str) -> HashMap<String, String> {
        let scope = match self.head.captures(html) {
            Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(html),
            None => html,
        };

        let mut pairs = HashMap::new();
        for tag in self.tag.find_iter(scope) {
            let tag = tag.as_str();
            let name = self.name_attr.captures(tag).and_then(first_group);
            let content = self.content_attr.captures(tag).and_then(first_group);
            if let (Some(name), Some(content)) = (name, content) {
                pairs.insert(decode_entities(name), decode_entities(content));
            }
        }
        pairs
    }
}

/// The three alternation arms of the attribute regexes are mutually
/// exclusive; exactly one is populated on a match.
fn first_group<'t>(caps: regex::Captures<'t>) -> Option<&'t str> {
    caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)).map(|m| m.as_str())
}

/// Decode the five basic character entities. Attribute values in the wild
/// rarely contain anything else worth handling here.
fn decode_entities(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(html: &str) -> HashMap<String, String> {
        MetaExtractor::new().unwrap().extract(html)
    }

    #[test]
    fn extracts_tdm_pairs_from_head() {
        let html = r#"<html><head>
            <meta name="tdm-reservation" content="1">
            <meta name="tdm-policy" content="https://host/policy">
        </head><body><p>hi</p></body></html>"#;
        let pairs = extract(html);
        assert_eq!(pairs.get("tdm-reservation").map(String::as_str), Some("1"));
        assert_eq!(
            pairs.get("tdm-policy").map(String::as_str),
            Some("https://host/policy")
        );
    }

    #[test]
    fn attribute_order_does_not_matter() {
        let pairs = extract(r#"<head><meta content="0" name="tdm-reservation"></head>"#);
        assert_eq!(pairs.get("tdm-reservation").map(String::as_str), Some("0"));
    }

    #[test]
    fn single_and_unquoted_attributes() {
        let pairs = extract(
            "<head><meta name='tdm-reservation' content='1'><meta name=viewport content=narrow></head>",
        );
        assert_eq!(pairs.get("tdm-reservation").map(String::as_str), Some("1"));
        assert_eq!(pairs.get("viewport").map(String::as_str), Some("narrow"));
    }

    #[test]
    fn self_closing_and_uppercase_tags() {
        let pairs = extract(r#"<HEAD><META NAME="tdm-reservation" CONTENT="1"/></HEAD>"#);
        assert_eq!(pairs.get("tdm-reservation").map(String::as_str), Some("1"));
    }

    #[test]
    fn body_meta_is_ignored_when_head_present() {
        let html = r#"<head><meta name="a" content="1"></head>
                      <body><meta name="b" content="2"></body>"#;
        let pairs = extract(html);
        assert!(pairs.contains_key("a"));
        assert!(!pairs.contains_key("b"));
    }

    #[test]
    fn whole_document_scanned_without_explicit_head() {
        let pairs = extract(r#"<meta name="tdm-reservation" content="1">"#);
        assert_eq!(pairs.get("tdm-reservation").map(String::as_str), Some("1"));
    }

    #[test]
    fn entities_are_decoded() {
        let pairs =
            extract(r#"<head><meta name="x" content="a &amp; b &quot;c&quot;"></head>"#);
        assert_eq!(pairs.get("x").map(String::as_str), Some(r#"a & b "c""#));
    }

    #[test]
    fn meta_without_name_or_content_is_skipped() {
        let pairs = extract(r#"<head><meta charset="utf-8"><meta name="lonely"></head>"#);
        assert!(pairs.is_empty());
    }

    #[test]
    fn later_duplicate_wins() {
        let html = r#"<head>
            <meta name="tdm-reservation" content="0">
            <meta name="tdm-reservation" content="1">
        </head>"#;
        let pairs = extract(html);
        assert_eq!(pairs.get("tdm-reservation").map(String::as_str), Some("1"));
    }
}
