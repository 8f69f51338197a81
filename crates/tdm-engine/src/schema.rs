use serde::{Deserialize, Serialize};

/// One raw entry of a `tdmrep.json` rules document, as decoded from JSON and
/// before validation. Field names follow the TDMRep wire format.
///
/// All fields are optional at this layer so that validation (and its
/// diagnostics) can happen per entry in
/// [`RuleSet::parse`](crate::RuleSet::parse) rather than failing the whole
/// document inside serde.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRule {
    /// Path pattern the sibling TDM properties apply to.
    #[serde(default)]
    pub location: Option<String>,
    /// Reservation value: 0 = mining permitted, 1 = mining reserved.
    #[serde(rename = "tdm-reservation", default)]
    pub reservation: Option<i64>,
    /// URI of the policy governing conditional mining permission.
    #[serde(rename = "tdm-policy", default)]
    pub policy: Option<String>,
}

/// Decode a rules document (a JSON array) into raw entries.
///
/// Elements are decoded individually: an element of the wrong shape yields
/// `Err` in its slot instead of aborting the array, so one malformed entry
/// cannot invalidate the rest of the document. The outer `Err` is returned
/// only when the document is not a JSON array at all.
pub fn decode_document(raw: &serde_json::Value) -> Result<Vec<Result<RawRule, String>>, String> {
    let entries = raw
        .as_array()
        .ok_or_else(|| format!("rules document must be a JSON array, got {}", type_name(raw)))?;

    Ok(entries
        .iter()
        .map(|v| serde_json::from_value::<RawRule>(v.clone()).map_err(|e| e.to_string()))
        .collect())
}

fn type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
