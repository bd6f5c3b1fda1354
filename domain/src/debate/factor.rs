//! Factors: the atomic claims agents exchange in structured rounds.
//!
//! Agents answer structured prompts with a JSON array of factors. The
//! parser here is deliberately forgiving about the surrounding text (models
//! like to wrap JSON in prose or code fences) and strict about each entry:
//! an entry missing a name, justification or confidence is dropped.

use serde::{Deserialize, Serialize};

/// A named claim with its justification and the agent's confidence in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    #[serde(rename = "factor_name", alias = "name")]
    pub name: String,
    pub justification: String,
    /// Always within `[0.0, 1.0]`
    pub confidence: f64,
}

impl Factor {
    /// Create a factor, clamping confidence into `[0.0, 1.0]`
    pub fn new(name: impl Into<String>, justification: impl Into<String>, confidence: f64) -> Self {
        Self {
            name: name.into().trim().to_string(),
            justification: justification.into().trim().to_string(),
            confidence: clamp_confidence(confidence),
        }
    }

    /// Normalized name used for literal grouping
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }
}

/// Lowercase and collapse whitespace.
///
/// This is the literal equivalence used by the algorithmic merge fallback
/// and the literal convergence mode. Semantic equivalence is only ever
/// established through a moderator grouping call.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Locate the first JSON array in a model response.
///
/// Returns the slice from the first `[` to the last `]`.
pub fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

/// Locate the first JSON object in a model response.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse a factor list out of a model response.
///
/// Returns `None` when the response contains no parseable JSON array.
/// Entries that lack any of the three fields, or whose confidence is not a
/// number, are skipped. An array whose entries are all invalid yields an
/// empty list, which callers treat as a failed response.
///
/// # Examples
///
/// ```
/// use debate_domain::debate::factor::parse_factor_list;
///
/// let text = r#"Here you go:
/// [{"factor_name": "Supply shocks", "justification": "Energy prices.", "confidence": 0.8}]"#;
/// let factors = parse_factor_list(text).unwrap();
/// assert_eq!(factors[0].name, "Supply shocks");
/// ```
pub fn parse_factor_list(text: &str) -> Option<Vec<Factor>> {
    let json = extract_json_array(text)?;
    let items: Vec<serde_json::Value> = serde_json::from_str(json).ok()?;

    Some(items.iter().filter_map(factor_from_value).collect())
}

fn factor_from_value(value: &serde_json::Value) -> Option<Factor> {
    let name = value
        .get("factor_name")
        .or_else(|| value.get("name"))
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())?;
    let justification = value.get("justification").and_then(|v| v.as_str())?;
    let confidence = number_field(value.get("confidence")?)?;

    Some(Factor::new(name, justification, confidence))
}

/// Read a JSON number, accepting numeric strings such as `"0.7"`
pub(crate) fn number_field(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Render a factor list as pretty JSON for inclusion in prompts
pub fn factors_to_json(factors: &[Factor]) -> String {
    serde_json::to_string_pretty(factors).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_array() {
        let text = r#"[
            {"factor_name": "Interest rates", "justification": "Cost of capital.", "confidence": 0.9},
            {"factor_name": "Labor market", "justification": "Wage pressure.", "confidence": 0.6}
        ]"#;
        let factors = parse_factor_list(text).unwrap();
        assert_eq!(factors.len(), 2);
        assert_eq!(factors[1].name, "Labor market");
        assert_eq!(factors[1].confidence, 0.6);
    }

    #[test]
    fn test_parse_inside_code_fence() {
        let text = "```json\n[{\"name\": \"Latency\", \"justification\": \"p99\", \"confidence\": \"0.4\"}]\n```";
        let factors = parse_factor_list(text).unwrap();
        assert_eq!(factors[0].name, "Latency");
        assert_eq!(factors[0].confidence, 0.4);
    }

    #[test]
    fn test_invalid_entries_are_skipped() {
        let text = r#"[
            {"factor_name": "Kept", "justification": "ok", "confidence": 0.5},
            {"factor_name": "No confidence", "justification": "missing"},
            {"justification": "no name", "confidence": 0.5},
            {"factor_name": "Bad confidence", "justification": "x", "confidence": "high"},
            "not an object"
        ]"#;
        let factors = parse_factor_list(text).unwrap();
        assert_eq!(factors.len(), 1);
        assert_eq!(factors[0].name, "Kept");
    }

    #[test]
    fn test_confidence_is_clamped() {
        let text = r#"[{"factor_name": "A", "justification": "j", "confidence": 4.5},
                       {"factor_name": "B", "justification": "j", "confidence": -1}]"#;
        let factors = parse_factor_list(text).unwrap();
        assert_eq!(factors[0].confidence, 1.0);
        assert_eq!(factors[1].confidence, 0.0);
    }

    #[test]
    fn test_no_array_returns_none() {
        assert!(parse_factor_list("I could not decide.").is_none());
        assert!(parse_factor_list("[not json]").is_none());
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Interest   Rates "), "interest rates");
        assert_eq!(
            Factor::new("Interest Rates", "", 0.5).normalized_name(),
            normalize_name("interest rates")
        );
    }

    #[test]
    fn test_factors_to_json_uses_prompt_keys() {
        let json = factors_to_json(&[Factor::new("A", "because", 0.5)]);
        assert!(json.contains("\"factor_name\": \"A\""));
        assert!(parse_factor_list(&json).is_some());
    }
}
