//! Judge verdicts: rating parsing and the accept/reject rule.
//!
//! The judge model compares a candidate answer with the reference baseline
//! and rates it per criterion. Ratings are normalized to `[0.0, 1.0]`:
//!
//! | Judge wrote | Rating |
//! |-------------|--------|
//! | `0.7` | 0.7 |
//! | `7/10` or `7` | 0.7 |
//! | `Better` / `Equal` / `Worse` | 1.0 / 0.5 / 0.0 |
//!
//! The decision fails safe: a missing criterion rejects the candidate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Accept,
    Reject,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Accept => write!(f, "ACCEPT"),
            Decision::Reject => write!(f, "REJECT"),
        }
    }
}

/// Minimum rating per criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RatingThresholds(BTreeMap<String, f64>);

impl Default for RatingThresholds {
    fn default() -> Self {
        Self::empty()
            .with_criterion("completeness", 0.5)
            .with_criterion("correctness", 0.5)
            .with_criterion("clarity", 0.5)
    }
}

impl RatingThresholds {
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Add or replace a criterion; names are stored lowercase
    pub fn with_criterion(mut self, name: impl AsRef<str>, minimum: f64) -> Self {
        self.0.insert(name.as_ref().trim().to_lowercase(), minimum);
        self
    }

    pub fn criteria(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Outcome of judging a candidate against the reference baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub ratings: BTreeMap<String, f64>,
    pub decision: Decision,
    pub raw_rationale: String,
    /// A configured criterion could not be read from the judge output
    #[serde(default)]
    pub parse_failed: bool,
    /// No judge call was made
    #[serde(default)]
    pub skipped: bool,
}

impl JudgeVerdict {
    /// Parse a judge response and apply the decision rule
    pub fn from_response(raw: impl Into<String>, thresholds: &RatingThresholds) -> Self {
        let raw = raw.into();
        let ratings = parse_judge_ratings(&raw, thresholds.criteria());
        let parse_failed = thresholds.criteria().any(|c| !ratings.contains_key(c));
        Self {
            decision: decide(&ratings, thresholds),
            ratings,
            raw_rationale: raw,
            parse_failed,
            skipped: false,
        }
    }

    /// Verdict for a candidate that was never judged. Always rejects.
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            ratings: BTreeMap::new(),
            decision: Decision::Reject,
            raw_rationale: reason.into(),
            parse_failed: false,
            skipped: true,
        }
    }

    /// Verdict when the judge call itself failed. Always rejects.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            ratings: BTreeMap::new(),
            decision: Decision::Reject,
            raw_rationale: reason.into(),
            parse_failed: true,
            skipped: false,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.decision == Decision::Accept
    }
}

/// REJECT if any configured criterion is missing or strictly below its minimum.
pub fn decide(ratings: &BTreeMap<String, f64>, thresholds: &RatingThresholds) -> Decision {
    let violated = thresholds.iter().any(|(criterion, minimum)| match ratings.get(criterion) {
        Some(rating) => !rating.is_finite() || *rating < minimum,
        None => true,
    });
    if violated { Decision::Reject } else { Decision::Accept }
}

/// Extract one rating per criterion from the judge's text.
///
/// A criterion line looks like `Correctness: 0.8` (numbering, bullets and
/// markdown emphasis are tolerated). When the value is not on the same line,
/// the next `Rating:` line supplies it. The first occurrence wins.
pub fn parse_judge_ratings<'a>(
    text: &str,
    criteria: impl IntoIterator<Item = &'a str>,
) -> BTreeMap<String, f64> {
    let criteria: Vec<String> = criteria.into_iter().map(|c| c.to_lowercase()).collect();
    let mut ratings = BTreeMap::new();
    let mut pending: Option<String> = None;

    for line in text.lines() {
        let cleaned = strip_line_prefix(line);
        let lower = cleaned.to_lowercase();

        if let Some(criterion) = criteria.iter().find(|c| {
            lower
                .strip_prefix(c.as_str())
                .is_some_and(|rest| rest.trim_start_matches('*').trim_start().starts_with(':'))
        }) {
            pending = None;
            if ratings.contains_key(criterion) {
                continue;
            }
            let rest = &lower[criterion.len()..];
            let rest = rest.trim_start_matches('*').trim_start().trim_start_matches(':');
            let rest = rest.trim().strip_prefix("rating:").unwrap_or(rest);
            match parse_rating_value(rest) {
                Some(value) => {
                    ratings.insert(criterion.clone(), value);
                }
                None => pending = Some(criterion.clone()),
            }
            continue;
        }

        if let Some(criterion) = pending.take() {
            if let Some(rest) = lower.strip_prefix("rating")
                && let Some(value) = parse_rating_value(rest.trim_start_matches([':', ' ', '*']))
            {
                ratings.insert(criterion, value);
                continue;
            }
            pending = Some(criterion);
        }
    }

    ratings
}

fn strip_line_prefix(line: &str) -> &str {
    line.trim()
        .trim_start_matches(|c: char| c.is_ascii_digit() || matches!(c, '.' | ')' | '-' | '#' | ' '))
        .trim_start_matches(['*', '_'])
        .trim()
}

/// Parse a single rating value, normalized to `[0.0, 1.0]`
fn parse_rating_value(text: &str) -> Option<f64> {
    let word = text
        .split_whitespace()
        .next()?
        .trim_matches(|c: char| matches!(c, '[' | ']' | '*' | '_' | ',' | ';' | '(' | ')' | '"'));
    let word = word.strip_suffix('.').unwrap_or(word);

    match word {
        "better" => return Some(1.0),
        "equal" | "same" => return Some(0.5),
        "worse" => return Some(0.0),
        _ => {}
    }

    if let Some((num, den)) = word.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if !num.is_finite() || !den.is_finite() {
            return None;
        }
        return (den > 0.0).then(|| (num / den).clamp(0.0, 1.0));
    }

    let value: f64 = word.parse().ok()?;
    if !value.is_finite() || !(0.0..=10.0).contains(&value) {
        return None;
    }
    Some(if value <= 1.0 { value } else { value / 10.0 })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratings(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn two_criteria() -> RatingThresholds {
        RatingThresholds::empty()
            .with_criterion("accuracy", 0.6)
            .with_criterion("completeness", 0.6)
    }

    #[test]
    fn test_any_violation_rejects() {
        let r = ratings(&[("accuracy", 0.5), ("completeness", 0.9)]);
        assert_eq!(decide(&r, &two_criteria()), Decision::Reject);
    }

    #[test]
    fn test_threshold_boundaries() {
        let t = two_criteria();
        for (accuracy, expected) in [
            (0.59, Decision::Reject),
            (0.6, Decision::Accept),
            (0.61, Decision::Accept),
        ] {
            let r = ratings(&[("accuracy", accuracy), ("completeness", 0.6)]);
            assert_eq!(decide(&r, &t), expected, "accuracy = {}", accuracy);
        }
    }

    #[test]
    fn test_missing_criterion_rejects() {
        let r = ratings(&[("accuracy", 1.0)]);
        assert_eq!(decide(&r, &two_criteria()), Decision::Reject);
    }

    #[test]
    fn test_no_criteria_accepts() {
        assert_eq!(
            decide(&BTreeMap::new(), &RatingThresholds::empty()),
            Decision::Accept
        );
    }

    #[test]
    fn test_parse_numeric_ratings() {
        let text = "Accuracy: 0.5\nCompleteness: 0.9\nReasoning: the candidate skips a step.";
        let verdict = JudgeVerdict::from_response(text, &two_criteria());
        assert_eq!(verdict.ratings["accuracy"], 0.5);
        assert_eq!(verdict.ratings["completeness"], 0.9);
        assert_eq!(verdict.decision, Decision::Reject);
        assert!(!verdict.parse_failed);
        assert_eq!(verdict.raw_rationale, text);
    }

    #[test]
    fn test_parse_comparative_ratings_with_numbering() {
        let text = "1. **Completeness**: Better\n   Reasoning: covers more.\n\
                    2. Correctness:\n   Rating: [Equal]\n\
                    3. Clarity: Worse";
        let r = parse_judge_ratings(text, ["completeness", "correctness", "clarity"]);
        assert_eq!(r["completeness"], 1.0);
        assert_eq!(r["correctness"], 0.5);
        assert_eq!(r["clarity"], 0.0);
    }

    #[test]
    fn test_parse_scaled_scores() {
        let r = parse_judge_ratings("Clarity: 8/10\nCorrectness: 7", ["clarity", "correctness"]);
        assert!((r["clarity"] - 0.8).abs() < 1e-9);
        assert!((r["correctness"] - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_unparseable_response_rejects() {
        let verdict = JudgeVerdict::from_response("Looks great to me!", &RatingThresholds::default());
        assert!(verdict.parse_failed);
        assert_eq!(verdict.decision, Decision::Reject);
    }

    #[test]
    fn test_non_finite_ratings_reject() {
        let verdict = JudgeVerdict::from_response("Accuracy: nan/10\nCompleteness: 0.9", &two_criteria());
        assert!(!verdict.ratings.contains_key("accuracy"));
        assert_eq!(verdict.decision, Decision::Reject);

        let r = parse_judge_ratings("Accuracy: inf\nCompleteness: 9/inf", ["accuracy", "completeness"]);
        assert!(r.is_empty());

        let r = ratings(&[("accuracy", f64::NAN), ("completeness", 0.9)]);
        assert_eq!(decide(&r, &two_criteria()), Decision::Reject);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let r = parse_judge_ratings("Clarity: 0.9\nClarity: 0.1", ["clarity"]);
        assert_eq!(r["clarity"], 0.9);
    }

    #[test]
    fn test_skipped_verdict_rejects() {
        let verdict = JudgeVerdict::skipped("no candidate");
        assert!(verdict.skipped);
        assert!(!verdict.is_accepted());
    }

    #[test]
    fn test_criteria_are_case_insensitive() {
        let t = RatingThresholds::empty().with_criterion("Clarity", 0.5);
        assert_eq!(t.criteria().collect::<Vec<_>>(), vec!["clarity"]);
        let verdict = JudgeVerdict::from_response("CLARITY: 0.5", &t);
        assert!(verdict.is_accepted());
    }
}
