//! Persistent-gap detection — keyword similarity across rounds.
//!
//! Gap strings are projected onto a fixed domain vocabulary before comparison
//! so that paraphrased complaints about the same deficiency still match.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Domain terms used to project gap text into a comparable keyword set.
pub const SIMILARITY_TERMS: &[&str] = &[
    "validation",
    "error",
    "handling",
    "transformation",
    "missing",
    "data",
    "pipeline",
    "quality",
    "incomplete",
];

/// How many trailing history entries the detector inspects.
const HISTORY_WINDOW: usize = 3;

/// Escalation tuning. The similarity threshold and cap are empirically
/// chosen; they are configuration, not invariants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationConfig {
    /// Jaccard similarity above which gaps count as recurring.
    pub similarity_threshold: f64,
    /// Maximum escalations per pipeline run.
    pub max_escalations: u32,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.3,
            max_escalations: 2,
        }
    }
}

/// Subset of the domain vocabulary present in the given gap strings.
fn keyword_set(gaps: &[String]) -> BTreeSet<&'static str> {
    let mut keywords = BTreeSet::new();
    for gap in gaps {
        let gap = gap.to_lowercase();
        for term in SIMILARITY_TERMS {
            if gap.contains(term) {
                keywords.insert(*term);
            }
        }
    }
    keywords
}

/// Jaccard index over the matched-keyword sets of two gap lists.
///
/// 0.0 when either side matches no vocabulary term.
pub fn gap_similarity(gaps_a: &[String], gaps_b: &[String]) -> f64 {
    let a = keyword_set(gaps_a);
    let b = keyword_set(gaps_b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(&b).count();
    let union = a.union(&b).count();
    intersection as f64 / union as f64
}

/// Evaluate whether the resolver sub-workflow should fire this round.
///
/// Preconditions: more than two completed rounds, escalation budget left,
/// and at least one gap mined this round. Fires when the first and last of
/// the last three non-empty history entries score above the threshold.
/// Returns the similarity when firing.
pub fn should_escalate(
    config: &EscalationConfig,
    feedback_history: &[String],
    current_gap_count: usize,
    escalation_count: u32,
) -> Option<f64> {
    if feedback_history.len() <= 2 || escalation_count >= config.max_escalations {
        return None;
    }
    if current_gap_count == 0 {
        return None;
    }

    let recent: Vec<Vec<String>> = feedback_history
        .iter()
        .rev()
        .take(HISTORY_WINDOW)
        .rev()
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.split(';').map(|g| g.trim().to_string()).collect())
        .collect();

    if recent.len() < 2 {
        return None;
    }

    let similarity = gap_similarity(&recent[0], recent.last().unwrap_or(&recent[0]));
    if similarity > config.similarity_threshold {
        Some(similarity)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gaps(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_identical_nonempty_sets_are_fully_similar() {
        let a = gaps(&["missing validation step"]);
        assert!((gap_similarity(&a, &a) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_disjoint_keywords_yield_zero() {
        let a = gaps(&["missing load step"]);
        let b = gaps(&["poor quality output"]);
        assert_eq!(gap_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_no_vocabulary_match_yields_zero() {
        let a = gaps(&["something unrelated"]);
        let b = gaps(&["missing validation"]);
        assert_eq!(gap_similarity(&a, &b), 0.0);
        assert_eq!(gap_similarity(&b, &a), 0.0);
    }

    #[test]
    fn test_partial_overlap() {
        // a → {missing, validation}; b → {missing, error, handling}
        let a = gaps(&["missing validation step"]);
        let b = gaps(&["missing error handling"]);
        let sim = gap_similarity(&a, &b);
        assert!((sim - 0.25).abs() < 1e-9, "got {sim}");
    }

    #[test]
    fn test_paraphrased_gaps_still_match() {
        let a = gaps(&["the pipeline is missing validation"]);
        let b = gaps(&["validation coverage is missing from the pipeline"]);
        assert!((gap_similarity(&a, &b) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_requires_more_than_two_rounds() {
        let cfg = EscalationConfig::default();
        let history = vec!["missing validation".to_string(), "missing validation".to_string()];
        assert!(should_escalate(&cfg, &history, 1, 0).is_none());
    }

    #[test]
    fn test_fires_on_recurring_gaps() {
        let cfg = EscalationConfig::default();
        let history = vec![
            "missing validation step".to_string(),
            "missing validation step".to_string(),
            "missing validation step".to_string(),
        ];
        let sim = should_escalate(&cfg, &history, 1, 0);
        assert!(sim.is_some());
        assert!((sim.unwrap() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_respects_escalation_cap() {
        let cfg = EscalationConfig::default();
        let history = vec!["missing validation".to_string(); 5];
        assert!(should_escalate(&cfg, &history, 1, 2).is_none());
        assert!(should_escalate(&cfg, &history, 1, 1).is_some());
    }

    #[test]
    fn test_requires_current_gaps() {
        let cfg = EscalationConfig::default();
        let history = vec!["missing validation".to_string(); 3];
        assert!(should_escalate(&cfg, &history, 0, 0).is_none());
    }

    #[test]
    fn test_empty_entries_skipped() {
        let cfg = EscalationConfig::default();
        // Only one non-empty entry in the window — cannot compare.
        let history = vec![
            "missing validation".to_string(),
            String::new(),
            String::new(),
            "missing validation".to_string(),
        ];
        assert!(should_escalate(&cfg, &history, 1, 0).is_none());
    }

    #[test]
    fn test_below_threshold_does_not_fire() {
        let cfg = EscalationConfig::default();
        let history = vec![
            "missing load step".to_string(),
            "missing load step".to_string(),
            "poor data quality; incomplete lineage".to_string(),
        ];
        // first → {missing}; last → {data, quality, incomplete} → similarity 0
        assert!(should_escalate(&cfg, &history, 1, 0).is_none());
    }

    #[test]
    fn test_config_defaults() {
        let cfg = EscalationConfig::default();
        assert!((cfg.similarity_threshold - 0.3).abs() < f64::EPSILON);
        assert_eq!(cfg.max_escalations, 2);
    }
}
