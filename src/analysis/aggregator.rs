//! Weekly aggregation of analysis results.
//!
//! Turns one week's analysis records into a [`SummaryDocument`]: how many
//! analyses were taken, their average score, the most frequent severity
//! labels, and a coarse trend.

use std::collections::HashMap;

use crate::constants::{IMPROVING_SCORE_THRESHOLD, TOP_ISSUES_LIMIT};
use crate::models::{AnalysisRecord, IssueCount, SummaryDocument, Trend, WeeklyStats};

/// Summarize a week's worth of analyses.
///
/// Records without a result, or results missing `skin_health` or
/// `overall_score`, still count towards `total_analyses` but are left out of
/// the aggregates they lack data for.
pub fn summarize(records: &[AnalysisRecord]) -> SummaryDocument {
    if records.is_empty() {
        return SummaryDocument::NoAnalyses;
    }

    let mut labels: Vec<&str> = Vec::new();
    let mut scores: Vec<f64> = Vec::new();

    for result in records.iter().filter_map(|r| r.result.as_ref()) {
        if let Some(skin_health) = &result.skin_health {
            labels.extend(skin_health.labels());
        }
        if let Some(score) = result.overall_score {
            scores.push(score);
        }
    }

    let average_score = average_score(&scores);
    let trend = if average_score > IMPROVING_SCORE_THRESHOLD {
        Trend::Improving
    } else {
        Trend::NeedsAttention
    };

    SummaryDocument::Computed(WeeklyStats {
        total_analyses: records.len(),
        average_score,
        most_common_issues: most_common(&labels, TOP_ISSUES_LIMIT),
        trend,
    })
}

/// Mean of `scores` rounded to two decimals, 0 when empty.
pub fn average_score(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }

    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    (mean * 100.0).round() / 100.0
}

/// The `limit` most frequent labels, highest count first.
///
/// Equal counts keep the order in which the labels were first seen.
pub fn most_common(labels: &[&str], limit: usize) -> Vec<IssueCount> {
    let mut counts: Vec<IssueCount> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for &label in labels {
        match positions.get(label) {
            Some(&idx) => counts[idx].count += 1,
            None => {
                positions.insert(label, counts.len());
                counts.push(IssueCount {
                    label: label.to_string(),
                    count: 1,
                });
            }
        }
    }

    // sort_by is stable, so ties stay in first-seen order
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(limit);
    counts
}
