use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::routes::timestamp_to_rfc3339;

/// Marker returned in place of statistics when a week has no analyses
pub const NO_ANALYSES_MESSAGE: &str = "No analyses this week";

/// Monday-to-Sunday date range used to bucket analyses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekWindow {
    /// The ISO week (Monday start) containing `day`
    pub fn containing(day: NaiveDate) -> Self {
        let start = day - Duration::days(day.weekday().num_days_from_monday() as i64);
        Self {
            start,
            end: start + Duration::days(6),
        }
    }

    /// Whether `day` falls inside the window (both ends inclusive)
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

/// Coarse classification of a week's average score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    NeedsAttention,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::NeedsAttention => "needs_attention",
        }
    }
}

/// One entry of the ranked most-common-issues list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCount {
    pub label: String,
    pub count: usize,
}

/// Aggregate statistics for a week with at least one analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyStats {
    pub total_analyses: usize,
    pub average_score: f64,
    /// Ranked by count descending, at most three entries
    pub most_common_issues: Vec<IssueCount>,
    pub trend: Trend,
}

/// Output of the weekly aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SummaryDocument {
    NoAnalyses,
    Computed(WeeklyStats),
}

impl SummaryDocument {
    /// Render the document as the `summary_data` JSON object
    ///
    /// `most_common_issues` becomes an object whose key order is the rank order.
    pub fn to_json(&self) -> Value {
        match self {
            SummaryDocument::NoAnalyses => json!({ "message": NO_ANALYSES_MESSAGE }),
            SummaryDocument::Computed(stats) => {
                let issues: Map<String, Value> = stats
                    .most_common_issues
                    .iter()
                    .map(|issue| (issue.label.clone(), Value::from(issue.count)))
                    .collect();

                json!({
                    "total_analyses": stats.total_analyses,
                    "average_score": stats.average_score,
                    "most_common_issues": issues,
                    "trend": stats.trend.as_str(),
                })
            }
        }
    }
}

/// Weekly summary record stored in redb
///
/// Keyed by `(owner_id, week_start)`; recomputing a week overwrites the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklySummaryRecord {
    pub id: String,
    pub owner_id: String,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub total_analyses: usize,
    pub summary: SummaryDocument,
    /// When the record was first created (Unix timestamp)
    pub created_at: i64,
    /// When the record was last recomputed (Unix timestamp)
    pub updated_at: i64,
}

/// Weekly summary model for API responses
#[derive(Debug, Clone, Serialize)]
pub struct WeeklySummary {
    pub id: String,
    pub user: String,
    pub user_email: String,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub total_analyses: usize,
    pub summary_data: Value,
    pub created_at: String,
}

impl WeeklySummary {
    pub fn from_record(record: WeeklySummaryRecord, user_email: &str) -> Self {
        Self {
            summary_data: record.summary.to_json(),
            id: record.id,
            user: record.owner_id,
            user_email: user_email.to_string(),
            week_start: record.week_start,
            week_end: record.week_end,
            total_analyses: record.total_analyses,
            created_at: timestamp_to_rfc3339(record.created_at),
        }
    }
}
