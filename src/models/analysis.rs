use serde::{Deserialize, Serialize};

use crate::constants::MEDIA_URL_PREFIX;
use crate::routes::timestamp_to_rfc3339;

/// Severity label per skin condition, as reported by the analyzer
///
/// Conditions are declared in a fixed order; [`SkinHealth::labels`] walks them
/// in that order so label aggregation is reproducible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkinHealth {
    pub acne: Option<String>,
    pub dark_circles: Option<String>,
    pub wrinkles: Option<String>,
    pub hydration: Option<String>,
    pub redness: Option<String>,
    pub pores: Option<String>,
}

impl SkinHealth {
    /// Present severity labels in declared condition order
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        [
            &self.acne,
            &self.dark_circles,
            &self.wrinkles,
            &self.hydration,
            &self.redness,
            &self.pores,
        ]
        .into_iter()
        .filter_map(|label| label.as_deref())
    }
}

/// Structured output of a facial analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisResult {
    pub skin_health: Option<SkinHealth>,
    pub recommendations: Vec<String>,
    pub overall_score: Option<f64>,
    pub confidence: Option<f64>,
    pub detected_issues: Vec<String>,
    pub improvement_areas: Vec<String>,
}

/// Analysis record stored in redb
///
/// Immutable once written; removed only when its owner is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: String,
    pub owner_id: String,
    /// Image path relative to the media root
    pub image: String,
    /// Absent when the analysis could not produce a result
    pub result: Option<AnalysisResult>,
    /// When the analysis was created (Unix timestamp)
    pub created_at: i64,
}

/// Analysis model for API responses
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub id: String,
    pub user: String,
    pub user_email: String,
    /// Public URL of the uploaded image
    pub image: String,
    pub analysis_result: Option<AnalysisResult>,
    pub created_at: String,
}

impl Analysis {
    pub fn from_record(record: AnalysisRecord, user_email: &str) -> Self {
        Self {
            image: format!("{}/{}", MEDIA_URL_PREFIX, record.image),
            id: record.id,
            user: record.owner_id,
            user_email: user_email.to_string(),
            analysis_result: record.result,
            created_at: timestamp_to_rfc3339(record.created_at),
        }
    }
}
