//! Facial analysis capability and weekly aggregation.

pub mod aggregator;

use std::path::Path;

use crate::models::{AnalysisResult, SkinHealth};

pub use aggregator::summarize;

/// Produces an [`AnalysisResult`] for an uploaded face image
///
/// Handlers only see this trait through `AppState`, so a real model can be
/// swapped in without touching the routes or the aggregator. Implementations
/// may block; callers run them on the blocking thread pool.
pub trait FacialAnalyzer: Send + Sync {
    fn analyze(&self, image: &Path) -> Result<AnalysisResult, String>;
}

/// Stand-in analyzer returning a fixed result for every readable image
#[derive(Debug, Default, Clone)]
pub struct MockAnalyzer;

impl FacialAnalyzer for MockAnalyzer {
    fn analyze(&self, image: &Path) -> Result<AnalysisResult, String> {
        if !image.is_file() {
            return Err(format!("image not found at {}", image.display()));
        }

        tracing::debug!("Mock analysis for {}", image.display());

        Ok(AnalysisResult {
            skin_health: Some(SkinHealth {
                acne: Some("low".to_string()),
                dark_circles: Some("medium".to_string()),
                wrinkles: Some("low".to_string()),
                hydration: Some("good".to_string()),
                redness: Some("low".to_string()),
                pores: Some("medium".to_string()),
            }),
            recommendations: vec![
                "Use a gentle cleanser twice daily".to_string(),
                "Apply moisturizer with SPF 30+".to_string(),
                "Get 7-8 hours of sleep".to_string(),
                "Stay hydrated".to_string(),
                "Use an eye cream for dark circles".to_string(),
            ],
            overall_score: Some(7.5),
            confidence: Some(0.85),
            detected_issues: vec!["dark_circles".to_string(), "enlarged_pores".to_string()],
            improvement_areas: vec!["hydration".to_string(), "sleep_quality".to_string()],
        })
    }
}
