pub mod analysis;
pub mod summary;
pub mod user;

pub use analysis::{Analysis, AnalysisRecord, AnalysisResult, SkinHealth};
pub use summary::{
    IssueCount, SummaryDocument, Trend, WeekWindow, WeeklyStats, WeeklySummary,
    WeeklySummaryRecord,
};
pub use user::{User, UserRecord};
