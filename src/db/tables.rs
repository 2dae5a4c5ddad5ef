use redb::TableDefinition;

/// Users table: user_id (UUID) -> UserRecord (serialized)
pub const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Email index: normalized email -> user_id
/// Enforces one account per email address
pub const USER_EMAILS: TableDefinition<&str, &str> = TableDefinition::new("user_emails");

/// Analyses table: analysis_id (UUID) -> AnalysisRecord (serialized)
pub const ANALYSES: TableDefinition<&str, &[u8]> = TableDefinition::new("analyses");

/// User analyses index: user_id -> Vec<analysis_id>
/// Used for per-user listing and cascade delete when a user is removed
pub const USER_ANALYSES: TableDefinition<&str, &[u8]> = TableDefinition::new("user_analyses");

/// Weekly summaries table: "<user_id>:<week_start>" -> WeeklySummaryRecord (serialized)
/// The composite key allows at most one summary per user and week
pub const WEEKLY_SUMMARIES: TableDefinition<&str, &[u8]> =
    TableDefinition::new("weekly_summaries");
