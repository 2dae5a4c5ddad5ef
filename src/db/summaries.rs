use chrono::NaiveDate;
use redb::{Database, ReadableTable, WriteTransaction};

use super::{analyses, decode, encode, tables};
use crate::error::Result;
use crate::models::{AnalysisRecord, SummaryDocument, WeekWindow, WeeklySummaryRecord};

/// Storage key for a user's summary of the week starting on `week_start`
///
/// ISO dates sort lexicographically, so a user's keys are contiguous and
/// ordered by week.
fn summary_key(owner_id: &str, week_start: NaiveDate) -> String {
    format!("{}:{}", owner_id, week_start)
}

/// Half-open key range covering every summary of `owner_id`
fn owner_range(owner_id: &str) -> (String, String) {
    // ';' is the byte right after ':'
    (format!("{}:", owner_id), format!("{};", owner_id))
}

/// Recompute and store the summary of `window` for `owner_id`
///
/// Loading the week's analyses, aggregating and writing the record happen in
/// one write transaction, so concurrent refreshes of the same week serialize
/// and the (user, week) key never holds more than one record. An existing
/// record keeps its ID and `created_at` and has its counts and summary
/// overwritten.
pub fn refresh_weekly_summary<F>(
    db: &Database,
    owner_id: &str,
    window: WeekWindow,
    now: i64,
    summarize: F,
) -> Result<WeeklySummaryRecord>
where
    F: FnOnce(&[AnalysisRecord]) -> SummaryDocument,
{
    let write_txn = db.begin_write()?;
    let record = {
        let analyses_table = write_txn.open_table(tables::ANALYSES)?;
        let index = write_txn.open_table(tables::USER_ANALYSES)?;
        let all = analyses::load_for_user(&analyses_table, &index, owner_id)?;
        drop(analyses_table);
        drop(index);

        let week = analyses::in_window(all, &window);
        let summary = summarize(&week);

        let key = summary_key(owner_id, window.start);
        let mut summaries = write_txn.open_table(tables::WEEKLY_SUMMARIES)?;
        let existing: Option<WeeklySummaryRecord> = summaries
            .get(key.as_str())?
            .map(|bytes| decode(bytes.value()))
            .transpose()?;

        let record = match existing {
            Some(mut record) => {
                record.week_end = window.end;
                record.total_analyses = week.len();
                record.summary = summary;
                record.updated_at = now;
                record
            }
            None => {
                tracing::info!("Creating weekly summary for week of {}", window.start);
                WeeklySummaryRecord {
                    id: uuid::Uuid::new_v4().to_string(),
                    owner_id: owner_id.to_string(),
                    week_start: window.start,
                    week_end: window.end,
                    total_analyses: week.len(),
                    summary,
                    created_at: now,
                    updated_at: now,
                }
            }
        };

        let bytes = encode(&record)?;
        summaries.insert(key.as_str(), bytes.as_slice())?;
        record
    };
    write_txn.commit()?;

    Ok(record)
}

/// Every stored summary of a user, most recent week first
pub fn history(db: &Database, owner_id: &str) -> Result<Vec<WeeklySummaryRecord>> {
    let read_txn = db.begin_read()?;
    let summaries = read_txn.open_table(tables::WEEKLY_SUMMARIES)?;

    let (start, end) = owner_range(owner_id);
    let mut records = Vec::new();
    for entry in summaries.range(start.as_str()..end.as_str())? {
        let (_, bytes) = entry?;
        records.push(decode::<WeeklySummaryRecord>(bytes.value())?);
    }

    records.reverse();
    Ok(records)
}

/// Remove every summary of a user inside an open write transaction
///
/// Returns how many records were removed.
pub(crate) fn remove_all_for_user(write_txn: &WriteTransaction, owner_id: &str) -> Result<usize> {
    let mut summaries = write_txn.open_table(tables::WEEKLY_SUMMARIES)?;

    let (start, end) = owner_range(owner_id);
    let mut keys = Vec::new();
    for entry in summaries.range(start.as_str()..end.as_str())? {
        let (key, _) = entry?;
        keys.push(key.value().to_string());
    }

    for key in &keys {
        summaries.remove(key.as_str())?;
    }

    Ok(keys.len())
}
