use chrono::DateTime;
use redb::{Database, ReadableTable, WriteTransaction};

use super::{decode, encode, tables};
use crate::error::{AppError, Result};
use crate::models::{AnalysisRecord, WeekWindow};

/// Analysis IDs owned by a user, oldest first
pub(crate) fn user_analysis_ids(
    index: &impl ReadableTable<&'static str, &'static [u8]>,
    owner_id: &str,
) -> Result<Vec<String>> {
    index
        .get(owner_id)?
        .map(|bytes| decode::<Vec<String>>(bytes.value()))
        .transpose()
        .map(Option::unwrap_or_default)
}

/// Load every analysis of `owner_id`, newest first
pub(crate) fn load_for_user(
    analyses: &impl ReadableTable<&'static str, &'static [u8]>,
    index: &impl ReadableTable<&'static str, &'static [u8]>,
    owner_id: &str,
) -> Result<Vec<AnalysisRecord>> {
    let mut records = Vec::new();
    for id in user_analysis_ids(index, owner_id)? {
        match analyses.get(id.as_str())? {
            Some(bytes) => records.push(decode::<AnalysisRecord>(bytes.value())?),
            None => tracing::warn!("Analysis index entry without record: {}", id),
        }
    }

    // Index is append-ordered; stable sort keeps insertion order for equal timestamps
    records.reverse();
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(records)
}

/// Store a new analysis and add it to its owner's index
pub fn insert_analysis(db: &Database, record: &AnalysisRecord) -> Result<()> {
    let write_txn = db.begin_write()?;
    {
        let users = write_txn.open_table(tables::USERS)?;
        if users.get(record.owner_id.as_str())?.is_none() {
            tracing::warn!("Analysis for non-existent user: {}", record.owner_id);
            return Err(AppError::UserNotFound);
        }
        drop(users);

        let mut analyses = write_txn.open_table(tables::ANALYSES)?;
        let bytes = encode(record)?;
        analyses.insert(record.id.as_str(), bytes.as_slice())?;
        drop(analyses);

        let mut index = write_txn.open_table(tables::USER_ANALYSES)?;
        let mut ids = user_analysis_ids(&index, &record.owner_id)?;
        if !ids.contains(&record.id) {
            ids.push(record.id.clone());
            let ids_bytes = encode(&ids)?;
            index.insert(record.owner_id.as_str(), ids_bytes.as_slice())?;
        }
    }
    write_txn.commit()?;

    Ok(())
}

/// All analyses of a user, newest first
pub fn list_for_user(db: &Database, owner_id: &str) -> Result<Vec<AnalysisRecord>> {
    let read_txn = db.begin_read()?;
    let analyses = read_txn.open_table(tables::ANALYSES)?;
    let index = read_txn.open_table(tables::USER_ANALYSES)?;

    load_for_user(&analyses, &index, owner_id)
}

/// A single analysis, only if it belongs to `owner_id`
pub fn get_for_user(db: &Database, owner_id: &str, analysis_id: &str) -> Result<AnalysisRecord> {
    let read_txn = db.begin_read()?;
    let analyses = read_txn.open_table(tables::ANALYSES)?;

    let record: AnalysisRecord = analyses
        .get(analysis_id)?
        .map(|bytes| decode(bytes.value()))
        .transpose()?
        .ok_or(AppError::AnalysisNotFound)?;

    // Other users' analyses look exactly like missing ones
    if record.owner_id != owner_id {
        return Err(AppError::AnalysisNotFound);
    }

    Ok(record)
}

/// Analyses whose creation date (UTC) falls inside `window`
pub fn in_window(records: Vec<AnalysisRecord>, window: &WeekWindow) -> Vec<AnalysisRecord> {
    records
        .into_iter()
        .filter(|r| {
            DateTime::from_timestamp(r.created_at, 0)
                .map(|dt| window.contains(dt.date_naive()))
                .unwrap_or(false)
        })
        .collect()
}

/// Remove every analysis of a user inside an open write transaction
///
/// Returns the media-relative image paths of the removed analyses.
pub(crate) fn remove_all_for_user(
    write_txn: &WriteTransaction,
    owner_id: &str,
) -> Result<Vec<String>> {
    let mut index = write_txn.open_table(tables::USER_ANALYSES)?;
    let ids = user_analysis_ids(&index, owner_id)?;
    index.remove(owner_id)?;
    drop(index);

    let mut analyses = write_txn.open_table(tables::ANALYSES)?;
    let mut images = Vec::with_capacity(ids.len());
    for id in &ids {
        let removed: Option<AnalysisRecord> = analyses
            .remove(id.as_str())?
            .map(|bytes| decode(bytes.value()))
            .transpose()?;
        if let Some(record) = removed {
            images.push(record.image);
        }
    }

    Ok(images)
}
