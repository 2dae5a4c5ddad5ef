use redb::{Database, ReadableTable};

use super::{analyses, decode, encode, summaries, tables};
use crate::error::{AppError, Result};
use crate::models::UserRecord;

/// Insert a new user and claim its email address
///
/// Returns the generated user ID, or `UserAlreadyExists` if the email is taken.
pub fn create_user(db: &Database, record: &UserRecord) -> Result<String> {
    let user_id = uuid::Uuid::new_v4().to_string();

    let write_txn = db.begin_write()?;
    {
        let mut emails = write_txn.open_table(tables::USER_EMAILS)?;
        if emails.get(record.email.as_str())?.is_some() {
            tracing::info!("Registration attempt with existing email");
            return Err(AppError::UserAlreadyExists);
        }
        emails.insert(record.email.as_str(), user_id.as_str())?;

        let mut users = write_txn.open_table(tables::USERS)?;
        let bytes = encode(record)?;
        users.insert(user_id.as_str(), bytes.as_slice())?;
    }
    write_txn.commit()?;

    Ok(user_id)
}

/// Look a user up by normalized email
pub fn find_by_email(db: &Database, email: &str) -> Result<Option<(String, UserRecord)>> {
    let read_txn = db.begin_read()?;
    let emails = read_txn.open_table(tables::USER_EMAILS)?;

    let Some(user_id) = emails.get(email)?.map(|id| id.value().to_string()) else {
        return Ok(None);
    };

    let users = read_txn.open_table(tables::USERS)?;
    let record = users
        .get(user_id.as_str())?
        .map(|bytes| decode::<UserRecord>(bytes.value()))
        .transpose()?;

    Ok(record.map(|r| (user_id, r)))
}

/// Look a user up by ID
pub fn get_user(db: &Database, user_id: &str) -> Result<Option<UserRecord>> {
    let read_txn = db.begin_read()?;
    let users = read_txn.open_table(tables::USERS)?;

    users
        .get(user_id)?
        .map(|bytes| decode(bytes.value()))
        .transpose()
}

/// Update a user's email and/or full name
///
/// Changing the email moves the email index entry; the new address must be free.
pub fn update_profile(
    db: &Database,
    user_id: &str,
    email: Option<String>,
    full_name: Option<String>,
) -> Result<UserRecord> {
    let write_txn = db.begin_write()?;
    let record = {
        let mut users = write_txn.open_table(tables::USERS)?;
        let mut record: UserRecord = match users.get(user_id)? {
            Some(bytes) => decode(bytes.value())?,
            None => return Err(AppError::UserNotFound),
        };

        if let Some(email) = email.filter(|e| *e != record.email) {
            let mut emails = write_txn.open_table(tables::USER_EMAILS)?;
            if emails.get(email.as_str())?.is_some() {
                return Err(AppError::UserAlreadyExists);
            }
            emails.remove(record.email.as_str())?;
            emails.insert(email.as_str(), user_id)?;
            record.email = email;
        }

        if let Some(full_name) = full_name {
            record.full_name = full_name;
        }

        let bytes = encode(&record)?;
        users.insert(user_id, bytes.as_slice())?;
        record
    };
    write_txn.commit()?;

    Ok(record)
}

/// Delete a user and everything they own in one transaction
///
/// Removes the user record, the email index entry, every analysis and weekly
/// summary. Returns the media-relative paths of the deleted analyses' images
/// so the caller can remove the files once the transaction has committed.
pub fn delete_user(db: &Database, user_id: &str) -> Result<Vec<String>> {
    let write_txn = db.begin_write()?;
    let images = {
        let mut users = write_txn.open_table(tables::USERS)?;
        let record: UserRecord = match users.remove(user_id)? {
            Some(bytes) => decode(bytes.value())?,
            None => return Err(AppError::UserNotFound),
        };
        drop(users);

        let mut emails = write_txn.open_table(tables::USER_EMAILS)?;
        emails.remove(record.email.as_str())?;
        drop(emails);

        let images = analyses::remove_all_for_user(&write_txn, user_id)?;
        let summary_count = summaries::remove_all_for_user(&write_txn, user_id)?;

        tracing::debug!(
            "Cascade delete removed {} analyses and {} summaries",
            images.len(),
            summary_count
        );

        images
    };
    write_txn.commit()?;

    Ok(images)
}
