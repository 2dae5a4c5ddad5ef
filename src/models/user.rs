use serde::{Deserialize, Serialize};

use crate::constants::MAX_FULL_NAME_LEN;
use crate::routes::timestamp_to_rfc3339;

/// User record stored in redb
/// Uses Unix timestamp for compact storage with bincode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Normalized email address (unique)
    pub email: String,
    pub full_name: String,
    /// Hex-encoded salted password hash
    pub password_hash: String,
    /// Hex-encoded per-user salt
    pub password_salt: String,
    /// When the user registered (Unix timestamp)
    pub date_joined: i64,
}

/// User model for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub date_joined: String,
}

impl User {
    pub fn from_record(id: &str, record: &UserRecord) -> Self {
        Self {
            id: id.to_string(),
            email: record.email.clone(),
            full_name: record.full_name.clone(),
            date_joined: timestamp_to_rfc3339(record.date_joined),
        }
    }

    /// Normalize an email address by lowercasing the domain part
    ///
    /// The local part is left untouched since some mail servers treat it
    /// case-sensitively.
    pub fn normalize_email(email: &str) -> String {
        let email = email.trim();
        match email.rsplit_once('@') {
            Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
            None => email.to_string(),
        }
    }

    /// Validate that an email address looks like `local@domain.tld`
    pub fn validate_email(email: &str) -> bool {
        let Some((local, domain)) = email.rsplit_once('@') else {
            return false;
        };

        if local.is_empty() || domain.is_empty() || email.chars().any(char::is_whitespace) {
            return false;
        }

        // Domain needs at least one dot with non-empty labels on both sides
        match domain.rsplit_once('.') {
            Some((host, tld)) => !host.is_empty() && !tld.is_empty() && !host.ends_with('.'),
            None => false,
        }
    }

    /// Validate that a full name is present and within the length limit
    pub fn validate_full_name(full_name: &str) -> bool {
        let trimmed = full_name.trim();
        !trimmed.is_empty() && trimmed.chars().count() <= MAX_FULL_NAME_LEN
    }
}
