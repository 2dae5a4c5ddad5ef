/// Maximum uploaded image size in bytes (10MB)
pub const MAX_IMAGE_SIZE_BYTES: usize = 10 * 1024 * 1024;

/// Warning threshold for large uploads (4MB)
/// Log when images exceed this size for monitoring
pub const WARN_IMAGE_SIZE_BYTES: usize = 4 * 1024 * 1024;

/// Subdirectory of the media root where uploaded face images are written
pub const FACIAL_IMAGES_DIR: &str = "facial_images";

/// URL prefix under which the media root is served
pub const MEDIA_URL_PREFIX: &str = "/media";

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 8;

/// Maximum length of a user's full name
pub const MAX_FULL_NAME_LEN: usize = 255;

/// Number of HMAC rounds applied when hashing a password
pub const PASSWORD_HASH_ROUNDS: u32 = 10_000;

/// Number of labels reported in a weekly summary's most common issues
pub const TOP_ISSUES_LIMIT: usize = 3;

/// Average score a week must exceed to count as improving
pub const IMPROVING_SCORE_THRESHOLD: f64 = 7.0;

// =============================================================================
// Error Messages
// =============================================================================

/// Error message for login failures (unknown email or wrong password)
pub const ERR_INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Error message for login requests missing a field
pub const ERR_MISSING_CREDENTIALS: &str = "Must include email and password";

/// Error message for malformed email addresses
pub const ERR_INVALID_EMAIL: &str = "Enter a valid email address";

/// Error message for short passwords
pub const ERR_PASSWORD_TOO_SHORT: &str = "Password must be at least 8 characters";

/// Error message for missing or oversized full names
pub const ERR_INVALID_FULL_NAME: &str = "Full name is required (max 255 characters)";

/// Error message for uploads without an image field
pub const ERR_MISSING_IMAGE: &str = "No image was submitted";

/// Error message for uploads that are not images
pub const ERR_NOT_AN_IMAGE: &str = "Upload a valid image";
