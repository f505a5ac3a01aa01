/// Identifier of the end user a token was minted for. Opaque to the core.
pub type UserId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
