#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Token not found")]
    TokenNotFound,

    #[error("Already verified")]
    AlreadyVerified,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
