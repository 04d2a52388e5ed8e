use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error("Username already taken: {0}")]
    UsernameTaken(String),
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Recurring expense not found: {0}")]
    RecurringNotFound(Uuid),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
