use thiserror::Error;

/// Failure taxonomy for every tracker operation. Validation and NotFound are
/// caller-correctable; Store wraps whatever the database reported and is
/// logged before it reaches the caller.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("no active session; run 'jobtrack login <user>' first")]
    Unauthorized,

    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// Covers both a missing id and an id owned by someone else. The two are
    /// deliberately indistinguishable.
    #[error("record not found")]
    NotFound,

    #[error("storage error: {0}")]
    Store(#[from] rusqlite::Error),
}

impl TrackerError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        TrackerError::Validation {
            field,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
