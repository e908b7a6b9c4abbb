//! Survey error types.

use sitesurvey_shared::AppError;
use thiserror::Error;

use crate::upload::UploadError;

/// Survey operation errors.
#[derive(Debug, Error)]
pub enum SurveyError {
    /// Survey not found.
    #[error("Survey not found: {0}")]
    NotFound(String),

    /// Dealer referenced by the survey does not exist.
    #[error("Dealer not found: {0}")]
    DealerNotFound(String),

    /// Invalid input.
    #[error("{0}")]
    Validation(String),

    /// Photo upload failed. The survey itself was stored.
    #[error("Photo upload failed: {0}")]
    Upload(#[from] UploadError),

    /// Repository operation failed.
    #[error("Repository error: {0}")]
    Repository(String),
}

impl SurveyError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}

impl From<SurveyError> for AppError {
    fn from(err: SurveyError) -> Self {
        match err {
            SurveyError::NotFound(_) | SurveyError::DealerNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            SurveyError::Validation(msg) => Self::Validation(msg),
            SurveyError::Upload(e) => e.into(),
            SurveyError::Repository(msg) => Self::Database(msg),
        }
    }
}
