//! Dealer error types.

use sitesurvey_shared::AppError;
use thiserror::Error;

use crate::upload::UploadError;

/// Dealer operation errors.
#[derive(Debug, Error)]
pub enum DealerError {
    /// Dealer not found.
    #[error("Dealer not found: {0}")]
    NotFound(String),

    /// Survey used to look up a dealer not found.
    #[error("Survey with ID \"{0}\" not found")]
    SurveyNotFound(String),

    /// Business key already taken.
    #[error("Dealer id '{0}' already exists")]
    DuplicateDealerId(String),

    /// Invalid input.
    #[error("{0}")]
    Validation(String),

    /// Logo upload failed.
    #[error("Logo upload failed: {0}")]
    Upload(#[from] UploadError),

    /// Repository operation failed.
    #[error("Repository error: {0}")]
    Repository(String),
}

impl DealerError {
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

impl From<DealerError> for AppError {
    fn from(err: DealerError) -> Self {
        match err {
            DealerError::NotFound(_) | DealerError::SurveyNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            DealerError::DuplicateDealerId(_) => Self::Conflict(err.to_string()),
            DealerError::Validation(msg) => Self::Validation(msg),
            DealerError::Upload(e) => e.into(),
            DealerError::Repository(msg) => Self::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;

    #[test]
    fn test_app_error_mapping() {
        let status = |e: DealerError| AppError::from(e).status_code();

        assert_eq!(status(DealerError::NotFound("x".into())), 404);
        assert_eq!(status(DealerError::SurveyNotFound("7".into())), 404);
        assert_eq!(status(DealerError::DuplicateDealerId("x".into())), 409);
        assert_eq!(status(DealerError::validation("name is required")), 400);
        assert_eq!(status(DealerError::repository("boom")), 500);
        assert_eq!(
            status(DealerError::Upload(UploadError::Storage(StorageError::operation("x")))),
            502
        );
        assert_eq!(
            status(DealerError::Upload(UploadError::TooLarge { size: 2, max: 1 })),
            400
        );
    }
}
