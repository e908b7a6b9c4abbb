//! Dealer domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::survey::Survey;

/// A dealer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dealer {
    /// Surrogate id.
    pub id: Uuid,
    /// Business key; unique and immutable.
    pub dealer_id: String,
    /// Display name.
    pub name: String,
    /// Logo URL or storage key.
    pub logo: Option<String>,
    /// Representative names; never empty.
    pub reps: Vec<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// A dealer with its surveys.
#[derive(Debug, Clone, PartialEq)]
pub struct DealerWithSurveys {
    /// The dealer.
    pub dealer: Dealer,
    /// Its surveys, newest first.
    pub surveys: Vec<Survey>,
}

/// Input for creating a dealer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateDealerInput {
    /// Business key.
    pub dealer_id: String,
    /// Display name.
    pub name: String,
    /// Representative names.
    pub reps: Vec<String>,
}

/// Input for updating a dealer. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateDealerInput {
    /// New display name.
    pub name: Option<String>,
    /// New representative list.
    pub reps: Option<Vec<String>>,
}

/// A validated dealer ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDealer {
    /// Business key.
    pub dealer_id: String,
    /// Display name.
    pub name: String,
    /// Logo URL.
    pub logo: Option<String>,
    /// Normalized reps.
    pub reps: Vec<String>,
}

/// Column changes for an update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DealerChanges {
    /// New name.
    pub name: Option<String>,
    /// New reps.
    pub reps: Option<Vec<String>>,
    /// New logo (`Some(None)` clears it).
    pub logo: Option<Option<String>>,
}

/// Dealer search filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DealerFilter {
    /// Case-insensitive substring of the name.
    pub search: Option<String>,
    /// Exact member of `reps`.
    pub rep_name: Option<String>,
}

/// Trim rep names and drop blanks. An empty result becomes `[""]` so the
/// list is never empty.
#[must_use]
pub fn normalize_reps(reps: Vec<String>) -> Vec<String> {
    let reps: Vec<String> = reps
        .into_iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect();

    if reps.is_empty() {
        vec![String::new()]
    } else {
        reps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_reps() {
        assert_eq!(
            normalize_reps(vec![" Alex ".into(), String::new(), "Sam".into()]),
            ["Alex", "Sam"]
        );
        assert_eq!(normalize_reps(Vec::new()), [""]);
        assert_eq!(normalize_reps(vec!["   ".into()]), [""]);
    }
}
