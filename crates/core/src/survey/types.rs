//! Survey domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// A stored survey response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Survey {
    /// Serial id.
    pub id: i32,
    /// Business key of the dealer the survey was taken for.
    pub dealer_id: String,
    /// Representative who took the survey.
    pub rep_name: String,
    /// Customer name.
    pub customer_name: String,
    /// Customer address.
    pub customer_address: String,
    /// Answers keyed by question id. Photo answers are lists of URLs.
    pub response_data: Value,
    /// URLs of the photos uploaded for this survey. Only these are removed
    /// from storage when the survey is deleted.
    #[serde(skip_serializing)]
    pub photos: Vec<String>,
    /// Submission time.
    pub created_at: DateTime<Utc>,
}

impl Survey {
    /// Link to the rendered response on the survey frontend.
    #[must_use]
    pub fn response_url(&self) -> String {
        format!("/r/{}?survey_id={}", self.dealer_id, self.id)
    }
}

/// A survey joined with the dealer it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveyWithDealer {
    /// The survey.
    #[serde(flatten)]
    pub survey: Survey,
    /// Dealer name, when the dealer still exists.
    pub dealer_name: Option<String>,
    /// Dealer reps, when the dealer still exists.
    pub dealer_reps: Option<Vec<String>>,
}

/// Input for submitting a survey.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateSurveyInput {
    /// Dealer business key.
    pub dealer_id: String,
    /// Representative name.
    pub rep_name: String,
    /// Customer name.
    pub customer_name: String,
    /// Customer address.
    pub customer_address: String,
    /// Answers; must be a JSON object.
    pub response_data: Value,
}

/// Survey search filter. All criteria are combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurveyFilter {
    /// Case-insensitive substring of customer name or address.
    pub search: Option<String>,
    /// Exact dealer business key.
    pub dealer_id: Option<String>,
    /// Case-insensitive substring of the rep name.
    pub rep_name: Option<String>,
    /// Exact survey id.
    pub id: Option<i32>,
}
