//! Survey routes.

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sitesurvey_core::survey::{CreateSurveyInput, Survey, SurveyFilter, SurveyWithDealer};
use sitesurvey_shared::types::PageRequest;
use tracing::info;

use crate::AppState;
use crate::error::error_response;
use crate::extractors::MultipartForm;

/// Creates the survey routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/surveys", get(search_surveys).post(create_survey))
        .route("/surveys/search", get(search_surveys))
        .route("/surveys/responses/{dealer_id}", get(list_dealer_responses))
        .route("/surveys/{id}", get(get_survey).delete(delete_survey))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for searching surveys.
#[derive(Debug, Deserialize)]
pub struct SearchSurveysQuery {
    /// Case-insensitive substring of customer name or address.
    pub search: Option<String>,
    /// Exact dealer business key.
    pub dealer_id: Option<String>,
    /// Case-insensitive substring of the rep name.
    pub rep_name: Option<String>,
    /// Exact survey id.
    pub id: Option<i32>,
    /// Page number (1-indexed).
    pub page: Option<u64>,
    /// Page size.
    pub limit: Option<u64>,
}

/// Optional customer lookup for `GET /surveys/{id}`.
#[derive(Debug, Deserialize)]
pub struct GetSurveyQuery {
    /// Dealer business key.
    pub dealer_id: Option<String>,
    /// Customer name.
    pub customer_name: Option<String>,
    /// Customer address.
    pub customer_address: Option<String>,
}

/// A survey with a link to its rendered response.
#[derive(Debug, Serialize)]
pub struct SurveyResponse {
    /// The survey.
    #[serde(flatten)]
    pub survey: Survey,
    /// Frontend link to the response.
    pub response_url: String,
}

impl From<Survey> for SurveyResponse {
    fn from(survey: Survey) -> Self {
        Self {
            response_url: survey.response_url(),
            survey,
        }
    }
}

/// A survey with its dealer and response link.
#[derive(Debug, Serialize)]
pub struct SurveyDetailResponse {
    /// The survey and dealer columns.
    #[serde(flatten)]
    pub survey: SurveyWithDealer,
    /// Frontend link to the response.
    pub response_url: String,
}

impl From<SurveyWithDealer> for SurveyDetailResponse {
    fn from(survey: SurveyWithDealer) -> Self {
        Self {
            response_url: survey.survey.response_url(),
            survey,
        }
    }
}

/// One search result row.
#[derive(Debug, Serialize)]
pub struct SurveySearchRow {
    /// Survey id.
    pub id: i32,
    /// Dealer business key.
    pub dealer_id: String,
    /// Dealer name, when the dealer still exists.
    pub dealer_name: Option<String>,
    /// Dealer reps, when the dealer still exists.
    pub dealer_reps: Option<Vec<String>>,
    /// Customer name.
    pub customer_name: String,
    /// Customer address.
    pub customer_address: String,
    /// Representative name.
    pub rep_name: String,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// Frontend link to the response.
    pub response_url: String,
}

impl From<SurveyWithDealer> for SurveySearchRow {
    fn from(row: SurveyWithDealer) -> Self {
        let response_url = row.survey.response_url();
        let survey = row.survey;
        Self {
            id: survey.id,
            dealer_id: survey.dealer_id,
            dealer_name: row.dealer_name,
            dealer_reps: row.dealer_reps,
            customer_name: survey.customer_name,
            customer_address: survey.customer_address,
            rep_name: survey.rep_name,
            created_at: survey.created_at,
            response_url,
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/surveys` - Submit a survey with photos.
///
/// Every file part is a photo; its field name (`<question>_<n>`) decides
/// which answer it is attached to.
async fn create_survey(State(state): State<AppState>, multipart: Multipart) -> impl IntoResponse {
    let mut form = match MultipartForm::read(multipart).await {
        Ok(form) => form,
        Err(e) => return error_response(e),
    };
    let response_data = match form.json_object("response_data") {
        Ok(data) => data,
        Err(e) => return error_response(e),
    };

    let input = CreateSurveyInput {
        dealer_id: form.text_or_empty("dealer_id"),
        rep_name: form.text_or_empty("rep_name"),
        customer_name: form.text_or_empty("customer_name"),
        customer_address: form.text_or_empty("customer_address"),
        response_data,
    };
    let photos = form.take_files();

    match state.survey_service().create(input, photos).await {
        Ok(survey) => {
            info!(survey_id = survey.id, "Survey submitted");
            (StatusCode::CREATED, Json(SurveyResponse::from(survey))).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// GET `/surveys` - Search surveys.
async fn search_surveys(
    State(state): State<AppState>,
    Query(query): Query<SearchSurveysQuery>,
) -> impl IntoResponse {
    let page = match PageRequest::from_query(query.page, query.limit) {
        Ok(page) => page,
        Err(e) => return error_response(e),
    };
    let filter = SurveyFilter {
        search: query.search,
        dealer_id: query.dealer_id,
        rep_name: query.rep_name,
        id: query.id,
    };

    match state.survey_service().search(filter, page).await {
        Ok(result) => {
            let result = result.map(SurveySearchRow::from);
            (
                StatusCode::OK,
                Json(json!({
                    "results": result.data,
                    "meta": result.meta,
                })),
            )
                .into_response()
        }
        Err(e) => error_response(e),
    }
}

/// GET `/surveys/{id}` - Get a survey.
///
/// When `dealer_id`, `customer_name` and `customer_address` are all given
/// the survey is looked up by customer instead.
async fn get_survey(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<GetSurveyQuery>,
) -> impl IntoResponse {
    let service = state.survey_service();

    let result = match (
        query.dealer_id.as_deref(),
        query.customer_name.as_deref(),
        query.customer_address.as_deref(),
    ) {
        (Some(dealer_id), Some(name), Some(address)) => {
            service.find_by_customer(dealer_id, name, address).await
        }
        _ => service.get(id).await,
    };

    match result {
        Ok(survey) => (StatusCode::OK, Json(SurveyDetailResponse::from(survey))).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET `/surveys/responses/{dealer_id}` - All responses of a dealer.
async fn list_dealer_responses(
    State(state): State<AppState>,
    Path(dealer_id): Path<String>,
) -> impl IntoResponse {
    match state.survey_service().list_for_dealer(&dealer_id).await {
        Ok(surveys) => {
            let surveys: Vec<SurveyResponse> = surveys.into_iter().map(SurveyResponse::from).collect();
            (StatusCode::OK, Json(surveys)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// DELETE `/surveys/{id}` - Delete a survey and its photos.
async fn delete_survey(State(state): State<AppState>, Path(id): Path<i32>) -> impl IntoResponse {
    match state.survey_service().delete(id).await {
        Ok(survey) => (
            StatusCode::OK,
            Json(json!({
                "message": format!("Survey {} has been successfully deleted", survey.id),
                "deleted_survey": SurveyResponse::from(survey),
            })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}
