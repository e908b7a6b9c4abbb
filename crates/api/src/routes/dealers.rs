//! Dealer management routes.

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sitesurvey_core::dealer::{CreateDealerInput, Dealer, DealerFilter, UpdateDealerInput};
use sitesurvey_core::storage::{RemoteStorage, StorageService};
use sitesurvey_core::survey::CreateSurveyInput;
use sitesurvey_shared::types::PageRequest;
use tracing::info;
use uuid::Uuid;

use super::surveys::SurveyResponse;
use crate::AppState;
use crate::error::error_response;
use crate::extractors::MultipartForm;

/// Creates the dealer routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dealers", get(search_dealers).post(create_dealer))
        .route("/dealers/by-dealer-id/{dealer_id}", get(get_by_dealer_id))
        .route(
            "/dealers/{id}",
            get(get_dealer).patch(update_dealer).delete(delete_dealer),
        )
        .route("/dealers/{id}/form", get(get_survey_form))
        .route("/dealers/{id}/surveys", post(submit_survey))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for searching dealers.
#[derive(Debug, Deserialize)]
pub struct SearchDealersQuery {
    /// Case-insensitive substring of the dealer name.
    pub search: Option<String>,
    /// Exact rep name.
    pub rep_name: Option<String>,
    /// Page number (1-indexed).
    pub page: Option<u64>,
    /// Page size.
    pub limit: Option<u64>,
}

/// Query parameters for the dealer-with-surveys lookup.
#[derive(Debug, Deserialize)]
pub struct ByDealerIdQuery {
    /// Only include surveys of this customer.
    pub customer_name: Option<String>,
}

/// Dealer as returned to clients.
#[derive(Debug, Serialize)]
pub struct DealerResponse {
    /// Surrogate id.
    pub system_id: Uuid,
    /// Business key.
    pub dealer_id: String,
    /// Display name.
    pub name: String,
    /// Absolute logo URL.
    pub logo: Option<String>,
    /// Representatives.
    pub reps: Vec<String>,
}

impl DealerResponse {
    /// Build a response, resolving a stored logo key to an absolute URL.
    #[must_use]
    pub fn new(dealer: Dealer, storage: &StorageService) -> Self {
        Self {
            system_id: dealer.id,
            logo: dealer.logo.as_deref().map(|l| storage.resolve_url(l)),
            dealer_id: dealer.dealer_id,
            name: dealer.name,
            reps: dealer.reps,
        }
    }
}

/// A dealer with its surveys.
#[derive(Debug, Serialize)]
pub struct DealerWithSurveysResponse {
    /// The dealer.
    #[serde(flatten)]
    pub dealer: DealerResponse,
    /// Its surveys, newest first.
    pub surveys: Vec<SurveyResponse>,
}

/// Branding for the survey form page.
#[derive(Debug, Serialize)]
pub struct SurveyFormResponse {
    /// Page title.
    pub title: String,
    /// Absolute logo URL.
    pub logo: Option<String>,
    /// Dealer business key.
    pub dealer_id: String,
    /// Representatives to pick from.
    pub reps: Vec<String>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/dealers` - Search dealers.
async fn search_dealers(
    State(state): State<AppState>,
    Query(query): Query<SearchDealersQuery>,
) -> impl IntoResponse {
    let page = match PageRequest::from_query(query.page, query.limit) {
        Ok(page) => page,
        Err(e) => return error_response(e),
    };
    let filter = DealerFilter {
        search: query.search,
        rep_name: query.rep_name,
    };

    match state.dealer_service().search(filter, page).await {
        Ok(result) => {
            let result = result.map(|d| DealerResponse::new(d, &state.storage));
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// GET `/dealers/{id}` - Get a dealer by surrogate id.
async fn get_dealer(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match state.dealer_service().get(id).await {
        Ok(dealer) => (
            StatusCode::OK,
            Json(DealerResponse::new(dealer, &state.storage)),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// GET `/dealers/by-dealer-id/{dealer_id}` - Dealer and its surveys.
///
/// An all-digit key is treated as a survey id.
async fn get_by_dealer_id(
    State(state): State<AppState>,
    Path(dealer_id): Path<String>,
    Query(query): Query<ByDealerIdQuery>,
) -> impl IntoResponse {
    match state
        .dealer_service()
        .get_by_dealer_id(&dealer_id, query.customer_name.as_deref())
        .await
    {
        Ok(found) => {
            let response = DealerWithSurveysResponse {
                dealer: DealerResponse::new(found.dealer, &state.storage),
                surveys: found.surveys.into_iter().map(SurveyResponse::from).collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// POST `/dealers` - Create a dealer with an optional logo.
async fn create_dealer(State(state): State<AppState>, multipart: Multipart) -> impl IntoResponse {
    let mut form = match MultipartForm::read(multipart).await {
        Ok(form) => form,
        Err(e) => return error_response(e),
    };
    let reps = match form.string_list("reps") {
        Ok(reps) => reps.unwrap_or_default(),
        Err(e) => return error_response(e),
    };

    let input = CreateDealerInput {
        dealer_id: form.text_or_empty("dealer_id"),
        name: form.text_or_empty("name"),
        reps,
    };
    let logo = form.take_file("logo");

    match state.dealer_service().create(input, logo).await {
        Ok(dealer) => (
            StatusCode::CREATED,
            Json(DealerResponse::new(dealer, &state.storage)),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// PATCH `/dealers/{id}` - Update name, reps or logo.
async fn update_dealer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> impl IntoResponse {
    let mut form = match MultipartForm::read(multipart).await {
        Ok(form) => form,
        Err(e) => return error_response(e),
    };
    let reps = match form.string_list("reps") {
        Ok(reps) => reps,
        Err(e) => return error_response(e),
    };

    let input = UpdateDealerInput {
        name: form.text("name").map(ToString::to_string),
        reps,
    };
    let logo = form.take_file("logo");

    match state.dealer_service().update(id, input, logo).await {
        Ok(dealer) => (
            StatusCode::OK,
            Json(DealerResponse::new(dealer, &state.storage)),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// DELETE `/dealers/{id}` - Delete a dealer and its logo.
async fn delete_dealer(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match state.dealer_service().delete(id).await {
        Ok(dealer) => {
            let message = format!("Dealer {} has been successfully deleted", dealer.name);
            (
                StatusCode::OK,
                Json(json!({
                    "message": message,
                    "deleted_dealer": DealerResponse::new(dealer, &state.storage),
                })),
            )
                .into_response()
        }
        Err(e) => error_response(e),
    }
}

/// GET `/dealers/{dealer_id}/form` - Branding for a dealer's survey form.
async fn get_survey_form(
    State(state): State<AppState>,
    Path(dealer_id): Path<String>,
) -> impl IntoResponse {
    match state.dealer_service().find_by_dealer_id(&dealer_id).await {
        Ok(dealer) => {
            let response = SurveyFormResponse {
                title: dealer.name.clone(),
                logo: dealer.logo.as_deref().map(|l| state.storage.resolve_url(l)),
                dealer_id: dealer.dealer_id,
                reps: dealer.reps,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// POST `/dealers/{dealer_id}/surveys` - Survey form submission.
///
/// The dealer comes from the path; any `dealer_id` field is ignored.
async fn submit_survey(
    State(state): State<AppState>,
    Path(dealer_id): Path<String>,
    multipart: Multipart,
) -> impl IntoResponse {
    let mut form = match MultipartForm::read(multipart).await {
        Ok(form) => form,
        Err(e) => return error_response(e),
    };
    let response_data = match form.json_object("response_data") {
        Ok(data) => data,
        Err(e) => return error_response(e),
    };

    let input = CreateSurveyInput {
        dealer_id,
        rep_name: form.text_or_empty("rep_name"),
        customer_name: form.text_or_empty("customer_name"),
        customer_address: form.text_or_empty("customer_address"),
        response_data,
    };
    let photos = form.take_files();

    match state.survey_service().create(input, photos).await {
        Ok(survey) => {
            info!(survey_id = survey.id, dealer_id = %survey.dealer_id, "Survey form submitted");
            (StatusCode::CREATED, Json(SurveyResponse::from(survey))).into_response()
        }
        Err(e) => error_response(e),
    }
}
