//! Survey service implementation.

use std::future::Future;
use std::sync::Arc;

use serde_json::{Map, Value};
use sitesurvey_shared::types::{PageRequest, PageResponse};
use tracing::{error, info};

use super::error::SurveyError;
use super::types::{CreateSurveyInput, Survey, SurveyFilter, SurveyWithDealer};
use crate::storage::RemoteStorage;
use crate::upload::{AssetCategory, UploadFile, UploadOrchestrator, UploadedAsset};

/// Repository trait for survey persistence.
///
/// This trait is implemented by the db crate to provide actual database operations.
pub trait SurveyRepository: Send + Sync {
    /// Check whether a dealer with this business key exists.
    fn dealer_exists(
        &self,
        dealer_id: &str,
    ) -> impl Future<Output = Result<bool, SurveyError>> + Send;

    /// Insert a survey.
    fn insert(
        &self,
        input: CreateSurveyInput,
    ) -> impl Future<Output = Result<Survey, SurveyError>> + Send;

    /// Replace a survey's response data and record the photos stored for it.
    fn attach_photos(
        &self,
        id: i32,
        response_data: Value,
        photos: Vec<String>,
    ) -> impl Future<Output = Result<Survey, SurveyError>> + Send;

    /// Find a survey with its dealer.
    fn find_by_id(
        &self,
        id: i32,
    ) -> impl Future<Output = Result<Option<SurveyWithDealer>, SurveyError>> + Send;

    /// Find a dealer's survey for one customer.
    fn find_by_customer(
        &self,
        dealer_id: &str,
        customer_name: &str,
        customer_address: &str,
    ) -> impl Future<Output = Result<Option<SurveyWithDealer>, SurveyError>> + Send;

    /// All surveys of a dealer, newest first.
    fn list_for_dealer(
        &self,
        dealer_id: &str,
    ) -> impl Future<Output = Result<Vec<Survey>, SurveyError>> + Send;

    /// One page of matching surveys, newest first, plus the total count.
    fn search(
        &self,
        filter: &SurveyFilter,
        page: &PageRequest,
    ) -> impl Future<Output = Result<(Vec<SurveyWithDealer>, u64), SurveyError>> + Send;

    /// Delete a survey. Returns `false` if it did not exist.
    fn delete(&self, id: i32) -> impl Future<Output = Result<bool, SurveyError>> + Send;
}

/// Survey service: submissions, photo uploads, lookups.
pub struct SurveyService<R: SurveyRepository, S: RemoteStorage> {
    repo: Arc<R>,
    uploads: Arc<UploadOrchestrator<S>>,
}

impl<R: SurveyRepository, S: RemoteStorage> SurveyService<R, S> {
    /// Create a new survey service.
    #[must_use]
    pub fn new(repo: Arc<R>, uploads: Arc<UploadOrchestrator<S>>) -> Self {
        Self { repo, uploads }
    }

    /// Store a survey, then upload its photos and merge their URLs into
    /// `response_data`.
    ///
    /// Photos are grouped by question id, the part of the multipart field
    /// name before the first `_`. Every photo is validated before anything
    /// is stored. When uploading fails afterwards the survey stays stored
    /// without photos and the upload error is returned.
    pub async fn create(
        &self,
        input: CreateSurveyInput,
        photos: Vec<UploadFile>,
    ) -> Result<Survey, SurveyError> {
        let input = validate_create(input)?;

        for photo in &photos {
            self.uploads.validate(photo)?;
        }

        if !self.repo.dealer_exists(&input.dealer_id).await? {
            return Err(SurveyError::DealerNotFound(input.dealer_id));
        }

        let survey = self.repo.insert(input).await?;
        info!(survey_id = survey.id, dealer_id = %survey.dealer_id, "Survey created");

        if photos.is_empty() {
            return Ok(survey);
        }

        let owner = format!("{}/{}", survey.dealer_id, survey.id);
        let assets = self
            .uploads
            .ingest_many(photos, &owner, AssetCategory::SurveyPhoto)
            .await
            .map_err(|e| {
                error!(survey_id = survey.id, error = %e, "Survey stored without photos");
                SurveyError::Upload(e)
            })?;

        let merged = merge_photo_urls(survey.response_data.clone(), &assets);
        let urls = assets.into_iter().map(|a| a.url).collect();
        let survey = self.repo.attach_photos(survey.id, merged, urls).await?;

        info!(survey_id = survey.id, photos = survey.photos.len(), "Survey photos attached");
        Ok(survey)
    }

    /// Get a survey with its dealer.
    pub async fn get(&self, id: i32) -> Result<SurveyWithDealer, SurveyError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| SurveyError::NotFound(id.to_string()))
    }

    /// Find a dealer's survey for one customer.
    pub async fn find_by_customer(
        &self,
        dealer_id: &str,
        customer_name: &str,
        customer_address: &str,
    ) -> Result<SurveyWithDealer, SurveyError> {
        self.repo
            .find_by_customer(dealer_id, customer_name, customer_address)
            .await?
            .ok_or_else(|| {
                SurveyError::NotFound(format!(
                    "dealer '{dealer_id}', customer '{customer_name}' at '{customer_address}'"
                ))
            })
    }

    /// All responses submitted for a dealer, newest first.
    pub async fn list_for_dealer(&self, dealer_id: &str) -> Result<Vec<Survey>, SurveyError> {
        self.repo.list_for_dealer(dealer_id).await
    }

    /// Search surveys.
    pub async fn search(
        &self,
        filter: SurveyFilter,
        page: PageRequest,
    ) -> Result<PageResponse<SurveyWithDealer>, SurveyError> {
        let filter = SurveyFilter {
            search: non_blank(filter.search),
            dealer_id: non_blank(filter.dealer_id),
            rep_name: non_blank(filter.rep_name),
            id: filter.id,
        };

        let (rows, total) = self.repo.search(&filter, &page).await?;
        Ok(PageResponse::new(rows, page, total))
    }

    /// Delete a survey and, best-effort, the photos uploaded for it.
    ///
    /// URLs a client wrote into `response_data` are never deleted.
    pub async fn delete(&self, id: i32) -> Result<Survey, SurveyError> {
        let survey = self.get(id).await?.survey;

        self.uploads.discard_all(survey.photos.iter()).await;

        if !self.repo.delete(id).await? {
            return Err(SurveyError::NotFound(id.to_string()));
        }

        info!(survey_id = id, "Survey deleted");
        Ok(survey)
    }
}

fn validate_create(input: CreateSurveyInput) -> Result<CreateSurveyInput, SurveyError> {
    let required = [
        ("dealer_id", &input.dealer_id),
        ("rep_name", &input.rep_name),
        ("customer_name", &input.customer_name),
        ("customer_address", &input.customer_address),
    ];
    if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
        return Err(SurveyError::validation(format!("{field} is required")));
    }

    if !input.response_data.is_object() {
        return Err(SurveyError::validation("response_data must be a JSON object"));
    }

    Ok(CreateSurveyInput {
        dealer_id: input.dealer_id.trim().to_string(),
        rep_name: input.rep_name.trim().to_string(),
        customer_name: input.customer_name.trim().to_string(),
        customer_address: input.customer_address.trim().to_string(),
        response_data: input.response_data,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Question id for a photo field: everything before the first `_`.
#[must_use]
pub fn question_id(field_name: &str) -> &str {
    field_name.split('_').next().unwrap_or(field_name)
}

/// Append uploaded URLs to `response_data`, one list per question id.
///
/// Existing lists are extended; any other existing value under the same
/// key is replaced by the list.
#[must_use]
pub fn merge_photo_urls(response_data: Value, assets: &[UploadedAsset]) -> Value {
    let mut map = match response_data {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    for asset in assets {
        let entry = map
            .entry(question_id(&asset.field_name).to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !entry.is_array() {
            *entry = Value::Array(Vec::new());
        }
        if let Value::Array(urls) = entry {
            urls.push(Value::String(asset.url.clone()));
        }
    }

    Value::Object(map)
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
