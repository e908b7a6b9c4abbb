//! Dealer service implementation.

use std::future::Future;
use std::sync::Arc;

use sitesurvey_shared::types::{PageRequest, PageResponse};
use tracing::{debug, info};
use uuid::Uuid;

use super::error::DealerError;
use super::types::{
    CreateDealerInput, Dealer, DealerChanges, DealerFilter, DealerWithSurveys, NewDealer,
    UpdateDealerInput, normalize_reps,
};
use crate::storage::RemoteStorage;
use crate::survey::Survey;
use crate::upload::{AssetCategory, UploadFile, UploadOrchestrator};

/// Repository trait for dealer persistence.
///
/// This trait is implemented by the db crate to provide actual database operations.
pub trait DealerRepository: Send + Sync {
    /// Find a dealer by surrogate id.
    fn find_by_id(&self, id: Uuid)
    -> impl Future<Output = Result<Option<Dealer>, DealerError>> + Send;

    /// Find a dealer by business key.
    fn find_by_dealer_id(
        &self,
        dealer_id: &str,
    ) -> impl Future<Output = Result<Option<Dealer>, DealerError>> + Send;

    /// Insert a dealer. A taken business key is
    /// [`DealerError::DuplicateDealerId`].
    fn insert(&self, dealer: NewDealer)
    -> impl Future<Output = Result<Dealer, DealerError>> + Send;

    /// Apply changes and bump `updated_at`.
    fn update(
        &self,
        id: Uuid,
        changes: DealerChanges,
    ) -> impl Future<Output = Result<Dealer, DealerError>> + Send;

    /// Delete a dealer. Returns `false` if it did not exist.
    fn delete(&self, id: Uuid) -> impl Future<Output = Result<bool, DealerError>> + Send;

    /// One page of matching dealers, newest first, plus the total count.
    fn search(
        &self,
        filter: &DealerFilter,
        page: &PageRequest,
    ) -> impl Future<Output = Result<(Vec<Dealer>, u64), DealerError>> + Send;

    /// Business key of the dealer a survey belongs to.
    fn dealer_id_for_survey(
        &self,
        survey_id: i32,
    ) -> impl Future<Output = Result<Option<String>, DealerError>> + Send;

    /// A dealer's surveys, newest first, optionally for one customer.
    fn surveys_for(
        &self,
        dealer_id: &str,
        customer_name: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Survey>, DealerError>> + Send;
}

/// Dealer service: CRUD plus logo handling.
pub struct DealerService<R: DealerRepository, S: RemoteStorage> {
    repo: Arc<R>,
    uploads: Arc<UploadOrchestrator<S>>,
}

impl<R: DealerRepository, S: RemoteStorage> DealerService<R, S> {
    /// Create a new dealer service.
    #[must_use]
    pub fn new(repo: Arc<R>, uploads: Arc<UploadOrchestrator<S>>) -> Self {
        Self { repo, uploads }
    }

    /// Create a dealer, uploading its logo first when one is given.
    ///
    /// If the insert fails the uploaded logo is discarded.
    pub async fn create(
        &self,
        input: CreateDealerInput,
        logo: Option<UploadFile>,
    ) -> Result<Dealer, DealerError> {
        let dealer_id = required(&input.dealer_id, "dealer_id")?;
        let name = required(&input.name, "name")?;
        let reps = normalize_reps(input.reps);

        if self.repo.find_by_dealer_id(&dealer_id).await?.is_some() {
            return Err(DealerError::DuplicateDealerId(dealer_id));
        }

        let logo_url = match logo {
            Some(file) => Some(
                self.uploads
                    .ingest(file, &dealer_id, AssetCategory::DealerLogo)
                    .await?,
            ),
            None => None,
        };

        let new_dealer = NewDealer {
            dealer_id,
            name,
            logo: logo_url.clone(),
            reps,
        };

        match self.repo.insert(new_dealer).await {
            Ok(dealer) => {
                info!(id = %dealer.id, dealer_id = %dealer.dealer_id, "Dealer created");
                Ok(dealer)
            }
            Err(e) => {
                if let Some(url) = logo_url {
                    self.uploads.discard(&url).await;
                }
                Err(e)
            }
        }
    }

    /// Update name and reps when provided. A new logo replaces the old one,
    /// which is deleted only after the new URL is saved.
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateDealerInput,
        logo: Option<UploadFile>,
    ) -> Result<Dealer, DealerError> {
        let existing = self.get(id).await?;

        let changes = DealerChanges {
            name: input
                .name
                .map(|n| required(&n, "name"))
                .transpose()?,
            reps: input.reps.map(normalize_reps),
            logo: None,
        };

        let dealer = match logo {
            Some(file) => {
                let repo = &self.repo;
                self.uploads
                    .replace(
                        existing.logo.as_deref(),
                        file,
                        &existing.dealer_id,
                        AssetCategory::DealerLogo,
                        |url| async move {
                            repo.update(
                                id,
                                DealerChanges {
                                    logo: Some(Some(url)),
                                    ..changes
                                },
                            )
                            .await
                        },
                    )
                    .await?
            }
            None => self.repo.update(id, changes).await?,
        };

        info!(id = %dealer.id, dealer_id = %dealer.dealer_id, "Dealer updated");
        Ok(dealer)
    }

    /// Delete a dealer, removing its logo best-effort first.
    pub async fn delete(&self, id: Uuid) -> Result<Dealer, DealerError> {
        let dealer = self.get(id).await?;

        if let Some(logo) = &dealer.logo {
            self.uploads.discard(logo).await;
        }

        if !self.repo.delete(id).await? {
            return Err(DealerError::NotFound(id.to_string()));
        }

        info!(id = %dealer.id, dealer_id = %dealer.dealer_id, "Dealer deleted");
        Ok(dealer)
    }

    /// Get a dealer by surrogate id.
    pub async fn get(&self, id: Uuid) -> Result<Dealer, DealerError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DealerError::NotFound(id.to_string()))
    }

    /// Get a dealer by business key.
    pub async fn find_by_dealer_id(&self, dealer_id: &str) -> Result<Dealer, DealerError> {
        let dealer_id = dealer_id.trim();
        self.repo
            .find_by_dealer_id(dealer_id)
            .await?
            .ok_or_else(|| DealerError::NotFound(dealer_id.to_string()))
    }

    /// Search dealers by name substring and exact rep membership.
    pub async fn search(
        &self,
        filter: DealerFilter,
        page: PageRequest,
    ) -> Result<PageResponse<Dealer>, DealerError> {
        let filter = DealerFilter {
            search: non_blank(filter.search),
            rep_name: non_blank(filter.rep_name),
        };

        let (rows, total) = self.repo.search(&filter, &page).await?;
        Ok(PageResponse::new(rows, page, total))
    }

    /// Look up a dealer by business key, with its surveys.
    ///
    /// An all-digit key is a survey id and resolves to that survey's dealer.
    pub async fn get_by_dealer_id(
        &self,
        key: &str,
        customer_name: Option<&str>,
    ) -> Result<DealerWithSurveys, DealerError> {
        let key = key.trim();

        let dealer_id = if !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) {
            let survey_id: i32 = key
                .parse()
                .map_err(|_| DealerError::SurveyNotFound(key.to_string()))?;
            self.repo
                .dealer_id_for_survey(survey_id)
                .await?
                .ok_or_else(|| DealerError::SurveyNotFound(key.to_string()))?
        } else {
            key.to_string()
        };

        let dealer = self
            .repo
            .find_by_dealer_id(&dealer_id)
            .await?
            .ok_or_else(|| DealerError::NotFound(dealer_id.clone()))?;

        let customer_name = customer_name.map(str::trim).filter(|c| !c.is_empty());
        // An unmatched customer still returns the dealer, with no surveys, not a 404.
        let surveys = self.repo.surveys_for(&dealer.dealer_id, customer_name).await?;

        debug!(dealer_id = %dealer.dealer_id, surveys = surveys.len(), "Found dealer");
        Ok(DealerWithSurveys { dealer, surveys })
    }
}

fn required(value: &str, field: &str) -> Result<String, DealerError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DealerError::validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
