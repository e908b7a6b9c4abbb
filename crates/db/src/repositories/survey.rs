//! Survey repository for database operations.

use chrono::Utc;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, NotSet, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde_json::Value;

use super::contains_pattern;
use super::dealer::summary;
use crate::entities::{dealers, surveys};
use sitesurvey_core::survey::{
    CreateSurveyInput, Survey, SurveyError, SurveyFilter, SurveyRepository as SurveyRepoTrait,
    SurveyWithDealer,
};
use sitesurvey_shared::types::PageRequest;

/// Survey repository implementation.
#[derive(Debug, Clone)]
pub struct SurveyRepository {
    db: DatabaseConnection,
}

impl SurveyRepository {
    /// Create a new survey repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl SurveyRepoTrait for SurveyRepository {
    async fn dealer_exists(&self, dealer_id: &str) -> Result<bool, SurveyError> {
        let count: u64 = dealers::Entity::find()
            .filter(dealers::Column::DealerId.eq(dealer_id))
            .count(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(count > 0)
    }

    async fn insert(&self, input: CreateSurveyInput) -> Result<Survey, SurveyError> {
        let active_model = surveys::ActiveModel {
            id: NotSet,
            dealer_id: Set(input.dealer_id),
            rep_name: Set(input.rep_name),
            customer_name: Set(input.customer_name),
            customer_address: Set(input.customer_address),
            response_data: Set(input.response_data),
            photos: Set(Vec::new()),
            created_at: Set(Utc::now().into()),
        };

        let model = active_model.insert(&self.db).await.map_err(repo_err)?;

        Ok(to_domain(model))
    }

    async fn attach_photos(
        &self,
        id: i32,
        response_data: Value,
        photos: Vec<String>,
    ) -> Result<Survey, SurveyError> {
        let model = surveys::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(repo_err)?
            .ok_or_else(|| SurveyError::NotFound(id.to_string()))?;

        let mut active_model = model.into_active_model();
        active_model.response_data = Set(response_data);
        active_model.photos = Set(photos);

        let model = active_model.update(&self.db).await.map_err(|e| match e {
            DbErr::RecordNotUpdated => SurveyError::NotFound(id.to_string()),
            other => repo_err(other),
        })?;

        Ok(to_domain(model))
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<SurveyWithDealer>, SurveyError> {
        let row = surveys::Entity::find_by_id(id)
            .find_also_related(dealers::Entity)
            .one(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(row.map(with_dealer))
    }

    async fn find_by_customer(
        &self,
        dealer_id: &str,
        customer_name: &str,
        customer_address: &str,
    ) -> Result<Option<SurveyWithDealer>, SurveyError> {
        let row = surveys::Entity::find()
            .filter(surveys::Column::DealerId.eq(dealer_id))
            .filter(surveys::Column::CustomerName.eq(customer_name))
            .filter(surveys::Column::CustomerAddress.eq(customer_address))
            .order_by_desc(surveys::Column::CreatedAt)
            .find_also_related(dealers::Entity)
            .one(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(row.map(with_dealer))
    }

    async fn list_for_dealer(&self, dealer_id: &str) -> Result<Vec<Survey>, SurveyError> {
        let models = surveys::Entity::find()
            .filter(surveys::Column::DealerId.eq(dealer_id))
            .order_by_desc(surveys::Column::CreatedAt)
            .order_by_desc(surveys::Column::Id)
            .all(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(models.into_iter().map(to_domain).collect())
    }

    async fn search(
        &self,
        filter: &SurveyFilter,
        page: &PageRequest,
    ) -> Result<(Vec<SurveyWithDealer>, u64), SurveyError> {
        let condition = condition_for(filter);

        let total = surveys::Entity::find()
            .filter(condition.clone())
            .count(&self.db)
            .await
            .map_err(repo_err)?;

        let rows = surveys::Entity::find()
            .filter(condition)
            .order_by_desc(surveys::Column::CreatedAt)
            .order_by_desc(surveys::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .find_also_related(dealers::Entity)
            .all(&self.db)
            .await
            .map_err(repo_err)?;

        Ok((rows.into_iter().map(with_dealer).collect(), total))
    }

    async fn delete(&self, id: i32) -> Result<bool, SurveyError> {
        let result = surveys::Entity::delete_many()
            .filter(surveys::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(result.rows_affected > 0)
    }
}

fn condition_for(filter: &SurveyFilter) -> Condition {
    let mut condition = Condition::all();

    if let Some(search) = &filter.search {
        let pattern = contains_pattern(search);
        condition = condition.add(
            Condition::any()
                .add(
                    Expr::col((surveys::Entity, surveys::Column::CustomerName))
                        .ilike(pattern.as_str()),
                )
                .add(
                    Expr::col((surveys::Entity, surveys::Column::CustomerAddress))
                        .ilike(pattern.as_str()),
                ),
        );
    }
    if let Some(dealer_id) = &filter.dealer_id {
        condition = condition.add(surveys::Column::DealerId.eq(dealer_id.as_str()));
    }
    if let Some(rep_name) = &filter.rep_name {
        condition = condition.add(
            Expr::col((surveys::Entity, surveys::Column::RepName))
                .ilike(contains_pattern(rep_name)),
        );
    }
    if let Some(id) = filter.id {
        condition = condition.add(surveys::Column::Id.eq(id));
    }

    condition
}

fn repo_err(e: DbErr) -> SurveyError {
    SurveyError::repository(e.to_string())
}

fn with_dealer((survey, dealer): (surveys::Model, Option<dealers::Model>)) -> SurveyWithDealer {
    let (dealer_name, dealer_reps) = summary(dealer);
    SurveyWithDealer {
        survey: to_domain(survey),
        dealer_name,
        dealer_reps,
    }
}

pub(crate) fn to_domain(model: surveys::Model) -> Survey {
    Survey {
        id: model.id,
        dealer_id: model.dealer_id,
        rep_name: model.rep_name,
        customer_name: model.customer_name,
        customer_address: model.customer_address,
        response_data: model.response_data,
        photos: model.photos,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
