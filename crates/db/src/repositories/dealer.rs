//! Dealer repository for database operations.
//!
//! Implements dealer CRUD and search using SeaORM.

use chrono::Utc;
use sea_orm::sea_query::extension::postgres::{PgExpr, PgFunc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, SqlErr,
};
use uuid::Uuid;

use super::contains_pattern;
use super::survey::to_domain as survey_to_domain;
use crate::entities::{dealers, surveys};
use sitesurvey_core::dealer::{
    Dealer, DealerChanges, DealerError, DealerFilter, DealerRepository as DealerRepoTrait,
    NewDealer,
};
use sitesurvey_core::survey::Survey;
use sitesurvey_shared::types::PageRequest;

/// Dealer repository implementation.
#[derive(Debug, Clone)]
pub struct DealerRepository {
    db: DatabaseConnection,
}

impl DealerRepository {
    /// Create a new dealer repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl DealerRepoTrait for DealerRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Dealer>, DealerError> {
        let model = dealers::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(model.map(to_domain))
    }

    async fn find_by_dealer_id(&self, dealer_id: &str) -> Result<Option<Dealer>, DealerError> {
        let model = dealers::Entity::find()
            .filter(dealers::Column::DealerId.eq(dealer_id))
            .one(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(model.map(to_domain))
    }

    async fn insert(&self, dealer: NewDealer) -> Result<Dealer, DealerError> {
        let now = Utc::now();
        let active_model = dealers::ActiveModel {
            id: Set(Uuid::new_v4()),
            dealer_id: Set(dealer.dealer_id.clone()),
            name: Set(dealer.name),
            logo: Set(dealer.logo),
            reps: Set(dealer.reps),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let model = active_model.insert(&self.db).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                DealerError::DuplicateDealerId(dealer.dealer_id.clone())
            } else {
                repo_err(e)
            }
        })?;

        Ok(to_domain(model))
    }

    async fn update(&self, id: Uuid, changes: DealerChanges) -> Result<Dealer, DealerError> {
        let model = dealers::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(repo_err)?
            .ok_or_else(|| DealerError::NotFound(id.to_string()))?;

        let mut active_model = model.into_active_model();
        if let Some(name) = changes.name {
            active_model.name = Set(name);
        }
        if let Some(reps) = changes.reps {
            active_model.reps = Set(reps);
        }
        if let Some(logo) = changes.logo {
            active_model.logo = Set(logo);
        }
        active_model.updated_at = Set(Utc::now().into());

        let model = active_model.update(&self.db).await.map_err(|e| match e {
            DbErr::RecordNotUpdated => DealerError::NotFound(id.to_string()),
            other => repo_err(other),
        })?;

        Ok(to_domain(model))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DealerError> {
        let result = dealers::Entity::delete_many()
            .filter(dealers::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(result.rows_affected > 0)
    }

    async fn search(
        &self,
        filter: &DealerFilter,
        page: &PageRequest,
    ) -> Result<(Vec<Dealer>, u64), DealerError> {
        let query = filtered(filter);

        let total = query.clone().count(&self.db).await.map_err(repo_err)?;

        let models = query
            .order_by_desc(dealers::Column::CreatedAt)
            .order_by_desc(dealers::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(repo_err)?;

        Ok((models.into_iter().map(to_domain).collect(), total))
    }

    async fn dealer_id_for_survey(&self, survey_id: i32) -> Result<Option<String>, DealerError> {
        let model = surveys::Entity::find_by_id(survey_id)
            .one(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(model.map(|m| m.dealer_id))
    }

    async fn surveys_for(
        &self,
        dealer_id: &str,
        customer_name: Option<&str>,
    ) -> Result<Vec<Survey>, DealerError> {
        let mut query = surveys::Entity::find().filter(surveys::Column::DealerId.eq(dealer_id));
        if let Some(customer_name) = customer_name {
            query = query.filter(surveys::Column::CustomerName.eq(customer_name));
        }

        let models = query
            .order_by_desc(surveys::Column::CreatedAt)
            .order_by_desc(surveys::Column::Id)
            .all(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(models.into_iter().map(survey_to_domain).collect())
    }
}

/// Name is matched case-insensitively anywhere; a rep must be an exact
/// element of `reps`.
fn filtered(filter: &DealerFilter) -> Select<dealers::Entity> {
    let mut query = dealers::Entity::find();

    if let Some(search) = &filter.search {
        query = query.filter(Expr::col(dealers::Column::Name).ilike(contains_pattern(search)));
    }
    if let Some(rep) = &filter.rep_name {
        query = query.filter(
            Expr::val(rep.as_str()).eq(PgFunc::any(Expr::col(dealers::Column::Reps))),
        );
    }

    query
}

fn repo_err(e: DbErr) -> DealerError {
    DealerError::repository(e.to_string())
}

fn to_domain(model: dealers::Model) -> Dealer {
    Dealer {
        id: model.id,
        dealer_id: model.dealer_id,
        name: model.name,
        logo: model.logo,
        reps: model.reps,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

/// Dealer columns exposed next to a survey.
pub(crate) fn summary(model: Option<dealers::Model>) -> (Option<String>, Option<Vec<String>>) {
    match model {
        Some(m) => (Some(m.name), Some(m.reps)),
        None => (None, None),
    }
}
