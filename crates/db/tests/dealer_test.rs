//! Integration tests for Dealer repository.
//!
//! Each test skips itself when `DATABASE_URL` is not set.

mod common;

use common::{create_test_dealer, setup, unique_dealer_id};
use sitesurvey_core::dealer::{
    DealerChanges, DealerError, DealerFilter, DealerRepository as _, NewDealer,
};
use sitesurvey_core::survey::{CreateSurveyInput, SurveyRepository as _};
use sitesurvey_db::{DealerRepository, SurveyRepository};
use sitesurvey_shared::types::PageRequest;
use uuid::Uuid;

#[tokio::test]
async fn test_dealer_insert_and_find() {
    let Some(db) = setup().await else {
        return;
    };
    let repo = DealerRepository::new(db.clone());
    let dealer_id = unique_dealer_id("acme");

    let dealer = repo
        .insert(NewDealer {
            dealer_id: dealer_id.clone(),
            name: "Acme Solar".to_string(),
            logo: None,
            reps: vec!["Alex".to_string(), "Jordan".to_string()],
        })
        .await
        .expect("Failed to insert dealer");

    assert_eq!(dealer.dealer_id, dealer_id);
    assert!(dealer.logo.is_none());
    assert_eq!(dealer.reps, vec!["Alex", "Jordan"]);

    let by_id = repo.find_by_id(dealer.id).await.expect("query").expect("found");
    assert_eq!(by_id.name, "Acme Solar");

    let by_key = repo
        .find_by_dealer_id(&dealer_id)
        .await
        .expect("query")
        .expect("found");
    assert_eq!(by_key.id, dealer.id);
}

#[tokio::test]
async fn test_duplicate_dealer_id_is_conflict() {
    let Some(db) = setup().await else {
        return;
    };
    let repo = DealerRepository::new(db.clone());
    let dealer_id = unique_dealer_id("dup");
    create_test_dealer(&db, &dealer_id, &["Alex"]).await;

    let err = repo
        .insert(NewDealer {
            dealer_id: dealer_id.clone(),
            name: "Second".to_string(),
            logo: None,
            reps: vec![String::new()],
        })
        .await
        .unwrap_err();

    assert!(matches!(err, DealerError::DuplicateDealerId(id) if id == dealer_id));
}

#[tokio::test]
async fn test_update_changes_only_given_fields() {
    let Some(db) = setup().await else {
        return;
    };
    let repo = DealerRepository::new(db.clone());
    let dealer_id = unique_dealer_id("upd");
    create_test_dealer(&db, &dealer_id, &["Alex"]).await;
    let before = repo
        .find_by_dealer_id(&dealer_id)
        .await
        .expect("query")
        .expect("found");

    let after = repo
        .update(
            before.id,
            DealerChanges {
                logo: Some(Some("https://cdn.example.com/dealers/logo.png".to_string())),
                ..DealerChanges::default()
            },
        )
        .await
        .expect("update");

    assert_eq!(after.name, before.name);
    assert_eq!(after.reps, before.reps);
    assert_eq!(
        after.logo.as_deref(),
        Some("https://cdn.example.com/dealers/logo.png")
    );
    assert!(after.updated_at >= before.updated_at);
}

#[tokio::test]
async fn test_update_missing_dealer_is_not_found() {
    let Some(db) = setup().await else {
        return;
    };
    let repo = DealerRepository::new(db);

    let err = repo
        .update(Uuid::new_v4(), DealerChanges::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DealerError::NotFound(_)));
}

#[tokio::test]
async fn test_search_by_rep_is_exact_membership() {
    let Some(db) = setup().await else {
        return;
    };
    let repo = DealerRepository::new(db.clone());
    let marker = Uuid::new_v4().simple().to_string();
    let exact = format!("Alex-{marker}");
    let longer = format!("Alexander-{marker}");

    let with_rep = unique_dealer_id("rep-a");
    let without_rep = unique_dealer_id("rep-b");
    create_test_dealer(&db, &with_rep, &[exact.as_str(), "Jordan"]).await;
    create_test_dealer(&db, &without_rep, &[longer.as_str()]).await;

    let (rows, total) = repo
        .search(
            &DealerFilter {
                search: None,
                rep_name: Some(exact),
            },
            &PageRequest::default(),
        )
        .await
        .expect("search");

    assert_eq!(total, 1);
    assert_eq!(rows[0].dealer_id, with_rep);
}

#[tokio::test]
async fn test_search_by_name_is_case_insensitive() {
    let Some(db) = setup().await else {
        return;
    };
    let repo = DealerRepository::new(db.clone());
    let dealer_id = unique_dealer_id("CaseName");
    create_test_dealer(&db, &dealer_id, &["Alex"]).await;

    let (rows, total) = repo
        .search(
            &DealerFilter {
                search: Some(dealer_id.to_lowercase()),
                rep_name: None,
            },
            &PageRequest::default(),
        )
        .await
        .expect("search");

    assert_eq!(total, 1);
    assert_eq!(rows[0].dealer_id, dealer_id);
}

#[tokio::test]
async fn test_surveys_for_and_survey_lookup() {
    let Some(db) = setup().await else {
        return;
    };
    let dealers = DealerRepository::new(db.clone());
    let surveys = SurveyRepository::new(db.clone());
    let dealer_id = unique_dealer_id("svy");
    create_test_dealer(&db, &dealer_id, &["Alex"]).await;

    let survey = surveys
        .insert(CreateSurveyInput {
            dealer_id: dealer_id.clone(),
            rep_name: "Alex".to_string(),
            customer_name: "Pat Doe".to_string(),
            customer_address: "1 Main St".to_string(),
            response_data: serde_json::json!({"roof_type": "shingle"}),
        })
        .await
        .expect("insert survey");

    let resolved = dealers
        .dealer_id_for_survey(survey.id)
        .await
        .expect("query");
    assert_eq!(resolved.as_deref(), Some(dealer_id.as_str()));

    let all = dealers.surveys_for(&dealer_id, None).await.expect("query");
    assert_eq!(all.len(), 1);

    let none = dealers
        .surveys_for(&dealer_id, Some("Somebody Else"))
        .await
        .expect("query");
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_delete_reports_existence() {
    let Some(db) = setup().await else {
        return;
    };
    let repo = DealerRepository::new(db.clone());
    let dealer_id = unique_dealer_id("del");
    create_test_dealer(&db, &dealer_id, &["Alex"]).await;
    let dealer = repo
        .find_by_dealer_id(&dealer_id)
        .await
        .expect("query")
        .expect("found");

    assert!(repo.delete(dealer.id).await.expect("delete"));
    assert!(!repo.delete(dealer.id).await.expect("delete again"));
    assert!(repo.find_by_id(dealer.id).await.expect("query").is_none());
}
