//! Site survey submissions and their photos.

mod error;
mod service;
mod types;

pub use error::SurveyError;
pub use service::{SurveyRepository, SurveyService, merge_photo_urls, question_id};
pub use types::{CreateSurveyInput, Survey, SurveyFilter, SurveyWithDealer};
