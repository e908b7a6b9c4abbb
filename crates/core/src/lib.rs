//! Core business logic for SiteSurvey.
//!
//! This crate contains the upload pipeline and entity services with ZERO web
//! or database dependencies. Persistence is reached through repository
//! traits implemented by the db crate.
//!
//! # Modules
//!
//! - `retry` - Bounded retry with exponential backoff
//! - `compression` - Image resize and re-encode
//! - `storage` - Remote object storage (bucket or Drive)
//! - `upload` - Upload orchestration: validate, compress, store
//! - `dealer` - Dealer management and logo handling
//! - `survey` - Survey submissions and photos

pub mod compression;
pub mod dealer;
pub mod retry;
pub mod storage;
pub mod survey;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_support;
