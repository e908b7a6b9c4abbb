//! Dealers: branding, representatives and their survey history.

mod error;
mod service;
mod types;

pub use error::DealerError;
pub use service::{DealerRepository, DealerService};
pub use types::{
    CreateDealerInput, Dealer, DealerChanges, DealerFilter, DealerWithSurveys, NewDealer,
    UpdateDealerInput, normalize_reps,
};
