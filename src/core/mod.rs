pub mod hdbscan;
pub mod hex_cleaner;
pub mod hex_estimator;
pub mod prioc_service;
pub mod reference;
pub mod snapshot;
pub mod spatial;
pub mod territory_estimator;
pub mod weighting;

pub use crate::domain::ports::{DocumentSource, HexProvider, ServiceProvider, Storage};
pub use crate::utils::error::Result;
pub use prioc_service::PriocService;
