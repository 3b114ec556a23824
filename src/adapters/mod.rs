//! Concrete collaborators: Urban API, file server, local cache, grid and output encoding.

pub mod cache;
pub mod export;
pub mod fileserver;
pub mod grid;
pub mod loader;
pub mod urban_api;

pub use cache::DocumentCache;
pub use fileserver::FileServerClient;
pub use grid::{GridHexProvider, HexGrid};
pub use loader::{ReferenceLoader, RefreshOutcome};
pub use urban_api::UrbanApiClient;
