use crate::domain::model::{HexCell, ServiceFeature, ServiceFetchMode};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Hex grid with indicator attributes for a territory.
#[async_trait]
pub trait HexProvider: Send + Sync {
    async fn hexes_by_territory(&self, territory_id: i64) -> Result<Vec<HexCell>>;
}

/// Existing services of the given types inside a territory.
#[async_trait]
pub trait ServiceProvider: Send + Sync {
    async fn services_by_territory(
        &self,
        territory_id: i64,
        service_type_ids: &[i64],
        mode: ServiceFetchMode,
    ) -> Result<Vec<ServiceFeature>>;
}

/// Remote store holding versioned reference documents.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn last_modified(&self, name: &str) -> Result<DateTime<Utc>>;
    async fn fetch(&self, name: &str) -> Result<Vec<u8>>;
}
