use crate::domain::model::{ServiceFeature, ServiceFetchMode};
use crate::domain::ports::ServiceProvider;
use crate::utils::error::{PriocError, Result};
use crate::utils::projection::to_planar;
use async_trait::async_trait;
use futures_util::future::try_join_all;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Service layers from the Urban API, one request per service type.
#[derive(Debug, Clone)]
pub struct UrbanApiClient {
    client: Client,
    base_url: String,
}

impl UrbanApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn services_url(&self, territory_id: i64) -> String {
        format!(
            "{}/api/v1/territory/{}/services_geojson",
            self.base_url, territory_id
        )
    }

    async fn services_of_type(
        &self,
        territory_id: i64,
        service_type_id: i64,
        mode: ServiceFetchMode,
    ) -> Result<Vec<ServiceFeature>> {
        let url = self.services_url(territory_id);
        tracing::debug!(
            "Requesting services of type {} from {} (centers_only={})",
            service_type_id,
            url,
            mode.centers_only()
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("service_type_id", service_type_id.to_string()),
                ("cities_only", "false".to_string()),
                ("centers_only", mode.centers_only().to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK && status != StatusCode::CREATED {
            return Err(PriocError::Upstream {
                status: status.as_u16(),
                message: format!("Couldn't retrieve services of type {}", service_type_id),
                body,
            });
        }

        parse_services(&body, service_type_id)
    }
}

/// Parses a services FeatureCollection (EPSG:4326) into planar features.
pub fn parse_services(body: &str, service_type_id: i64) -> Result<Vec<ServiceFeature>> {
    let collection: geojson::FeatureCollection = body.parse()?;
    let mut services = Vec::with_capacity(collection.features.len());

    for feature in collection.features {
        let id = feature
            .property("service_id")
            .and_then(|value| value.as_i64())
            .or_else(|| match &feature.id {
                Some(geojson::feature::Id::Number(number)) => number.as_i64(),
                _ => None,
            });
        let Some(geometry) = feature.geometry else {
            tracing::warn!("Service {:?} of type {} has no geometry, skipped", id, service_type_id);
            continue;
        };
        let geometry = geo::Geometry::<f64>::try_from(geometry)?;
        services.push(ServiceFeature {
            id,
            service_type_id,
            geometry: to_planar(&geometry),
        });
    }

    Ok(services)
}

#[async_trait]
impl ServiceProvider for UrbanApiClient {
    async fn services_by_territory(
        &self,
        territory_id: i64,
        service_type_ids: &[i64],
        mode: ServiceFetchMode,
    ) -> Result<Vec<ServiceFeature>> {
        let layers = try_join_all(
            service_type_ids
                .iter()
                .map(|id| self.services_of_type(territory_id, *id, mode)),
        )
        .await?;

        let services: Vec<ServiceFeature> = layers.into_iter().flatten().collect();
        tracing::debug!(
            "{} services of {} types in territory {}",
            services.len(),
            service_type_ids.len(),
            territory_id
        );
        Ok(services)
    }
}
