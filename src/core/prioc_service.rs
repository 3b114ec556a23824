//! Request orchestration: scored hexes, clustered hexes and territory estimates.

use crate::core::hdbscan::HdbscanParams;
use crate::core::hex_cleaner::{
    clean_by_min_object_val, clean_estimation_dict_by_territory, negative_clean, positive_clean,
};
use crate::core::hex_estimator::{clarify_clusters, cluster_hexes, weight_hexes};
use crate::core::reference::ReferenceConfig;
use crate::core::snapshot::Snapshot;
use crate::core::spatial;
use crate::core::territory_estimator::estimate_territory;
use crate::domain::model::{
    Cluster, HexCell, HexQuery, ObjectType, ServiceFeature, ServiceFetchMode, TerritoryEstimate,
    TerritoryRequest,
};
use crate::domain::ports::{HexProvider, ServiceProvider};
use crate::utils::error::{PriocError, Result};
use crate::utils::projection::to_planar;
use crate::utils::validation::validate_territory_polygon;
use futures_util::future::try_join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Positive and negative service layers of one object type; `None` when the
/// object type configures no service types for that side.
type ServiceLayers = (Option<Vec<ServiceFeature>>, Option<Vec<ServiceFeature>>);

/// Raises the flag when the awaiting future goes away.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

pub struct PriocService {
    hexes: Arc<dyn HexProvider>,
    services: Arc<dyn ServiceProvider>,
    reference: Arc<Snapshot<ReferenceConfig>>,
    clustering: HdbscanParams,
}

impl PriocService {
    pub fn new(
        hexes: Arc<dyn HexProvider>,
        services: Arc<dyn ServiceProvider>,
        reference: Arc<Snapshot<ReferenceConfig>>,
        clustering: HdbscanParams,
    ) -> Self {
        Self {
            hexes,
            services,
            reference,
            clustering,
        }
    }

    pub fn reference(&self) -> Arc<ReferenceConfig> {
        self.reference.current()
    }

    async fn service_layers(
        &self,
        territory_id: i64,
        object_type: ObjectType,
        reference: &ReferenceConfig,
    ) -> Result<ServiceLayers> {
        let positive_ids = reference.positive_service_types(object_type);
        let negative_ids = reference.negative_service_types(object_type);

        let positive = async {
            if positive_ids.is_empty() {
                return Ok(None);
            }
            self.services
                .services_by_territory(territory_id, positive_ids, ServiceFetchMode::Footprints)
                .await
                .map(Some)
        };
        let negative = async {
            if negative_ids.is_empty() {
                return Ok(None);
            }
            self.services
                .services_by_territory(territory_id, negative_ids, ServiceFetchMode::CentersOnly)
                .await
                .map(Some)
        };

        tokio::try_join!(positive, negative)
    }

    /// Cleaned and scored hexes for one object type.
    pub async fn hexes_for_object(&self, query: &HexQuery) -> Result<Vec<HexCell>> {
        let reference = self.reference.current();
        tracing::info!(
            "Estimating hexes for {} in territory {}",
            query.object_type,
            query.territory_id
        );

        let (hexes, (positive, negative)) = tokio::try_join!(
            self.hexes.hexes_by_territory(query.territory_id),
            self.service_layers(query.territory_id, query.object_type, &reference)
        )?;
        let total = hexes.len();

        // Negative cleaning starts over from the full grid and replaces the
        // positive result when both layers are configured.
        let cleaned = match (positive, negative) {
            (positive, Some(negative)) => {
                if positive.is_some() {
                    tracing::debug!("Negative cleaning overrides the positive cleaning result");
                }
                negative_clean(hexes, &negative)
            }
            (Some(positive), None) => positive_clean(hexes, &positive),
            (None, None) => hexes,
        };

        let cleaned = clean_by_min_object_val(cleaned, query.object_type, &reference);
        let scored = weight_hexes(cleaned, query.object_type, &reference);

        tracing::info!("{} of {} hexes left after cleaning", scored.len(), total);
        Ok(scored)
    }

    /// Contiguous clusters of well scored hexes for one object type.
    pub async fn hex_clusters_for_object(&self, query: &HexQuery) -> Result<Vec<Cluster>> {
        let hexes = self.hexes_for_object(query).await?;

        let cancel = Arc::new(AtomicBool::new(false));
        let _guard = CancelOnDrop(Arc::clone(&cancel));
        let params = self.clustering;

        let clustered = tokio::task::spawn_blocking(move || cluster_hexes(hexes, params, &cancel))
            .await
            .map_err(|e| PriocError::WorkerError {
                message: format!("Clustering task failed: {}", e),
            })??;

        let clusters = clarify_clusters(&clustered);
        tracing::info!("{} clusters for {}", clusters.len(), query.object_type);
        Ok(clusters)
    }

    /// Suitability of a drawn territory for every object type, minus the
    /// object types whose services already sit inside it.
    pub async fn territory_estimation(
        &self,
        request: &TerritoryRequest,
    ) -> Result<TerritoryEstimate> {
        let territory = to_planar(&validate_territory_polygon(&request.territory)?);
        let reference = self.reference.current();

        let hexes = self.hexes.hexes_by_territory(request.territory_id).await?;
        let clipped: Vec<HexCell> = hexes
            .into_iter()
            .filter(|hex| spatial::clip(&hex.geometry, &territory).is_some())
            .collect();
        tracing::info!("{} hexes intersect the territory", clipped.len());

        let mut estimate = estimate_territory(&clipped, &reference);

        let object_types: Vec<ObjectType> = estimate.keys().copied().collect();
        let checks = object_types.into_iter().map(|object_type| {
            let reference = &reference;
            let territory = &territory;
            async move {
                let (positive, negative) = self
                    .service_layers(request.territory_id, object_type, reference)
                    .await?;
                let served = clean_estimation_dict_by_territory(
                    territory,
                    positive.as_deref(),
                    negative.as_deref(),
                );
                Ok::<_, PriocError>((object_type, served))
            }
        });

        for (object_type, served) in try_join_all(checks).await? {
            if served {
                tracing::debug!("{} already served inside the territory, dropped", object_type);
                estimate.remove(&object_type);
            }
        }

        Ok(estimate)
    }
}
