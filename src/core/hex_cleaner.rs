//! Drops hexes that cannot host an object: no required service nearby, a
//! forbidden service inside or next door, or indicators under the minimum.

use crate::core::reference::ReferenceConfig;
use crate::core::spatial;
use crate::domain::model::{HexCell, ObjectType, ServiceFeature};
use geo::Polygon;
use std::collections::HashSet;

/// Keeps hexes containing or intersecting at least one positive service.
pub fn positive_clean(hexes: Vec<HexCell>, positive_services: &[ServiceFeature]) -> Vec<HexCell> {
    if positive_services.is_empty() {
        return hexes;
    }

    let before = hexes.len();
    let kept: Vec<HexCell> = hexes
        .into_iter()
        .filter(|hex| {
            positive_services
                .iter()
                .any(|service| spatial::intersects(&hex.geometry, &service.geometry))
        })
        .collect();

    tracing::debug!("Positive cleaning kept {} of {} hexes", kept.len(), before);
    kept
}

/// Removes hexes hit by a negative service together with their touching neighbours.
pub fn negative_clean(hexes: Vec<HexCell>, negative_services: &[ServiceFeature]) -> Vec<HexCell> {
    if negative_services.is_empty() {
        return hexes;
    }

    let hit: Vec<&HexCell> = hexes
        .iter()
        .filter(|hex| {
            negative_services
                .iter()
                .any(|service| spatial::intersects(&hex.geometry, &service.geometry))
        })
        .collect();

    let mut dropped: HashSet<u64> = hit.iter().map(|hex| hex.id).collect();
    for service_hex in &hit {
        for candidate in &hexes {
            if !dropped.contains(&candidate.id)
                && spatial::touches(&service_hex.geometry, &candidate.geometry)
            {
                dropped.insert(candidate.id);
            }
        }
    }

    tracing::debug!(
        "Negative cleaning: {} hexes hit, {} dropped with neighbours",
        hit.len(),
        dropped.len()
    );

    hexes
        .into_iter()
        .filter(|hex| !dropped.contains(&hex.id))
        .collect()
}

/// Drops hexes where any thresholded indicator is under its minimum or missing.
pub fn clean_by_min_object_val(
    hexes: Vec<HexCell>,
    object_type: ObjectType,
    reference: &ReferenceConfig,
) -> Vec<HexCell> {
    let Some(min_values) = reference.min_values(object_type) else {
        tracing::debug!("No minimum values for {}, skipping", object_type);
        return hexes;
    };

    hexes
        .into_iter()
        .filter(|hex| {
            min_values.iter().all(|(indicator, minimum)| {
                hex.indicator(indicator)
                    .map(|value| value >= *minimum)
                    .unwrap_or(false)
            })
        })
        .collect()
}

/// Whether an object type's territory estimate must be dropped.
///
/// Any intersection with a positive OR a negative service triggers the drop;
/// a layer that was not fetched never does.
pub fn clean_estimation_dict_by_territory(
    territory: &Polygon<f64>,
    positive_services: Option<&[ServiceFeature]>,
    negative_services: Option<&[ServiceFeature]>,
) -> bool {
    let hits_any = |services: Option<&[ServiceFeature]>| {
        services
            .unwrap_or(&[])
            .iter()
            .any(|service| spatial::intersects(territory, &service.geometry))
    };

    hits_any(positive_services) || hits_any(negative_services)
}
