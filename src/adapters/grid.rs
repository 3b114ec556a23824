use crate::core::snapshot::Snapshot;
use crate::domain::model::{HexCell, HEX_INDICATORS};
use crate::domain::ports::HexProvider;
use crate::utils::error::{PriocError, Result};
use crate::utils::projection::to_planar;
use async_trait::async_trait;
use geo::Polygon;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Hexagonal grid with indicator values, geometry in UTM 36N.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HexGrid {
    hexes: Vec<HexCell>,
}

impl HexGrid {
    /// Reads a GeoJSON FeatureCollection of hex polygons in EPSG:4326.
    ///
    /// Hex ids come from the feature id, then an `id` property. Feature
    /// positions are used only when no feature carries an id at all; a grid
    /// mixing both, or repeating an id, is rejected. Only the known indicator
    /// properties are kept.
    pub fn from_geojson(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes).map_err(|e| PriocError::InvalidGeometry {
            reason: format!("hex grid is not UTF-8: {}", e),
        })?;
        let collection: geojson::FeatureCollection = text.parse()?;
        let ids = hex_ids(&collection.features)?;

        let mut hexes = Vec::with_capacity(collection.features.len());
        for (id, feature) in ids.into_iter().zip(collection.features) {
            let indicators: HashMap<String, f64> = HEX_INDICATORS
                .iter()
                .filter_map(|name| {
                    feature
                        .property(name)
                        .and_then(|value| value.as_f64())
                        .map(|value| (name.to_string(), value))
                })
                .collect();

            let geometry = feature.geometry.ok_or_else(|| PriocError::InvalidGeometry {
                reason: format!("hex {} has no geometry", id),
            })?;
            let polygon = hex_polygon(id, geo::Geometry::<f64>::try_from(geometry)?)?;

            hexes.push(HexCell::new(id, to_planar(&polygon), indicators));
        }

        tracing::info!("Hex grid loaded: {} hexes", hexes.len());
        Ok(Self { hexes })
    }

    pub fn hexes(&self) -> &[HexCell] {
        &self.hexes
    }

    pub fn len(&self) -> usize {
        self.hexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hexes.is_empty()
    }
}

fn feature_id(feature: &geojson::Feature) -> Option<u64> {
    match &feature.id {
        Some(geojson::feature::Id::Number(number)) => number.as_u64(),
        _ => None,
    }
    .or_else(|| feature.property("id").and_then(|value| value.as_u64()))
}

fn hex_ids(features: &[geojson::Feature]) -> Result<Vec<u64>> {
    let explicit: Vec<Option<u64>> = features.iter().map(feature_id).collect();
    if explicit.iter().all(Option::is_none) {
        return Ok((0..features.len() as u64).collect());
    }

    let mut seen = HashSet::with_capacity(explicit.len());
    explicit
        .into_iter()
        .enumerate()
        .map(|(index, id)| {
            let id = id.ok_or_else(|| PriocError::InvalidGeometry {
                reason: format!("hex at position {} has no id", index),
            })?;
            if !seen.insert(id) {
                return Err(PriocError::InvalidGeometry {
                    reason: format!("hex id {} is used more than once", id),
                });
            }
            Ok(id)
        })
        .collect()
}

fn hex_polygon(id: u64, geometry: geo::Geometry<f64>) -> Result<Polygon<f64>> {
    match geometry {
        geo::Geometry::Polygon(polygon) => Ok(polygon),
        geo::Geometry::MultiPolygon(mut multi) if multi.0.len() == 1 => Ok(multi.0.remove(0)),
        _ => Err(PriocError::InvalidGeometry {
            reason: format!("hex {} is not a polygon", id),
        }),
    }
}

/// Serves the grid snapshot for the single supported territory.
pub struct GridHexProvider {
    grid: Arc<Snapshot<HexGrid>>,
    supported_territory_id: i64,
}

impl GridHexProvider {
    pub fn new(grid: Arc<Snapshot<HexGrid>>, supported_territory_id: i64) -> Self {
        Self {
            grid,
            supported_territory_id,
        }
    }
}

#[async_trait]
impl HexProvider for GridHexProvider {
    async fn hexes_by_territory(&self, territory_id: i64) -> Result<Vec<HexCell>> {
        if territory_id != self.supported_territory_id {
            tracing::warn!("Hexes requested for unsupported territory {}", territory_id);
            return Err(PriocError::UnsupportedTerritory { territory_id });
        }
        Ok(self.grid.current().hexes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ECOLOGY, POPULATION};

    const GRID: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": 11,
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[30.0, 59.0], [30.01, 59.0], [30.01, 59.01], [30.0, 59.0]]]
                },
                "properties": {
                    "Показатель: Население": 4,
                    "Показатель: Экология": 2.5,
                    "Прочее": 100
                }
            },
            {
                "type": "Feature",
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [[[[30.02, 59.0], [30.03, 59.0], [30.03, 59.01], [30.02, 59.0]]]]
                },
                "properties": {"id": 12, "Показатель: Население": null}
            }
        ]
    }"#;

    #[test]
    fn test_grid_keeps_known_indicators_and_projects() {
        let grid = HexGrid::from_geojson(GRID.as_bytes()).unwrap();
        assert_eq!(grid.len(), 2);

        let first = &grid.hexes()[0];
        assert_eq!(first.id, 11);
        assert_eq!(first.indicator(POPULATION), Some(4.0));
        assert_eq!(first.indicator(ECOLOGY), Some(2.5));
        assert_eq!(first.indicators.len(), 2);
        assert!(first.geometry.exterior().0[0].x > 300_000.0);

        let second = &grid.hexes()[1];
        assert_eq!(second.id, 12);
        assert!(second.indicators.is_empty());
    }

    #[test]
    fn test_grid_rejects_non_polygons() {
        let points = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [30.0, 59.0]}, "properties": {}}
        ]}"#;
        assert!(matches!(
            HexGrid::from_geojson(points.as_bytes()),
            Err(PriocError::InvalidGeometry { .. })
        ));
    }

    fn square(id: Option<u64>, west: f64) -> String {
        let id = id.map(|id| format!(r#""id": {},"#, id)).unwrap_or_default();
        format!(
            r#"{{"type": "Feature", {} "geometry": {{"type": "Polygon", "coordinates":
                [[[{w}, 59.0], [{e}, 59.0], [{e}, 59.01], [{w}, 59.0]]]}}, "properties": {{}}}}"#,
            id,
            w = west,
            e = west + 0.01
        )
    }

    fn collection(features: &[String]) -> String {
        format!(r#"{{"type": "FeatureCollection", "features": [{}]}}"#, features.join(","))
    }

    #[test]
    fn test_grid_without_ids_numbers_hexes_by_position() {
        let grid = HexGrid::from_geojson(
            collection(&[square(None, 30.0), square(None, 30.01)]).as_bytes(),
        )
        .unwrap();
        let ids: Vec<u64> = grid.hexes().iter().map(|hex| hex.id).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn test_grid_mixing_ids_and_positions_is_rejected() {
        // Position 1 would collide with the explicit id 1.
        let mixed = collection(&[square(Some(1), 30.0), square(None, 30.01)]);
        assert!(matches!(
            HexGrid::from_geojson(mixed.as_bytes()),
            Err(PriocError::InvalidGeometry { .. })
        ));
    }

    #[test]
    fn test_grid_with_repeated_ids_is_rejected() {
        let repeated = collection(&[square(Some(4), 30.0), square(Some(4), 30.01)]);
        assert!(matches!(
            HexGrid::from_geojson(repeated.as_bytes()),
            Err(PriocError::InvalidGeometry { .. })
        ));
    }

    #[test]
    fn test_provider_serves_only_the_supported_territory() {
        let grid = Arc::new(Snapshot::new(HexGrid::from_geojson(GRID.as_bytes()).unwrap()));
        let provider = GridHexProvider::new(grid, 1);

        let hexes = tokio_test::block_on(provider.hexes_by_territory(1)).unwrap();
        assert_eq!(hexes.len(), 2);

        let err = tokio_test::block_on(provider.hexes_by_territory(2)).unwrap_err();
        assert!(matches!(err, PriocError::UnsupportedTerritory { territory_id: 2 }));
    }
}
