//! Result encoding: GeoJSON in EPSG:4326 and flat CSV tables.

use crate::domain::model::{Cluster, HexCell, TerritoryEstimate};
use crate::utils::error::{PriocError, Result};
use crate::utils::projection::to_geographic;
use geojson::{Feature, FeatureCollection, JsonObject};
use serde_json::json;

fn feature(geometry: geojson::Value, id: Option<u64>, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geometry)),
        id: id.map(|id| geojson::feature::Id::Number(id.into())),
        properties: Some(properties),
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

pub fn hexes_to_feature_collection(hexes: &[HexCell]) -> FeatureCollection {
    let features = hexes
        .iter()
        .map(|hex| {
            let mut properties = JsonObject::new();
            let mut indicators: Vec<(&String, &f64)> = hex.indicators.iter().collect();
            indicators.sort_by(|a, b| a.0.cmp(b.0));
            for (indicator, value) in indicators {
                properties.insert(indicator.clone(), json!(value));
            }
            properties.insert("weighted_score".to_string(), json!(hex.weighted_score));
            if let Some(cluster) = hex.cluster {
                properties.insert("cluster".to_string(), json!(cluster));
            }
            let geometry = to_geographic(&hex.geometry);
            feature(geojson::Value::from(&geometry), Some(hex.id), properties)
        })
        .collect();
    collection(features)
}

pub fn clusters_to_feature_collection(clusters: &[Cluster]) -> FeatureCollection {
    let features = clusters
        .iter()
        .map(|cluster| {
            let mut properties = JsonObject::new();
            properties.insert("cluster".to_string(), json!(cluster.label));
            properties.insert("hex_count".to_string(), json!(cluster.members.len()));
            for (indicator, value) in &cluster.mean_indicators {
                properties.insert(indicator.clone(), json!(value));
            }
            properties.insert(
                "weighted_score".to_string(),
                json!(cluster.mean_weighted_score),
            );
            let geometry = to_geographic(&cluster.geometry);
            feature(geojson::Value::from(&geometry), None, properties)
        })
        .collect();
    collection(features)
}

pub fn estimate_to_json(estimate: &TerritoryEstimate) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(estimate)?)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| PriocError::IoError(e.into_error()))
}

pub fn hexes_to_csv(hexes: &[HexCell]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["id", "weighted_score", "cluster"])?;
    for hex in hexes {
        writer.write_record([
            hex.id.to_string(),
            hex.weighted_score.map(|s| s.to_string()).unwrap_or_default(),
            hex.cluster.map(|c| c.to_string()).unwrap_or_default(),
        ])?;
    }
    finish(writer)
}

pub fn clusters_to_csv(clusters: &[Cluster]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["cluster", "hex_count", "weighted_score"])?;
    for cluster in clusters {
        writer.write_record([
            cluster.label.to_string(),
            cluster.members.len().to_string(),
            cluster
                .mean_weighted_score
                .map(|s| s.to_string())
                .unwrap_or_default(),
        ])?;
    }
    finish(writer)
}

pub fn estimate_to_csv(estimate: &TerritoryEstimate) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["object_type", "score"])?;
    for (object_type, score) in estimate {
        writer.write_record([object_type.name().to_string(), score.to_string()])?;
    }
    finish(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ObjectType, POPULATION};
    use crate::utils::projection::wgs84_to_utm;
    use geo::{Coord, LineString, MultiPolygon, Polygon};
    use std::collections::{BTreeMap, HashMap};

    fn utm_square(lon: f64, lat: f64) -> Polygon<f64> {
        let ring: Vec<Coord<f64>> = [(0.0, 0.0), (0.01, 0.0), (0.01, 0.01), (0.0, 0.01), (0.0, 0.0)]
            .iter()
            .map(|(dx, dy)| wgs84_to_utm(Coord { x: lon + dx, y: lat + dy }))
            .collect();
        Polygon::new(LineString::new(ring), vec![])
    }

    #[test]
    fn test_hexes_are_written_in_geographic_coordinates() {
        let mut hex = HexCell::new(
            5,
            utm_square(30.0, 59.0),
            HashMap::from([(POPULATION.to_string(), 3.0)]),
        );
        hex.weighted_score = Some(1.5);

        let collection = hexes_to_feature_collection(&[hex]);
        let feature = &collection.features[0];
        assert_eq!(feature.property("weighted_score"), Some(&json!(1.5)));
        assert_eq!(feature.property(POPULATION), Some(&json!(3.0)));

        match &feature.geometry.as_ref().unwrap().value {
            geojson::Value::Polygon(rings) => {
                assert!((rings[0][0][0] - 30.0).abs() < 1e-7);
                assert!((rings[0][0][1] - 59.0).abs() < 1e-7);
            }
            other => panic!("unexpected geometry {:?}", other),
        }
    }

    #[test]
    fn test_clusters_carry_label_and_means() {
        let cluster = Cluster {
            label: 2,
            members: vec![1, 2],
            geometry: MultiPolygon::new(vec![utm_square(30.0, 59.0)]),
            mean_indicators: BTreeMap::from([(POPULATION.to_string(), 4.0)]),
            mean_weighted_score: Some(2.0),
        };
        let collection = clusters_to_feature_collection(&[cluster.clone()]);
        let feature = &collection.features[0];
        assert_eq!(feature.property("cluster"), Some(&json!(2)));
        assert_eq!(feature.property("hex_count"), Some(&json!(2)));

        let csv = String::from_utf8(clusters_to_csv(&[cluster]).unwrap()).unwrap();
        assert_eq!(csv, "cluster,hex_count,weighted_score\n2,2,2\n");
    }

    #[test]
    fn test_estimate_outputs_use_object_type_names() {
        let estimate = TerritoryEstimate::from([(ObjectType::Port, 1.25)]);
        let json: serde_json::Value =
            serde_json::from_slice(&estimate_to_json(&estimate).unwrap()).unwrap();
        assert_eq!(json, json!({"Порт": 1.25}));

        let csv = String::from_utf8(estimate_to_csv(&estimate).unwrap()).unwrap();
        assert_eq!(csv, "object_type,score\nПорт,1.25\n");
    }
}
