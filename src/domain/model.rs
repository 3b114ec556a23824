use geo::{Geometry, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::utils::error::PriocError;

pub const POPULATION: &str = "Показатель: Население";
pub const TRANSPORT: &str = "Показатель: Транспорт";
pub const ECOLOGY: &str = "Показатель: Экология";
pub const SOCIAL_PROVISION: &str = "Показатель: Социальная обеспеченность";
pub const ENGINEERING_INFRASTRUCTURE: &str = "Показатель: Инженерная инфраструктура";

/// Indicator attributes kept from the hex grid; everything else is dropped on load.
pub const HEX_INDICATORS: [&str; 5] = [
    POPULATION,
    TRANSPORT,
    ECOLOGY,
    SOCIAL_PROVISION,
    ENGINEERING_INFRASTRUCTURE,
];

/// Label the clusterer gives to points that belong to no cluster.
pub const NOISE_LABEL: i32 = -1;

/// One cell of the hexagonal grid, geometry in UTM 36N metres.
#[derive(Debug, Clone, PartialEq)]
pub struct HexCell {
    pub id: u64,
    pub geometry: Polygon<f64>,
    pub indicators: HashMap<String, f64>,
    pub weighted_score: Option<f64>,
    pub cluster: Option<i32>,
}

impl HexCell {
    pub fn new(id: u64, geometry: Polygon<f64>, indicators: HashMap<String, f64>) -> Self {
        Self {
            id,
            geometry,
            indicators,
            weighted_score: None,
            cluster: None,
        }
    }

    pub fn indicator(&self, name: &str) -> Option<f64> {
        self.indicators.get(name).copied()
    }
}

/// Existing service taken from the Urban API, geometry in UTM 36N metres.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceFeature {
    pub id: Option<i64>,
    pub service_type_id: i64,
    pub geometry: Geometry<f64>,
}

/// Which footprint the service layer provider should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceFetchMode {
    /// Full footprints, used for services that must be present.
    Footprints,
    /// Centroids only, used for services to stay away from.
    CentersOnly,
}

impl ServiceFetchMode {
    pub fn centers_only(self) -> bool {
        matches!(self, ServiceFetchMode::CentersOnly)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectType {
    #[serde(rename = "Медицинский комплекс")]
    MedicalComplex,
    #[serde(rename = "Бизнес-кластер")]
    BusinessCluster,
    #[serde(rename = "Пром объект")]
    IndustrialSite,
    #[serde(rename = "Логистическо-складской комплекс")]
    LogisticsHub,
    #[serde(rename = "Порт")]
    Port,
    #[serde(rename = "Кампус университетский")]
    UniversityCampus,
    #[serde(rename = "Тур база")]
    TouristBase,
}

impl ObjectType {
    pub const ALL: [ObjectType; 7] = [
        ObjectType::MedicalComplex,
        ObjectType::BusinessCluster,
        ObjectType::IndustrialSite,
        ObjectType::LogisticsHub,
        ObjectType::Port,
        ObjectType::UniversityCampus,
        ObjectType::TouristBase,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ObjectType::MedicalComplex => "Медицинский комплекс",
            ObjectType::BusinessCluster => "Бизнес-кластер",
            ObjectType::IndustrialSite => "Пром объект",
            ObjectType::LogisticsHub => "Логистическо-складской комплекс",
            ObjectType::Port => "Порт",
            ObjectType::UniversityCampus => "Кампус университетский",
            ObjectType::TouristBase => "Тур база",
        }
    }

    /// ASCII name for file names.
    pub fn slug(&self) -> &'static str {
        match self {
            ObjectType::MedicalComplex => "medical_complex",
            ObjectType::BusinessCluster => "business_cluster",
            ObjectType::IndustrialSite => "industrial_site",
            ObjectType::LogisticsHub => "logistics_hub",
            ObjectType::Port => "port",
            ObjectType::UniversityCampus => "university_campus",
            ObjectType::TouristBase => "tourist_base",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ObjectType {
    type Err = PriocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectType::ALL
            .iter()
            .copied()
            .find(|object_type| object_type.name() == s.trim())
            .ok_or_else(|| PriocError::InvalidConfigValueError {
                field: "object_type".to_string(),
                value: s.to_string(),
                reason: "Unknown priority object type".to_string(),
            })
    }
}

/// Reference settings of one object type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectTypeProfile {
    pub ranks: BTreeMap<String, i64>,
    /// `None` when the reference documents carry no thresholds for the type.
    pub min_values: Option<BTreeMap<String, f64>>,
    pub positive_service_types: Vec<i64>,
    pub negative_service_types: Vec<i64>,
}

/// Contiguous group of hexes proposed as a siting zone.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub label: i32,
    pub members: Vec<u64>,
    pub geometry: MultiPolygon<f64>,
    pub mean_indicators: BTreeMap<String, f64>,
    pub mean_weighted_score: Option<f64>,
}

/// Object type name to suitability score.
pub type TerritoryEstimate = BTreeMap<ObjectType, f64>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexQuery {
    pub territory_id: i64,
    pub object_type: ObjectType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerritoryRequest {
    pub territory_id: i64,
    /// GeoJSON polygon in EPSG:4326.
    pub territory: geojson::Geometry,
}
