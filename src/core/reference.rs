//! Reference configuration: per object type indicator ranks, minimum values
//! and the service types that must be near or away from a candidate site.
//!
//! Built from four JSON documents keyed by object type name:
//!
//! ```json
//! { "Тур база": { "Показатель: Экология": 1, "Показатель: Транспорт": 2 } }
//! { "Тур база": { "Показатель: Экология": 3.5 } }
//! { "Тур база": [21, 22] }
//! { "Тур база": [5] }
//! ```

use crate::core::weighting::rank_weights;
use crate::domain::model::{ObjectType, ObjectTypeProfile};
use crate::utils::error::{PriocError, Result};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};

/// Names of the four reference documents on the file server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceDocuments {
    pub indicators_weights: String,
    pub object_indicators_min_val: String,
    pub positive_service_cleaning: String,
    pub negative_service_cleaning: String,
}

impl ReferenceDocuments {
    pub fn names(&self) -> [&str; 4] {
        [
            self.indicators_weights.as_str(),
            self.object_indicators_min_val.as_str(),
            self.positive_service_cleaning.as_str(),
            self.negative_service_cleaning.as_str(),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceConfig {
    profiles: BTreeMap<ObjectType, ObjectTypeProfile>,
    ranked: BTreeSet<ObjectType>,
}

impl ReferenceConfig {
    pub fn from_documents(
        weights: &[u8],
        min_values: &[u8],
        positive: &[u8],
        negative: &[u8],
    ) -> Result<Self> {
        let weights: BTreeMap<String, BTreeMap<String, i64>> =
            parse_document("indicators_weights", weights)?;
        let min_values: BTreeMap<String, BTreeMap<String, f64>> =
            parse_document("object_indicators_min_val", min_values)?;
        let positive: BTreeMap<String, Option<Vec<i64>>> =
            parse_document("positive_service_cleaning", positive)?;
        let negative: BTreeMap<String, Option<Vec<i64>>> =
            parse_document("negative_service_cleaning", negative)?;

        let mut config = ReferenceConfig::default();

        for (name, ranks) in weights {
            if let Some(object_type) = known_object_type("indicators_weights", &name) {
                config.profile_mut(object_type).ranks = ranks;
                config.ranked.insert(object_type);
            }
        }
        for (name, values) in min_values {
            if let Some(object_type) = known_object_type("object_indicators_min_val", &name) {
                config.profile_mut(object_type).min_values = Some(values);
            }
        }
        for (name, ids) in positive {
            if let Some(object_type) = known_object_type("positive_service_cleaning", &name) {
                config.profile_mut(object_type).positive_service_types = ids.unwrap_or_default();
            }
        }
        for (name, ids) in negative {
            if let Some(object_type) = known_object_type("negative_service_cleaning", &name) {
                config.profile_mut(object_type).negative_service_types = ids.unwrap_or_default();
            }
        }

        tracing::debug!(
            "Reference configuration built: {} profiles, {} ranked",
            config.profiles.len(),
            config.ranked.len()
        );
        Ok(config)
    }

    pub fn from_profiles(profiles: BTreeMap<ObjectType, ObjectTypeProfile>) -> Self {
        let ranked = profiles
            .iter()
            .filter(|(_, profile)| !profile.ranks.is_empty())
            .map(|(object_type, _)| *object_type)
            .collect();
        Self { profiles, ranked }
    }

    fn profile_mut(&mut self, object_type: ObjectType) -> &mut ObjectTypeProfile {
        self.profiles.entry(object_type).or_default()
    }

    pub fn profile(&self, object_type: ObjectType) -> Option<&ObjectTypeProfile> {
        self.profiles.get(&object_type)
    }

    /// Object types that carry an indicator ranking, i.e. can be scored.
    pub fn ranked_object_types(&self) -> impl Iterator<Item = ObjectType> + '_ {
        self.ranked.iter().copied()
    }

    pub fn weights(&self, object_type: ObjectType) -> BTreeMap<String, f64> {
        self.profile(object_type)
            .map(|profile| rank_weights(&profile.ranks))
            .unwrap_or_default()
    }

    pub fn min_values(&self, object_type: ObjectType) -> Option<&BTreeMap<String, f64>> {
        self.profile(object_type)
            .and_then(|profile| profile.min_values.as_ref())
    }

    pub fn positive_service_types(&self, object_type: ObjectType) -> &[i64] {
        self.profile(object_type)
            .map(|profile| profile.positive_service_types.as_slice())
            .unwrap_or(&[])
    }

    pub fn negative_service_types(&self, object_type: ObjectType) -> &[i64] {
        self.profile(object_type)
            .map(|profile| profile.negative_service_types.as_slice())
            .unwrap_or(&[])
    }
}

fn parse_document<T: DeserializeOwned>(document: &str, bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| PriocError::ConfigValidationError {
        field: document.to_string(),
        message: format!("Reference document is malformed: {}", e),
    })
}

fn known_object_type(document: &str, name: &str) -> Option<ObjectType> {
    match name.parse() {
        Ok(object_type) => Some(object_type),
        Err(_) => {
            tracing::warn!("Skipping unknown object type '{}' in {}", name, document);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const WEIGHTS: &str = r#"{
        "Тур база": {"Показатель: Экология": 1, "Показатель: Транспорт": 2},
        "Порт": {"Показатель: Транспорт": 1},
        "Космодром": {"Показатель: Транспорт": 1}
    }"#;
    const MIN_VALUES: &str = r#"{"Тур база": {"Показатель: Экология": 3.5}}"#;
    const POSITIVE: &str = r#"{"Тур база": [21, 22], "Порт": null}"#;
    const NEGATIVE: &str = r#"{"Тур база": [5]}"#;

    fn config() -> ReferenceConfig {
        ReferenceConfig::from_documents(
            WEIGHTS.as_bytes(),
            MIN_VALUES.as_bytes(),
            POSITIVE.as_bytes(),
            NEGATIVE.as_bytes(),
        )
        .unwrap()
    }

    #[test]
    fn test_profiles_are_assembled_from_all_documents() {
        let config = config();
        let tourist = config.profile(ObjectType::TouristBase).unwrap();
        assert_eq!(tourist.ranks.len(), 2);
        assert_eq!(tourist.positive_service_types, vec![21, 22]);
        assert_eq!(tourist.negative_service_types, vec![5]);
        assert_eq!(
            config.min_values(ObjectType::TouristBase).unwrap()["Показатель: Экология"],
            3.5
        );

        let ranked: Vec<ObjectType> = config.ranked_object_types().collect();
        assert_eq!(ranked, vec![ObjectType::Port, ObjectType::TouristBase]);
    }

    #[test]
    fn test_missing_entries_mean_no_constraint() {
        let config = config();
        assert!(config.positive_service_types(ObjectType::Port).is_empty());
        assert!(config.negative_service_types(ObjectType::Port).is_empty());
        assert!(config.min_values(ObjectType::Port).is_none());
        assert!(config.profile(ObjectType::MedicalComplex).is_none());
        assert!(config.weights(ObjectType::MedicalComplex).is_empty());
    }

    #[test]
    fn test_weights_come_from_ranks() {
        let weights = config().weights(ObjectType::TouristBase);
        assert_abs_diff_eq!(weights["Показатель: Экология"], 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(weights["Показатель: Транспорт"], 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_malformed_document_is_a_config_error() {
        let err = ReferenceConfig::from_documents(
            b"[1, 2]",
            MIN_VALUES.as_bytes(),
            POSITIVE.as_bytes(),
            NEGATIVE.as_bytes(),
        )
        .unwrap_err();
        assert!(matches!(err, PriocError::ConfigValidationError { .. }));
    }
}
