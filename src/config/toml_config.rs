use crate::core::hdbscan::HdbscanParams;
use crate::core::reference::ReferenceDocuments;
use crate::utils::error::{PriocError, Result};
use crate::utils::validation::{
    validate_file_extensions, validate_non_empty_string, validate_path, validate_positive_number,
    validate_range, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECONDS: u64 = 360;
const VALID_FORMATS: [&str; 2] = ["geojson", "csv"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub urban_api: UrbanApiConfig,
    pub fileserver: FileServerConfig,
    pub cache: CacheConfig,
    pub clustering: Option<HdbscanParams>,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub supported_territory_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrbanApiConfig {
    pub base_url: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileServerConfig {
    pub base_url: String,
    pub bucket: String,
    pub timeout_seconds: Option<u64>,
    pub hexes: String,
    pub indicators_weights: String,
    pub object_indicators_min_val: String,
    pub positive_service_cleaning: String,
    pub negative_service_cleaning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,
    pub formats: Vec<String>,
}

impl AppConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| PriocError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| PriocError::ConfigError {
            message: format!("Bad substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_range(
            "service.supported_territory_id",
            self.supported_territory_id(),
            1,
            i64::MAX,
        )?;

        validate_url("urban_api.base_url", &self.urban_api.base_url)?;
        for (field, timeout) in [
            ("urban_api.timeout_seconds", self.urban_api.timeout_seconds),
            ("fileserver.timeout_seconds", self.fileserver.timeout_seconds),
        ] {
            if let Some(seconds) = timeout {
                validate_positive_number(field, seconds as usize, 1)?;
            }
        }
        validate_url("fileserver.base_url", &self.fileserver.base_url)?;
        validate_non_empty_string("fileserver.bucket", &self.fileserver.bucket)?;

        let documents: Vec<String> = self
            .reference_documents()
            .names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        validate_file_extensions("fileserver", &documents, &["json"])?;
        validate_file_extensions(
            "fileserver.hexes",
            std::slice::from_ref(&self.fileserver.hexes),
            &["geojson", "json"],
        )?;

        validate_path("cache.path", &self.cache.path)?;
        validate_path("output.path", &self.output.path)?;

        for format in &self.output.formats {
            if !VALID_FORMATS.contains(&format.as_str()) {
                return Err(PriocError::InvalidConfigValueError {
                    field: "output.formats".to_string(),
                    value: format.clone(),
                    reason: format!(
                        "Unsupported format. Valid formats: {}",
                        VALID_FORMATS.join(", ")
                    ),
                });
            }
        }

        self.clustering().validate()
    }

    pub fn supported_territory_id(&self) -> i64 {
        self.service.supported_territory_id.unwrap_or(1)
    }

    pub fn urban_api_timeout(&self) -> Duration {
        Duration::from_secs(self.urban_api.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }

    pub fn fileserver_timeout(&self) -> Duration {
        Duration::from_secs(self.fileserver.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }

    pub fn reference_documents(&self) -> ReferenceDocuments {
        ReferenceDocuments {
            indicators_weights: self.fileserver.indicators_weights.clone(),
            object_indicators_min_val: self.fileserver.object_indicators_min_val.clone(),
            positive_service_cleaning: self.fileserver.positive_service_cleaning.clone(),
            negative_service_cleaning: self.fileserver.negative_service_cleaning.clone(),
        }
    }

    pub fn clustering(&self) -> HdbscanParams {
        self.clustering.unwrap_or_default()
    }

    pub fn writes_geojson(&self) -> bool {
        self.output.formats.iter().any(|f| f == "geojson")
    }

    pub fn writes_csv(&self) -> bool {
        self.output.formats.iter().any(|f| f == "csv")
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
