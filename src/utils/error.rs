use thiserror::Error;

#[derive(Error, Debug)]
pub enum PriocError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJsonError(#[from] geojson::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Territory {territory_id} is not supported for now")]
    UnsupportedTerritory { territory_id: i64 },

    #[error("{message} (upstream status {status}): {body}")]
    Upstream {
        status: u16,
        message: String,
        body: String,
    },

    #[error("Invalid geometry: {reason}")]
    InvalidGeometry { reason: String },

    #[error("Several cached instances of '{name}' ({count}), manual conflict resolution required")]
    CacheConflict { name: String, count: usize },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Worker failed: {message}")]
    WorkerError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller sent something we will never accept; retrying is pointless.
    Client,
    Upstream,
    Configuration,
    Internal,
}

impl PriocError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PriocError::UnsupportedTerritory { .. } | PriocError::InvalidGeometry { .. } => {
                ErrorCategory::Client
            }
            PriocError::HttpError(_) | PriocError::Upstream { .. } => ErrorCategory::Upstream,
            PriocError::ConfigError { .. }
            | PriocError::InvalidConfigValueError { .. }
            | PriocError::ConfigValidationError { .. }
            | PriocError::CacheConflict { .. } => ErrorCategory::Configuration,
            _ => ErrorCategory::Internal,
        }
    }

    /// HTTP-style status an outer transport should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            PriocError::UnsupportedTerritory { .. } | PriocError::InvalidGeometry { .. } => 400,
            PriocError::Upstream { status, .. } => *status,
            PriocError::HttpError(e) => e.status().map(|s| s.as_u16()).unwrap_or(502),
            PriocError::Cancelled => 499,
            _ => 500,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            PriocError::UnsupportedTerritory { territory_id } => format!(
                "Calculations are not implemented for territory {} yet",
                territory_id
            ),
            PriocError::InvalidGeometry { reason } => {
                format!("The territory polygon was rejected: {}", reason)
            }
            PriocError::Upstream { message, status, .. } => {
                format!("{} (remote service answered {})", message, status)
            }
            PriocError::HttpError(_) => "A remote service could not be reached".to_string(),
            PriocError::CacheConflict { name, .. } => format!(
                "The local cache holds several copies of '{}'; remove the stale ones",
                name
            ),
            other if other.category() == ErrorCategory::Configuration => {
                format!("Configuration problem: {}", other)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PriocError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_territory_is_client_error() {
        let err = PriocError::UnsupportedTerritory { territory_id: 7 };
        assert_eq!(err.category(), ErrorCategory::Client);
        assert_eq!(err.status_code(), 400);
        assert!(err.user_friendly_message().contains("territory 7"));
    }

    #[test]
    fn test_upstream_keeps_status_and_body() {
        let err = PriocError::Upstream {
            status: 503,
            message: "Couldn't retrieve services".to_string(),
            body: "{\"detail\":\"down\"}".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Upstream);
        assert_eq!(err.status_code(), 503);
        assert!(err.to_string().contains("down"));
    }
}
