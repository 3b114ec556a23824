use crate::utils::error::{PriocError, Result};
use geo::{Coord, LineString, Polygon};
use std::collections::HashSet;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(PriocError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => {
            match url.scheme() {
                "http" | "https" => Ok(()),
                scheme => Err(PriocError::InvalidConfigValueError {
                    field: field_name.to_string(),
                    value: url_str.to_string(),
                    reason: format!("Unsupported URL scheme: {}", scheme),
                }),
            }
        }
        Err(e) => Err(PriocError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(PriocError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(PriocError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(PriocError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_file_extensions(
    field_name: &str,
    files: &[String],
    allowed_extensions: &[&str],
) -> Result<()> {
    let allowed_set: HashSet<&str> = allowed_extensions.iter().copied().collect();

    for file in files {
        if let Some(extension) = std::path::Path::new(file)
            .extension()
            .and_then(|ext| ext.to_str())
        {
            if !allowed_set.contains(extension) {
                return Err(PriocError::InvalidConfigValueError {
                    field: field_name.to_string(),
                    value: file.clone(),
                    reason: format!(
                        "Unsupported file extension: {}. Allowed extensions: {}",
                        extension,
                        allowed_extensions.join(", ")
                    ),
                });
            }
        } else {
            return Err(PriocError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: file.clone(),
                reason: "File has no extension or invalid filename".to_string(),
            });
        }
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PriocError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(PriocError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// Checks a GeoJSON territory polygon (EPSG:4326) and converts it to `geo`.
///
/// Rings must be closed, hold at least four positions and stay inside
/// longitude/latitude bounds.
pub fn validate_territory_polygon(geometry: &geojson::Geometry) -> Result<Polygon<f64>> {
    let rings = match &geometry.value {
        geojson::Value::Polygon(rings) => rings,
        _ => {
            return Err(PriocError::InvalidGeometry {
                reason: "territory must be a GeoJSON Polygon".to_string(),
            })
        }
    };
    if rings.is_empty() {
        return Err(PriocError::InvalidGeometry {
            reason: "polygon has no rings".to_string(),
        });
    }

    let mut converted = Vec::with_capacity(rings.len());
    for (index, ring) in rings.iter().enumerate() {
        if ring.len() < 4 {
            return Err(PriocError::InvalidGeometry {
                reason: format!("ring {} has {} positions, at least 4 required", index, ring.len()),
            });
        }
        let mut coords = Vec::with_capacity(ring.len());
        for position in ring {
            let (x, y) = match position.as_slice() {
                [x, y, ..] => (*x, *y),
                _ => {
                    return Err(PriocError::InvalidGeometry {
                        reason: format!("ring {} has a position without two coordinates", index),
                    })
                }
            };
            let in_bounds = (-180.0..=180.0).contains(&x) && (-90.0..=90.0).contains(&y);
            if !x.is_finite() || !y.is_finite() || !in_bounds {
                return Err(PriocError::InvalidGeometry {
                    reason: format!("position ({}, {}) is outside geographic bounds", x, y),
                });
            }
            coords.push(Coord { x, y });
        }
        if coords.first() != coords.last() {
            return Err(PriocError::InvalidGeometry {
                reason: format!("ring {} is not closed", index),
            });
        }
        converted.push(LineString::new(coords));
    }

    let exterior = converted.remove(0);
    Ok(Polygon::new(exterior, converted))
}
