//! Local read-through cache of file server documents.
//!
//! Each document is kept once as `{YYYY-mm-dd-HH-MM-SS}_{name}`, stamped with
//! the UTC time it was downloaded.

use crate::domain::ports::DocumentSource;
use crate::utils::error::{PriocError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::fs;
use std::path::PathBuf;

const STAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDocument {
    pub bytes: Vec<u8>,
    /// True when the bytes were just downloaded rather than read from cache.
    pub downloaded: bool,
}

#[derive(Debug, Clone)]
pub struct DocumentCache {
    dir: PathBuf,
}

impl DocumentCache {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The single cached file of `name`, if any.
    pub fn cached_file_name(&self, name: &str) -> Result<Option<String>> {
        let mut matches = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let file_name = entry?.file_name().to_string_lossy().into_owned();
            if let Some((stamp, rest)) = file_name.split_once('_') {
                if rest == name && NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).is_ok() {
                    matches.push(file_name);
                }
            }
        }

        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            count => Err(PriocError::CacheConflict {
                name: name.to_string(),
                count,
            }),
        }
    }

    pub fn cached_at(&self, name: &str) -> Result<Option<DateTime<Utc>>> {
        let Some(file_name) = self.cached_file_name(name)? else {
            return Ok(None);
        };
        let stamp = file_name.split('_').next().unwrap_or_default();
        let parsed = NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).map_err(|e| {
            PriocError::ConfigError {
                message: format!("Bad cache stamp on {}: {}", file_name, e),
            }
        })?;
        Ok(Some(parsed.and_utc()))
    }

    pub fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        match self.cached_file_name(name)? {
            Some(file_name) => Ok(Some(fs::read(self.dir.join(file_name))?)),
            None => Ok(None),
        }
    }

    /// Stores `bytes` as the cached copy of `name`, replacing an older copy.
    pub fn save(&self, name: &str, bytes: &[u8], at: DateTime<Utc>) -> Result<PathBuf> {
        if let Some(existing) = self.cached_file_name(name)? {
            tracing::info!("Deleting existing cache - {}", existing);
            fs::remove_file(self.dir.join(existing))?;
        }
        let path = self
            .dir
            .join(format!("{}_{}", at.format(STAMP_FORMAT), name));
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Cached bytes of `name`, downloaded first when nothing is cached or the
    /// source holds a newer version.
    pub async fn resolve(
        &self,
        source: &dyn DocumentSource,
        name: &str,
    ) -> Result<ResolvedDocument> {
        let remote = source.last_modified(name).await?;

        if let Some(cached_at) = self.cached_at(name)? {
            if remote <= cached_at {
                if let Some(bytes) = self.read(name)? {
                    tracing::debug!("Using cached copy of {} from {}", name, cached_at);
                    return Ok(ResolvedDocument {
                        bytes,
                        downloaded: false,
                    });
                }
            }
        }

        tracing::info!("Downloading new file - {}", name);
        let bytes = source.fetch(name).await?;
        self.save(name, &bytes, Utc::now())?;
        Ok(ResolvedDocument {
            bytes,
            downloaded: true,
        })
    }
}
