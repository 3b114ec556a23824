use crate::domain::ports::DocumentSource;
use crate::utils::error::{PriocError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::LAST_MODIFIED;
use reqwest::{Client, Response};
use std::time::Duration;

/// Documents kept in a bucket of an S3-style file server, addressed as
/// `{base_url}/{bucket}/{name}`.
#[derive(Debug, Clone)]
pub struct FileServerClient {
    client: Client,
    base_url: String,
    bucket: String,
}

impl FileServerClient {
    pub fn new(
        base_url: impl Into<String>,
        bucket: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
        })
    }

    fn object_url(&self, name: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.bucket, name)
    }
}

async fn ensure_success(response: Response, name: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PriocError::Upstream {
        status: status.as_u16(),
        message: format!("Couldn't access /{}", name),
        body,
    })
}

#[async_trait]
impl DocumentSource for FileServerClient {
    async fn last_modified(&self, name: &str) -> Result<DateTime<Utc>> {
        let url = self.object_url(name);
        tracing::debug!("Checking {}", url);
        let response = ensure_success(self.client.head(&url).send().await?, name).await?;

        let header = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| PriocError::Upstream {
                status: response.status().as_u16(),
                message: format!("No Last-Modified for /{}", name),
                body: String::new(),
            })?;

        DateTime::parse_from_rfc2822(header)
            .map(|date| date.with_timezone(&Utc))
            .map_err(|e| PriocError::Upstream {
                status: response.status().as_u16(),
                message: format!("Malformed Last-Modified '{}' for /{}: {}", header, name, e),
                body: String::new(),
            })
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        let url = self.object_url(name);
        tracing::info!("Downloading {}", url);
        let response = ensure_success(self.client.get(&url).send().await?, name).await?;
        Ok(response.bytes().await?.to_vec())
    }
}
