use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::Value;
use thiserror::Error;
use valid8_core::ValidationJob;
use valid8_logging::valid8_warn;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("http error: {0}")]
    Http(String),
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("seed data larger than {max_bytes} bytes")]
    TooLarge { max_bytes: u64 },
    #[error("seed data is not valid json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("seed data is not a json array")]
    NotAnArray,
}

/// Static snapshot used to populate an empty history once.
#[async_trait::async_trait]
pub trait SeedSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<ValidationJob>, SeedError>;
}

/// Parses a seed snapshot. Records that do not match the history schema are
/// skipped; anything other than a top-level array is an error.
pub fn parse_seed(bytes: &[u8]) -> Result<Vec<ValidationJob>, SeedError> {
    let raw: Value = serde_json::from_slice(bytes)?;
    let Value::Array(items) = raw else {
        return Err(SeedError::NotAnArray);
    };
    let mut jobs = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<ValidationJob>(item) {
            Ok(job) => jobs.push(job),
            Err(err) => valid8_warn!("Skipping seed record {}: {}", index, err),
        }
    }
    Ok(jobs)
}

#[derive(Debug, Clone)]
pub struct FileSeedSource {
    path: PathBuf,
}

impl FileSeedSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl SeedSource for FileSeedSource {
    async fn fetch(&self) -> Result<Vec<ValidationJob>, SeedError> {
        let bytes = fs::read(&self.path)?;
        parse_seed(&bytes)
    }
}

#[derive(Debug, Clone)]
pub struct HttpSeedSource {
    url: String,
    client: reqwest::Client,
    max_bytes: u64,
}

impl HttpSeedSource {
    pub const DEFAULT_MAX_BYTES: u64 = 5 * 1024 * 1024;

    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SeedError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| SeedError::Http(err.to_string()))?;
        Ok(Self {
            url: url.into(),
            client,
            max_bytes: Self::DEFAULT_MAX_BYTES,
        })
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

#[async_trait::async_trait]
impl SeedSource for HttpSeedSource {
    async fn fetch(&self) -> Result<Vec<ValidationJob>, SeedError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|err| SeedError::Http(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SeedError::HttpStatus(status.as_u16()));
        }
        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes)
        {
            return Err(SeedError::TooLarge {
                max_bytes: self.max_bytes,
            });
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| SeedError::Http(err.to_string()))?;
            if bytes.len() as u64 + chunk.len() as u64 > self.max_bytes {
                return Err(SeedError::TooLarge {
                    max_bytes: self.max_bytes,
                });
            }
            bytes.extend_from_slice(&chunk);
        }
        parse_seed(&bytes)
    }
}
