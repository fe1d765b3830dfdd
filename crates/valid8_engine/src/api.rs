use std::time::Duration;

use reqwest::multipart::{Form, Part};
use url::Url;

use crate::{ApiError, StartJobResponse, StatusResponse, UploadFile};

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// The backend job endpoints consumed by the poller.
#[async_trait::async_trait]
pub trait JobApi: Send + Sync {
    /// Uploads `file` and returns the issued job id.
    async fn start_job(&self, file: &UploadFile) -> Result<String, ApiError>;

    async fn job_status(&self, job_id: &str) -> Result<StatusResponse, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestJobApi {
    base_url: Url,
    client: reqwest::Client,
}

impl ReqwestJobApi {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let base_url = Url::parse(settings.base_url.trim())
            .map_err(|err| ApiError::InvalidUrl(err.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(format!(
                "{} cannot be used as a base url",
                settings.base_url
            )));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::Network(err.to_string()))?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends path segments to the base url, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl JobApi for ReqwestJobApi {
    async fn start_job(&self, file: &UploadFile) -> Result<String, ApiError> {
        let url = self.endpoint(&["start-job"])?;
        let part = Part::bytes(file.bytes.clone()).file_name(file.name.clone());
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(ApiError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: StartJobResponse = serde_json::from_str(&body)
            .map_err(|err| ApiError::InvalidResponse(err.to_string()))?;
        if parsed.job_id.trim().is_empty() {
            return Err(ApiError::InvalidResponse("empty job_id".to_string()));
        }
        Ok(parsed.job_id)
    }

    async fn job_status(&self, job_id: &str) -> Result<StatusResponse, ApiError> {
        let url = self.endpoint(&["status", job_id])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(ApiError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|err| ApiError::InvalidResponse(err.to_string()))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::Timeout;
    }
    ApiError::Network(err.to_string())
}
