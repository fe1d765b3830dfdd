use std::fs;
use std::io;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use valid8_core::{RemoteStatus, Stage, StatusUpdate, UploadInfo, ValidationResults};

/// A file selected for validation, held in memory for the multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Reads `path` and names the upload after its file name.
    pub fn read(path: &Path) -> io::Result<Self> {
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn info(&self) -> UploadInfo {
        UploadInfo {
            name: self.name.clone(),
            size: self.size(),
        }
    }
}

/// Body of a successful `POST /start-job`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StartJobResponse {
    pub job_id: String,
}

/// Body of `GET /status/{job_id}` as sent on the wire.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
}

impl StatusResponse {
    /// Converts the wire body into a typed update.
    ///
    /// A missing `status` falls back to the stage name, and to `failed` when
    /// only an `error` is present. A completed result that does not match the
    /// result schema turns into a failure.
    pub fn into_update(self) -> StatusUpdate {
        let stage = self.stage.as_deref().and_then(Stage::from_wire);
        let status = match self.status.as_deref().map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("completed") => RemoteStatus::Completed,
            Some(s) if s.eq_ignore_ascii_case("failed") => RemoteStatus::Failed,
            Some(_) => RemoteStatus::Running,
            None => match stage {
                Some(Stage::Completed) => RemoteStatus::Completed,
                Some(Stage::Failed) => RemoteStatus::Failed,
                _ if self.error.is_some() => RemoteStatus::Failed,
                _ => RemoteStatus::Running,
            },
        };

        let result = match (status, self.result) {
            (RemoteStatus::Completed, Some(Value::Null) | None) => {
                Some(ValidationResults::default())
            }
            (RemoteStatus::Completed, Some(raw)) => match ValidationResults::from_value(raw) {
                Ok(results) => Some(results),
                Err(err) => {
                    return StatusUpdate {
                        stage,
                        progress: self.progress,
                        ..StatusUpdate::failed(format!("malformed result payload: {err}"))
                    }
                }
            },
            _ => None,
        };

        StatusUpdate {
            stage,
            progress: self.progress,
            status,
            error: self.error,
            result,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("timeout")]
    Timeout,
    #[error("http status {status}")]
    HttpStatus { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Text shown to the user when job creation fails.
    ///
    /// Prefers the server-supplied error text; FastAPI-style `{"detail": ..}`
    /// or `{"error": ..}` bodies are unwrapped.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::HttpStatus { status, body } => {
                server_message(body).unwrap_or_else(|| format!("Upload failed (http status {status})"))
            }
            ApiError::Network(_) | ApiError::Timeout => {
                "Could not reach the validation service. Check your connection and try again."
                    .to_string()
            }
            ApiError::InvalidUrl(msg) => format!("Invalid service address: {msg}"),
            ApiError::InvalidResponse(msg) => format!("Unexpected response from service: {msg}"),
        }
    }
}

fn server_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        for key in ["detail", "error", "message"] {
            if let Some(Value::String(text)) = map.get(key) {
                return Some(text.clone());
            }
        }
    }
    Some(trimmed.to_string())
}

