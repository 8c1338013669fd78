//! reqwest client for the processing service's HTTP API.
//!
//! Uploads go as multipart, text removal as a url-encoded form, and every
//! other operation as a JSON body; all answers share the same envelope.
//! Responses are judged only as success or failure: any non-2xx status or
//! `ok: false` body becomes [`OperationError::Rejected`] with the service's
//! `message` (or `detail`), and anything that prevents a response from
//! arriving becomes [`OperationError::Transport`].

use super::types::{FileInfo, Operation, ServiceResponse, FALLBACK_FAILURE};
use super::ProcessingService;
use crate::config::WizardConfig;
use crate::error::OperationError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use tracing::{debug, info, warn};

/// HTTP implementation of [`ProcessingService`].
#[derive(Debug, Clone)]
pub struct HttpService {
    client: Client,
    base: String,
}

impl HttpService {
    /// Build a client for `config.api_base` with the configured timeout.
    pub fn new(config: &WizardConfig) -> Result<Self, OperationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| OperationError::transport(format!("HTTP client setup failed: {e}")))?;
        Ok(Self::with_client(client, &config.api_base))
    }

    /// Use a pre-built client (custom TLS, proxies, …).
    pub fn with_client(client: Client, base: impl AsRef<str>) -> Self {
        Self {
            client,
            base: base.as_ref().trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base, endpoint)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<ServiceResponse, OperationError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                OperationError::transport(format!("Request timed out: {e}"))
            } else {
                OperationError::transport(format!("Request failed: {e}"))
            }
        })?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| OperationError::transport(format!("Failed to read response: {e}")))?;
        interpret(status, &body)
    }
}

/// Turn a status and raw body into the response envelope.
pub(crate) fn interpret(
    status: StatusCode,
    body: &[u8],
) -> Result<ServiceResponse, OperationError> {
    let parsed = serde_json::from_slice::<ServiceResponse>(body);
    if !status.is_success() {
        let message = match parsed {
            Ok(r) => r.failure_message(),
            Err(_) if body.is_empty() => FALLBACK_FAILURE.to_string(),
            Err(_) => format!("HTTP {status}"),
        };
        warn!("Service answered {}: {}", status, message);
        return Err(OperationError::rejected(message));
    }
    parsed.map_err(|e| OperationError::transport(format!("Invalid response from service: {e}")))
}

#[async_trait]
impl ProcessingService for HttpService {
    async fn invoke(&self, operation: &Operation) -> Result<ServiceResponse, OperationError> {
        let url = self.url(operation.endpoint());
        info!("Calling {} → {}", operation.action(), url);

        let request = match operation {
            Operation::Upload(req) => {
                let path = req.file.path();
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| OperationError::File {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    })?;
                debug!("Uploading {} ({} bytes) as {}", path.display(), bytes.len(), req.save_as);
                let part = Part::bytes(bytes)
                    .file_name(req.file.name().to_string())
                    .mime_str("application/pdf")
                    .map_err(|e| OperationError::transport(e.to_string()))?;
                let form = Form::new()
                    .part("file", part)
                    .text("save_as", req.save_as.clone());
                self.client.post(&url).multipart(form)
            }
            Operation::RemoveText(req) => self.client.post(&url).form(req),
            Operation::ExtractCharacters(req) => self.client.post(&url).json(req),
            Operation::ExtractLines(req) => self.client.post(&url).json(req),
            Operation::TranslateArabic(req) => self.client.post(&url).json(req),
            Operation::ReconstructEnglish(req) => self.client.post(&url).json(req),
            Operation::ReconstructArabic(req) => self.client.post(&url).json(req),
            Operation::VisualizeLines(req) => self.client.post(&url).json(req),
        };

        self.send(request).await
    }

    async fn health(&self) -> Result<ServiceResponse, OperationError> {
        self.send(self.client.get(self.url("/api/health"))).await
    }

    async fn list_files(&self) -> Result<Vec<FileInfo>, OperationError> {
        let response = self
            .send(self.client.get(self.url("/api/list")))
            .await?
            .into_result()?;
        let files = response
            .payload
            .get("files")
            .cloned()
            .unwrap_or_else(|| serde_json::Value::Array(Vec::new()));
        serde_json::from_value(files)
            .map_err(|e| OperationError::transport(format!("Invalid file listing: {e}")))
    }

    fn download_url(&self, file: &str) -> String {
        let endpoint = self.url("/api/download");
        Url::parse_with_params(&endpoint, &[("file", file)])
            .map(String::from)
            .unwrap_or_else(|_| format!("{endpoint}?file={file}"))
    }
}
