//! HTTP client for the analysis engine.

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

use crate::domain::{DuplicateGroup, FileInfo, Language, RefactorPlan, Symbol};
use crate::error::{ToolError, ToolResult};

use super::http::{send_error, send_with_retry};

/// Similarity above which two blocks count as duplicates
pub const SIMILARITY_THRESHOLD: f64 = 0.85;

/// Health probes must answer quickly; startup polls every 500ms.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

/// Retries for idempotent analysis calls
const ANALYSIS_RETRIES: usize = 2;

/// Response wrapper used by every engine endpoint.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: String,
    #[serde(default)]
    data: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    path: &'a str,
    files: &'a [FileInfo],
}

#[derive(Debug, Serialize)]
struct DeduplicateRequest<'a> {
    path: &'a str,
    files: &'a [FileInfo],
    similarity_threshold: f64,
}

#[derive(Debug, Serialize)]
struct IdiomatizeRequest<'a> {
    path: &'a str,
    files: &'a [FileInfo],
    language: Language,
}

#[derive(Debug, Serialize)]
struct PatternRequest<'a> {
    pattern: &'a str,
    path: &'a str,
    files: &'a [FileInfo],
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeResult {
    #[serde(default)]
    pub total_files: usize,
    #[serde(default)]
    pub total_symbols: usize,
    #[serde(default)]
    pub hotspots: Vec<ComplexityHotspot>,
    #[serde(default)]
    pub duplicates: Vec<DuplicateGroup>,
    #[serde(default)]
    pub symbols: Vec<Symbol>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplexityHotspot {
    pub file: String,
    pub line: usize,
    pub symbol: String,
    pub cyclomatic_complexity: i64,
    pub cognitive_complexity: i64,
}

/// Client for the engine's localhost HTTP API
#[derive(Debug, Clone)]
pub struct EngineClient {
    client: Client,
    base_url: Url,
}

impl EngineClient {
    pub fn new(port: u16, request_timeout: Duration) -> ToolResult<Self> {
        let base_url = Url::parse(&format!("http://127.0.0.1:{}/", port))
            .map_err(|e| ToolError::Internal(format!("Invalid engine URL: {}", e)))?;
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ToolError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> ToolResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ToolError::Internal(format!("Invalid endpoint {}: {}", path, e)))
    }

    /// `GET /health`; any 2xx counts as healthy.
    pub async fn health(&self) -> ToolResult<()> {
        let response = self
            .client
            .get(self.endpoint("/health")?)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .map_err(send_error)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ToolError::EngineUnavailable(format!(
                "health check returned status {}",
                response.status()
            )))
        }
    }

    pub async fn analyze(&self, path: &str, files: &[FileInfo]) -> ToolResult<AnalyzeResult> {
        self.post("/analyze", &AnalyzeRequest { path, files }, ANALYSIS_RETRIES)
            .await
    }

    pub async fn deduplicate(&self, path: &str, files: &[FileInfo]) -> ToolResult<RefactorPlan> {
        let request = DeduplicateRequest {
            path,
            files,
            similarity_threshold: SIMILARITY_THRESHOLD,
        };
        self.post("/deduplicate", &request, 0).await
    }

    pub async fn idiomatize(
        &self,
        path: &str,
        files: &[FileInfo],
        language: Language,
    ) -> ToolResult<RefactorPlan> {
        let request = IdiomatizeRequest {
            path,
            files,
            language,
        };
        self.post("/idiomatize", &request, 0).await
    }

    pub async fn pattern(
        &self,
        pattern: &str,
        path: &str,
        files: &[FileInfo],
    ) -> ToolResult<RefactorPlan> {
        let request = PatternRequest {
            pattern,
            path,
            files,
        };
        self.post("/pattern", &request, 0).await
    }

    /// `POST /shutdown`. The response body is ignored.
    pub async fn shutdown(&self) -> ToolResult<()> {
        self.client
            .post(self.endpoint("/shutdown")?)
            .send()
            .await
            .map_err(send_error)?;
        Ok(())
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req, retries: usize) -> ToolResult<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        debug!("POST {}", url);

        let response = send_with_retry(retries, || self.client.post(url.clone()).json(body)).await?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ToolError::Engine(format!("Failed to read response: {}", e)))?;

        if status == StatusCode::NOT_FOUND {
            return Err(ToolError::MethodNotFound(path.to_string()));
        }

        if !status.is_success() {
            let message = serde_json::from_str::<Envelope>(&text)
                .ok()
                .and_then(|env| env.error)
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| format!("request failed with status {}: {}", status, text));
            error!("Engine call {} failed: {}", path, message);
            return Err(ToolError::Engine(message));
        }

        let envelope: Envelope = serde_json::from_str(&text)
            .map_err(|e| ToolError::Engine(format!("Failed to parse response: {}", e)))?;

        if envelope.status == "error" {
            return Err(ToolError::Engine(
                envelope.error.unwrap_or_else(|| "unknown engine error".to_string()),
            ));
        }

        serde_json::from_value(envelope.data)
            .map_err(|e| ToolError::Engine(format!("Failed to parse response data: {}", e)))
    }
}
