use std::time::Duration;

use futures::StreamExt as _;
use tracing::debug;

use crate::backend::{ByteStream, TravelBackend, validate_question};
use crate::config::ClientConfig;
use crate::errors::{ClientError, detail_from_body};
use crate::record::{QueryHistory, QueryRecord, QueryRequest};

const QUERY_PATH: &str = "/api/query";
const STREAM_PATH: &str = "/api/query/stream";
const HISTORY_PATH: &str = "/api/history";
const HEALTH_PATH: &str = "/health";

/// `TravelBackend` over HTTP.
pub struct HttpTravelBackend {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpTravelBackend {
    /// Creates a backend from explicit configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        // No client-wide timeout: it would also cap how long an answer may stream.
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates a backend from `TRAVEL_*` environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl TravelBackend for HttpTravelBackend {
    async fn ask(&self, question: &str) -> Result<QueryRecord, ClientError> {
        let question = validate_question(question)?;
        debug!(chars = question.len(), "sending single-shot query");
        let response = self
            .client
            .post(self.config.url(QUERY_PATH))
            .timeout(self.config.timeout)
            .json(&QueryRequest { question })
            .send()
            .await
            .map_err(ClientError::transport)?;
        let response = ensure_success(response).await?;
        response
            .json::<QueryRecord>()
            .await
            .map_err(|e| ClientError::Decode(format!("invalid query response: {e}")))
    }

    async fn open_stream(&self, question: &str) -> Result<ByteStream, ClientError> {
        let question = validate_question(question)?;
        debug!(chars = question.len(), "opening answer stream");
        let request = self
            .client
            .post(self.config.url(STREAM_PATH))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&QueryRequest { question })
            .send();
        // Bounds the wait for response headers only; the body may stream for longer.
        let response = tokio::time::timeout(self.config.timeout, request)
            .await
            .map_err(|_| {
                ClientError::transport(format!(
                    "no response from {STREAM_PATH} within {:?}",
                    self.config.timeout
                ))
            })?
            .map_err(ClientError::transport)?;
        let response = ensure_success(response).await?;
        Ok(Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(ClientError::transport)),
        ))
    }

    async fn history(&self, limit: usize, offset: usize) -> Result<QueryHistory, ClientError> {
        let response = self
            .client
            .get(self.config.url(HISTORY_PATH))
            .query(&[("limit", limit), ("offset", offset)])
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(ClientError::transport)?;
        let response = ensure_success(response).await?;
        response
            .json::<QueryHistory>()
            .await
            .map_err(|e| ClientError::Decode(format!("invalid history response: {e}")))
    }

    async fn clear_history(&self) -> Result<(), ClientError> {
        let response = self
            .client
            .delete(self.config.url(HISTORY_PATH))
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(ClientError::transport)?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn health(&self) -> bool {
        let response = match self
            .client
            .get(self.config.url(HEALTH_PATH))
            .timeout(self.config.timeout)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!(status = %response.status(), "health check returned failure status");
                return false;
            }
            Err(err) => {
                debug!(error = %err, "health check failed");
                return false;
            }
        };
        match response.json::<serde_json::Value>().await {
            Ok(body) => body.get("status").and_then(|v| v.as_str()) == Some("healthy"),
            Err(_) => false,
        }
    }

    fn stream_idle_timeout(&self) -> Option<Duration> {
        self.config.stream_idle_timeout
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    debug!(%status, body_len = body.len(), "backend request rejected");
    Err(ClientError::Status {
        status: status.as_u16(),
        detail: detail_from_body(&body),
    })
}
