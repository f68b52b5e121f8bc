use super::ndjson::{chunk_stream, collect_reply};
use super::types::{
    ChatOptions, ChatRequestBody, EmbeddingRequestBody, EmbeddingResponseBody, VersionResponseBody,
};
use crate::domain::model::ChatRequest;
use crate::domain::ports::{ChatModel, ChunkStream, ConfigProvider, Embedder};
use crate::utils::error::{map_http_status, ChatError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for a local Ollama backend.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    request_timeout: Option<Duration>,
    keep_alive: Option<String>,
    client: Client,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            });

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout: None,
            keep_alive: None,
            client,
        }
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Self {
        let mut client = Self::new(config.base_url());
        client.request_timeout = config.request_timeout();
        client.keep_alive = config.keep_alive().map(str::to_string);
        client
    }

    /// Timeout for embedding, version and whole-reply chat requests.
    ///
    /// Streamed chats are not bounded; generation may run for minutes.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = Some(keep_alive.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    pub(crate) fn embeddings_url(&self) -> String {
        format!("{}/api/embeddings", self.base_url)
    }

    pub(crate) fn version_url(&self) -> String {
        format!("{}/api/version", self.base_url)
    }

    fn bounded(&self, request: RequestBuilder) -> RequestBuilder {
        match self.request_timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        }
    }

    fn chat_body<'a>(&'a self, request: &'a ChatRequest) -> ChatRequestBody<'a> {
        ChatRequestBody {
            model: &request.model,
            messages: &request.messages,
            // 非串流請求同樣以 NDJSON 接收後再彙整
            stream: true,
            options: request.temperature.map(|t| ChatOptions {
                temperature: Some(t),
            }),
            keep_alive: self.keep_alive.as_deref(),
        }
    }

    async fn send_chat(&self, request: &ChatRequest, bounded: bool) -> Result<Response> {
        let url = self.chat_url();
        tracing::debug!(
            "Sending chat request to {} (model: {}, messages: {})",
            url,
            request.model,
            request.messages.len()
        );

        let mut builder = self.client.post(&url).json(&self.chat_body(request));
        if bounded {
            builder = self.bounded(builder);
        }

        let response = builder.send().await?;
        check_status(response).await
    }

    /// Query the backend version; used as a health probe.
    pub async fn version(&self) -> Result<String> {
        let response = self.bounded(self.client.get(self.version_url())).send().await?;
        let response = check_status(response).await?;
        let body: VersionResponseBody = response.json().await?;
        Ok(body.version)
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    tracing::debug!("Backend response status: {}", status);

    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(map_http_status(status, &body))
    }
}

#[async_trait]
impl ChatModel for OllamaClient {
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChunkStream> {
        let response = self.send_chat(request, false).await?;
        Ok(chunk_stream(response.bytes_stream()))
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String> {
        let response = self.send_chat(request, true).await?;
        let body = response.text().await?;
        collect_reply(&body)
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let body = EmbeddingRequestBody {
            model,
            prompt: text,
        };

        let response = self
            .bounded(self.client.post(self.embeddings_url()).json(&body))
            .send()
            .await?;
        let response = check_status(response).await?;
        let parsed: EmbeddingResponseBody = response.json().await?;

        if parsed.embedding.is_empty() {
            return Err(ChatError::StreamError {
                message: format!("model '{}' returned an empty embedding", model),
            });
        }

        Ok(parsed.embedding)
    }
}
