use crate::domain::model::{ChatChunk, ChatRequest};
use crate::utils::error::Result;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::time::Duration;

pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatChunk>> + Send>>;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn request_timeout(&self) -> Option<Duration>;
    fn keep_alive(&self) -> Option<&str>;
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Start a streamed completion; chunks arrive as the model produces them.
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChunkStream>;

    /// Complete the whole reply and return its trimmed text.
    async fn chat(&self, request: &ChatRequest) -> Result<String>;
}

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>>;
}
