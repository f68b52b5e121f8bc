//! Ollama backend adapter.

pub mod client;
pub mod ndjson;
pub mod types;

pub use client::{OllamaClient, DEFAULT_BASE_URL};
