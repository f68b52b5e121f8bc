pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};

pub use self::adapters::{ollama::OllamaClient, storage::LocalStorage};
pub use self::config::AppConfig;
pub use self::core::{
    assistant::Assistant,
    knowledge::KnowledgeBase,
    reembed::Reembedder,
    streamer::{stream_prompt, stream_to_writer, StreamSummary},
};
pub use self::utils::error::{ChatError, Result};
