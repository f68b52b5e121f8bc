pub mod assistant;
pub mod knowledge;
pub mod prompt;
pub mod reembed;
pub mod similarity;
pub mod streamer;

pub use crate::domain::model::{ChatChunk, ChatMessage, ChatRequest};
pub use crate::domain::ports::{ChatModel, ChunkStream, ConfigProvider, Embedder, Storage};
pub use crate::utils::error::Result;
