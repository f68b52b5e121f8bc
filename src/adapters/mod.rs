// Adapters layer: concrete implementations of the domain ports (Ollama over HTTP, local files).

pub mod ollama;
pub mod storage;
