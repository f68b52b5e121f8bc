use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Model not found: {message}")]
    ModelNotFound { message: String },

    #[error("Backend returned HTTP {status}: {body}")]
    BackendError { status: u16, body: String },

    #[error("Model backend error: {message}")]
    GenerationError { message: String },

    #[error("Malformed response stream: {message}")]
    StreamError { message: String },

    #[error("Knowledge base error ({path}): {message}")]
    KnowledgeBaseError { path: String, message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Backend,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ChatError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ChatError::ConfigError { .. }
            | ChatError::ConfigValidationError { .. }
            | ChatError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            ChatError::ApiError(_) => ErrorCategory::Network,
            ChatError::ModelNotFound { .. }
            | ChatError::BackendError { .. }
            | ChatError::GenerationError { .. }
            | ChatError::StreamError { .. } => ErrorCategory::Backend,
            ChatError::SerializationError(_)
            | ChatError::KnowledgeBaseError { .. }
            | ChatError::ValidationError { .. } => ErrorCategory::Data,
            ChatError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 後端暫時不可用，可以重試
            ChatError::ApiError(_) => ErrorSeverity::Medium,
            ChatError::BackendError { status, .. } if *status >= 500 => ErrorSeverity::Medium,
            ChatError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.severity() == ErrorSeverity::Medium
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            ChatError::ApiError(e) if e.is_connect() => {
                "Make sure Ollama is running (`ollama serve`) and the base URL is correct".to_string()
            }
            ChatError::ApiError(e) if e.is_timeout() => {
                "The backend did not answer in time; raise ollama.timeout_seconds or retry".to_string()
            }
            ChatError::ApiError(_) => "Check network connectivity to the Ollama backend".to_string(),
            ChatError::ModelNotFound { .. } => {
                "Pull the model first, e.g. `ollama pull llama3`".to_string()
            }
            ChatError::BackendError { status, .. } if *status >= 500 => {
                "The backend failed internally; check the Ollama server logs and retry".to_string()
            }
            ChatError::BackendError { .. } => {
                "The backend rejected the request; check the model name and options".to_string()
            }
            ChatError::GenerationError { .. } => {
                "The model stopped with an error; check the Ollama server logs".to_string()
            }
            ChatError::StreamError { .. } => {
                "The backend sent an unexpected response; verify the URL points at Ollama".to_string()
            }
            ChatError::ConfigError { .. }
            | ChatError::ConfigValidationError { .. }
            | ChatError::InvalidConfigValueError { .. } => {
                "Review the configuration file and command-line flags".to_string()
            }
            ChatError::KnowledgeBaseError { path, .. } => {
                format!("Check that '{}' exists and holds a JSON array of embedded entries", path)
            }
            ChatError::SerializationError(_) => "Check that the input file is valid JSON".to_string(),
            ChatError::ValidationError { .. } => "Check the command input".to_string(),
            ChatError::IoError(_) => "Check file paths and permissions".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Network => format!("Could not reach the model backend: {}", self),
            ErrorCategory::Backend => format!("The model backend reported a problem: {}", self),
            ErrorCategory::Data => format!("Invalid data: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    /// 依嚴重程度對應的程序結束碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

/// Map a non-success HTTP status from the backend to a [`ChatError`].
pub fn map_http_status(status: reqwest::StatusCode, body: &str) -> ChatError {
    match status.as_u16() {
        404 => ChatError::ModelNotFound {
            message: extract_backend_message(body),
        },
        code => ChatError::BackendError {
            status: code,
            body: extract_backend_message(body),
        },
    }
}

// Ollama 錯誤回應格式為 {"error": "..."}
fn extract_backend_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

pub type Result<T> = std::result::Result<T, ChatError>;
