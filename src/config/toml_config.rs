use crate::adapters::ollama::DEFAULT_BASE_URL;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{ChatError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range,
    validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "ollama-chat.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ollama: OllamaConfig,
    pub stream: StreamConfig,
    pub assistant: AssistantConfig,
    pub knowledge: KnowledgeConfig,
    pub reembed: ReembedConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    pub timeout_seconds: Option<u64>,
    pub keep_alive: Option<String>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: None,
            keep_alive: None,
        }
    }
}

/// 單次串流對話的模型與提示
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub model: String,
    pub prompt: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            model: "llama3".to_string(),
            prompt: "Tell me a story".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub model: String,
    pub embedding_model: String,
    pub temperature: f32,
    pub policy_top_k: usize,
    pub policy_excerpt_chars: usize,
    pub faq_threshold: f32,
    pub history_window: usize,
    pub default_roles: Vec<i64>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            model: "mistral".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            temperature: 0.7,
            policy_top_k: 3,
            policy_excerpt_chars: 200,
            faq_threshold: 0.65,
            history_window: 2,
            default_roles: vec![2, 10, 7],
        }
    }
}

/// 向量檔案位置，相對於 `base_dir`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    pub base_dir: String,
    pub policy_file: String,
    pub faq_employee_file: String,
    pub faq_manager_file: String,
    pub faq_hr_file: String,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            base_dir: "data".to_string(),
            policy_file: "policy_vectors2_ollama.json".to_string(),
            faq_employee_file: "faq_vectors_emp.json".to_string(),
            faq_manager_file: "faq_vectors_mgr.json".to_string(),
            faq_hr_file: "faq_vectors_hr.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReembedJob {
    pub input: String,
    pub output: String,
    pub text_field: String,
}

impl ReembedJob {
    fn new(input: &str, output: &str, text_field: &str) -> Self {
        Self {
            input: input.to_string(),
            output: output.to_string(),
            text_field: text_field.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReembedConfig {
    pub base_dir: String,
    pub jobs: Vec<ReembedJob>,
}

impl Default for ReembedConfig {
    fn default() -> Self {
        Self {
            base_dir: "data".to_string(),
            jobs: vec![
                ReembedJob::new("policy_vectors2.json", "policy_vectors2_ollama.json", "text"),
                ReembedJob::new("faq_vectors_emp.json", "faq_vectors_emp_ollama.json", "question"),
                ReembedJob::new("faq_vectors_mgr.json", "faq_vectors_mgr_ollama.json", "question"),
                ReembedJob::new("faq_vectors_hr.json", "faq_vectors_hr_ollama.json", "question"),
                ReembedJob::new("qa_dataset_emp.json", "qa_dataset_emp_ollama.json", "question"),
                ReembedJob::new("qa_dataset_mgr.json", "qa_dataset_mgr_ollama.json", "question"),
                ReembedJob::new("qa_dataset_hr.json", "qa_dataset_hr_ollama.json", "question"),
            ],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub json_logs: bool,
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| ChatError::ConfigError {
            message: format!("cannot read '{}': {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 檔案存在才載入，否則使用預設值
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(
                "No config file at {}, using defaults",
                path.as_ref().display()
            );
            Ok(Self::default())
        }
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ChatError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OLLAMA_HOST})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ChatError::ConfigError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_url("ollama.base_url", &self.ollama.base_url)?;
        if let Some(timeout) = self.ollama.timeout_seconds {
            validate_positive_number("ollama.timeout_seconds", timeout as usize, 1)?;
        }

        validate_non_empty_string("stream.model", &self.stream.model)?;
        validate_non_empty_string("stream.prompt", &self.stream.prompt)?;

        validate_non_empty_string("assistant.model", &self.assistant.model)?;
        validate_non_empty_string("assistant.embedding_model", &self.assistant.embedding_model)?;
        validate_range("assistant.temperature", self.assistant.temperature, 0.0, 2.0)?;
        validate_range("assistant.faq_threshold", self.assistant.faq_threshold, -1.0, 1.0)?;
        validate_positive_number("assistant.policy_top_k", self.assistant.policy_top_k, 1)?;
        validate_positive_number(
            "assistant.policy_excerpt_chars",
            self.assistant.policy_excerpt_chars,
            1,
        )?;
        validate_positive_number("assistant.history_window", self.assistant.history_window, 1)?;

        validate_path("knowledge.policy_file", &self.knowledge.policy_file)?;

        for (index, job) in self.reembed.jobs.iter().enumerate() {
            validate_path(&format!("reembed.jobs[{}].input", index), &job.input)?;
            validate_path(&format!("reembed.jobs[{}].output", index), &job.output)?;
            validate_non_empty_string(
                &format!("reembed.jobs[{}].text_field", index),
                &job.text_field,
            )?;
        }

        Ok(())
    }
}

impl ConfigProvider for AppConfig {
    fn base_url(&self) -> &str {
        &self.ollama.base_url
    }

    fn request_timeout(&self) -> Option<Duration> {
        self.ollama.timeout_seconds.map(Duration::from_secs)
    }

    fn keep_alive(&self) -> Option<&str> {
        self.ollama.keep_alive.as_deref()
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
