use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// 對話歷史中非 user 的角色一律視為 assistant
    pub fn from_history(role: &str) -> Self {
        if role == "user" {
            Role::User
        } else {
            Role::Assistant
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Conversation entry as supplied by callers (e.g. a `--history` file).
///
/// The role is free-form text; see [`Role::from_history`].
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
}

impl From<HistoryEntry> for ChatMessage {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            role: Role::from_history(&entry.role),
            content: entry.content,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// One decoded piece of a streamed reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatChunk {
    pub content: String,
    pub done: bool,
    pub done_reason: Option<String>,
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyChunk {
    pub text: String,
    pub embedding: Vec<f32>,
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, Copy)]
pub struct Scored<T> {
    pub item: T,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_roles_fold_to_assistant() {
        let user: ChatMessage = HistoryEntry {
            role: "user".to_string(),
            content: "hi".to_string(),
        }
        .into();
        assert_eq!(user.role, Role::User);

        let bot: ChatMessage = HistoryEntry {
            role: "bot".to_string(),
            content: "hello".to_string(),
        }
        .into();
        assert_eq!(bot.role, Role::Assistant);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatMessage::system("x")).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"x"}"#);
    }

    #[test]
    fn test_policy_chunk_keeps_extra_fields() {
        let chunk: PolicyChunk = serde_json::from_str(
            r#"{"text":"Leave policy","embedding":[0.1,0.2],"section":"Leave"}"#,
        )
        .unwrap();
        assert_eq!(chunk.embedding.len(), 2);
        assert_eq!(chunk.metadata["section"], "Leave");
    }
}
