use crate::config::toml_config::AssistantConfig;
use crate::core::knowledge::KnowledgeBase;
use crate::core::prompt::{build_messages, build_system_prompt};
use crate::domain::model::{ChatMessage, ChatRequest, HistoryEntry, Role};
use crate::domain::ports::{ChatModel, Embedder, Storage};
use crate::utils::error::{ChatError, Result};

/// A knowledge-grounded answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub policies_used: usize,
    pub faq_question: Option<String>,
}

/// Prepared request plus what grounded it.
#[derive(Debug, Clone)]
pub struct PreparedQuestion {
    pub request: ChatRequest,
    pub policies_used: usize,
    pub faq_question: Option<String>,
}

/// Retrieval-augmented question answering over a [`KnowledgeBase`].
pub struct Assistant<C, E> {
    chat: C,
    embedder: E,
    knowledge: KnowledgeBase,
    settings: AssistantConfig,
}

impl<C: ChatModel, E: Embedder> Assistant<C, E> {
    pub fn new(chat: C, embedder: E, knowledge: KnowledgeBase, settings: AssistantConfig) -> Self {
        Self {
            chat,
            embedder,
            knowledge,
            settings,
        }
    }

    pub fn chat_model(&self) -> &C {
        &self.chat
    }

    /// 以最後一則使用者訊息檢索政策與 FAQ，組出送給模型的請求
    pub async fn prepare(&self, history: &[ChatMessage], roles: &[i64]) -> Result<PreparedQuestion> {
        let last_user = history
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .ok_or_else(|| ChatError::ValidationError {
                message: "conversation has no user message to answer".to_string(),
            })?;

        let query = last_user.content.trim().to_lowercase();
        if query.is_empty() {
            return Err(ChatError::ValidationError {
                message: "question is empty".to_string(),
            });
        }

        let roles: &[i64] = if roles.is_empty() {
            &self.settings.default_roles
        } else {
            roles
        };

        tracing::debug!("Embedding query with {}", self.settings.embedding_model);
        let query_embedding = self
            .embedder
            .embed(&self.settings.embedding_model, &query)
            .await?;

        let policies = self
            .knowledge
            .relevant_policies(&query_embedding, self.settings.policy_top_k);
        let faq = self.knowledge.best_faq(&query_embedding, roles);

        if let Some(faq) = &faq {
            tracing::debug!("Top FAQ '{}' scored {:.3}", faq.item.question, faq.score);
        }

        let faq_question = faq
            .as_ref()
            .filter(|f| f.score > self.settings.faq_threshold)
            .map(|f| f.item.question.clone());

        let system_prompt = build_system_prompt(
            &policies,
            faq.as_ref(),
            self.settings.faq_threshold,
            self.settings.policy_excerpt_chars,
        );
        let messages = build_messages(system_prompt, history, self.settings.history_window);

        Ok(PreparedQuestion {
            request: ChatRequest::new(&self.settings.model, messages)
                .with_temperature(self.settings.temperature),
            policies_used: policies.len(),
            faq_question,
        })
    }

    pub async fn answer(&self, history: &[ChatMessage], roles: &[i64]) -> Result<Answer> {
        let prepared = self.prepare(history, roles).await?;
        tracing::info!(
            "🔎 Answering with {} policies{}",
            prepared.policies_used,
            if prepared.faq_question.is_some() { " and a matching FAQ" } else { "" }
        );

        let text = self.chat.chat(&prepared.request).await?;

        Ok(Answer {
            text,
            policies_used: prepared.policies_used,
            faq_question: prepared.faq_question,
        })
    }
}

/// 讀取先前對話（JSON 陣列），並在最後加上新的提問
pub async fn load_conversation<S: Storage>(
    storage: &S,
    history_path: Option<&str>,
    question: impl Into<String>,
) -> Result<Vec<ChatMessage>> {
    let mut messages = match history_path {
        Some(path) => {
            let raw = storage
                .read_file(path)
                .await
                .map_err(|e| ChatError::ValidationError {
                    message: format!("cannot read history file '{}': {}", path, e),
                })?;
            let entries: Vec<HistoryEntry> = serde_json::from_slice(&raw)?;
            entries.into_iter().map(ChatMessage::from).collect()
        }
        None => Vec::new(),
    };

    messages.push(ChatMessage::user(question));
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{FaqEntry, PolicyChunk};
    use crate::domain::ports::ChunkStream;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _model: &str, _text: &str) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct EchoModel {
        requests: Mutex<Vec<ChatRequest>>,
    }

    #[async_trait]
    impl ChatModel for EchoModel {
        async fn stream_chat(&self, _request: &ChatRequest) -> Result<ChunkStream> {
            Ok(Box::pin(futures::stream::empty()))
        }

        async fn chat(&self, request: &ChatRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request.clone());
            Ok("You get 20 days.".to_string())
        }
    }

    fn knowledge() -> KnowledgeBase {
        KnowledgeBase {
            policies: vec![
                PolicyChunk {
                    text: "Annual leave is 20 days.".to_string(),
                    embedding: vec![1.0, 0.0],
                    metadata: Default::default(),
                },
                PolicyChunk {
                    text: "Payroll runs monthly.".to_string(),
                    embedding: vec![0.0, 1.0],
                    metadata: Default::default(),
                },
            ],
            faqs_employee: vec![FaqEntry {
                question: "How many leave days?".to_string(),
                answer: "20".to_string(),
                embedding: vec![1.0, 0.05],
            }],
            faqs_manager: vec![],
            faqs_hr: vec![],
        }
    }

    #[tokio::test]
    async fn test_answer_builds_grounded_request() {
        let assistant = Assistant::new(
            EchoModel::default(),
            FixedEmbedder(vec![1.0, 0.0]),
            knowledge(),
            AssistantConfig::default(),
        );

        let history = vec![
            ChatMessage::user("hello"),
            ChatMessage::assistant("Hi! How can I help?"),
            ChatMessage::user("  How many LEAVE days?  "),
        ];

        let answer = assistant.answer(&history, &[]).await.unwrap();
        assert_eq!(answer.text, "You get 20 days.");
        assert_eq!(answer.policies_used, 2);
        assert_eq!(answer.faq_question.as_deref(), Some("How many leave days?"));

        let requests = assistant.chat_model().requests.lock().unwrap();
        let request = &requests[0];
        assert_eq!(request.model, "mistral");
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.messages.len(), 3);
        assert!(request.messages[0]
            .content
            .contains("Policy 1: Annual leave is 20 days."));
        assert!(request.messages[0].content.contains("Q: How many leave days?"));
        assert_eq!(request.messages[2].content, "  How many LEAVE days?  ");
    }

    #[tokio::test]
    async fn test_weak_faq_is_left_out() {
        let assistant = Assistant::new(
            EchoModel::default(),
            FixedEmbedder(vec![0.0, 1.0]),
            knowledge(),
            AssistantConfig::default(),
        );

        let prepared = assistant
            .prepare(&[ChatMessage::user("when is payday?")], &[2])
            .await
            .unwrap();
        assert!(prepared.faq_question.is_none());
        assert!(!prepared.request.messages[0].content.contains("FAQ:"));
        assert!(prepared.request.messages[0]
            .content
            .contains("Policy 1: Payroll runs monthly."));
    }

    #[tokio::test]
    async fn test_requires_user_message() {
        let assistant = Assistant::new(
            EchoModel::default(),
            FixedEmbedder(vec![1.0, 0.0]),
            knowledge(),
            AssistantConfig::default(),
        );

        let err = assistant
            .answer(&[ChatMessage::assistant("hi")], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::ValidationError { ref message } if message.contains("no user message")));
    }

    #[tokio::test]
    async fn test_blank_question_is_rejected() {
        let assistant = Assistant::new(
            EchoModel::default(),
            FixedEmbedder(vec![1.0, 0.0]),
            knowledge(),
            AssistantConfig::default(),
        );

        let err = assistant
            .prepare(&[ChatMessage::user("leave?"), ChatMessage::user("   ")], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::ValidationError { ref message } if message == "question is empty"));
    }
}
