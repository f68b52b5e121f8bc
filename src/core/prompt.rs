use crate::domain::model::{ChatMessage, FaqEntry, PolicyChunk, Role, Scored};

const PREAMBLE: &str = "You are the HRMS assistant. Answer from policies and FAQs.\n\nPolicies:\n";

/// Build the grounding system prompt.
///
/// Each policy contributes its first `excerpt_chars` characters. The FAQ is
/// appended only when its score is strictly above `faq_threshold`.
pub fn build_system_prompt(
    policies: &[Scored<&PolicyChunk>],
    faq: Option<&Scored<&FaqEntry>>,
    faq_threshold: f32,
    excerpt_chars: usize,
) -> String {
    let policy_section = policies
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let excerpt: String = p.item.text.chars().take(excerpt_chars).collect();
            format!("Policy {}: {}", i + 1, excerpt)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut prompt = format!("{}{}", PREAMBLE, policy_section);

    if let Some(faq) = faq.filter(|f| f.score > faq_threshold) {
        prompt.push_str(&format!(
            "\n\nFAQ:\nQ: {}\nA: {}",
            faq.item.question, faq.item.answer
        ));
    }

    prompt
}

/// System prompt followed by the last `window` turns of history.
pub fn build_messages(system_prompt: String, history: &[ChatMessage], window: usize) -> Vec<ChatMessage> {
    let start = history.len().saturating_sub(window);

    std::iter::once(ChatMessage::system(system_prompt))
        .chain(history[start..].iter().map(|m| ChatMessage {
            role: if m.role == Role::User {
                Role::User
            } else {
                Role::Assistant
            },
            content: m.content.clone(),
        }))
        .collect()
}
