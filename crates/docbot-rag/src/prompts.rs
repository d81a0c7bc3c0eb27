//! Prompt templates for the query pipeline

use docbot_core::{ChatMessage, ChatTurn, DocumentChunk, TurnRole};

const REPHRASE_TEMPLATE: &str = "Given the following conversation and a follow up question, \
rephrase the follow up question to be a standalone question.

Chat History:
{chat_history}
Follow Up Input: {input}
Standalone Question:";

const ANSWER_SYSTEM_TEMPLATE: &str = "Answer any use questions based solely on the context below:

<context>
{context}
</context>";

/// Render turns as `Human: ...` / `AI: ...` lines
pub fn render_history(history: &[ChatTurn]) -> String {
    history
        .iter()
        .map(|turn| match turn.role {
            TurnRole::Human => format!("Human: {}", turn.text),
            TurnRole::Ai => format!("AI: {}", turn.text),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Messages asking the model to turn a follow-up into a standalone question
pub fn rephrase_messages(query: &str, history: &[ChatTurn]) -> Vec<ChatMessage> {
    let prompt = REPHRASE_TEMPLATE
        .replace("{chat_history}", &render_history(history))
        .replace("{input}", query);
    vec![ChatMessage::user(prompt)]
}

/// Messages asking the model to answer from the retrieved chunks only
///
/// Every chunk is stuffed into the system message; the history follows as
/// user/assistant messages and the original query comes last.
pub fn answer_messages(
    query: &str,
    history: &[ChatTurn],
    documents: &[DocumentChunk],
) -> Vec<ChatMessage> {
    let context = documents
        .iter()
        .map(|doc| doc.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(
        ANSWER_SYSTEM_TEMPLATE.replace("{context}", &context),
    ));
    messages.extend(history.iter().map(|turn| match turn.role {
        TurnRole::Human => ChatMessage::user(&turn.text),
        TurnRole::Ai => ChatMessage::assistant(&turn.text),
    }));
    messages.push(ChatMessage::user(query));
    messages
}
