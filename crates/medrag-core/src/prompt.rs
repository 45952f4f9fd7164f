//! System prompt and message assembly for the retrieval chain.

use medrag_llm::Message;
use medrag_memory::{HistoryEntry, TurnRole};

/// Replaced with the retrieved passages.
pub const CONTEXT_PLACEHOLDER: &str = "{context}";

pub const SYSTEM_PROMPT: &str = "You are a helpful and knowledgeable medical expert assistant \
designed for question-answering tasks. Use the following pieces of retrieved context to answer \
the question at the end, clearly, accurately, and concisely. Respond in a professional and \
natural tone, as a doctor would explain to a patient or student. Do not start your answers with \
phrases like 'Based on the context' or 'According to the document'. If you don't know the answer \
based on the provided context, respond naturally and honestly - for example, you can say \
'I'm not sure' or 'I don't have that information right now.' Use three sentences maximum to \
answer the question and keep the answer concise and to the point.\n\n{context}";

/// Substitute `passages`, separated by blank lines, into `template`.
///
/// A template without the placeholder gets the passages appended.
#[must_use]
pub fn render_system_prompt<S: AsRef<str>>(template: &str, passages: &[S]) -> String {
    let context = passages
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n\n");
    if template.contains(CONTEXT_PLACEHOLDER) {
        template.replace(CONTEXT_PLACEHOLDER, &context)
    } else {
        format!("{template}\n\n{context}")
    }
}

/// System prompt, then prior turns in order, then the new user message.
#[must_use]
pub fn build_messages(system: String, history: &[HistoryEntry], user: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(system));
    messages.extend(history.iter().map(|entry| match entry.role {
        TurnRole::User => Message::user(entry.text.clone()),
        TurnRole::Assistant => Message::assistant(entry.text.clone()),
    }));
    messages.push(Message::user(user));
    messages
}

#[cfg(test)]
mod tests {
    use medrag_llm::Role;

    use super::*;

    #[test]
    fn default_prompt_has_single_placeholder_at_end() {
        assert_eq!(SYSTEM_PROMPT.matches(CONTEXT_PLACEHOLDER).count(), 1);
        assert!(SYSTEM_PROMPT.ends_with("\n\n{context}"));
        assert!(SYSTEM_PROMPT.contains("three sentences maximum"));
    }

    #[test]
    fn passages_joined_with_blank_lines() {
        let rendered = render_system_prompt("Context:\n{context}", &["one", "two"]);
        assert_eq!(rendered, "Context:\none\n\ntwo");
    }

    #[test]
    fn no_passages_leaves_empty_context() {
        let rendered = render_system_prompt::<&str>("Context:\n{context}", &[]);
        assert_eq!(rendered, "Context:\n");
    }

    #[test]
    fn template_without_placeholder_gets_context_appended() {
        let rendered = render_system_prompt("Be brief.", &["passage"]);
        assert_eq!(rendered, "Be brief.\n\npassage");
    }

    #[test]
    fn messages_order() {
        let history = [
            HistoryEntry::user("What is anemia?"),
            HistoryEntry::assistant("A lack of red blood cells."),
        ];
        let messages = build_messages("sys".into(), &history, "How is it treated?");
        let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            [Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(messages[3].content, "How is it treated?");
    }
}
