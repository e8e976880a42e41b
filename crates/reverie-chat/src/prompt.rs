//! Prompt assembly for the generation service.
//!
//! Builds the full prompt from the system preamble, retrieved context
//! documents, the session's rolling history, and the user's query.

use std::fmt::Write;

use reverie_store::RetrievedDocument;

use crate::context::ConversationWindow;

/// Default system preamble for the assistant persona.
pub const SYSTEM_PROMPT: &str = "You are a friendly and helpful assistant. Be warm, polite, and \
     conversational while providing accurate information. If you reference \
     documents, mention which ones you are using. Keep responses concise \
     but helpful.";

/// Reply guidelines placed between the query and the response cue.
const GUIDELINES: &str = "Guidelines:\n\
    1. Respond conversationally using \"I\" and \"you\"\n\
    2. If using documents, mention relevant ones briefly\n\
    3. Keep responses under 3 sentences unless more is needed\n\
    4. Be polite and helpful\n\
    5. If unsure, say so but still try to help\n";

/// Assembles generation prompts from query, context, and history.
pub struct PromptBuilder {
    system_prompt: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptBuilder {
    /// Create a builder with the default system preamble.
    pub fn new() -> Self {
        Self {
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }

    /// Create a builder with a custom system preamble.
    pub fn with_system_prompt(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
        }
    }

    /// Build the full prompt string.
    pub fn build(
        &self,
        query: &str,
        context: &[RetrievedDocument],
        history: &ConversationWindow,
    ) -> String {
        let mut prompt = String::new();
        let _ = writeln!(prompt, "System: {}", self.system_prompt);
        prompt.push('\n');

        prompt.push_str("Context Documents:\n");
        if context.is_empty() {
            prompt.push_str("No matching documents were found.\n");
        } else {
            for doc in context {
                let _ = writeln!(
                    prompt,
                    "Document {} ({}):\n{}\n----",
                    doc.doc_id,
                    doc.timestamp.to_rfc3339(),
                    doc.text
                );
            }
        }
        prompt.push('\n');

        prompt.push_str("Conversation History:\n");
        for turn in history.turns() {
            match &turn.attachment {
                Some(attachment) => {
                    let _ = writeln!(
                        prompt,
                        "{}: {} [attachment: {}]",
                        turn.role.as_str(),
                        turn.text,
                        attachment
                    );
                }
                None => {
                    let _ = writeln!(prompt, "{}: {}", turn.role.as_str(), turn.text);
                }
            }
        }
        prompt.push('\n');

        let _ = writeln!(prompt, "User Query: {}", query);
        prompt.push('\n');
        prompt.push_str(GUIDELINES);
        prompt.push('\n');
        prompt.push_str("Assistant Response:");
        prompt
    }
}
