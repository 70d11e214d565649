//! Prompt assembly: retrieved chunks are folded into the system instruction,
//! the user's question is sent verbatim as the user turn.

use crate::types::SearchResult;

/// Placeholder replaced by the retrieved context.
pub const CONTEXT_PLACEHOLDER: &str = "{context}";

/// System instruction used when none is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a medical assistant for question-answering tasks. \
Use the following pieces of retrieved context to answer the question. \
If you don't know the answer, say that you don't know. \
Use three sentences maximum and keep the answer concise.\n\n{context}";

/// A system/user message pair ready for the LLM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    pub system: String,
    pub user: String,
}

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    system_template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

impl PromptTemplate {
    pub fn new(system_template: impl Into<String>) -> Self {
        Self {
            system_template: system_template.into(),
        }
    }

    /// Build the prompt for `query` from the retrieved `context`, in rank order.
    pub fn assemble(&self, query: &str, context: &[SearchResult]) -> AssembledPrompt {
        let joined = context
            .iter()
            .map(|result| result.content.trim())
            .filter(|content| !content.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        let system = if self.system_template.contains(CONTEXT_PLACEHOLDER) {
            self.system_template.replace(CONTEXT_PLACEHOLDER, &joined)
        } else if joined.is_empty() {
            self.system_template.clone()
        } else {
            format!("{}\n\n{}", self.system_template, joined)
        };

        AssembledPrompt {
            system,
            user: query.to_string(),
        }
    }
}
