use std::sync::Arc;
use tracing::instrument;

use crate::application::services::rag::RetrievedPassage;
use crate::domain::{ports::LlmService, DomainError, Message, MessageRole};
use crate::infrastructure::config::PromptsConfig;

/// Builds prompts from templates and sends them to the LLM.
pub struct QueryService {
    llm: Arc<dyn LlmService>,
    prompts: PromptsConfig,
}

impl QueryService {
    pub fn new(llm: Arc<dyn LlmService>, prompts: PromptsConfig) -> Self {
        Self { llm, prompts }
    }

    pub fn llm_configured(&self) -> bool {
        self.llm.is_configured()
    }

    pub fn document_prompt(&self, document_text: &str, user_query: &str) -> String {
        fill_template(
            &self.prompts.document,
            &[("document_text", document_text), ("user_query", user_query)],
        )
    }

    pub fn chat_prompt(
        &self,
        passages: &[RetrievedPassage],
        history: &[Message],
        user_query: &str,
    ) -> String {
        let context = if passages.is_empty() {
            self.prompts.no_results.clone()
        } else {
            format_passages(passages)
        };

        let history = history
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| format!("{}: {}", m.role.as_str(), m.content))
            .collect::<Vec<_>>()
            .join("\n");
        let history = if history.is_empty() {
            String::new()
        } else {
            format!("Previous conversation:\n{history}\n\n")
        };

        fill_template(
            &self.prompts.chat,
            &[
                ("context", context.as_str()),
                ("history", history.as_str()),
                ("user_query", user_query),
            ],
        )
    }

    /// Direct flow: the whole document text and the question in one prompt.
    #[instrument(skip(self, document_text), fields(document_chars = document_text.len()))]
    pub async fn ask_document(
        &self,
        document_text: &str,
        user_query: &str,
    ) -> Result<String, DomainError> {
        let prompt = self.document_prompt(document_text, user_query);
        self.llm.complete(&prompt).await
    }

    /// Chat flow: retrieved passages and prior turns as context.
    #[instrument(skip(self, passages, history), fields(passages = passages.len()))]
    pub async fn ask_with_context(
        &self,
        passages: &[RetrievedPassage],
        history: &[Message],
        user_query: &str,
    ) -> Result<String, DomainError> {
        let prompt = self.chat_prompt(passages, history, user_query);
        self.llm.complete(&prompt).await
    }

    /// Retrieval-only answer, used when no LLM credential is configured.
    pub fn passages_answer(&self, passages: &[RetrievedPassage]) -> String {
        if passages.is_empty() {
            self.prompts.no_results.clone()
        } else {
            format_passages(passages)
        }
    }
}

/// Substitutes `{name}` placeholders in one pass; inserted values are never
/// rescanned, and unknown braces are kept as written.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let matched = values.iter().find(|(name, _)| {
            tail[1..]
                .strip_prefix(name)
                .is_some_and(|after| after.starts_with('}'))
        });
        match matched {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 2..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn format_passages(passages: &[RetrievedPassage]) -> String {
    passages
        .iter()
        .enumerate()
        .map(|(i, p)| match &p.source {
            Some(source) => format!("[{}] ({}) {}", i + 1, source, p.content),
            None => format!("[{}] {}", i + 1, p.content),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
