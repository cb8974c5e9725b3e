use crate::domain::errors::DomainError;
use async_trait::async_trait;

#[async_trait]
pub trait LlmService: Send + Sync {
    /// Sends `prompt` as a single user message and returns the generated text.
    async fn complete(&self, prompt: &str) -> Result<String, DomainError>;

    /// Whether a credential is configured. Callers use this to skip the
    /// remote call entirely.
    fn is_configured(&self) -> bool;
}
