//! AI feedback provider seam.
//!
//! The provider hands back the normalized textual payload of its response;
//! any failure to produce one (transport error, error status, empty content)
//! is reported as `LlmError` and treated by the pipeline as "unavailable".

use async_trait::async_trait;

use crate::analysis::prompts::{build_feedback_prompt, FEEDBACK_SYSTEM};
use crate::llm_client::{LlmClient, LlmError};

#[async_trait]
pub trait FeedbackProvider: Send + Sync {
    async fn request_feedback(
        &self,
        extracted_text: &str,
        instructions: &str,
    ) -> Result<String, LlmError>;
}

#[async_trait]
impl FeedbackProvider for LlmClient {
    async fn request_feedback(
        &self,
        extracted_text: &str,
        instructions: &str,
    ) -> Result<String, LlmError> {
        let prompt = build_feedback_prompt(instructions, extracted_text);
        let response = self.call(&prompt, FEEDBACK_SYSTEM).await?;
        response
            .text()
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }
}
