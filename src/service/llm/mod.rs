//! Large-language-model collaborator.
//!
//! The model is treated as a fallible text generator: callers get raw
//! text back and recover structure with [`json_repair`].

mod gemini;
pub mod json_repair;

pub use gemini::{GeminiClient, GeminiSettings};

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// One completion, no retries. Transport and API failures surface as
    /// `ServiceError`.
    async fn complete(&self, system_prompt: &str, user_prompt: &str, max_tokens: u32) -> Result<String>;

    /// Human-readable name for this client.
    fn name(&self) -> &'static str;
}
