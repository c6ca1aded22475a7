// Chat module
// Prompt-to-answer capability and its implementations

pub mod mock;
pub mod openai;

use async_trait::async_trait;

use crate::Result;

pub use mock::MockChat;
pub use openai::OpenAiClient;

/// Produces an answer for a fully composed prompt.
///
/// Unreachable or failing services are reported as
/// [`crate::RagError::ChatCompletionFailure`].
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}
