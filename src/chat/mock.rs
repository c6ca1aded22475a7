use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use super::ChatProvider;
use crate::{RagError, Result};

/// Chat provider for tests: records every prompt and answers with a fixed
/// prefix followed by the prompt length
#[derive(Debug, Default)]
pub struct MockChat {
    prompts: Mutex<Vec<String>>,
    answer: Option<String>,
    unavailable: AtomicBool,
}

impl MockChat {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer with `answer`
    #[inline]
    pub fn with_answer(answer: impl Into<String>) -> Self {
        Self {
            answer: Some(answer.into()),
            ..Self::default()
        }
    }

    #[inline]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Prompts received so far, oldest first
    #[inline]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }

    #[inline]
    pub fn last_prompt(&self) -> Option<String> {
        self.prompts().pop()
    }
}

#[async_trait]
impl ChatProvider for MockChat {
    #[inline]
    async fn complete(&self, prompt: &str) -> Result<String> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RagError::ChatCompletionFailure(
                "mock chat unavailable".to_string(),
            ));
        }

        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        Ok(self
            .answer
            .clone()
            .unwrap_or_else(|| format!("answer to a {} character prompt", prompt.chars().count())))
    }
}
