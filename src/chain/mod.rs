// Chain module
// Conversational retrieval: history + retrieved chunks -> prompt -> answer

#[cfg(test)]
mod tests;

use std::fmt::Write as _;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::chat::ChatProvider;
use crate::retriever::Retriever;
use crate::retry::{Capability, RetryPolicy};
use crate::store::ScoredRecord;
use crate::{RagError, Result};

/// Metadata key used to attribute a chunk in the prompt
pub const SOURCE_KEY: &str = "file_name";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct HistoryConfig {
    /// Oldest turns are dropped beyond this many. Unbounded when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub query: String,
    pub answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainState {
    #[default]
    Idle,
    Retrieving,
    Composing,
    Answered,
}

/// An answer together with the chunks it was grounded on
#[derive(Debug, Clone, PartialEq)]
pub struct ChainAnswer {
    pub answer: String,
    pub sources: Vec<ScoredRecord>,
}

/// One conversation session. Sessions own their history; run several in
/// parallel by creating several chains over the same retriever.
pub struct ConversationalChain {
    retriever: Retriever,
    chat: Arc<dyn ChatProvider>,
    history: Vec<ConversationTurn>,
    config: HistoryConfig,
    retry: RetryPolicy,
    state: ChainState,
}

impl ConversationalChain {
    #[inline]
    pub fn new(retriever: Retriever, chat: Arc<dyn ChatProvider>) -> Self {
        Self {
            retriever,
            chat,
            history: Vec::new(),
            config: HistoryConfig::default(),
            retry: RetryPolicy::default(),
            state: ChainState::Idle,
        }
    }

    #[inline]
    pub fn with_history_config(mut self, config: HistoryConfig) -> Self {
        self.config = config;
        self
    }

    #[inline]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[inline]
    pub const fn state(&self) -> ChainState {
        self.state
    }

    /// Completed turns, oldest first
    #[inline]
    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    /// Forget the conversation so far
    #[inline]
    pub fn reset(&mut self) {
        debug!("Clearing {} turns of history", self.history.len());
        self.history.clear();
        self.state = ChainState::Idle;
    }

    #[inline]
    pub async fn ask(&mut self, query: &str) -> Result<String> {
        self.ask_with_sources(query).await.map(|answer| answer.answer)
    }

    /// Answer `query` and record the turn. On failure the history is left
    /// exactly as it was.
    #[inline]
    pub async fn ask_with_sources(&mut self, query: &str) -> Result<ChainAnswer> {
        if query.trim().is_empty() {
            return Err(RagError::InvalidInput("query must not be empty".to_string()));
        }

        self.transition(ChainState::Retrieving);
        let retrieved = self.retriever.retrieve_default(query).await;
        let sources = match retrieved {
            Ok(sources) => sources,
            Err(error) => return Err(self.fail(error)),
        };

        self.transition(ChainState::Composing);
        let prompt = compose_prompt(&self.history, &sources, query);

        let chat = &self.chat;
        let prompt_ref = prompt.as_str();
        let completion = self
            .retry
            .run(Capability::Chat, move || chat.complete(prompt_ref))
            .await;
        let answer = match completion {
            Ok(answer) => answer,
            Err(error) => return Err(self.fail(error)),
        };

        self.transition(ChainState::Answered);
        self.history.push(ConversationTurn {
            query: query.to_string(),
            answer: answer.clone(),
        });
        self.enforce_history_limit();

        info!(
            "Answered query using {} retrieved chunks ({} turns in history)",
            sources.len(),
            self.history.len()
        );

        self.transition(ChainState::Idle);
        Ok(ChainAnswer { answer, sources })
    }

    fn transition(&mut self, next: ChainState) {
        debug!("Chain state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn fail(&mut self, error: RagError) -> RagError {
        warn!("Query failed while {:?}: {}", self.state, error);
        self.transition(ChainState::Idle);
        error
    }

    fn enforce_history_limit(&mut self) {
        if let Some(max_turns) = self.config.max_turns {
            let excess = self.history.len().saturating_sub(max_turns);
            if excess > 0 {
                self.history.drain(..excess);
            }
        }
    }
}

/// Build the completion prompt: prior turns verbatim, then the retrieved
/// chunks in ranked order with their source, then the new question
#[inline]
pub fn compose_prompt(history: &[ConversationTurn], sources: &[ScoredRecord], query: &str) -> String {
    let mut prompt = String::from("Answer the following question to the best of your ability.\n");

    if !history.is_empty() {
        prompt.push_str("\nConversation so far:\n");
        for turn in history {
            let _ = writeln!(prompt, "User: {}", turn.query);
            let _ = writeln!(prompt, "Assistant: {}", turn.answer);
        }
    }

    prompt.push_str("\nBase your answer on the following information:\n");
    if sources.is_empty() {
        prompt.push_str("(no relevant information was found)\n");
    }
    for (rank, source) in sources.iter().enumerate() {
        let origin = source
            .metadata
            .get(SOURCE_KEY)
            .map_or("unknown source", String::as_str);
        let _ = writeln!(prompt, "[{}] ({}) {}", rank + 1, origin, source.text);
    }

    let _ = write!(prompt, "\nQuestion: {}", query);
    prompt
}
