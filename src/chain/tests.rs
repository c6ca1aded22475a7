use super::*;
use crate::chat::MockChat;
use crate::embeddings::{HashingEmbedder, MockEmbedder};
use crate::retry::RetryConfig;
use crate::splitter::Metadata;
use crate::store::{InMemoryVectorStore, NewRecord, VectorStore};

const DIMENSION: usize = 128;

const REVENUE: &str = "Revenue grew by twelve percent in the third quarter.";
const HIRING: &str = "The company hired forty engineers during the year.";
const WEATHER: &str = "Heavy rain delayed the construction of the new office.";

fn single_attempt() -> RetryPolicy {
    RetryPolicy::from_config(&RetryConfig {
        attempts: 1,
        base_delay_ms: 1,
        timeout_seconds: 5,
    })
}

async fn seeded_store(embedder: &HashingEmbedder) -> Arc<InMemoryVectorStore> {
    let store = Arc::new(InMemoryVectorStore::new(DIMENSION));
    let records = [(REVENUE, "report.pdf"), (HIRING, "people.pdf"), (WEATHER, "site.pdf")]
        .into_iter()
        .map(|(text, file_name)| {
            let mut metadata = Metadata::new();
            metadata.insert(SOURCE_KEY.to_string(), file_name.to_string());
            NewRecord {
                vector: embedder.embed_text(text),
                text: text.to_string(),
                metadata,
            }
        })
        .collect();
    store.add(records).await.expect("should seed store");
    store
}

async fn chain_with(chat: Arc<MockChat>) -> ConversationalChain {
    let embedder = HashingEmbedder::new(DIMENSION).expect("valid dimension");
    let store = seeded_store(&embedder).await;
    let retriever = Retriever::new(Arc::new(embedder), store).with_retry(single_attempt());
    ConversationalChain::new(retriever, chat).with_retry(single_attempt())
}

#[tokio::test]
async fn second_turn_prompt_contains_first_turn_verbatim() {
    let chat = Arc::new(MockChat::with_answer("Twelve percent."));
    let mut chain = chain_with(chat.clone()).await;

    let first = chain
        .ask("How much did revenue grow?")
        .await
        .expect("first question should be answered");
    assert_eq!(first, "Twelve percent.");
    assert_eq!(chain.state(), ChainState::Idle);

    chain
        .ask("And how many engineers were hired?")
        .await
        .expect("second question should be answered");

    let prompt = chat.last_prompt().expect("chat was called");
    assert!(prompt.contains("User: How much did revenue grow?"));
    assert!(prompt.contains("Assistant: Twelve percent."));
    assert!(prompt.ends_with("Question: And how many engineers were hired?"));

    assert_eq!(
        chain.history(),
        &[
            ConversationTurn {
                query: "How much did revenue grow?".to_string(),
                answer: "Twelve percent.".to_string(),
            },
            ConversationTurn {
                query: "And how many engineers were hired?".to_string(),
                answer: "Twelve percent.".to_string(),
            },
        ]
    );
}

#[tokio::test]
async fn prompt_lists_retrieved_chunks_with_their_source() {
    let chat = Arc::new(MockChat::new());
    let mut chain = chain_with(chat.clone()).await;

    let answer = chain
        .ask_with_sources("Revenue grew by twelve percent in the third quarter.")
        .await
        .expect("question should be answered");

    assert_eq!(answer.sources.len(), 2);
    assert_eq!(answer.sources[0].text, REVENUE);

    let prompt = chat.last_prompt().expect("chat was called");
    let expected = format!("[1] (report.pdf) {}", REVENUE);
    assert!(prompt.contains(&expected));
    assert!(prompt.contains("[2] ("));
    assert!(!prompt.contains("Conversation so far"));
}

#[tokio::test]
async fn chat_outage_leaves_history_untouched() {
    let chat = Arc::new(MockChat::with_answer("ok"));
    let mut chain = chain_with(chat.clone()).await;
    chain.ask("first question").await.expect("should answer");

    chat.set_unavailable(true);
    let result = chain.ask("second question").await;

    assert!(matches!(result, Err(RagError::ChatCompletionFailure(_))));
    assert_eq!(chain.state(), ChainState::Idle);
    assert_eq!(chain.history().len(), 1);
    assert_eq!(chain.history()[0].query, "first question");
}

#[tokio::test]
async fn retrieval_outage_never_reaches_chat() {
    let chat = Arc::new(MockChat::new());
    let embedder = Arc::new(MockEmbedder::new(DIMENSION));
    embedder.set_unavailable(true);
    let retriever = Retriever::new(embedder, Arc::new(InMemoryVectorStore::new(DIMENSION)))
        .with_retry(single_attempt());
    let mut chain = ConversationalChain::new(retriever, chat.clone());

    let result = chain.ask("what happened?").await;

    assert!(matches!(result, Err(RagError::EmbeddingFailure(_))));
    assert_eq!(chain.state(), ChainState::Idle);
    assert!(chain.history().is_empty());
    assert!(chat.prompts().is_empty());
}

#[tokio::test]
async fn blank_query_is_rejected_before_any_work() {
    let chat = Arc::new(MockChat::new());
    let mut chain = chain_with(chat.clone()).await;

    assert!(matches!(
        chain.ask(" \n\t").await,
        Err(RagError::InvalidInput(_))
    ));
    assert!(chat.prompts().is_empty());
    assert!(chain.history().is_empty());
}

#[tokio::test]
async fn history_cap_drops_oldest_turns() {
    let chat = Arc::new(MockChat::with_answer("noted"));
    let mut chain = chain_with(chat)
        .await
        .with_history_config(HistoryConfig { max_turns: Some(2) });

    for query in ["one", "two", "three"] {
        chain.ask(query).await.expect("should answer");
    }

    let queries: Vec<&str> = chain.history().iter().map(|t| t.query.as_str()).collect();
    assert_eq!(queries, vec!["two", "three"]);
}

#[tokio::test]
async fn reset_clears_history() {
    let chat = Arc::new(MockChat::with_answer("noted"));
    let mut chain = chain_with(chat.clone()).await;
    chain.ask("remember this").await.expect("should answer");

    chain.reset();
    chain.ask("fresh start").await.expect("should answer");

    assert_eq!(chain.history().len(), 1);
    let prompt = chat.last_prompt().expect("chat was called");
    assert!(!prompt.contains("remember this"));
}

#[test]
fn prompt_without_context_says_so() {
    let prompt = compose_prompt(&[], &[], "Anything?");

    assert!(prompt.contains("(no relevant information was found)"));
    assert!(prompt.ends_with("Question: Anything?"));
}

#[test]
fn unattributed_chunks_are_marked() {
    let source = ScoredRecord {
        id: "1".to_string(),
        text: "loose text".to_string(),
        metadata: Metadata::new(),
        score: 0.5,
    };

    let prompt = compose_prompt(&[], &[source], "q");
    assert!(prompt.contains("[1] (unknown source) loose text"));
}
