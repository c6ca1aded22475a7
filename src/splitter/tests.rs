use super::*;

fn document(text: &str) -> Document {
    let mut metadata = Metadata::new();
    metadata.insert("file_name".to_string(), "test.txt".to_string());
    Document::with_metadata(text, metadata)
}

fn reconstruct(chunks: &[Chunk<'_>]) -> String {
    chunks.iter().map(Chunk::core_text).collect()
}

fn sample_text() -> String {
    let mut text = String::new();
    text.push_str("Retrieval augmented generation pairs a search step with a language model. ");
    text.push_str("The search step finds passages that look relevant to the question.\n\n");
    text.push_str("Passages are stored as vectors. Each vector comes from an embedding model, ");
    text.push_str("and similar meaning gives similar vectors!\n\n");
    text.push_str("Answers are grounded in the passages? That is the goal. ");
    text.push_str(&"Long filler words keep going without much structure at all ".repeat(8));
    text
}

#[test]
fn cat_and_dog_scenario() {
    let doc = document("The cat sat. The dog ran.");

    let chunks = split(&doc, 20, 5).expect("split should succeed");

    assert!(chunks.len() >= 2);
    for chunk in &chunks {
        assert!(chunk.text.chars().count() <= 20);
    }

    let first_tail: String = {
        let chars: Vec<char> = chunks[0].text.chars().collect();
        chars[chars.len() - 5..].iter().collect()
    };
    assert!(chunks[1].text.starts_with(&first_tail));
    assert_eq!(chunks[0].text, "The cat sat. ");
    assert_eq!(chunks[1].text, "sat. The dog ran.");
}

#[test]
fn chunks_respect_max_size() {
    let doc = document(&sample_text());

    for (size, overlap) in [(40, 0), (40, 10), (100, 25), (300, 0), (7, 3)] {
        let chunks = split(&doc, size, overlap).expect("split should succeed");
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(
                chunk.char_len() <= size,
                "chunk of {} chars exceeds {}",
                chunk.char_len(),
                size
            );
            assert_eq!(chunk.text.chars().count(), chunk.char_len());
        }
    }
}

#[test]
fn core_text_reconstructs_document() {
    let text = sample_text();
    let doc = document(&text);

    for (size, overlap) in [(40, 0), (40, 10), (100, 25), (13, 12), (1, 0)] {
        let chunks = split(&doc, size, overlap).expect("split should succeed");
        assert_eq!(reconstruct(&chunks), text, "size {size} overlap {overlap}");
    }
}

#[test]
fn adjacent_chunks_overlap_exactly() {
    let doc = document(&sample_text());
    let chunks = split(&doc, 60, 15).expect("split should succeed");

    for pair in chunks.windows(2) {
        assert_eq!(pair[1].start, pair[0].end - 15);
        assert_eq!(pair[1].overlap, 15);
    }
    assert_eq!(chunks[0].overlap, 0);
}

#[test]
fn prefers_paragraph_boundaries() {
    let doc = document("First paragraph here.\n\nSecond paragraph is here.");
    let chunks = split(&doc, 30, 0).expect("split should succeed");

    assert_eq!(chunks[0].text, "First paragraph here.\n\n");
    assert_eq!(chunks[1].text, "Second paragraph is here.");
}

#[test]
fn falls_back_to_words_then_hard_split() {
    let doc = document("alpha beta gamma delta");
    let chunks = split(&doc, 12, 0).expect("split should succeed");
    assert_eq!(chunks[0].text, "alpha beta ");

    let doc = document("abcdefghijklmnopqrstuvwxyz");
    let chunks = split(&doc, 10, 0).expect("split should succeed");
    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["abcdefghij", "klmnopqrst", "uvwxyz"]);
}

#[test]
fn multibyte_text_is_split_on_char_boundaries() {
    let text = "héllo wörld ünïcode tëxt ".repeat(5);
    let doc = document(&text);
    let chunks = split(&doc, 9, 2).expect("split should succeed");

    assert_eq!(reconstruct(&chunks), text);
    assert!(chunks.iter().all(|c| c.text.chars().count() <= 9));
}

#[test]
fn empty_document_yields_no_chunks() {
    let empty = document("");
    let chunks = split(&empty, 20, 5).expect("split should succeed");
    assert!(chunks.is_empty());

    let blank = document("  \n\n ");
    let chunks = split(&blank, 20, 5).expect("split should succeed");
    assert!(chunks.is_empty());
}

#[test]
fn chunks_reference_document_metadata() {
    let doc = document(&sample_text());
    let chunks = split(&doc, 50, 0).expect("split should succeed");

    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.index, i);
        assert!(std::ptr::eq(chunk.metadata, doc.metadata()));
    }
}

#[test]
fn split_is_restartable() {
    let doc = document(&sample_text());
    let splitter = DocumentSplitter::new(SplitterConfig {
        chunk_size: 45,
        chunk_overlap: 5,
    })
    .expect("config should be valid");

    assert_eq!(splitter.split(&doc), splitter.split(&doc));
}

#[test]
fn invalid_parameters_are_rejected() {
    let doc = document("text");

    assert!(matches!(split(&doc, 0, 0), Err(RagError::InvalidInput(_))));
    assert!(matches!(split(&doc, 10, 10), Err(RagError::InvalidInput(_))));
    assert!(matches!(split(&doc, 10, 11), Err(RagError::InvalidInput(_))));
    assert!(
        DocumentSplitter::new(SplitterConfig {
            chunk_size: 5,
            chunk_overlap: 5,
        })
        .is_err()
    );
}

#[test]
fn default_config_matches_original_wiring() {
    let config = SplitterConfig::default();
    assert_eq!(config.chunk_size, 300);
    assert_eq!(config.chunk_overlap, 0);
}
