use criterion::{Criterion, criterion_group, criterion_main};
use pdf_chat::internal::splitter::{Document, DocumentSplitter, SplitterConfig};
use std::hint::black_box;

fn sample_text() -> String {
    let paragraph = "Retrieval-augmented generation pairs a language model with a search index. \
        Documents are split into chunks, every chunk is embedded, and the closest chunks are \
        added to the prompt! Does it help? Usually it does.\n\n";
    paragraph.repeat(200)
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let document = Document::new(sample_text());

    let disjoint = DocumentSplitter::new(SplitterConfig::default()).expect("valid config");
    c.bench_function("split_300_no_overlap", |b| {
        b.iter(|| disjoint.split(black_box(&document)))
    });

    let overlapping = DocumentSplitter::new(SplitterConfig {
        chunk_size: 500,
        chunk_overlap: 50,
    })
    .expect("valid config");
    c.bench_function("split_500_overlap_50", |b| {
        b.iter(|| overlapping.split(black_box(&document)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
