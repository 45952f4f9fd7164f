use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use medrag_memory::document::{
    Document, DocumentMetadata, SplitStrategy, SplitterConfig, TextSplitter,
};

fn generate_text(size: usize) -> String {
    let paragraph = "Hypertension, or high blood pressure, is a condition in which the \
                     force of the blood against the artery walls is too high.\n\
                     Treatment includes lifestyle changes and medication.\n\n";
    let text = paragraph.repeat(size / paragraph.len() + 1);
    text[..size].to_string()
}

fn split(c: &mut Criterion) {
    for (name, strategy) in [
        ("recursive", SplitStrategy::Recursive),
        ("sentence", SplitStrategy::Sentence),
        ("chars", SplitStrategy::Chars),
    ] {
        let mut group = c.benchmark_group(format!("split_{name}"));
        let splitter = TextSplitter::new(SplitterConfig {
            strategy,
            ..SplitterConfig::default()
        });

        for size in [10_000, 100_000] {
            let doc = Document {
                content: generate_text(size),
                metadata: DocumentMetadata::new("bench.pdf", "application/pdf"),
            };
            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(BenchmarkId::from_parameter(size), &doc, |b, doc| {
                b.iter(|| splitter.split(black_box(doc)));
            });
        }

        group.finish();
    }
}

criterion_group!(benches, split);
criterion_main!(benches);
