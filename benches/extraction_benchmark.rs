/// Benchmarks for document decoding and history extraction
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use doc_history::decoder::DocumentDecoder;
use doc_history::{Config, HistoryExtractor, MemoryObjectStore, ProgressReporter};
use std::io::{Cursor, Write};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

/// Helper to build a document archive with `paragraphs` paragraphs
fn create_document(seed: usize, paragraphs: usize) -> Vec<u8> {
    let mut xml = String::from("<document>");
    for p in 0..paragraphs {
        xml.push_str(&format!(
            "<p style=\"body\">Paragraph {p} of revision {seed} &amp; <b>some</b> text</p>"
        ));
        if p % 10 == 0 {
            xml.push_str(&format!("<string>Label {p}</string>"));
        }
    }
    xml.push_str("</document>");

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("Content.xml", zip::write::FileOptions::default())
        .unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

/// Helper to build a store where each of `files` documents changes every
/// third commit
fn create_store(commits: usize, files: usize) -> MemoryObjectStore {
    let mut store = MemoryObjectStore::new();
    let mut contents: Vec<Vec<u8>> = (0..files).map(|f| create_document(f, 50)).collect();
    let paths: Vec<String> = (0..files).map(|f| format!("book/chapter_{f}.ulyz")).collect();

    for c in 0..commits {
        for (f, content) in contents.iter_mut().enumerate() {
            if (c + f) % 3 == 0 {
                *content = create_document(c * files + f, 50);
            }
        }
        let snapshot: Vec<(&str, &[u8])> = paths
            .iter()
            .map(String::as_str)
            .zip(contents.iter().map(Vec::as_slice))
            .collect();
        let timestamp = chrono::DateTime::from_timestamp(1_700_000_000 + c as i64 * 60, 0).unwrap();
        store.commit(timestamp, "Bench", &format!("commit {c}"), &snapshot);
    }

    store
}

fn benchmark_decoding(c: &mut Criterion) {
    let decoder = DocumentDecoder::default();
    let mut group = c.benchmark_group("decoding");

    for paragraphs in [10, 100, 1000].iter() {
        let bytes = create_document(0, *paragraphs);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_paragraphs", paragraphs)),
            &bytes,
            |b, bytes| b.iter(|| decoder.decode(black_box(bytes))),
        );
    }

    group.finish();
}

fn benchmark_extraction(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("extraction");

    for (commits, files) in [(50, 5), (200, 10), (500, 20)].iter() {
        let store = Arc::new(create_store(*commits, *files));
        let config = Config::default();
        let selection: Vec<String> = Vec::new();

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_commits_{}_files", commits, files)),
            &store,
            |b, store| {
                b.iter(|| {
                    rt.block_on(async {
                        HistoryExtractor::new(store.clone(), &config)
                            .extract(
                                black_box(selection.as_slice()),
                                &ProgressReporter::disabled(),
                                &CancellationToken::new(),
                            )
                            .await
                            .unwrap()
                    })
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_decoding, benchmark_extraction);
criterion_main!(benches);
