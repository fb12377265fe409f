use std::io::Cursor;
use std::path::PathBuf;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use savegame_miner::{DerivationConfig, ExtractorConfig, extract_save, run_pipeline, scan_to_memory};

fn sample_save() -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("sample_save.xml");
    std::fs::read_to_string(path).unwrap()
}

/// The sample save with its event log and an ignored script block padded out
fn inflated_save(log_entries: usize) -> String {
    let base = sample_save();
    let mut entries = String::new();
    let mut script = String::from("  <script>\n");
    for i in 0..log_entries {
        entries.push_str(&format!(
            "    <entry time=\"{}\" category=\"upkeep\" title=\"Hauler {} (BEN-{}) was destroyed.\" text=\"Location: Sector {}&#10;Destroyed by: Xenon\"/>\n",
            2000 + i,
            i,
            i,
            i % 40
        ));
        script.push_str(&format!("    <value name=\"v{}\" value=\"{}\"/>\n", i, i));
    }
    script.push_str("  </script>\n");

    base.replacen("  </log>\n", &format!("{}  </log>\n", entries), 1)
        .replacen("  <universe>\n", &format!("{}  <universe>\n", script), 1)
}

fn scanner_benchmark(c: &mut Criterion) {
    let config = ExtractorConfig::default();
    let mut group = c.benchmark_group("scanner");

    for entries in [1_000usize, 10_000] {
        let save = inflated_save(entries);
        group.throughput(Throughput::Bytes(save.len() as u64));
        group.bench_with_input(BenchmarkId::new("scan_to_memory", entries), &save, |b, save| {
            b.iter(|| black_box(scan_to_memory(Cursor::new(save.as_bytes()), &config).unwrap()))
        });
    }

    group.finish();
}

fn extraction_benchmark(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("bench.xml");
    std::fs::write(&source, inflated_save(10_000)).unwrap();
    let out = dir.path().join("out");
    let extractor = ExtractorConfig::default();
    let derivation = DerivationConfig::default();

    let mut group = c.benchmark_group("extraction");
    group.sample_size(10); // writes every section to disk

    group.bench_function("extract_save", |b| {
        b.iter(|| black_box(extract_save(&source, &out, &extractor).unwrap()))
    });

    extract_save(&source, &out, &extractor).unwrap();
    group.bench_function("run_pipeline", |b| {
        b.iter(|| black_box(run_pipeline(&out, &derivation).unwrap()))
    });

    group.finish();
}

criterion_group!(benches, scanner_benchmark, extraction_benchmark);
criterion_main!(benches);
