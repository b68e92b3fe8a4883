use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use gitbridge::git::parser::{StatusParser, parse_commits, parse_refs};

fn status_output(entries: usize) -> Vec<u8> {
    let mut raw = Vec::new();
    for i in 0..entries {
        match i % 4 {
            0 => raw.extend_from_slice(format!(" M src/module_{}/lib.rs\0", i).as_bytes()),
            1 => raw.extend_from_slice(format!("?? notes/draft {}.md\0", i).as_bytes()),
            2 => raw.extend_from_slice(format!("R  renamed_{}.rs\0original_{}.rs\0", i, i).as_bytes()),
            _ => raw.extend_from_slice(format!("A  added_{}.txt\0", i).as_bytes()),
        }
    }
    raw
}

fn log_output(commits: usize) -> String {
    (0..commits)
        .map(|i| {
            format!(
                "{:040x}\nJane Doe\njane@example.com\n{}\n{}\n{:040x}\nCommit number {}\n\nWith a body line.\n\0",
                i + 1,
                1_700_000_000 + i,
                1_700_000_000 + i,
                i,
                i
            )
        })
        .collect()
}

fn ref_output(refs: usize) -> String {
    (0..refs)
        .map(|i| match i % 3 {
            0 => format!("refs/heads/branch-{} {:040x} \n", i, i),
            1 => format!("refs/remotes/origin/branch-{} {:040x} \n", i, i),
            _ => format!("refs/tags/v{} {:040x} {:040x}\n", i, i, i + 1),
        })
        .collect()
}

fn bench_status(c: &mut Criterion) {
    let mut group = c.benchmark_group("status_parser");

    for entries in [100, 5000] {
        let raw = status_output(entries);
        group.throughput(Throughput::Bytes(raw.len() as u64));

        group.bench_with_input(BenchmarkId::new("single_chunk", entries), &raw, |b, raw| {
            b.iter(|| {
                let mut parser = StatusParser::new();
                parser.update(black_box(raw));
                parser.len()
            })
        });

        // Pipe-sized reads split records at arbitrary points
        group.bench_with_input(BenchmarkId::new("chunks_of_64k", entries), &raw, |b, raw| {
            b.iter(|| {
                let mut parser = StatusParser::new();
                for chunk in raw.chunks(65_536) {
                    parser.update(black_box(chunk));
                }
                parser.len()
            })
        });
    }

    group.finish();
}

fn bench_log(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_commits");

    for commits in [32, 1000] {
        let output = log_output(commits);
        group.bench_with_input(BenchmarkId::from_parameter(commits), &output, |b, output| {
            b.iter(|| parse_commits(black_box(output)))
        });
    }

    group.finish();
}

fn bench_refs(c: &mut Criterion) {
    let output = ref_output(1000);
    c.bench_function("parse_refs_1000", |b| b.iter(|| parse_refs(black_box(&output))));
}

criterion_group!(benches, bench_status, bench_log, bench_refs);
criterion_main!(benches);
