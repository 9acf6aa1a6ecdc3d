use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use bucket_inspector::snapshot::{Issue, Snapshot};
use bucket_inspector::store::diff;
use bucket_inspector::store::memory::MemoryStore;
use bucket_inspector::store::whitelist::Whitelist;
use bucket_inspector::store::{SnapshotStore, DEFAULT_HORIZON};
use std::collections::BTreeMap;

/// Fixture generator for snapshots of a given size
mod fixtures {
    use super::*;

    const KINDS: [&str; 4] = [
        "PubliclyListableBucketIssue",
        "PubliclyReadableFileIssue",
        "PubliclyUploadableBucketIssue",
        "PubliclyDeletableBucketIssue",
    ];

    /// `count` issues spread over the four kinds; `offset` shifts the bucket
    /// names so two snapshots overlap partially.
    pub fn snapshot(count: usize, offset: usize) -> Snapshot {
        let issues = (0..count)
            .map(|i| {
                Issue::new(KINDS[i % KINDS.len()], format!("bucket-{:06}", i + offset))
                    .with_help("Bucket is publicly accessible")
                    .with_extra("key", format!("data/{i}.csv"))
            })
            .collect();

        Snapshot {
            start_time: Utc::now(),
            end_time: Utc::now(),
            checks_run: Vec::new(),
            issues,
            external_context: BTreeMap::new(),
        }
    }

    /// Every tenth issue of a snapshot from `snapshot(count, 0)`.
    pub fn whitelist(count: usize) -> Whitelist {
        snapshot(count, 0)
            .issues
            .iter()
            .step_by(10)
            .map(Issue::id)
            .collect()
    }
}

fn bench_identity_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("issue_identity_set");

    for size in [100, 1_000, 10_000] {
        let snapshot = fixtures::snapshot(size, 0);
        group.bench_with_input(BenchmarkId::new("issues", size), &snapshot, |b, snapshot| {
            b.iter(|| diff::issue_identity_set(black_box(snapshot)));
        });
    }

    group.finish();
}

fn bench_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff");

    for size in [100, 1_000, 10_000] {
        let previous = fixtures::snapshot(size, 0);
        let current = fixtures::snapshot(size, size / 4);
        let whitelist = fixtures::whitelist(size);

        group.bench_with_input(BenchmarkId::new("no_whitelist", size), &size, |b, _| {
            b.iter(|| diff::diff(black_box(&current), Some(&previous), None));
        });
        group.bench_with_input(BenchmarkId::new("whitelisted", size), &size, |b, _| {
            b.iter(|| diff::diff(black_box(&current), Some(&previous), Some(&whitelist)));
        });
    }

    group.finish();
}

fn bench_resolve_previous(c: &mut Criterion) {
    c.bench_function("resolve_previous_memory_store", |b| {
        let store = SnapshotStore::new(MemoryStore::new());
        let mut last_key = String::new();
        let now = Utc::now();
        for i in (0..50).rev() {
            let mut snapshot = fixtures::snapshot(200, 0);
            snapshot.end_time = now - chrono::Duration::minutes(i);
            last_key = store.put(&snapshot).expect("Failed to store snapshot");
        }

        b.iter(|| {
            let previous = store
                .resolve_previous(black_box(&last_key), DEFAULT_HORIZON)
                .expect("Failed to resolve previous snapshot");
            black_box(previous)
        });
    });
}

criterion_group!(benches, bench_identity_set, bench_diff, bench_resolve_previous);
criterion_main!(benches);
