//! B-tree benchmarks for esedb
//!
//! These benchmarks measure point lookups and ordered scans over an
//! in-memory two-level tree, and raw key comparison.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box as hint_black_box;

use esedb::btree::TreeNavigator;
use esedb::config::DecodeContext;
use esedb::encoding::compare;
use esedb::storage::MemoryPageSource;

const PAGE_SIZE: usize = 8192;
const ROOT_PAGE: u32 = 4;
const FIRST_LEAF: u32 = 10;
const KEYS_PER_LEAF: u32 = 100;

const ROOT: u32 = 0x0001;
const LEAF: u32 = 0x0002;
const PARENT: u32 = 0x0004;

fn page(flags: u32, next: u32, values: &[Vec<u8>]) -> Vec<u8> {
    let mut page = vec![0u8; PAGE_SIZE];
    page[20..24].copy_from_slice(&next.to_le_bytes());
    page[34..36].copy_from_slice(&((values.len() + 1) as u16).to_le_bytes());
    page[36..40].copy_from_slice(&flags.to_le_bytes());

    let mut offset = 0usize;
    let external_header: Vec<u8> = Vec::new();
    let tags = std::iter::once(&external_header).chain(values.iter());
    for (i, value) in tags.enumerate() {
        page[40 + offset..40 + offset + value.len()].copy_from_slice(value);
        let tag = PAGE_SIZE - 4 * (i + 1);
        page[tag..tag + 2].copy_from_slice(&(value.len() as u16).to_le_bytes());
        page[tag + 2..tag + 4].copy_from_slice(&(offset as u16).to_le_bytes());
        offset += value.len();
    }
    page
}

fn entry(key: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut out = (key.len() as u16).to_le_bytes().to_vec();
    out.extend_from_slice(key);
    out.extend_from_slice(payload);
    out
}

fn key(n: u32) -> [u8; 4] {
    (0x8000_0000 | n).to_be_bytes()
}

/// Root branch over `leaves` linked leaves of `KEYS_PER_LEAF` keys each.
fn build_tree(leaves: u32) -> MemoryPageSource {
    let mut source = MemoryPageSource::new(PAGE_SIZE);
    let mut branches = Vec::new();

    for leaf in 0..leaves {
        let first = leaf * KEYS_PER_LEAF;
        let values: Vec<Vec<u8>> = (first..first + KEYS_PER_LEAF)
            .map(|n| entry(&key(n), &[0x11; 24]))
            .collect();
        let next = if leaf + 1 < leaves { FIRST_LEAF + leaf + 1 } else { 0 };
        source.set_page(FIRST_LEAF + leaf, page(LEAF, next, &values)).unwrap();

        let separator = if leaf + 1 < leaves {
            key(first + KEYS_PER_LEAF - 1).to_vec()
        } else {
            Vec::new()
        };
        branches.push(entry(&separator, &(FIRST_LEAF + leaf).to_le_bytes()));
    }

    source.set_page(ROOT_PAGE, page(ROOT | PARENT, 0, &branches)).unwrap();
    source
}

fn bench_find_leaf(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree_find_leaf");
    let ctx = DecodeContext::default();

    for leaves in [1u32, 8, 40].iter() {
        let source = build_tree(*leaves);
        let navigator = TreeNavigator::new(&source, &ctx);
        let total = leaves * KEYS_PER_LEAF;

        group.bench_with_input(BenchmarkId::new("hit", total), &total, |b, &total| {
            let mut n = 0u32;
            b.iter(|| {
                n = (n + 7919) % total;
                hint_black_box(navigator.find_leaf(ROOT_PAGE, black_box(&key(n)), false).unwrap())
            });
        });

        group.bench_with_input(BenchmarkId::new("miss", total), &total, |b, &total| {
            b.iter(|| hint_black_box(navigator.find_leaf(ROOT_PAGE, black_box(&key(total + 1)), false).unwrap()));
        });
    }

    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree_scan");
    let ctx = DecodeContext::default();

    for leaves in [8u32, 40].iter() {
        let source = build_tree(*leaves);
        let navigator = TreeNavigator::new(&source, &ctx);
        let total = leaves * KEYS_PER_LEAF;

        group.throughput(Throughput::Elements(total as u64));
        group.bench_with_input(BenchmarkId::new("leaf_values", total), &total, |b, _| {
            b.iter(|| {
                let count = navigator
                    .leaf_values(ROOT_PAGE)
                    .unwrap()
                    .filter_map(Result::ok)
                    .count();
                hint_black_box(count)
            });
        });
    }

    group.finish();
}

fn bench_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_compare");
    let a = [0x7fu8, 0x80, 0x00, 0x12, 0x34, 0x56, 0x78, 0x9a];
    let b_key = [0x7fu8, 0x80, 0x00, 0x12, 0x34, 0x56, 0x78, 0x9b];

    group.bench_function("normal", |b| {
        b.iter(|| hint_black_box(compare(black_box(&a), black_box(&b_key), false)));
    });

    group.bench_function("reversed", |b| {
        b.iter(|| hint_black_box(compare(black_box(&a), black_box(&b_key), true)));
    });

    group.finish();
}

criterion_group!(benches, bench_find_leaf, bench_scan, bench_compare);
criterion_main!(benches);
