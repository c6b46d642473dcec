//! Performance benchmarks for route search.
//!
//! Run with: `cargo bench --bench search`
//!
//! ## Workloads
//!
//! | Operation | Graph | Notes |
//! |-----------|-------|-------|
//! | Plain Dijkstra | n×n grid | Full tree from one corner |
//! | k-path propagation | n×n grid | k labels per vertex |
//! | Reduction | n×n junction grid | Build + reduce |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::collections::BTreeSet;

use route_kernel::search::kpaths;
use route_kernel::{Edge, GraphReducer, Network, PlainDijkstra, SearchBackend, VertexId};

/// Bidirectional grid with varied travel times.
fn grid(n: usize) -> Network {
    let mut net = Network::new();
    let ids: Vec<VertexId> = (0..n * n).map(|i| net.new_labelled_vertex(format!("J{i}"))).collect();
    let add = |net: &mut Network, a: usize, b: usize, label: String| {
        let id = net.add_edge(Edge::real(label, ids[a], ids[b])).expect("grid edge");
        let secs = 30.0 + ((a * 7 + b * 13) % 17) as f64;
        let attrs = net.edge_attributes_mut(id).expect("grid edge attrs");
        attrs.free_flow_time = secs;
        attrs.current_time = secs;
    };
    for r in 0..n {
        for c in 0..n {
            let v = r * n + c;
            if c + 1 < n {
                add(&mut net, v, v + 1, format!("h{v}f"));
                add(&mut net, v + 1, v, format!("h{v}b"));
            }
            if r + 1 < n {
                add(&mut net, v, v + n, format!("v{v}f"));
                add(&mut net, v + n, v, format!("v{v}b"));
            }
        }
    }
    net
}

/// Grid of isolated roads joined at each junction by full connector bundles.
fn junction_grid(n: usize) -> Network {
    let mut net = Network::new();
    let mut roads = Vec::new();
    for i in 0..n * n {
        roads.push(net.add_isolated_real_edge(format!("r{i}")).expect("road"));
    }
    for i in 0..n * n {
        for j in [i + 1, i + n] {
            if j < n * n {
                let from = net.edge(roads[i]).expect("road").target();
                let to = net.edge(roads[j]).expect("road").source();
                net.add_edge(Edge::connector(format!("r{i}_r{j}"), from, to)).expect("connector");
            }
        }
    }
    net
}

fn bench_dijkstra(c: &mut Criterion) {
    let mut group = c.benchmark_group("dijkstra");
    for n in [10usize, 30, 60] {
        let net = grid(n);
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_with_input(BenchmarkId::new("plain_full_tree", n), &net, |b, net| {
            b.iter(|| {
                let tree = PlainDijkstra::new()
                    .search(black_box(net), VertexId::new(0), &BTreeSet::new())
                    .expect("search");
                black_box(tree)
            })
        });
    }
    group.finish();
}

fn bench_kpaths(c: &mut Criterion) {
    let mut group = c.benchmark_group("kpaths");
    let net = grid(20);
    for k in [1usize, 4, 8] {
        group.bench_with_input(BenchmarkId::new("propagate", k), &k, |b, &k| {
            b.iter(|| black_box(kpaths::propagate(&net, VertexId::new(0), k).expect("propagate")))
        });
    }
    group.finish();
}

fn bench_reduction(c: &mut Criterion) {
    let mut group = c.benchmark_group("reduction");
    for n in [10usize, 30] {
        group.bench_with_input(BenchmarkId::new("build_and_reduce", n), &n, |b, &n| {
            b.iter(|| {
                let mut net = junction_grid(n);
                black_box(GraphReducer::new().run(&mut net).expect("reduce"))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_dijkstra, bench_kpaths, bench_reduction);
criterion_main!(benches);
