/// Selector throughput on a synthetic 200-monitor matrix.
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use monitor_select::SimilarityMatrix;
use monitor_select::clustering::ClusteringMethod;
use monitor_select::selection::{SelectionMethod, Selector};
use rand::{Rng, SeedableRng, rngs::StdRng};

fn synthetic_matrix(n: usize) -> SimilarityMatrix<u32> {
    let mut rng = StdRng::seed_from_u64(2021);
    let items: Vec<u32> = (0..n as u32).collect();
    let mut pairs = Vec::with_capacity(n * n / 2);
    for i in 0..n as u32 {
        for j in (i + 1)..n as u32 {
            pairs.push((i, j, rng.random_range(0.0..1.0)));
        }
    }
    SimilarityMatrix::from_pairs(items, pairs).unwrap_or_else(|error| panic!("{error}"))
}

fn bench_method(c: &mut Criterion, name: &str, method: SelectionMethod) {
    let matrix = synthetic_matrix(200);
    let selector = Selector::default();
    c.bench_function(name, |b| {
        b.iter(|| {
            let mut rng = StdRng::seed_from_u64(1);
            let selection = selector.select(&matrix, &method, &mut rng);
            black_box(selection.map(|s| s.order.len()).unwrap_or_default());
        });
    });
}

fn bench_greedy(c: &mut Criterion) {
    bench_method(
        c,
        "greedy_max_elimination_200",
        SelectionMethod::GreedyMaxElimination {
            rank_normalize: false,
        },
    );
    bench_method(
        c,
        "greedy_min_diverse_50_of_200",
        SelectionMethod::GreedyMinDiverse { nb_items: Some(50) },
    );
}

fn bench_cluster_sample(c: &mut Criterion) {
    bench_method(
        c,
        "spectral_cluster_sample_200",
        SelectionMethod::ClusterSample {
            clustering: ClusteringMethod::Spectral,
            nb_clusters: 7,
            nb_items: None,
        },
    );
}

criterion_group!(benches, bench_greedy, bench_cluster_sample);
criterion_main!(benches);
