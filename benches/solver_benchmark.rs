use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use crossword_engine::solver::FillSolver;
use crossword_engine::{BlockPattern, Config, Grid, Word, WordIndex};

/// Every string over {A, B, C, D} of length 3 to 5, with varied scores.
fn synthetic_index() -> WordIndex {
    let mut words = vec![String::new()];
    let mut all = Vec::new();
    for _ in 0..5 {
        words = words
            .iter()
            .flat_map(|w| ['A', 'B', 'C', 'D'].map(|c| format!("{}{}", w, c)))
            .collect();
        all.extend(words.iter().filter(|w| w.len() >= 3).cloned());
    }
    WordIndex::from_words(all.into_iter().enumerate().map(|(i, text)| Word {
        text,
        score: 50 + (i % 50) as i32,
    }))
}

fn fill_benchmark(c: &mut Criterion) {
    let index = synthetic_index();

    let mut group = c.benchmark_group("fill_solver");
    group.sample_size(10);

    for (name, pattern) in [("auto", BlockPattern::Auto), ("lattice", BlockPattern::Lattice)] {
        let config = Config {
            size: 5,
            min_score: 0,
            max_retries: 10,
            pattern,
            ..Config::default()
        };
        let skeleton = Grid::empty(config.size, &config.pattern, config.seed).unwrap();
        group.bench_with_input(BenchmarkId::new("fill_5x5", name), &skeleton, |b, skeleton| {
            b.iter(|| FillSolver::new(&index, &config).fill(skeleton).unwrap())
        });
    }

    group.bench_function("match_scored", |b| {
        b.iter(|| index.match_scored("A_C_D", 60).len())
    });
    group.finish();
}

criterion_group!(benches, fill_benchmark);
criterion_main!(benches);
