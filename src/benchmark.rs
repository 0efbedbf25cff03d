use crate::config::{Config, Difficulty};
use crate::generator::PuzzleGenerator;
use crate::word_index::WordIndex;
use crate::{CrosswordError, Result};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Results from a benchmark run
#[derive(Debug)]
pub struct BenchmarkResults {
    pub total_duration: Duration,
    pub average_duration: Duration,
    pub min_duration: Duration,
    pub max_duration: Duration,
    pub total_puzzles: usize,
    pub filled_puzzles: usize,
    pub total_backtracks: usize,
    pub difficulty_stats: DifficultyStats,
}

/// Filled puzzles per difficulty
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DifficultyStats {
    pub easy: usize,
    pub medium: usize,
    pub hard: usize,
    pub expert: usize,
}

impl DifficultyStats {
    fn record(&mut self, difficulty: Difficulty) {
        match difficulty {
            Difficulty::Easy => self.easy += 1,
            Difficulty::Medium => self.medium += 1,
            Difficulty::Hard => self.hard += 1,
            Difficulty::Expert => self.expert += 1,
        }
    }

    pub fn get(&self, difficulty: Difficulty) -> usize {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
            Difficulty::Expert => self.expert,
        }
    }
}

impl BenchmarkResults {
    /// Returns the fill success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        (self.filled_puzzles as f64 / self.total_puzzles as f64) * 100.0
    }

    /// Pretty prints the benchmark results
    pub fn print_results(&self) {
        println!("\n=== Benchmark Results ===");
        println!("Total Duration: {:?}", self.total_duration);
        println!("Average Fill: {:?}", self.average_duration);
        println!("Min Fill: {:?}", self.min_duration);
        println!("Max Fill: {:?}", self.max_duration);
        println!("Total Puzzles: {}", self.total_puzzles);
        println!("Successfully Filled: {} ({:.1}%)", self.filled_puzzles, self.success_rate());
        println!("Backtracks: {}", self.total_backtracks);

        println!("\nFilled by Difficulty:");
        for difficulty in Difficulty::ALL {
            let count = self.difficulty_stats.get(difficulty);
            println!(
                "  {}: {} ({:.1}%)",
                difficulty,
                count,
                (count as f64 / self.total_puzzles as f64) * 100.0
            );
        }
    }
}

/// Generates `count` puzzles in parallel, cycling through the difficulties.
/// Request `i` uses `base` with seed `base.seed + i`.
pub fn run_benchmark(index: &WordIndex, count: usize, base: &Config) -> Result<BenchmarkResults> {
    if count == 0 {
        return Err(CrosswordError::InvalidConfig(
            "Puzzle count must be greater than 0".to_string(),
        ));
    }

    let configs: Vec<Config> = (0..count)
        .map(|i| Config {
            difficulty: Difficulty::ALL[i % Difficulty::ALL.len()],
            seed: base.seed.wrapping_add(i as u64),
            ..base.clone()
        })
        .collect();

    info!("Starting benchmark with {} puzzles...", count);
    let start = Instant::now();
    let results = PuzzleGenerator::new(index).generate_batch(&configs);
    let total_duration = start.elapsed();

    let mut min_duration = Duration::MAX;
    let mut max_duration = Duration::ZERO;
    let mut fill_duration = Duration::ZERO;
    let mut filled_puzzles = 0;
    let mut total_backtracks = 0;
    let mut difficulty_stats = DifficultyStats::default();

    for (i, result) in results.into_iter().enumerate() {
        match result {
            Ok(generated) => {
                let elapsed = generated.stats.elapsed;
                min_duration = min_duration.min(elapsed);
                max_duration = max_duration.max(elapsed);
                fill_duration += elapsed;
                filled_puzzles += 1;
                total_backtracks += generated.stats.backtracks;
                difficulty_stats.record(generated.config.difficulty);
            }
            Err(e) => debug!("Puzzle {}/{} failed: {}", i + 1, count, e),
        }
    }

    Ok(BenchmarkResults {
        total_duration,
        average_duration: fill_duration
            .checked_div(filled_puzzles as u32)
            .unwrap_or(Duration::ZERO),
        min_duration: if filled_puzzles == 0 { Duration::ZERO } else { min_duration },
        max_duration,
        total_puzzles: count,
        filled_puzzles,
        total_backtracks,
        difficulty_stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::BlockPattern;
    use crate::word_index::Word;

    fn lattice_index() -> WordIndex {
        let words = ["AJBKC", "DLEMF", "GNHOI", "APDRG", "BSETH", "CUFVI"];
        WordIndex::from_words(words.iter().map(|w| Word {
            text: w.to_string(),
            score: 80,
        }))
    }

    fn lattice_config() -> Config {
        Config {
            size: 5,
            pattern: BlockPattern::Lattice,
            max_retries: 3,
            ..Config::default()
        }
    }

    #[test]
    fn test_benchmark_small() {
        let results = run_benchmark(&lattice_index(), 8, &lattice_config()).unwrap();
        assert_eq!(results.total_puzzles, 8);
        assert_eq!(results.filled_puzzles, 8);
        assert!((results.success_rate() - 100.0).abs() < f64::EPSILON);
        assert_eq!(
            results.difficulty_stats,
            DifficultyStats {
                easy: 2,
                medium: 2,
                hard: 2,
                expert: 2
            }
        );
        assert!(results.min_duration <= results.max_duration);
    }

    #[test]
    fn test_benchmark_counts_failures() {
        let config = Config {
            min_score: 90,
            ..lattice_config()
        };
        let results = run_benchmark(&lattice_index(), 4, &config).unwrap();
        assert_eq!(results.filled_puzzles, 0);
        assert_eq!(results.average_duration, Duration::ZERO);
        assert_eq!(results.success_rate(), 0.0);
    }

    #[test]
    fn test_benchmark_invalid_count() {
        match run_benchmark(&lattice_index(), 0, &lattice_config()) {
            Ok(_) => panic!("Should fail with zero puzzles"),
            Err(CrosswordError::InvalidConfig(_)) => (),
            Err(e) => panic!("Unexpected error: {}", e),
        }
    }
}
