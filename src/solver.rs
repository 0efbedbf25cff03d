use crate::config::{Config, Difficulty, DifficultyPolicy};
use crate::grid::{Entry, Grid, Pos};
use crate::word_index::{Word, WordIndex};
use crate::{CrosswordError, Result};
use lru::LruCache;
use rand::prelude::*;
use rand::rngs::SmallRng;
use serde::Serialize;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// Distinct (pattern, floor) lookups remembered during one fill.
const CANDIDATE_CACHE_SIZE: usize = 4096;

/// How much each restart raises the backtrack limit.
const RETRY_GROWTH_FACTOR: f64 = 1.1;

/// Counters for one `FillSolver::fill` call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FillStats {
    pub attempts: usize,
    pub placements: usize,
    pub backtracks: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub elapsed: Duration,
}

/// Backtracking grid filler.
///
/// Holds only borrowed, read-only data, so any number of solvers may run
/// against the same `WordIndex` at once.
pub struct FillSolver<'a> {
    index: &'a WordIndex,
    difficulty: Difficulty,
    policy: DifficultyPolicy,
    min_score: i32,
    seed: u64,
    max_retries: usize,
    backtrack_limit: usize,
}

enum Outcome {
    Solved,
    Exhausted,
    OutOfBudget,
}

enum Selection<'a> {
    Complete,
    DeadEnd,
    Next(usize, Rc<[&'a Word]>),
}

impl<'a> FillSolver<'a> {
    pub fn new(index: &'a WordIndex, config: &Config) -> Self {
        Self {
            index,
            difficulty: config.difficulty,
            policy: config.policy,
            min_score: config.min_score,
            seed: config.seed,
            max_retries: config.max_retries,
            backtrack_limit: config.backtrack_limit,
        }
    }

    /// Letters every open cell of `skeleton` so each entry spells an indexed
    /// word above its score floor. Letters already in the skeleton are kept.
    pub fn fill(&self, skeleton: &Grid) -> Result<(Grid, FillStats)> {
        let start = Instant::now();
        let entries = skeleton.entries().to_vec();
        let floors: Vec<i32> = entries
            .iter()
            .map(|e| self.policy.floor(self.difficulty, e.length, self.min_score))
            .collect();

        debug!(
            "Filling {}x{} grid: {} entries, difficulty {}, up to {} attempts",
            skeleton.size(),
            skeleton.size(),
            entries.len(),
            self.difficulty,
            self.max_retries
        );

        let mut search = Search {
            index: self.index,
            grid: skeleton.clone(),
            entries: &entries,
            floors: &floors,
            placed: vec![false; entries.len()],
            used: HashSet::new(),
            rng: SmallRng::seed_from_u64(self.seed),
            cache: LruCache::new(NonZeroUsize::new(CANDIDATE_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN)),
            backtracks: 0,
            limit: self.backtrack_limit,
            stats: FillStats::default(),
        };

        for attempt in 0..self.max_retries {
            let limit = (self.backtrack_limit as f64 * RETRY_GROWTH_FACTOR.powi(attempt as i32)) as usize;
            search.reset(skeleton, attempt_seed(self.seed, attempt), limit);
            search.stats.attempts += 1;

            match search.run() {
                Outcome::Solved => {
                    search.stats.elapsed = start.elapsed();
                    info!(
                        "Filled grid on attempt {} ({} placements, {} backtracks, {:?})",
                        attempt + 1,
                        search.stats.placements,
                        search.stats.backtracks,
                        search.stats.elapsed
                    );
                    return Ok((search.grid, search.stats));
                }
                Outcome::Exhausted => {
                    debug!("Attempt {} exhausted every candidate", attempt + 1);
                }
                Outcome::OutOfBudget => {
                    debug!("Attempt {} hit its backtrack limit of {}", attempt + 1, limit);
                }
            }
        }

        debug!("No fill after {} attempts ({:?})", self.max_retries, start.elapsed());
        Err(CrosswordError::NoSolution {
            attempts: self.max_retries,
        })
    }
}

fn attempt_seed(seed: u64, attempt: usize) -> u64 {
    seed ^ (attempt as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Mutable state of one fill, reused across restarts.
struct Search<'a, 'e> {
    index: &'a WordIndex,
    grid: Grid,
    entries: &'e [Entry],
    floors: &'e [i32],
    placed: Vec<bool>,
    used: HashSet<&'a str>,
    rng: SmallRng,
    cache: LruCache<(String, i32), Rc<[&'a Word]>>,
    backtracks: usize,
    limit: usize,
    stats: FillStats,
}

impl<'a, 'e> Search<'a, 'e> {
    fn reset(&mut self, skeleton: &Grid, seed: u64, limit: usize) {
        self.grid = skeleton.clone();
        self.placed.iter_mut().for_each(|p| *p = false);
        self.used.clear();
        self.rng = SmallRng::seed_from_u64(seed);
        self.backtracks = 0;
        self.limit = limit;
    }

    fn run(&mut self) -> Outcome {
        let (idx, pool) = match self.select() {
            Selection::Complete => return Outcome::Solved,
            Selection::DeadEnd => return Outcome::Exhausted,
            Selection::Next(idx, pool) => (idx, pool),
        };

        let entries = self.entries;
        let entry = &entries[idx];
        for word in self.ordered(&pool) {
            if self.used.contains(word.text.as_str()) {
                continue;
            }

            let written = self.place(entry, word);
            self.placed[idx] = true;
            self.used.insert(word.text.as_str());
            self.stats.placements += 1;
            trace!("Placed {} at {}", word.text, entry.key());

            match self.run() {
                Outcome::Solved => return Outcome::Solved,
                Outcome::OutOfBudget => return Outcome::OutOfBudget,
                Outcome::Exhausted => {}
            }

            for pos in written {
                self.grid.set_letter(pos, None);
            }
            self.placed[idx] = false;
            self.used.remove(word.text.as_str());
            self.backtracks += 1;
            self.stats.backtracks += 1;
            if self.backtracks >= self.limit {
                return Outcome::OutOfBudget;
            }
        }
        Outcome::Exhausted
    }

    /// Picks the unplaced entry with the fewest candidates, longer entries
    /// first on ties.
    fn select(&mut self) -> Selection<'a> {
        let mut best: Option<(usize, Rc<[&'a Word]>)> = None;
        for idx in 0..self.entries.len() {
            if self.placed[idx] {
                continue;
            }
            let pool = self.candidates(idx);
            if pool.is_empty() {
                return Selection::DeadEnd;
            }
            let better = match &best {
                None => true,
                Some((best_idx, best_pool)) => {
                    pool.len() < best_pool.len()
                        || (pool.len() == best_pool.len()
                            && self.entries[idx].length > self.entries[*best_idx].length)
                }
            };
            if better {
                best = Some((idx, pool));
            }
        }
        match best {
            Some((idx, pool)) => Selection::Next(idx, pool),
            None => Selection::Complete,
        }
    }

    fn candidates(&mut self, idx: usize) -> Rc<[&'a Word]> {
        let key = (self.grid.pattern_for(&self.entries[idx]), self.floors[idx]);
        if let Some(pool) = self.cache.get(&key) {
            self.stats.cache_hits += 1;
            return Rc::clone(pool);
        }
        self.stats.cache_misses += 1;
        let pool: Rc<[&'a Word]> = self.index.match_scored(&key.0, key.1).into();
        self.cache.put(key, Rc::clone(&pool));
        pool
    }

    /// Candidates best-first, with each run of equal scores shuffled.
    fn ordered(&mut self, pool: &[&'a Word]) -> Vec<&'a Word> {
        let mut ordered = pool.to_vec();
        let mut start = 0;
        while start < ordered.len() {
            let score = ordered[start].score;
            let end = ordered[start..]
                .iter()
                .position(|w| w.score != score)
                .map_or(ordered.len(), |offset| start + offset);
            ordered[start..end].shuffle(&mut self.rng);
            start = end;
        }
        ordered
    }

    /// Writes the word into the entry's empty cells, returning those cells.
    fn place(&mut self, entry: &Entry, word: &Word) -> Vec<Pos> {
        let mut written = Vec::new();
        for (&pos, ch) in entry.cells.iter().zip(word.text.chars()) {
            if self.grid.letter(pos).is_none() {
                self.grid.set_letter(pos, Some(ch));
                written.push(pos);
            }
        }
        written
    }
}
