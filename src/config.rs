//! Generation request settings and the difficulty policy.

use crate::grid::BlockPattern;
use crate::{CrosswordError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub const MIN_SIZE: usize = 5;
pub const MAX_SIZE: usize = 25;
pub const DEFAULT_AUTHOR: &str = "Crossword Engine";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    /// No floor beyond `min_score`.
    #[default]
    Expert,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Expert,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
            Difficulty::Expert => "Expert",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Difficulty {
    type Err = CrosswordError;

    fn from_str(s: &str) -> Result<Self> {
        Difficulty::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CrosswordError::InvalidConfig(format!("unknown difficulty {:?}", s)))
    }
}

/// Score floors applied per difficulty before the configured `min_score`.
///
/// Entries of `short_length` letters or fewer use the `short` floor; longer
/// ones use `long`. `i32::MIN` leaves `min_score` as the only floor. Floors
/// never increase from Easy towards Expert, so an easier level's candidate
/// pool is always contained in a harder level's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyPolicy {
    pub short_length: usize,
    /// `(short, long)` floors indexed Easy, Medium, Hard, Expert.
    pub floors: [(i32, i32); 4],
}

impl Default for DifficultyPolicy {
    fn default() -> Self {
        Self {
            short_length: 4,
            floors: [
                (70, 60),
                (55, i32::MIN),
                (40, i32::MIN),
                (i32::MIN, i32::MIN),
            ],
        }
    }
}

impl DifficultyPolicy {
    /// Minimum score a candidate for an entry of `length` letters needs.
    pub fn floor(&self, difficulty: Difficulty, length: usize, min_score: i32) -> i32 {
        let (short, long) = self.floors[difficulty as usize];
        let policy_floor = if length <= self.short_length { short } else { long };
        policy_floor.max(min_score)
    }

    /// Checks the floors are non-increasing from Easy to Expert.
    pub fn validate(&self) -> Result<()> {
        let monotonic = self.floors.windows(2).all(|pair| {
            let (easier, harder) = (pair[0], pair[1]);
            harder.0 <= easier.0 && harder.1 <= easier.1
        });
        if monotonic {
            Ok(())
        } else {
            Err(CrosswordError::InvalidConfig(
                "difficulty floors must not increase from Easy to Expert".to_string(),
            ))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub size: usize,
    pub difficulty: Difficulty,
    pub seed: u64,
    pub min_score: i32,
    pub max_retries: usize,
    /// Backtracks allowed in the first attempt; later attempts get more.
    pub backtrack_limit: usize,
    pub pattern: BlockPattern,
    pub policy: DifficultyPolicy,
    pub title: Option<String>,
    pub author: Option<String>,
    pub copyright: Option<String>,
    pub theme: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            size: 15,
            difficulty: Difficulty::default(),
            seed: 0,
            min_score: 50,
            max_retries: 100,
            backtrack_limit: 20_000,
            pattern: BlockPattern::default(),
            policy: DifficultyPolicy::default(),
            title: None,
            author: None,
            copyright: None,
            theme: None,
        }
    }
}

impl Config {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CrosswordError::InvalidConfig(e.to_string()))
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_SIZE..=MAX_SIZE).contains(&self.size) {
            return Err(CrosswordError::InvalidConfig(format!(
                "size {} is outside [{}, {}]",
                self.size, MIN_SIZE, MAX_SIZE
            )));
        }
        if self.max_retries == 0 {
            return Err(CrosswordError::InvalidConfig(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if self.backtrack_limit == 0 {
            return Err(CrosswordError::InvalidConfig(
                "backtrack_limit must be at least 1".to_string(),
            ));
        }
        self.policy.validate()
    }

    /// Title with the timestamped default applied.
    pub fn resolved_title(&self, now: chrono::DateTime<chrono::Utc>) -> String {
        self.title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| format!("Crossword Puzzle - {}", now.format("%Y-%m-%d %H:%M:%S")))
    }

    pub fn resolved_author(&self) -> String {
        self.author
            .clone()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_AUTHOR.to_string())
    }
}
