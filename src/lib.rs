use thiserror::Error;

pub mod api;
pub mod benchmark;
pub mod config;
pub mod formats;
pub mod generator;
pub mod grid;
pub mod puzzle;
pub mod solver;
pub mod word_index;

pub use config::{Config, Difficulty, DifficultyPolicy};
pub use generator::{Generated, PuzzleGenerator};
pub use grid::{BlockPattern, Cell, Direction, Entry, Grid};
pub use puzzle::{assemble, ClueProvider, ClueProviderError, Metadata, Puzzle};
pub use word_index::{Word, WordIndex};

#[derive(Debug, Error)]
pub enum CrosswordError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Corpus line {line} is malformed ({reason}): {content:?}")]
    CorpusFormat {
        line: usize,
        content: String,
        reason: String,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No solution found within retry budget ({attempts} attempts)")]
    NoSolution { attempts: usize },
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Malformed legacy puzzle file: {0}")]
    LegacyFormat(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("API error: {0}")]
    ApiError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, CrosswordError>;
