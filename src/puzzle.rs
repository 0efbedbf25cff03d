//! Assembly of a filled grid and externally written clues into a `Puzzle`.

use crate::config::{Config, Difficulty};
use crate::grid::{Direction, Entry, Grid};
use crate::{CrosswordError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Clue text shown for any entry the provider did not cover.
pub const MISSING_CLUE: &str = "Missing clue";

/// Clue text keyed by `"<number>-<direction>"`.
pub type ClueMap = HashMap<String, String>;

#[derive(Debug, Error)]
pub enum ClueProviderError {
    #[error("Clue request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Clue service returned status {0}")]
    Status(u16),
    #[error("Clue provider unavailable: {0}")]
    Unavailable(String),
}

/// What a clue provider is told about one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClueRequest {
    pub key: String,
    pub number: u32,
    pub direction: Direction,
    pub answer: String,
    pub length: usize,
}

impl ClueRequest {
    fn for_entry(grid: &Grid, entry: &Entry) -> Self {
        Self {
            key: entry.key(),
            number: entry.number,
            direction: entry.direction,
            answer: grid.answer(entry).unwrap_or_default(),
            length: entry.length,
        }
    }
}

/// Something that writes clues for a list of entries.
#[allow(async_fn_in_trait)]
pub trait ClueProvider {
    async fn generate_clues(
        &self,
        requests: &[ClueRequest],
    ) -> std::result::Result<ClueMap, ClueProviderError>;
}

/// Serves clues from memory, by entry key or by answer word.
#[derive(Debug, Clone, Default)]
pub struct StaticClueProvider {
    by_key: ClueMap,
    by_answer: HashMap<String, String>,
}

impl StaticClueProvider {
    pub fn by_key(clues: ClueMap) -> Self {
        Self {
            by_key: clues,
            ..Self::default()
        }
    }

    /// Clues looked up by answer; answers are matched case-insensitively.
    pub fn by_answer<I: IntoIterator<Item = (String, String)>>(clues: I) -> Self {
        Self {
            by_answer: clues
                .into_iter()
                .map(|(answer, clue)| (answer.to_uppercase(), clue))
                .collect(),
            ..Self::default()
        }
    }
}

impl ClueProvider for StaticClueProvider {
    async fn generate_clues(
        &self,
        requests: &[ClueRequest],
    ) -> std::result::Result<ClueMap, ClueProviderError> {
        Ok(requests
            .iter()
            .filter_map(|req| {
                self.by_key
                    .get(&req.key)
                    .or_else(|| self.by_answer.get(&req.answer))
                    .map(|clue| (req.key.clone(), clue.clone()))
            })
            .collect())
    }
}

/// Supplies no clues, so every entry gets [`MISSING_CLUE`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderClueProvider;

impl ClueProvider for PlaceholderClueProvider {
    async fn generate_clues(
        &self,
        _requests: &[ClueRequest],
    ) -> std::result::Result<ClueMap, ClueProviderError> {
        Ok(ClueMap::new())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub copyright: Option<String>,
    pub difficulty: Difficulty,
    pub theme: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Metadata {
    /// Fresh metadata for a request, with default title and author applied.
    pub fn from_config(config: &Config) -> Self {
        let created_at = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: config.resolved_title(created_at),
            author: config.resolved_author(),
            copyright: config.copyright.clone(),
            difficulty: config.difficulty,
            theme: config.theme.clone(),
            created_at,
        }
    }
}

/// A filled grid with one clue per entry. Immutable once assembled.
#[derive(Debug, Clone)]
pub struct Puzzle {
    grid: Grid,
    clues: ClueMap,
    metadata: Metadata,
}

impl Puzzle {
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn clues(&self) -> &ClueMap {
        &self.clues
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn clue(&self, entry: &Entry) -> &str {
        self.clues
            .get(&entry.key())
            .map(String::as_str)
            .unwrap_or(MISSING_CLUE)
    }
}

/// Asks `provider` once for clues covering every entry of `grid`.
///
/// Clues are best-effort: a provider error or a missing or blank clue leaves
/// that entry with [`MISSING_CLUE`]. The grid itself must be fully lettered.
pub async fn assemble<P: ClueProvider>(
    grid: Grid,
    provider: &P,
    metadata: Metadata,
) -> Result<Puzzle> {
    if !grid.is_filled() {
        return Err(CrosswordError::Validation(
            "cannot assemble a puzzle from a partially filled grid".to_string(),
        ));
    }

    let requests: Vec<ClueRequest> = grid
        .entries()
        .iter()
        .map(|entry| ClueRequest::for_entry(&grid, entry))
        .collect();

    let mut supplied = match provider.generate_clues(&requests).await {
        Ok(clues) => clues,
        Err(e) => {
            warn!("Clue generation failed, using placeholders: {}", e);
            ClueMap::new()
        }
    };

    let mut missing = 0;
    let clues: ClueMap = requests
        .into_iter()
        .map(|req| {
            let text = supplied
                .remove(&req.key)
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| {
                    debug!("No clue for {} ({})", req.key, req.answer);
                    missing += 1;
                    MISSING_CLUE.to_string()
                });
            (req.key, text)
        })
        .collect();

    info!(
        "Assembled \"{}\" with {} clues ({} placeholders)",
        metadata.title,
        clues.len(),
        missing
    );
    Ok(Puzzle {
        grid,
        clues,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::BlockPattern;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn filled_grid() -> Grid {
        let mut grid = Grid::empty(5, &BlockPattern::Lattice, 0).unwrap();
        let rows = ["AJBKC", "P.S.U", "DLEMF", "R.T.V", "GNHOI"];
        for (r, row) in rows.iter().enumerate() {
            for (c, ch) in row.chars().enumerate() {
                if ch != '.' {
                    grid.set_letter((r, c), Some(ch));
                }
            }
        }
        grid
    }

    fn metadata() -> Metadata {
        Metadata::from_config(&Config {
            title: Some("Lattice".to_string()),
            ..Config::default()
        })
    }

    struct FailingProvider;

    impl ClueProvider for FailingProvider {
        async fn generate_clues(
            &self,
            _requests: &[ClueRequest],
        ) -> std::result::Result<ClueMap, ClueProviderError> {
            Err(ClueProviderError::Unavailable("offline".to_string()))
        }
    }

    struct CountingProvider(AtomicUsize);

    impl ClueProvider for CountingProvider {
        async fn generate_clues(
            &self,
            requests: &[ClueRequest],
        ) -> std::result::Result<ClueMap, ClueProviderError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(requests
                .iter()
                .map(|r| (r.key.clone(), format!("Clue for {}", r.answer)))
                .collect())
        }
    }

    #[tokio::test]
    async fn test_assemble_uses_supplied_clues() {
        let provider = CountingProvider(AtomicUsize::new(0));
        let puzzle = assemble(filled_grid(), &provider, metadata()).await.unwrap();
        assert_eq!(provider.0.load(Ordering::SeqCst), 1);
        assert_eq!(puzzle.clues().len(), 6);
        assert_eq!(puzzle.clues()["1-across"], "Clue for AJBKC");
        assert_eq!(puzzle.clues()["1-down"], "Clue for APDRG");
        assert_eq!(puzzle.metadata().title, "Lattice");
    }

    #[tokio::test]
    async fn test_missing_clues_get_placeholder() {
        let provider = StaticClueProvider::by_answer(vec![
            ("ajbkc".to_string(), "Top row".to_string()),
            ("BSETH".to_string(), "   ".to_string()),
        ]);
        let puzzle = assemble(filled_grid(), &provider, metadata()).await.unwrap();
        assert_eq!(puzzle.clues()["1-across"], "Top row");
        assert_eq!(puzzle.clues()["2-down"], MISSING_CLUE);
        assert_eq!(puzzle.clues()["1-down"], MISSING_CLUE);
    }

    #[tokio::test]
    async fn test_provider_failure_degrades() {
        let puzzle = assemble(filled_grid(), &FailingProvider, metadata()).await.unwrap();
        assert_eq!(puzzle.clues().len(), 6);
        assert!(puzzle.clues().values().all(|c| c == MISSING_CLUE));
    }

    #[tokio::test]
    async fn test_placeholder_provider() {
        let puzzle = assemble(filled_grid(), &PlaceholderClueProvider, metadata()).await.unwrap();
        let across = &puzzle.grid().entries()[0];
        assert_eq!(puzzle.clue(across), MISSING_CLUE);
        assert!(puzzle.clues().values().all(|c| c == MISSING_CLUE));
    }

    #[tokio::test]
    async fn test_partial_grid_rejected() {
        let grid = Grid::empty(5, &BlockPattern::Lattice, 0).unwrap();
        let result = assemble(grid, &StaticClueProvider::default(), metadata()).await;
        assert!(matches!(result, Err(CrosswordError::Validation(_))));
    }

    #[test]
    fn test_metadata_defaults() {
        let meta = Metadata::from_config(&Config::default());
        assert!(meta.title.starts_with("Crossword Puzzle - "));
        assert_eq!(meta.author, crate::config::DEFAULT_AUTHOR);
        assert_eq!(meta.difficulty, Difficulty::Expert);
    }
}
