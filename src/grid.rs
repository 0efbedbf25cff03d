use crate::{CrosswordError, Result};
use rand::prelude::*;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// A position in a grid: (row, column)
pub type Pos = (usize, usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Across,
    Down,
}

impl Direction {
    pub fn name(&self) -> &'static str {
        match self {
            Direction::Across => "across",
            Direction::Down => "down",
        }
    }

    fn step(&self, (row, col): Pos, offset: usize) -> Pos {
        match self {
            Direction::Across => (row, col + offset),
            Direction::Down => (row + offset, col),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub letter: Option<char>,
    pub is_black: bool,
    pub number: Option<u32>,
}

impl Cell {
    pub fn open() -> Self {
        Self::default()
    }

    pub fn block() -> Self {
        Self {
            is_black: true,
            ..Self::default()
        }
    }
}

/// One numbered answer slot. `cells` index into the owning grid's matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub number: u32,
    pub direction: Direction,
    pub start_row: usize,
    pub start_col: usize,
    pub length: usize,
    pub cells: Vec<Pos>,
}

impl Entry {
    /// Clue key in `"<number>-<direction>"` form, e.g. `"1-across"`.
    pub fn key(&self) -> String {
        clue_key(self.number, self.direction)
    }
}

pub fn clue_key(number: u32, direction: Direction) -> String {
    format!("{}-{}", number, direction.name())
}

/// Extracts and numbers every entry of a `width`×`height` block layout.
///
/// Cells are scanned row-major; a cell starting an across or a down run of at
/// least two open cells takes the next number. Entries come back in document
/// order: ascending number, across before down.
pub fn scan_entries<F>(width: usize, height: usize, is_black: F) -> Vec<Entry>
where
    F: Fn(usize, usize) -> bool,
{
    let open = |row: usize, col: usize| row < height && col < width && !is_black(row, col);
    let run_length = |start: Pos, direction: Direction| {
        (0..)
            .map(|offset| direction.step(start, offset))
            .take_while(|&(r, c)| open(r, c))
            .count()
    };

    let mut entries = Vec::new();
    let mut next_number = 1;
    for row in 0..height {
        for col in 0..width {
            if !open(row, col) {
                continue;
            }
            let mut starts = Vec::with_capacity(2);
            if col == 0 || !open(row, col - 1) {
                starts.push(Direction::Across);
            }
            if row == 0 || !open(row - 1, col) {
                starts.push(Direction::Down);
            }

            let mut numbered = false;
            for direction in starts {
                let length = run_length((row, col), direction);
                if length < 2 {
                    continue;
                }
                numbered = true;
                entries.push(Entry {
                    number: next_number,
                    direction,
                    start_row: row,
                    start_col: col,
                    length,
                    cells: (0..length).map(|i| direction.step((row, col), i)).collect(),
                });
            }
            if numbered {
                next_number += 1;
            }
        }
    }
    entries
}

/// How the blocks of an empty grid are laid out.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockPattern {
    /// Seeded, symmetric blocks with no run shorter than three cells.
    #[default]
    Auto,
    /// No blocks at all.
    Open,
    /// A block at every (odd row, odd column). Needs an odd size.
    Lattice,
    /// Explicit rows: `#` is a block, `_` an open cell.
    Template(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    size: usize,
    cells: Vec<Vec<Cell>>,
    entries: Vec<Entry>,
}

impl Grid {
    /// Builds an unlettered skeleton using the given block layout.
    pub fn empty(size: usize, pattern: &BlockPattern, seed: u64) -> Result<Self> {
        let blocks = match pattern {
            BlockPattern::Open => vec![vec![false; size]; size],
            BlockPattern::Lattice => {
                if size % 2 == 0 {
                    return Err(CrosswordError::InvalidConfig(format!(
                        "lattice pattern needs an odd size, got {}",
                        size
                    )));
                }
                (0..size)
                    .map(|r| (0..size).map(|c| r % 2 == 1 && c % 2 == 1).collect())
                    .collect()
            }
            BlockPattern::Auto => auto_blocks(size, seed),
            BlockPattern::Template(rows) => parse_template(size, rows)?,
        };
        Self::from_blocks(remove_orphans(blocks))
    }

    /// Builds a square grid from a block mask. Every row must be as long as
    /// the mask is tall.
    pub fn from_blocks(blocks: Vec<Vec<bool>>) -> Result<Self> {
        let size = blocks.len();
        if let Some((r, row)) = blocks.iter().enumerate().find(|(_, row)| row.len() != size) {
            return Err(CrosswordError::InvalidConfig(format!(
                "block mask row {} has {} cells, expected {}",
                r + 1,
                row.len(),
                size
            )));
        }
        let cells = blocks
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|black| if black { Cell::block() } else { Cell::open() })
                    .collect()
            })
            .collect();
        let mut grid = Self {
            size,
            cells,
            entries: Vec::new(),
        };
        grid.derive_entries();
        Ok(grid)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cells(&self) -> &[Vec<Cell>] {
        &self.cells
    }

    pub fn cell(&self, (row, col): Pos) -> &Cell {
        &self.cells[row][col]
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn is_black(&self, (row, col): Pos) -> bool {
        self.cells[row][col].is_black
    }

    pub fn letter(&self, (row, col): Pos) -> Option<char> {
        self.cells[row][col].letter
    }

    /// Assigns (or clears) an open cell's letter. Blocks stay letterless.
    pub fn set_letter(&mut self, (row, col): Pos, letter: Option<char>) {
        let cell = &mut self.cells[row][col];
        if !cell.is_black {
            cell.letter = letter;
        }
    }

    /// Changes one cell's block state and renumbers the grid.
    pub fn set_block(&mut self, (row, col): Pos, black: bool) {
        let cell = &mut self.cells[row][col];
        cell.is_black = black;
        if black {
            cell.letter = None;
        }
        self.derive_entries();
    }

    /// Recomputes entries and cell numbers from the current block layout.
    pub fn derive_entries(&mut self) -> &[Entry] {
        let entries = scan_entries(self.size, self.size, |r, c| self.cells[r][c].is_black);
        for cell in self.cells.iter_mut().flatten() {
            cell.number = None;
        }
        for entry in &entries {
            self.cells[entry.start_row][entry.start_col].number = Some(entry.number);
        }
        self.entries = entries;
        &self.entries
    }

    /// Lookup pattern for an entry: assigned letters verbatim, `_` elsewhere.
    pub fn pattern_for(&self, entry: &Entry) -> String {
        entry
            .cells
            .iter()
            .map(|&pos| self.letter(pos).unwrap_or(crate::word_index::WILDCARD))
            .collect()
    }

    /// The entry's word, if every one of its cells is lettered.
    pub fn answer(&self, entry: &Entry) -> Option<String> {
        entry.cells.iter().map(|&pos| self.letter(pos)).collect()
    }

    pub fn is_filled(&self) -> bool {
        self.cells
            .iter()
            .flatten()
            .all(|cell| cell.is_black || cell.letter.is_some())
    }

    /// Whether the block layout is unchanged by a 180° rotation.
    pub fn is_symmetric(&self) -> bool {
        let n = self.size;
        (0..n).all(|r| (0..n).all(|c| self.cells[r][c].is_black == self.cells[n - 1 - r][n - 1 - c].is_black))
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.cells {
            for cell in row {
                let ch = match cell {
                    Cell { is_black: true, .. } => '#',
                    Cell { letter: Some(l), .. } => *l,
                    _ => '.',
                };
                write!(f, "{}", ch)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn parse_template(size: usize, rows: &[String]) -> Result<Vec<Vec<bool>>> {
    if rows.len() != size {
        return Err(CrosswordError::InvalidConfig(format!(
            "template has {} rows, expected {}",
            rows.len(),
            size
        )));
    }

    let mut blocks = Vec::with_capacity(size);
    for (r, row) in rows.iter().enumerate() {
        let parsed = row
            .chars()
            .map(|ch| match ch {
                '#' => Ok(true),
                '_' => Ok(false),
                other => Err(CrosswordError::InvalidConfig(format!(
                    "template row {} has unexpected character {:?}",
                    r + 1,
                    other
                ))),
            })
            .collect::<Result<Vec<bool>>>()?;
        if parsed.len() != size {
            return Err(CrosswordError::InvalidConfig(format!(
                "template row {} has {} cells, expected {}",
                r + 1,
                parsed.len(),
                size
            )));
        }
        blocks.push(parsed);
    }

    let symmetric = (0..size).all(|r| (0..size).all(|c| blocks[r][c] == blocks[size - 1 - r][size - 1 - c]));
    if !symmetric {
        return Err(CrosswordError::InvalidConfig(
            "template is not symmetric under 180° rotation".to_string(),
        ));
    }
    Ok(blocks)
}

/// Seeded symmetric block placement, aiming for roughly one block in six
/// cells while keeping every run at least three long and the open cells
/// connected.
fn auto_blocks(size: usize, seed: u64) -> Vec<Vec<bool>> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut blocks = vec![vec![false; size]; size];
    let target = size * size / 6;

    // One representative per symmetric pair.
    let mut positions: Vec<Pos> = (0..size)
        .flat_map(|r| (0..size).map(move |c| (r, c)))
        .filter(|&(r, c)| r * size + c <= (size - 1 - r) * size + (size - 1 - c))
        .collect();
    positions.shuffle(&mut rng);

    let mut placed = 0;
    for (r, c) in positions {
        if placed >= target {
            break;
        }
        let mirror = (size - 1 - r, size - 1 - c);
        blocks[r][c] = true;
        blocks[mirror.0][mirror.1] = true;

        if runs_are_long_enough(&blocks) && is_connected(&blocks) {
            placed += if (r, c) == mirror { 1 } else { 2 };
        } else {
            blocks[r][c] = false;
            blocks[mirror.0][mirror.1] = false;
        }
    }
    blocks
}

fn runs_are_long_enough(blocks: &[Vec<bool>]) -> bool {
    let n = blocks.len();
    let lines = |transpose: bool| {
        (0..n).all(|i| {
            let mut run = 0;
            for j in 0..=n {
                let black = j == n || if transpose { blocks[j][i] } else { blocks[i][j] };
                if black {
                    if run == 1 || run == 2 {
                        return false;
                    }
                    run = 0;
                } else {
                    run += 1;
                }
            }
            true
        })
    };
    lines(false) && lines(true)
}

fn is_connected(blocks: &[Vec<bool>]) -> bool {
    let n = blocks.len();
    let open: Vec<Pos> = (0..n)
        .flat_map(|r| (0..n).map(move |c| (r, c)))
        .filter(|&(r, c)| !blocks[r][c])
        .collect();
    let Some(&start) = open.first() else {
        return false;
    };

    let mut seen = vec![vec![false; n]; n];
    let mut queue = VecDeque::from([start]);
    seen[start.0][start.1] = true;
    let mut reached = 1;
    while let Some((r, c)) = queue.pop_front() {
        let neighbors = [
            (r.wrapping_sub(1), c),
            (r + 1, c),
            (r, c.wrapping_sub(1)),
            (r, c + 1),
        ];
        for (nr, nc) in neighbors {
            if nr < n && nc < n && !blocks[nr][nc] && !seen[nr][nc] {
                seen[nr][nc] = true;
                reached += 1;
                queue.push_back((nr, nc));
            }
        }
    }
    reached == open.len()
}

/// Blocks out open cells that belong to no entry in either direction.
/// Orphan status is rotation-invariant, so symmetry survives.
fn remove_orphans(mut blocks: Vec<Vec<bool>>) -> Vec<Vec<bool>> {
    let n = blocks.len();
    let open = |b: &Vec<Vec<bool>>, r: usize, c: usize| r < n && c < n && !b[r][c];
    let orphans: Vec<Pos> = (0..n)
        .flat_map(|r| (0..n).map(move |c| (r, c)))
        .filter(|&(r, c)| {
            open(&blocks, r, c)
                && !(c > 0 && open(&blocks, r, c - 1))
                && !open(&blocks, r, c + 1)
                && !(r > 0 && open(&blocks, r - 1, c))
                && !open(&blocks, r + 1, c)
        })
        .collect();
    for (r, c) in orphans {
        blocks[r][c] = true;
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(rows: &[&str]) -> BlockPattern {
        BlockPattern::Template(rows.iter().map(|r| r.to_string()).collect())
    }

    #[test]
    fn test_from_blocks_rejects_ragged_masks() {
        let ragged = vec![vec![false; 3], vec![false; 2], vec![false; 3]];
        assert!(matches!(Grid::from_blocks(ragged), Err(CrosswordError::InvalidConfig(_))));

        let wide = vec![vec![false; 4]; 3];
        assert!(matches!(Grid::from_blocks(wide), Err(CrosswordError::InvalidConfig(_))));

        let grid = Grid::from_blocks(vec![vec![false; 3]; 3]).unwrap();
        assert_eq!(grid.entries().len(), 6);
    }

    #[test]
    fn test_numbering_follows_convention() {
        let grid = Grid::empty(5, &template(&["#____", "_____", "_____", "_____", "____#"]), 0).unwrap();
        let summary: Vec<_> = grid
            .entries()
            .iter()
            .map(|e| (e.number, e.direction, e.start_row, e.start_col, e.length))
            .collect();
        assert_eq!(
            summary,
            vec![
                (1, Direction::Across, 0, 1, 4),
                (1, Direction::Down, 0, 1, 5),
                (2, Direction::Down, 0, 2, 5),
                (3, Direction::Down, 0, 3, 5),
                (4, Direction::Down, 0, 4, 4),
                (5, Direction::Across, 1, 0, 5),
                (5, Direction::Down, 1, 0, 4),
                (6, Direction::Across, 2, 0, 5),
                (7, Direction::Across, 3, 0, 5),
                (8, Direction::Across, 4, 0, 4),
            ]
        );
        assert_eq!(grid.cell((0, 1)).number, Some(1));
        assert_eq!(grid.cell((1, 0)).number, Some(5));
        assert_eq!(grid.cell((1, 1)).number, None);
        assert_eq!(grid.cell((0, 0)).number, None);
    }

    #[test]
    fn test_entry_cells_are_contiguous_and_open() {
        let grid = Grid::empty(7, &BlockPattern::Lattice, 0).unwrap();
        for entry in grid.entries() {
            assert_eq!(entry.length, entry.cells.len());
            for (i, &pos) in entry.cells.iter().enumerate() {
                assert!(!grid.is_black(pos));
                assert_eq!(pos, entry.direction.step((entry.start_row, entry.start_col), i));
            }
        }
    }

    #[test]
    fn test_lattice_layout() {
        let grid = Grid::empty(5, &BlockPattern::Lattice, 0).unwrap();
        assert!(grid.is_symmetric());
        assert_eq!(grid.entries().len(), 6);
        assert!(grid.entries().iter().all(|e| e.length == 5));
        assert!(Grid::empty(6, &BlockPattern::Lattice, 0).is_err());
    }

    #[test]
    fn test_derive_entries_is_idempotent() {
        let mut grid = Grid::empty(9, &BlockPattern::Auto, 7).unwrap();
        let first = grid.entries().to_vec();
        assert_eq!(grid.derive_entries(), first.as_slice());
    }

    #[test]
    fn test_set_block_renumbers() {
        let mut grid = Grid::empty(5, &BlockPattern::Open, 0).unwrap();
        assert_eq!(grid.entries().len(), 10);
        grid.set_block((0, 0), true);
        assert_eq!(grid.entries()[0].start_col, 1);
        assert_eq!(grid.cell((0, 1)).number, Some(1));
    }

    #[test]
    fn test_auto_pattern_is_symmetric_and_well_formed() {
        for seed in 0..20 {
            for size in [5, 9, 15] {
                let grid = Grid::empty(size, &BlockPattern::Auto, seed).unwrap();
                assert!(grid.is_symmetric(), "size {} seed {}", size, seed);
                assert!(grid.entries().iter().all(|e| e.length >= 3));
            }
        }
    }

    #[test]
    fn test_auto_pattern_is_deterministic() {
        let a = Grid::empty(13, &BlockPattern::Auto, 99).unwrap();
        let b = Grid::empty(13, &BlockPattern::Auto, 99).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_template_rejects_bad_input() {
        assert!(Grid::empty(5, &template(&["#____"]), 0).is_err());
        assert!(Grid::empty(5, &template(&["#____", "_____", "_____", "_____", "_____"]), 0).is_err());
        assert!(Grid::empty(5, &template(&["x____", "_____", "_____", "_____", "____x"]), 0).is_err());
    }

    #[test]
    fn test_orphan_cells_become_blocks() {
        // The centre cell of this layout is walled in on all four sides.
        let grid = Grid::empty(
            5,
            &template(&["_____", "__#__", "_#_#_", "__#__", "_____"]),
            0,
        )
        .unwrap();
        assert!(grid.is_black((2, 2)));
        assert!(grid.is_symmetric());
    }

    #[test]
    fn test_pattern_and_answer() {
        let mut grid = Grid::empty(5, &BlockPattern::Open, 0).unwrap();
        let entry = grid.entries()[0].clone();
        grid.set_letter((0, 0), Some('C'));
        grid.set_letter((0, 2), Some('T'));
        assert_eq!(grid.pattern_for(&entry), "C_T__");
        assert_eq!(grid.answer(&entry), None);
        for (i, ch) in "CATCH".chars().enumerate() {
            grid.set_letter((0, i), Some(ch));
        }
        assert_eq!(grid.answer(&entry).as_deref(), Some("CATCH"));
        assert_eq!(entry.key(), "1-across");
    }

    #[test]
    fn test_scan_entries_rectangular() {
        let entries = scan_entries(4, 2, |_, _| false);
        assert_eq!(entries.len(), 6);
        assert_eq!(entries[0].length, 4);
        assert_eq!(entries[1].length, 2);
    }
}
