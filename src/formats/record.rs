//! Canonical JSON record of an assembled puzzle.
//!
//! The record is the common currency of the encoders: `.puz` and ipuz both
//! encode from it and decode back into it.

use crate::grid::{scan_entries, Direction, Entry};
use crate::puzzle::Puzzle;
use crate::{CrosswordError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordCell {
    /// `None` marks a block.
    pub letter: Option<char>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_circled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rebus: Option<String>,
}

impl RecordCell {
    pub fn is_block(&self) -> bool {
        self.letter.is_none()
    }

    /// Full solution text of the cell: the rebus if any, else the letter.
    pub fn solution(&self) -> Option<String> {
        match (&self.rebus, self.letter) {
            (Some(rebus), _) => Some(rebus.clone()),
            (None, Some(letter)) => Some(letter.to_string()),
            (None, None) => None,
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordClue {
    pub number: u32,
    pub text: String,
    pub answer: String,
    pub start_row: usize,
    pub start_col: usize,
    pub length: usize,
    pub direction: Direction,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordClues {
    pub across: Vec<RecordClue>,
    pub down: Vec<RecordClue>,
}

impl RecordClues {
    pub fn len(&self) -> usize {
        self.across.len() + self.down.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clues in document order: ascending number, across before down.
    pub fn in_document_order(&self) -> Vec<&RecordClue> {
        let mut all: Vec<&RecordClue> = self.across.iter().chain(&self.down).collect();
        all.sort_by_key(|clue| (clue.number, clue.direction));
        all
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleRecord {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub copyright: String,
    #[serde(default)]
    pub notes: String,
    pub width: usize,
    pub height: usize,
    pub grid: Vec<Vec<RecordCell>>,
    pub clues: RecordClues,
}

/// Header text shared by every way of building a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordHeader {
    pub title: String,
    pub author: String,
    pub copyright: String,
    pub notes: String,
}

/// Solution layout recovered from some encoding: `None` is a block,
/// `Some(text)` an open cell holding a letter or a rebus.
#[derive(Debug, Clone, Default)]
pub(crate) struct Layout {
    pub width: usize,
    pub height: usize,
    pub cells: Vec<Vec<Option<String>>>,
    pub circled: Vec<Vec<bool>>,
}

impl Layout {
    fn is_black(&self, row: usize, col: usize) -> bool {
        self.cells[row][col].is_none()
    }

    fn is_circled(&self, row: usize, col: usize) -> bool {
        self.circled
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(false)
    }
}

impl PuzzleRecord {
    /// Snapshot of an assembled puzzle.
    pub fn from_puzzle(puzzle: &Puzzle) -> Result<Self> {
        let grid = puzzle.grid();
        let meta = puzzle.metadata();
        if !grid.is_filled() {
            return Err(CrosswordError::Validation(
                "puzzle grid has unlettered open cells".to_string(),
            ));
        }
        let cells = grid
            .cells()
            .iter()
            .map(|row| row.iter().map(|cell| cell.letter.map(|l| l.to_string())).collect())
            .collect();

        let layout = Layout {
            width: grid.size(),
            height: grid.size(),
            cells,
            circled: Vec::new(),
        };
        let header = RecordHeader {
            title: meta.title.clone(),
            author: meta.author.clone(),
            copyright: meta.copyright.clone().unwrap_or_default(),
            notes: meta.theme.clone().unwrap_or_default(),
        };
        Self::from_layout(header, &layout, |entry| Ok(puzzle.clue(entry).to_string()))
    }

    /// Numbers a layout and attaches clue text to each derived entry.
    pub(crate) fn from_layout<F>(header: RecordHeader, layout: &Layout, mut clue_text: F) -> Result<Self>
    where
        F: FnMut(&Entry) -> Result<String>,
    {
        let entries = scan_entries(layout.width, layout.height, |r, c| layout.is_black(r, c));

        let mut grid: Vec<Vec<RecordCell>> = (0..layout.height)
            .map(|r| {
                (0..layout.width)
                    .map(|c| {
                        let solution = layout.cells[r][c].as_deref();
                        let rebus = solution.filter(|s| s.chars().count() > 1).map(str::to_string);
                        RecordCell {
                            letter: solution.and_then(|s| s.chars().next()),
                            number: None,
                            is_circled: layout.is_circled(r, c),
                            rebus,
                        }
                    })
                    .collect()
            })
            .collect();

        let mut clues = RecordClues::default();
        for entry in &entries {
            grid[entry.start_row][entry.start_col].number = Some(entry.number);
            let answer: String = entry
                .cells
                .iter()
                .filter_map(|&(r, c)| layout.cells[r][c].as_deref())
                .collect();
            let clue = RecordClue {
                number: entry.number,
                text: clue_text(entry)?,
                answer,
                start_row: entry.start_row,
                start_col: entry.start_col,
                length: entry.length,
                direction: entry.direction,
            };
            match entry.direction {
                Direction::Across => clues.across.push(clue),
                Direction::Down => clues.down.push(clue),
            }
        }

        Ok(Self {
            title: header.title,
            author: header.author,
            copyright: header.copyright,
            notes: header.notes,
            width: layout.width,
            height: layout.height,
            grid,
            clues,
        })
    }

    pub fn header(&self) -> RecordHeader {
        RecordHeader {
            title: self.title.clone(),
            author: self.author.clone(),
            copyright: self.copyright.clone(),
            notes: self.notes.clone(),
        }
    }

    /// Checks dimensions, required text and that there is something to solve.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CrosswordError::Validation("grid has no cells".to_string()));
        }
        if self.grid.len() != self.height {
            return Err(CrosswordError::Validation(format!(
                "grid has {} rows but height is {}",
                self.grid.len(),
                self.height
            )));
        }
        if let Some((r, row)) = self.grid.iter().enumerate().find(|(_, row)| row.len() != self.width) {
            return Err(CrosswordError::Validation(format!(
                "row {} has {} cells but width is {}",
                r,
                row.len(),
                self.width
            )));
        }
        if self.title.trim().is_empty() {
            return Err(CrosswordError::Validation("title is empty".to_string()));
        }
        if self.author.trim().is_empty() {
            return Err(CrosswordError::Validation("author is empty".to_string()));
        }
        if self.clues.is_empty() {
            return Err(CrosswordError::Validation("puzzle has no clues".to_string()));
        }
        Ok(())
    }

    /// Validated, pretty-printed JSON.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        self.validate()?;
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let record: Self = serde_json::from_slice(bytes)?;
        record.validate()?;
        Ok(record)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A 3x3 record with one corner block: CAT / ORE / WE#.
    pub(crate) fn sample_record() -> PuzzleRecord {
        let rows = ["CAT", "ORE", "WE#"];
        let layout = Layout {
            width: 3,
            height: 3,
            cells: rows
                .iter()
                .map(|row| {
                    row.chars()
                        .map(|c| if c == '#' { None } else { Some(c.to_string()) })
                        .collect()
                })
                .collect(),
            circled: vec![vec![false, true, false], vec![false; 3], vec![false; 3]],
        };
        let header = RecordHeader {
            title: "Tiny".to_string(),
            author: "Tester".to_string(),
            copyright: "© 2026".to_string(),
            notes: "Animals".to_string(),
        };
        PuzzleRecord::from_layout(header, &layout, |entry| {
            Ok(format!("Clue {}-{}", entry.number, entry.direction))
        })
        .unwrap()
    }

    #[test]
    fn test_layout_numbering_and_answers() {
        let record = sample_record();
        let across: Vec<_> = record.clues.across.iter().map(|c| (c.number, c.answer.as_str())).collect();
        let down: Vec<_> = record.clues.down.iter().map(|c| (c.number, c.answer.as_str())).collect();
        assert_eq!(across, vec![(1, "CAT"), (4, "ORE"), (5, "WE")]);
        assert_eq!(down, vec![(1, "COW"), (2, "ARE"), (3, "TE")]);
        assert_eq!(record.grid[0][0].number, Some(1));
        assert_eq!(record.grid[2][2].letter, None);
        assert!(record.grid[0][1].is_circled);
    }

    #[test]
    fn test_document_order() {
        let record = sample_record();
        let order: Vec<_> = record
            .clues
            .in_document_order()
            .iter()
            .map(|c| format!("{}-{}", c.number, c.direction))
            .collect();
        assert_eq!(order, vec!["1-across", "1-down", "2-down", "3-down", "4-across", "5-across"]);
    }

    #[test]
    fn test_json_shape() {
        let record = sample_record();
        let json: serde_json::Value = serde_json::from_slice(&record.to_json().unwrap()).unwrap();
        assert_eq!(json["grid"][0][0], serde_json::json!({"letter": "C", "number": 1}));
        assert_eq!(json["grid"][0][1]["isCircled"], true);
        assert_eq!(json["grid"][2][2], serde_json::json!({"letter": null}));
        assert_eq!(json["clues"]["across"][0]["startRow"], 0);
        assert_eq!(json["clues"]["down"][0]["direction"], "down");
        assert_eq!(PuzzleRecord::from_json(&record.to_json().unwrap()).unwrap(), record);
    }

    #[test]
    fn test_validation_failures() {
        let mut record = sample_record();
        record.title = "  ".to_string();
        assert!(matches!(record.to_json(), Err(CrosswordError::Validation(_))));

        let mut record = sample_record();
        record.author.clear();
        assert!(record.validate().is_err());

        let mut record = sample_record();
        record.grid.pop();
        assert!(record.validate().is_err());

        let mut record = sample_record();
        record.grid[1].pop();
        assert!(record.validate().is_err());

        let mut record = sample_record();
        record.clues = RecordClues::default();
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_rebus_cells() {
        let layout = Layout {
            width: 2,
            height: 2,
            cells: vec![
                vec![Some("HEART".to_string()), Some("A".to_string())],
                vec![Some("B".to_string()), Some("C".to_string())],
            ],
            circled: Vec::new(),
        };
        let record = PuzzleRecord::from_layout(RecordHeader::default(), &layout, |_| Ok(String::new())).unwrap();
        assert_eq!(record.grid[0][0].letter, Some('H'));
        assert_eq!(record.grid[0][0].rebus.as_deref(), Some("HEART"));
        assert_eq!(record.clues.across[0].answer, "HEARTA");
    }
}
