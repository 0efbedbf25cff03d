//! ipuz v2 crossword documents.

use super::record::{Layout, PuzzleRecord};
use crate::grid::Direction;
use crate::puzzle::MISSING_CLUE;
use crate::{CrosswordError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

pub const IPUZ_VERSION: &str = "http://ipuz.org/v2";
pub const CROSSWORD_KIND: &str = "http://ipuz.org/crossword#1";
const BLOCK: &str = "#";
const CIRCLE: &str = "circle";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: usize,
    pub height: usize,
}

/// One `[number, "text"]` pair. Anything else fails to deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClueTuple(pub u32, pub String);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpuzClues {
    #[serde(rename = "Across", default)]
    pub across: Vec<ClueTuple>,
    #[serde(rename = "Down", default)]
    pub down: Vec<ClueTuple>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpuzDocument {
    pub version: String,
    pub kind: Vec<String>,
    pub dimensions: Dimensions,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub copyright: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "default_block")]
    pub block: String,
    #[serde(default)]
    pub empty: Value,
    pub puzzle: Vec<Vec<Value>>,
    pub solution: Vec<Vec<Value>>,
    #[serde(default)]
    pub clues: IpuzClues,
}

fn default_block() -> String {
    BLOCK.to_string()
}

impl IpuzDocument {
    pub fn from_record(record: &PuzzleRecord) -> Self {
        let puzzle = record
            .grid
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| {
                        if cell.is_block() {
                            return json!(BLOCK);
                        }
                        let number = cell.number.unwrap_or(0);
                        if cell.is_circled {
                            json!({ "cell": number, "style": { "shapebg": CIRCLE } })
                        } else {
                            json!(number)
                        }
                    })
                    .collect()
            })
            .collect();
        let solution = record
            .grid
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell.solution() {
                        Some(text) => Value::String(text),
                        None => json!(BLOCK),
                    })
                    .collect()
            })
            .collect();
        let tuples = |clues: &[super::RecordClue]| {
            clues
                .iter()
                .map(|clue| ClueTuple(clue.number, clue.text.clone()))
                .collect()
        };

        Self {
            version: IPUZ_VERSION.to_string(),
            kind: vec![CROSSWORD_KIND.to_string()],
            dimensions: Dimensions {
                width: record.width,
                height: record.height,
            },
            title: record.title.clone(),
            author: record.author.clone(),
            copyright: record.copyright.clone(),
            notes: record.notes.clone(),
            block: default_block(),
            empty: json!(0),
            puzzle,
            solution,
            clues: IpuzClues {
                across: tuples(&record.clues.across),
                down: tuples(&record.clues.down),
            },
        }
    }

    fn check_shape(&self) -> Result<()> {
        if !self.kind.iter().any(|k| k.starts_with("http://ipuz.org/crossword")) {
            return Err(CrosswordError::Validation(format!(
                "ipuz kind {:?} is not a crossword",
                self.kind
            )));
        }
        let Dimensions { width, height } = self.dimensions;
        for (name, rows) in [("puzzle", &self.puzzle), ("solution", &self.solution)] {
            if rows.len() != height || rows.iter().any(|row| row.len() != width) {
                return Err(CrosswordError::Validation(format!(
                    "{} grid does not match dimensions {}x{}",
                    name, width, height
                )));
            }
        }
        Ok(())
    }

    fn is_block(&self, value: &Value) -> bool {
        matches!(value, Value::String(s) if *s == self.block) || value.is_null() && self.block == "null"
    }

    /// Number printed in a puzzle cell, `None` when unnumbered.
    fn cell_number(&self, value: &Value) -> Result<Option<u32>> {
        let raw = match value {
            Value::Object(map) => map.get("cell").unwrap_or(&Value::Null),
            other => other,
        };
        match raw {
            Value::Number(n) => match n.as_u64() {
                Some(0) => Ok(None),
                Some(n) => u32::try_from(n)
                    .map(Some)
                    .map_err(|_| CrosswordError::Validation(format!("cell number {} is too large", n))),
                None => Err(CrosswordError::Validation(format!("invalid cell number {}", n))),
            },
            Value::Null => Ok(None),
            Value::String(s) if s.is_empty() || *s == self.empty_marker() => Ok(None),
            Value::String(s) => s
                .parse::<u32>()
                .map(|n| (n > 0).then_some(n))
                .map_err(|_| CrosswordError::Validation(format!("invalid cell number {:?}", s))),
            other => Err(CrosswordError::Validation(format!("invalid puzzle cell {}", other))),
        }
    }

    fn empty_marker(&self) -> String {
        match &self.empty {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn layout(&self) -> Result<Layout> {
        let mut cells = Vec::with_capacity(self.dimensions.height);
        let mut circled = Vec::with_capacity(self.dimensions.height);
        for (r, (puzzle_row, solution_row)) in self.puzzle.iter().zip(&self.solution).enumerate() {
            let mut cells_row = Vec::with_capacity(puzzle_row.len());
            let mut circled_row = Vec::with_capacity(puzzle_row.len());
            for (c, (shown, answer)) in puzzle_row.iter().zip(solution_row).enumerate() {
                let block = self.is_block(shown) || self.is_block(answer);
                let text = match answer {
                    _ if block => None,
                    Value::String(s) if !s.is_empty() => Some(s.to_uppercase()),
                    Value::Object(map) => map
                        .get("value")
                        .and_then(Value::as_str)
                        .map(str::to_uppercase),
                    _ => None,
                };
                if !block && text.is_none() {
                    return Err(CrosswordError::Validation(format!(
                        "open cell ({}, {}) has no solution",
                        r, c
                    )));
                }
                let ring = shown
                    .pointer("/style/shapebg")
                    .and_then(Value::as_str)
                    .is_some_and(|shape| shape == CIRCLE);
                cells_row.push(text);
                circled_row.push(ring);
            }
            cells.push(cells_row);
            circled.push(circled_row);
        }
        Ok(Layout {
            width: self.dimensions.width,
            height: self.dimensions.height,
            cells,
            circled,
        })
    }

    /// Rebuilds the record. Numbering is re-derived from the block pattern and
    /// must agree with the numbers printed in the document.
    pub fn into_record(self) -> Result<PuzzleRecord> {
        self.check_shape()?;
        let layout = self.layout()?;

        let mut texts: HashMap<(u32, Direction), String> = HashMap::new();
        for (direction, list) in [(Direction::Across, &self.clues.across), (Direction::Down, &self.clues.down)] {
            for ClueTuple(number, text) in list {
                texts.insert((*number, direction), text.clone());
            }
        }

        let header = super::RecordHeader {
            title: self.title.clone(),
            author: self.author.clone(),
            copyright: self.copyright.clone(),
            notes: self.notes.clone(),
        };
        let record = PuzzleRecord::from_layout(header, &layout, |entry| {
            Ok(texts
                .remove(&(entry.number, entry.direction))
                .unwrap_or_else(|| MISSING_CLUE.to_string()))
        })?;

        if let Some(((number, direction), _)) = texts.iter().min_by_key(|(key, _)| **key) {
            return Err(CrosswordError::Validation(format!(
                "clue {} {} has no matching entry",
                number, direction
            )));
        }

        for (r, row) in self.puzzle.iter().enumerate() {
            for (c, shown) in row.iter().enumerate() {
                if record.grid[r][c].is_block() {
                    continue;
                }
                let printed = self.cell_number(shown)?;
                if printed.is_some() && printed != record.grid[r][c].number {
                    return Err(CrosswordError::Validation(format!(
                        "cell ({}, {}) is numbered {:?} but should be {:?}",
                        r, c, printed, record.grid[r][c].number
                    )));
                }
            }
        }
        Ok(record)
    }
}

/// Serializes a validated record as a pretty-printed ipuz document.
pub fn encode(record: &PuzzleRecord) -> Result<Vec<u8>> {
    record.validate()?;
    Ok(serde_json::to_vec_pretty(&IpuzDocument::from_record(record))?)
}

pub fn parse(bytes: &[u8]) -> Result<PuzzleRecord> {
    let document: IpuzDocument = serde_json::from_slice(bytes)?;
    document.into_record()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::record::tests::sample_record;

    fn sample_json() -> Value {
        serde_json::from_slice(&encode(&sample_record()).unwrap()).unwrap()
    }

    #[test]
    fn test_document_shape() {
        let doc = sample_json();
        assert_eq!(doc["version"], IPUZ_VERSION);
        assert_eq!(doc["kind"], json!([CROSSWORD_KIND]));
        assert_eq!(doc["dimensions"], json!({"width": 3, "height": 3}));
        assert_eq!(doc["puzzle"][0][0], json!(1));
        assert_eq!(doc["puzzle"][0][1], json!({"cell": 2, "style": {"shapebg": "circle"}}));
        assert_eq!(doc["puzzle"][1][1], json!(0));
        assert_eq!(doc["puzzle"][2][2], json!("#"));
        assert_eq!(doc["solution"][1], json!(["O", "R", "E"]));
        assert_eq!(doc["clues"]["Across"][0], json!([1, "Clue 1-across"]));
        assert_eq!(doc["clues"]["Down"][2], json!([3, "Clue 3-down"]));
    }

    #[test]
    fn test_round_trip() {
        let record = sample_record();
        assert_eq!(parse(&encode(&record).unwrap()).unwrap(), record);
    }

    #[test]
    fn test_rebus_round_trip() {
        let mut record = sample_record();
        record.grid[0][0].rebus = Some("CAT".to_string());
        record.clues.across[0].answer = "CATAT".to_string();
        record.clues.down[0].answer = "CATOW".to_string();
        let decoded = parse(&encode(&record).unwrap()).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_malformed_clue_pairs_rejected() {
        for bad in [json!([1]), json!([1, "a", 2]), json!(["1", "a"])] {
            let mut doc = sample_json();
            doc["clues"]["Across"][0] = bad;
            let bytes = serde_json::to_vec(&doc).unwrap();
            assert!(matches!(parse(&bytes), Err(CrosswordError::Json(_))));
        }
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let mut doc = sample_json();
        doc["dimensions"]["width"] = json!(4);
        let bytes = serde_json::to_vec(&doc).unwrap();
        assert!(matches!(parse(&bytes), Err(CrosswordError::Validation(_))));
    }

    #[test]
    fn test_wrong_numbering_rejected() {
        let mut doc = sample_json();
        doc["puzzle"][1][0] = json!(7);
        let bytes = serde_json::to_vec(&doc).unwrap();
        assert!(matches!(parse(&bytes), Err(CrosswordError::Validation(_))));
    }

    #[test]
    fn test_orphan_clue_rejected() {
        let mut doc = sample_json();
        doc["clues"]["Down"]
            .as_array_mut()
            .unwrap()
            .push(json!([9, "Nowhere"]));
        let bytes = serde_json::to_vec(&doc).unwrap();
        assert!(matches!(parse(&bytes), Err(CrosswordError::Validation(_))));
    }

    #[test]
    fn test_missing_clue_gets_placeholder() {
        let mut doc = sample_json();
        doc["clues"]["Across"].as_array_mut().unwrap().remove(1);
        let record = parse(&serde_json::to_vec(&doc).unwrap()).unwrap();
        assert_eq!(record.clues.across[1].text, MISSING_CLUE);
    }

    #[test]
    fn test_not_a_crossword() {
        let mut doc = sample_json();
        doc["kind"] = json!(["http://ipuz.org/sudoku#1"]);
        let bytes = serde_json::to_vec(&doc).unwrap();
        assert!(matches!(parse(&bytes), Err(CrosswordError::Validation(_))));
    }
}
