//! Output encodings. Every encoder is a pure function of a validated
//! [`PuzzleRecord`].

pub mod ipuz;
pub mod puz;
pub mod record;

pub use record::{PuzzleRecord, RecordCell, RecordClue, RecordClues, RecordHeader};
