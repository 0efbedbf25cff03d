//! Across Lite `.puz` binary format (version 1.3).
//!
//! Layout: a 0x34-byte header, the solution and player-state grids (one byte
//! per cell, row-major), NUL-terminated strings (title, author, copyright,
//! clues in document order, notes) and optional extra sections. All 16-bit
//! fields are little-endian.

use super::record::{Layout, PuzzleRecord, RecordHeader};
use crate::grid::scan_entries;
use crate::{CrosswordError, Result};
use std::collections::HashMap;
use tracing::debug;

const FILE_MAGIC: &[u8; 12] = b"ACROSS&DOWN\0";
const CHECKSUM_MASK: &[u8; 8] = b"ICHEATED";
const VERSION: &[u8; 4] = b"1.3\0";
const HEADER_LEN: usize = 0x34;
const PUZZLE_TYPE_NORMAL: u16 = 0x0001;
const UNSCRAMBLED: u16 = 0x0000;

const BLOCK: u8 = b'.';
const EMPTY: u8 = b'-';
const GEXT_CIRCLED: u8 = 0x80;

/// The format's rotating checksum: for each byte, rotate the running sum
/// right by one bit, then add the byte.
pub fn checksum_region(data: &[u8], seed: u16) -> u16 {
    data.iter()
        .fold(seed, |sum, &byte| sum.rotate_right(1).wrapping_add(byte as u16))
}

/// Every checksum stored in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checksums {
    pub global: u16,
    pub board: u16,
    pub masked_low: [u8; 4],
    pub masked_high: [u8; 4],
}

/// Raw Latin-1 string section.
struct Strings {
    title: Vec<u8>,
    author: Vec<u8>,
    copyright: Vec<u8>,
    clues: Vec<Vec<u8>>,
    notes: Vec<u8>,
    /// Notes only count towards checksums from version 1.3 on.
    notes_checksummed: bool,
}

impl Strings {
    fn checksum(&self, seed: u16) -> u16 {
        let mut sum = seed;
        for field in [&self.title, &self.author, &self.copyright] {
            if !field.is_empty() {
                sum = checksum_region(field, sum);
                sum = checksum_region(&[0], sum);
            }
        }
        for clue in &self.clues {
            sum = checksum_region(clue, sum);
        }
        if self.notes_checksummed && !self.notes.is_empty() {
            sum = checksum_region(&self.notes, sum);
            sum = checksum_region(&[0], sum);
        }
        sum
    }

    fn write(&self, out: &mut Vec<u8>) {
        let fields = [&self.title, &self.author, &self.copyright]
            .into_iter()
            .chain(&self.clues)
            .chain([&self.notes]);
        for field in fields {
            out.extend_from_slice(field);
            out.push(0);
        }
    }
}

fn compute_checksums(board_info: &[u8], solution: &[u8], state: &[u8], strings: &Strings) -> Checksums {
    let board = checksum_region(board_info, 0);
    let global = strings.checksum(checksum_region(state, checksum_region(solution, board)));

    let parts = [
        board,
        checksum_region(solution, 0),
        checksum_region(state, 0),
        strings.checksum(0),
    ];
    let mut masked_low = [0u8; 4];
    let mut masked_high = [0u8; 4];
    for (i, part) in parts.iter().enumerate() {
        masked_low[i] = CHECKSUM_MASK[i] ^ (part & 0xFF) as u8;
        masked_high[i] = CHECKSUM_MASK[i + 4] ^ (part >> 8) as u8;
    }

    Checksums {
        global,
        board,
        masked_low,
        masked_high,
    }
}

fn latin1(field: &str, text: &str) -> Result<Vec<u8>> {
    text.chars()
        .map(|c| match u8::try_from(u32::from(c)) {
            Ok(0) | Err(_) => Err(CrosswordError::Validation(format!(
                "{} contains {:?}, which cannot be stored as Latin-1",
                field, c
            ))),
            Ok(byte) => Ok(byte),
        })
        .collect()
}

fn from_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn write_section(out: &mut Vec<u8>, name: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(name);
    out.extend_from_slice(&(data.len() as u16).to_le_bytes());
    out.extend_from_slice(&checksum_region(data, 0).to_le_bytes());
    out.extend_from_slice(data);
    out.push(0);
}

/// Encodes a validated record. Rebus cells go into `GRBS`/`RTBL` sections
/// and circled cells into `GEXT`.
pub fn encode(record: &PuzzleRecord) -> Result<Vec<u8>> {
    record.validate()?;
    let dimension = |name: &str, value: usize| {
        u8::try_from(value)
            .map_err(|_| CrosswordError::Validation(format!("{} {} exceeds 255", name, value)))
    };
    let width = dimension("width", record.width)?;
    let height = dimension("height", record.height)?;

    let cell_count = record.width * record.height;
    let mut solution = Vec::with_capacity(cell_count);
    let mut state = Vec::with_capacity(cell_count);
    let mut markup = Vec::with_capacity(cell_count);
    let mut rebus_cells = Vec::with_capacity(cell_count);
    let mut rebus_table: Vec<&str> = Vec::new();

    for cell in record.grid.iter().flatten() {
        markup.push(if cell.is_circled { GEXT_CIRCLED } else { 0 });
        let Some(letter) = cell.letter else {
            solution.push(BLOCK);
            state.push(BLOCK);
            rebus_cells.push(0);
            continue;
        };
        if !letter.is_ascii_alphanumeric() {
            return Err(CrosswordError::Validation(format!(
                "solution letter {:?} is not ASCII alphanumeric",
                letter
            )));
        }
        solution.push(letter.to_ascii_uppercase() as u8);
        state.push(EMPTY);

        let key = match cell.rebus.as_deref() {
            None => 0,
            Some(rebus) => {
                let idx = match rebus_table.iter().position(|r| *r == rebus) {
                    Some(idx) => idx,
                    None => {
                        rebus_table.push(rebus);
                        rebus_table.len() - 1
                    }
                };
                u8::try_from(idx + 1).map_err(|_| {
                    CrosswordError::Validation("more than 255 distinct rebus entries".to_string())
                })?
            }
        };
        rebus_cells.push(key);
    }

    let clues = record
        .clues
        .in_document_order()
        .iter()
        .map(|clue| latin1(&format!("clue {}-{}", clue.number, clue.direction), &clue.text))
        .collect::<Result<Vec<_>>>()?;
    let clue_count = u16::try_from(clues.len())
        .map_err(|_| CrosswordError::Validation(format!("{} clues exceed 65535", clues.len())))?;

    let strings = Strings {
        title: latin1("title", &record.title)?,
        author: latin1("author", &record.author)?,
        copyright: latin1("copyright", &record.copyright)?,
        clues,
        notes: latin1("notes", &record.notes)?,
        notes_checksummed: true,
    };

    let mut board_info = vec![width, height];
    board_info.extend_from_slice(&clue_count.to_le_bytes());
    board_info.extend_from_slice(&PUZZLE_TYPE_NORMAL.to_le_bytes());
    board_info.extend_from_slice(&UNSCRAMBLED.to_le_bytes());

    let sums = compute_checksums(&board_info, &solution, &state, &strings);

    let mut out = Vec::with_capacity(HEADER_LEN + 3 * cell_count + 256);
    out.extend_from_slice(&sums.global.to_le_bytes());
    out.extend_from_slice(FILE_MAGIC);
    out.extend_from_slice(&sums.board.to_le_bytes());
    out.extend_from_slice(&sums.masked_low);
    out.extend_from_slice(&sums.masked_high);
    out.extend_from_slice(VERSION);
    out.extend_from_slice(&[0; 2]);
    out.extend_from_slice(&0u16.to_le_bytes()); // scrambled checksum
    out.extend_from_slice(&[0; 12]);
    out.extend_from_slice(&board_info);
    debug_assert_eq!(out.len(), HEADER_LEN);

    out.extend_from_slice(&solution);
    out.extend_from_slice(&state);
    strings.write(&mut out);

    if !rebus_table.is_empty() {
        let table: String = rebus_table
            .iter()
            .enumerate()
            .map(|(idx, rebus)| format!("{:>2}:{};", idx, rebus))
            .collect();
        write_section(&mut out, b"GRBS", &rebus_cells);
        write_section(&mut out, b"RTBL", &latin1("rebus table", &table)?);
    }
    if markup.iter().any(|&flags| flags != 0) {
        write_section(&mut out, b"GEXT", &markup);
    }

    debug!("Encoded {}x{} puzzle into {} bytes", width, height, out.len());
    Ok(out)
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let data: &'a [u8] = self.data;
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                CrosswordError::LegacyFormat(format!("unexpected end of file at offset {:#x}", self.pos))
            })?;
        let slice = &data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u16(&mut self) -> Result<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn cstr(&mut self) -> Result<&'a [u8]> {
        let data: &'a [u8] = self.data;
        let rest = &data[self.pos..];
        let len = rest.iter().position(|&b| b == 0).ok_or_else(|| {
            CrosswordError::LegacyFormat(format!("unterminated string at offset {:#x}", self.pos))
        })?;
        self.pos += len + 1;
        Ok(&rest[..len])
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

fn verify(name: &str, stored: u16, computed: u16) -> Result<()> {
    if stored == computed {
        Ok(())
    } else {
        Err(CrosswordError::LegacyFormat(format!(
            "{} checksum mismatch: stored {:#06x}, computed {:#06x}",
            name, stored, computed
        )))
    }
}

fn parse_rebus_table(table: &str) -> Result<HashMap<u8, String>> {
    table
        .split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let (key, value) = item.split_once(':').ok_or_else(|| {
                CrosswordError::LegacyFormat(format!("malformed rebus table entry {:?}", item))
            })?;
            let key = key.trim().parse::<u8>().map_err(|_| {
                CrosswordError::LegacyFormat(format!("malformed rebus key {:?}", key))
            })?;
            Ok((key, value.to_string()))
        })
        .collect()
}

/// Parses a `.puz` file, verifying every checksum, and rebuilds the record.
/// Clues are matched to entries in document order.
pub fn decode(bytes: &[u8]) -> Result<PuzzleRecord> {
    let start = bytes
        .windows(FILE_MAGIC.len())
        .position(|window| window == FILE_MAGIC)
        .and_then(|pos| pos.checked_sub(2))
        .ok_or_else(|| CrosswordError::LegacyFormat("missing ACROSS&DOWN magic".to_string()))?;
    let mut reader = Reader {
        data: &bytes[start..],
        pos: 0,
    };

    let global = reader.u16()?;
    reader.take(FILE_MAGIC.len())?;
    let board = reader.u16()?;
    let masked_low = reader.take(4)?;
    let masked_high = reader.take(4)?;
    let version = reader.take(4)?;
    reader.take(2)?;
    reader.u16()?; // scrambled checksum
    reader.take(12)?;
    let board_info = reader.take(8)?;

    let width = board_info[0] as usize;
    let height = board_info[1] as usize;
    let clue_count = u16::from_le_bytes([board_info[2], board_info[3]]) as usize;
    let scrambled = u16::from_le_bytes([board_info[6], board_info[7]]);
    if scrambled != UNSCRAMBLED {
        return Err(CrosswordError::LegacyFormat(
            "scrambled puzzles are not supported".to_string(),
        ));
    }

    let solution = reader.take(width * height)?;
    let state = reader.take(width * height)?;
    let title = reader.cstr()?.to_vec();
    let author = reader.cstr()?.to_vec();
    let copyright = reader.cstr()?.to_vec();
    let clues = (0..clue_count)
        .map(|_| reader.cstr().map(<[u8]>::to_vec))
        .collect::<Result<Vec<_>>>()?;
    let notes = if reader.remaining() > 0 {
        reader.cstr()?.to_vec()
    } else {
        Vec::new()
    };

    let strings = Strings {
        title,
        author,
        copyright,
        clues,
        notes,
        notes_checksummed: version >= b"1.3\0".as_slice(),
    };
    let expected = compute_checksums(board_info, solution, state, &strings);
    verify("board", board, expected.board)?;
    verify("global", global, expected.global)?;
    if masked_low != expected.masked_low || masked_high != expected.masked_high {
        return Err(CrosswordError::LegacyFormat("masked checksum mismatch".to_string()));
    }

    let mut circled = vec![false; width * height];
    let mut rebus_cells: Vec<u8> = Vec::new();
    let mut rebus_table = HashMap::new();
    while reader.remaining() >= 8 {
        let name = reader.take(4)?;
        let len = reader.u16()? as usize;
        let stored = reader.u16()?;
        let data = reader.take(len)?;
        if reader.remaining() > 0 {
            reader.take(1)?;
        }
        verify(&from_latin1(name), stored, checksum_region(data, 0))?;

        match name {
            b"GEXT" if data.len() == width * height => {
                for (flag, &byte) in circled.iter_mut().zip(data) {
                    *flag = byte & GEXT_CIRCLED != 0;
                }
            }
            b"GRBS" if data.len() == width * height => rebus_cells = data.to_vec(),
            b"RTBL" => rebus_table = parse_rebus_table(&from_latin1(data))?,
            _ => debug!("Skipping {} section ({} bytes)", from_latin1(name), len),
        }
    }

    let mut cells = Vec::with_capacity(height);
    for row in 0..height {
        let mut cells_row = Vec::with_capacity(width);
        for col in 0..width {
            let idx = row * width + col;
            let cell = match (solution[idx], rebus_cells.get(idx).copied().unwrap_or(0)) {
                (BLOCK, _) => None,
                (letter, 0) => Some((letter as char).to_string()),
                (_, key) => Some(rebus_table.get(&(key - 1)).cloned().ok_or_else(|| {
                    CrosswordError::LegacyFormat(format!("rebus key {} missing from table", key - 1))
                })?),
            };
            cells_row.push(cell);
        }
        cells.push(cells_row);
    }
    let layout = Layout {
        width,
        height,
        circled: circled.chunks(width.max(1)).map(<[bool]>::to_vec).collect(),
        cells,
    };

    let entry_count = scan_entries(width, height, |r, c| layout.cells[r][c].is_none()).len();
    if entry_count != strings.clues.len() {
        return Err(CrosswordError::LegacyFormat(format!(
            "file has {} clues but its grid has {} entries",
            strings.clues.len(),
            entry_count
        )));
    }

    let header = RecordHeader {
        title: from_latin1(&strings.title),
        author: from_latin1(&strings.author),
        copyright: from_latin1(&strings.copyright),
        notes: from_latin1(&strings.notes),
    };
    let mut texts = strings.clues.iter().map(|clue| from_latin1(clue));
    PuzzleRecord::from_layout(header, &layout, |_| {
        texts
            .next()
            .ok_or_else(|| CrosswordError::LegacyFormat("ran out of clues".to_string()))
    })
}
