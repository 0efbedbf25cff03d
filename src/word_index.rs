//! Scored word corpus, bucketed by length, with masked-pattern lookup.
//!
//! Corpus files hold one `WORD;SCORE` pair per line. Words are uppercased on
//! load and each length bucket is kept sorted by descending score, so every
//! lookup returns its results best-first without a further sort.

use crate::{CrosswordError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Character that matches any single letter in a lookup pattern.
pub const WILDCARD: char = '_';

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub score: i32,
}

/// All words of one length plus a positional posting index.
///
/// `postings[i][c]` lists, in ascending order, the ids of the words whose
/// `i`-th letter is `c`. Ids are positions in `words`, so ascending ids are
/// also descending scores.
#[derive(Debug, Default)]
struct Bucket {
    words: Vec<Word>,
    postings: Vec<HashMap<char, Vec<u32>>>,
}

impl Bucket {
    fn build(words: Vec<Word>, length: usize) -> Self {
        let mut postings: Vec<HashMap<char, Vec<u32>>> = vec![HashMap::new(); length];
        for (id, word) in words.iter().enumerate() {
            for (pos, ch) in word.text.chars().enumerate() {
                postings[pos].entry(ch).or_default().push(id as u32);
            }
        }
        Self { words, postings }
    }

    /// Ids of words agreeing with every fixed position, ascending.
    fn candidate_ids(&self, pattern: &[char]) -> Vec<u32> {
        let mut lists = Vec::new();
        for (pos, &ch) in pattern.iter().enumerate() {
            if ch == WILDCARD {
                continue;
            }
            match self.postings[pos].get(&ch) {
                Some(list) => lists.push(list),
                None => return Vec::new(),
            }
        }

        lists.sort_by_key(|list| list.len());
        let Some((shortest, rest)) = lists.split_first() else {
            return (0..self.words.len() as u32).collect();
        };
        shortest
            .iter()
            .copied()
            .filter(|id| rest.iter().all(|list| list.binary_search(id).is_ok()))
            .collect()
    }
}

/// Read-only word index. Build it once and share it by reference across
/// solver runs; nothing mutates it after construction.
#[derive(Debug, Default)]
pub struct WordIndex {
    buckets: HashMap<usize, Bucket>,
    total: usize,
}

impl WordIndex {
    /// Loads a corpus file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let index = Self::parse_str(&contents)?;
        info!("Loaded {} words from {}", index.len(), path.display());
        Ok(index)
    }

    /// Parses corpus text. Any malformed line fails the whole load.
    pub fn parse_str(contents: &str) -> Result<Self> {
        let mut words: Vec<Word> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for (idx, raw_line) in contents.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }
            let word = parse_line(idx + 1, line)?;

            // Duplicates keep their best score and their first position.
            match positions.get(&word.text) {
                Some(&pos) => {
                    if word.score > words[pos].score {
                        words[pos].score = word.score;
                    }
                }
                None => {
                    positions.insert(word.text.clone(), words.len());
                    words.push(word);
                }
            }
        }

        Ok(Self::from_words(words))
    }

    /// Builds an index from already-normalised words.
    pub fn from_words<I: IntoIterator<Item = Word>>(words: I) -> Self {
        let mut by_length: HashMap<usize, Vec<Word>> = HashMap::new();
        let mut total = 0;
        for word in words {
            total += 1;
            by_length
                .entry(word.text.chars().count())
                .or_default()
                .push(word);
        }

        let buckets = by_length
            .into_iter()
            .map(|(length, mut bucket)| {
                // Stable, so equal scores stay in insertion order.
                bucket.sort_by(|a, b| b.score.cmp(&a.score));
                (length, Bucket::build(bucket, length))
            })
            .collect::<HashMap<_, _>>();

        debug!("Indexed {} words into {} length buckets", total, buckets.len());
        Self { buckets, total }
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Every word of length `n`, best score first.
    pub fn words_of_length(&self, n: usize) -> &[Word] {
        self.buckets
            .get(&n)
            .map(|bucket| bucket.words.as_slice())
            .unwrap_or(&[])
    }

    /// Word texts matching `pattern`, without any score filter.
    pub fn matches(&self, pattern: &str) -> Vec<&str> {
        self.match_scored(pattern, i32::MIN)
            .into_iter()
            .map(|word| word.text.as_str())
            .collect()
    }

    /// Words matching `pattern` with `score >= min_score`, best first.
    pub fn match_scored(&self, pattern: &str, min_score: i32) -> Vec<&Word> {
        let pattern = normalize_pattern(pattern);
        let Some(bucket) = self.buckets.get(&pattern.len()) else {
            return Vec::new();
        };

        bucket
            .candidate_ids(&pattern)
            .into_iter()
            .map(|id| &bucket.words[id as usize])
            .take_while(|word| word.score >= min_score)
            .collect()
    }
}

fn normalize_pattern(pattern: &str) -> Vec<char> {
    pattern
        .chars()
        .flat_map(|c| {
            if c == WILDCARD {
                vec![c]
            } else {
                c.to_uppercase().collect()
            }
        })
        .collect()
}

fn parse_line(line_no: usize, line: &str) -> Result<Word> {
    let malformed = |reason: &str| CrosswordError::CorpusFormat {
        line: line_no,
        content: line.to_string(),
        reason: reason.to_string(),
    };

    let fields: Vec<&str> = line.split(';').collect();
    if fields.len() != 2 {
        return Err(malformed("expected exactly two ';'-separated fields"));
    }

    let text = fields[0].trim().to_uppercase();
    if text.is_empty() {
        return Err(malformed("empty word"));
    }

    let score = fields[1]
        .trim()
        .parse::<i32>()
        .map_err(|_| malformed("score is not an integer"))?;

    Ok(Word { text, score })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WordIndex {
        WordIndex::parse_str("JAZZ;95\nPUZZLE;85\nCAT;70\nQUIZ;92").unwrap()
    }

    #[test]
    fn test_match_scored_orders_by_score() {
        let index = sample();
        let found: Vec<_> = index
            .match_scored("J___", 90)
            .into_iter()
            .map(|w| (w.text.as_str(), w.score))
            .collect();
        assert_eq!(found, vec![("JAZZ", 95)]);

        let found: Vec<_> = index
            .match_scored("____", 90)
            .into_iter()
            .map(|w| (w.text.as_str(), w.score))
            .collect();
        assert_eq!(found, vec![("JAZZ", 95), ("QUIZ", 92)]);
    }

    #[test]
    fn test_match_scored_respects_fixed_letters() {
        let index = sample();
        let found: Vec<_> = index
            .match_scored("__I_", 0)
            .into_iter()
            .map(|w| w.text.as_str())
            .collect();
        assert_eq!(found, vec!["QUIZ"]);
        assert!(index.match_scored("Q__Z", 93).is_empty());
    }

    #[test]
    fn test_missing_bucket_returns_nothing() {
        let index = sample();
        assert!(index.match_scored("_____", 0).is_empty());
        assert!(index.matches("__").is_empty());
        assert!(index.words_of_length(9).is_empty());
    }

    #[test]
    fn test_matches_is_case_insensitive() {
        let index = WordIndex::parse_str("cat;10\nCot;20\ndog;5").unwrap();
        assert_eq!(index.matches("c_t"), vec!["COT", "CAT"]);
        assert_eq!(index.matches("___"), vec!["COT", "CAT", "DOG"]);
    }

    #[test]
    fn test_words_of_length_sorted_descending() {
        let index = WordIndex::parse_str("ABC;1\nDEF;30\nGHI;30\nJKL;7").unwrap();
        let texts: Vec<_> = index.words_of_length(3).iter().map(|w| w.text.as_str()).collect();
        // Ties keep corpus order.
        assert_eq!(texts, vec!["DEF", "GHI", "JKL", "ABC"]);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let index = WordIndex::parse_str("\nCAT;50\n\n   \nDOG;60\n").unwrap();
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_duplicates_keep_best_score() {
        let index = WordIndex::parse_str("CAT;50\ncat;80\nCAT;10").unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.words_of_length(3)[0].score, 80);
    }

    #[test]
    fn test_malformed_lines_report_line_number() {
        let cases = [
            ("CAT;50\nDOG\n", 2),
            ("CAT;50\n\nDOG;abc", 3),
            (";50", 1),
            ("CAT;50;EXTRA", 1),
        ];
        for (input, expected_line) in cases {
            match WordIndex::parse_str(input) {
                Err(CrosswordError::CorpusFormat { line, .. }) => assert_eq!(line, expected_line),
                other => panic!("Expected corpus error for {:?}, got {:?}", input, other),
            }
        }
    }

    #[test]
    fn test_negative_scores_allowed() {
        let index = WordIndex::parse_str("CAT;-10\nDOG;5").unwrap();
        assert_eq!(index.matches("___"), vec!["DOG", "CAT"]);
        assert_eq!(index.match_scored("___", 0).len(), 1);
    }
}
