// Wed Jan 14 2026 - Alex

use crate::corpus::CorpusError;
use crate::token::is_token_byte;
use serde::Serialize;
use std::fmt;
use std::ops::Range;

/// One reader's share of the corpus.
///
/// `nominal` is the plain `ceil(S/R)` slice. `start..end` is the slice the reader
/// actually scans: both edges are pushed forward past any token they would
/// otherwise cut, so a token straddling a nominal edge belongs to the reader on
/// its left and is skipped by the reader on its right.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub index: usize,
    pub nominal: Range<usize>,
    pub start: usize,
    pub end: usize,
}

impl Chunk {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} [{}, {}) nominal [{}, {})",
            self.index, self.start, self.end, self.nominal.start, self.nominal.end
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Partitioner {
    parts: usize,
}

impl Partitioner {
    pub fn new(parts: usize) -> Self {
        assert!(parts > 0, "partitioner needs at least one part");
        Self { parts }
    }

    /// Splits the whole corpus.
    pub fn split(&self, data: &[u8]) -> Vec<Chunk> {
        self.split_range(data, 0..data.len())
    }

    /// Computes a single reader's chunk without materialising the others.
    pub fn chunk(&self, data: &[u8], index: usize) -> Result<Chunk, CorpusError> {
        if index >= self.parts {
            return Err(CorpusError::ChunkOutOfRange {
                index,
                parts: self.parts,
            });
        }
        Ok(self.chunk_in(data, 0..data.len(), index))
    }

    /// Splits `range` (whose edges must already sit on token boundaries) into
    /// word-aligned sub-chunks. Used for the intra-worker scan fan-out.
    pub fn split_range(&self, data: &[u8], range: Range<usize>) -> Vec<Chunk> {
        (0..self.parts)
            .map(|index| self.chunk_in(data, range.clone(), index))
            .collect()
    }

    fn chunk_in(&self, data: &[u8], range: Range<usize>, index: usize) -> Chunk {
        let size = range.end - range.start;
        let step = (size + self.parts - 1) / self.parts;
        let nominal_start = (range.start + step * index).min(range.end);
        let nominal_end = (nominal_start + step).min(range.end);

        let start = if index == 0 {
            range.start
        } else {
            align_forward(data, nominal_start, range.end)
        };
        let end = if index + 1 == self.parts {
            range.end
        } else {
            align_forward(data, nominal_end, range.end)
        };

        Chunk {
            index,
            nominal: nominal_start..nominal_end,
            start,
            end: end.max(start),
        }
    }
}

/// First position at or after `pos` that does not sit inside a token.
fn align_forward(data: &[u8], pos: usize, limit: usize) -> usize {
    let mut pos = pos;
    while pos < limit && is_token_byte(data[pos]) {
        pos += 1;
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Tokenizer;

    fn tokens_of(data: &[u8], chunks: &[Chunk]) -> Vec<String> {
        let tokenizer = Tokenizer::default();
        chunks
            .iter()
            .flat_map(|c| tokenizer.tokens(data, c.range()))
            .map(|t| t.to_string())
            .collect()
    }

    #[test]
    fn test_chunks_cover_without_gaps() {
        let data = b"The quick brown fox jumps over the lazy dog.\nPack my box with five dozen liquor jugs";
        for parts in 1..20 {
            let chunks = Partitioner::new(parts).split(data);
            assert_eq!(chunks.len(), parts);
            assert_eq!(chunks[0].start, 0);
            assert_eq!(chunks[parts - 1].end, data.len());
            for pair in chunks.windows(2) {
                assert_eq!(pair[0].end, pair[1].start, "gap or overlap with {} parts", parts);
            }
        }
    }

    #[test]
    fn test_every_size_and_reader_count_yields_same_tokens() {
        let text = b"alpha beta, gamma-delta EPSILON zeta\neta theta iota kappa lambda mu";
        let expected = tokens_of(text, &Partitioner::new(1).split(text));

        for len in 0..=text.len() {
            let data = &text[..len];
            let whole = tokens_of(data, &Partitioner::new(1).split(data));
            for parts in 1..12 {
                let chunks = Partitioner::new(parts).split(data);
                let covered: usize = chunks.iter().map(|c| c.len()).sum();
                assert_eq!(covered, data.len());
                assert_eq!(tokens_of(data, &chunks), whole, "len {} parts {}", len, parts);
            }
        }
        assert_eq!(expected.len(), 12);
    }

    #[test]
    fn test_token_on_nominal_edge_goes_left() {
        // nominal split for 2 parts of 9 bytes falls at 5, inside "cdef"
        let data = b"ab cdef g";
        let chunks = Partitioner::new(2).split(data);
        assert_eq!(chunks[0].nominal, 0..5);
        assert_eq!(chunks[0].range(), 0..7);
        assert_eq!(chunks[1].range(), 7..9);
    }

    #[test]
    fn test_word_spanning_several_chunks() {
        let data = b"a supercalifragilistic b";
        let chunks = Partitioner::new(6).split(data);
        let tokens = tokens_of(data, &chunks);
        assert_eq!(tokens, vec!["a", "supercalifragilistic", "b"]);
        assert!(chunks.iter().filter(|c| c.is_empty()).count() >= 3);
    }

    #[test]
    fn test_more_readers_than_bytes() {
        let data = b"ab";
        let chunks = Partitioner::new(5).split(data);
        assert_eq!(chunks.len(), 5);
        assert_eq!(chunks.iter().map(|c| c.len()).sum::<usize>(), 2);
        assert_eq!(tokens_of(data, &chunks), vec!["ab"]);
    }

    #[test]
    fn test_single_chunk_matches_split() {
        let data = b"one two three four five six seven eight nine ten";
        let partitioner = Partitioner::new(4);
        let all = partitioner.split(data);
        for (i, chunk) in all.iter().enumerate() {
            assert_eq!(&partitioner.chunk(data, i).unwrap(), chunk);
        }
        assert!(matches!(
            partitioner.chunk(data, 4),
            Err(CorpusError::ChunkOutOfRange { index: 4, parts: 4 })
        ));
    }

    #[test]
    fn test_split_range_stays_inside() {
        let data = b"xx one two three four five yy";
        let chunks = Partitioner::new(3).split_range(data, 3..26);
        assert_eq!(chunks[0].start, 3);
        assert_eq!(chunks[2].end, 26);
        assert_eq!(
            tokens_of(data, &chunks),
            vec!["one", "two", "three", "four", "five"]
        );
    }
}
