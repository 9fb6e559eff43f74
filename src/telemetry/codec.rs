//! Telemetry text codec.
//!
//! A hash-chain LZ compressor whose output bytes are packed six bits at a time
//! into a URL-safe alphabet. The collector decodes it server-side, so the
//! output must match the in-page encoder bit for bit.

use serde::Serialize;

use crate::config::{
    CODEC_ALPHABET, CODEC_FORMAT_MARKER, CODEC_MAX_LITERAL_RUN, CODEC_MAX_MATCH,
    CODEC_MIN_MATCH, CODEC_WINDOW,
};

const HASH_MASK: u32 = (CODEC_WINDOW as u32) - 1;
const HASH_MULTIPLIER: u32 = 16_777_619;

/// Encodes any serializable value: compact JSON, then [`encode_str`].
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    Ok(encode_str(&json))
}

/// Encodes a string. Every UTF-8 byte is one input unit.
pub fn encode_str(input: &str) -> String {
    Compressor::new(input.as_bytes()).run()
}

/// Six-bit packer over an eight-bit carry.
struct BitPacker {
    out: String,
    last: u32,
    carried: u32,
}

impl BitPacker {
    fn new(capacity: usize) -> Self {
        Self {
            out: String::with_capacity(capacity),
            last: 0,
            carried: 0,
        }
    }

    fn push(&mut self, byte: u8) {
        let mut t = self.last << (6 - self.carried);
        self.last = u32::from(byte);
        self.carried += 2;
        t |= self.last >> self.carried;
        self.symbol(t);
        if self.carried >= 6 {
            self.carried -= 6;
            self.symbol(self.last >> self.carried);
        }
    }

    fn symbol(&mut self, index: u32) {
        self.out.push(char::from(CODEC_ALPHABET[(index & 63) as usize]));
    }

    fn finish(mut self) -> String {
        match self.carried {
            2 => self.symbol(self.last << 4),
            4 => self.symbol(self.last << 2),
            _ => {}
        }
        self.out
    }
}

struct Compressor<'a> {
    input: &'a [u8],
    packer: BitPacker,
    /// Most recent position + 1 per hash bucket (0 = empty)
    heads: Vec<i64>,
    /// Previous position with the same hash, indexed relative to the chunk start
    chain: Vec<i64>,
    chunk_start: usize,
    pos: usize,
    /// First position not covered by the last emitted match
    covered_until: usize,
    literal_start: Option<usize>,
}

impl<'a> Compressor<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            packer: BitPacker::new(input.len() + input.len() / 3 + 4),
            heads: vec![0; CODEC_WINDOW],
            chain: Vec::new(),
            chunk_start: 0,
            pos: 0,
            covered_until: 0,
            literal_start: None,
        }
    }

    fn run(mut self) -> String {
        self.packer.push(CODEC_FORMAT_MARKER);

        let len = self.input.len();
        while self.chunk_start < len && self.pos < len {
            if self.chunk_start > 0 {
                let drop = self.chain.len().min(CODEC_WINDOW);
                self.chain.drain(..drop);
            }
            self.compress_chunk();
            self.chunk_start += CODEC_WINDOW;
        }

        if self.literal_start.is_some() {
            self.flush_literals();
        }
        self.packer.finish()
    }

    fn hash_at(&self, at: usize) -> usize {
        let mut h: u32 = 0;
        for &byte in &self.input[at..at + CODEC_MIN_MATCH] {
            h = h.wrapping_mul(HASH_MULTIPLIER);
            h ^= u32::from(byte);
        }
        (h & HASH_MASK) as usize
    }

    /// Length of the common prefix of `candidate..` and `pos..`, capped at the
    /// maximum match and at `pos`.
    fn match_length(&self, candidate: usize) -> usize {
        let limit = (candidate + CODEC_MAX_MATCH).min(self.pos);
        let mut i = candidate;
        let mut j = self.pos;
        while i < limit && j < self.input.len() && self.input[i] == self.input[j] {
            i += 1;
            j += 1;
        }
        i - candidate
    }

    fn compress_chunk(&mut self) {
        let len = self.input.len();
        let chunk_end = (self.chunk_start + CODEC_WINDOW).min(len);
        let hash_limit = chunk_end.min(len.saturating_sub(CODEC_MIN_MATCH - 1));

        while self.pos < chunk_end {
            let mut best_len = 0usize;
            let mut best_offset = 0usize;

            if self.pos < hash_limit {
                let bucket = self.hash_at(self.pos);
                let pos = self.pos as i64;

                if self.pos >= self.covered_until {
                    let mut candidate = self.heads[bucket] - 1;
                    while best_len != CODEC_MAX_MATCH
                        && candidate >= 0
                        && candidate >= pos - CODEC_WINDOW as i64
                    {
                        let length = self.match_length(candidate as usize);
                        if length >= CODEC_MIN_MATCH && length > best_len {
                            best_len = length;
                            best_offset = self.pos - candidate as usize - best_len;
                        }

                        let rel = candidate - self.chunk_start as i64;
                        if rel >= 0 && (rel as usize) < self.chain.len() {
                            candidate = self.chain[rel as usize];
                        } else {
                            break;
                        }
                    }
                }

                if self.pos >= self.chunk_start {
                    let rel = self.pos - self.chunk_start;
                    if self.chain.len() <= rel {
                        self.chain.resize(rel + 1, -1);
                    }
                    self.chain[rel] = self.heads[bucket] - 1;
                }
                self.heads[bucket] = pos + 1;
            }

            if best_len >= CODEC_MIN_MATCH {
                self.covered_until = self.pos + best_len;
                if self.literal_start.is_some() {
                    self.flush_literals();
                    self.literal_start = None;
                }
                self.packer.push((best_len - CODEC_MIN_MATCH) as u8);
                while best_offset > 127 {
                    self.packer.push(((best_offset & 127) | 128) as u8);
                    best_offset >>= 7;
                }
                self.packer.push(best_offset as u8);
            } else if self.pos >= self.covered_until && self.literal_start.is_none() {
                self.literal_start = Some(self.pos);
            }

            self.pos += 1;
        }
    }

    /// Emits `literal_start..pos` as runs of at most 127 bytes, each behind a
    /// negated-length control byte.
    fn flush_literals(&mut self) {
        let Some(mut start) = self.literal_start else {
            return;
        };
        while start < self.pos {
            let run = CODEC_MAX_LITERAL_RUN.min(self.pos - start);
            self.packer.push((run as u8).wrapping_neg());
            for &byte in &self.input[start..start + run] {
                self.packer.push(byte);
            }
            start += CODEC_MAX_LITERAL_RUN;
        }
    }
}
