//! UTF-8 to CP949 translation
//!
//! ASCII bytes are copied as-is. Other input is decoded one scalar at a time
//! and looked up in the scalar-ordered index; a hit is written as the two
//! native bytes, most significant first, and a miss as a single `?`.
//! Malformed UTF-8 decodes to U+FFFD one byte at a time.

use std::sync::Arc;

use crate::Translate;
use crate::table::{ByScalar, Index};

/// Byte written for characters the table cannot represent
pub const UNMAPPED: u8 = b'?';

/// Streaming UTF-8 to CP949 translator.
///
/// Same ownership rules as [`Decoder`](crate::Decoder).
#[derive(Debug)]
pub struct Encoder {
    index: Arc<Index<ByScalar>>,
    scratch: Vec<u8>,
}

impl Encoder {
    /// Create an encoder over a scalar-ordered index
    pub fn new(index: Arc<Index<ByScalar>>) -> Self {
        Self {
            index,
            scratch: Vec::new(),
        }
    }

    /// Index this encoder searches
    pub fn index(&self) -> &Index<ByScalar> {
        &self.index
    }
}

impl Translate for Encoder {
    fn translate(&mut self, chunk: &[u8], eof: bool) -> (usize, &[u8]) {
        self.scratch.clear();
        self.scratch.reserve(chunk.len());

        let mut pos = 0;
        while pos < chunk.len() {
            let byte = chunk[pos];
            if byte < 0x80 {
                self.scratch.push(byte);
                pos += 1;
                continue;
            }

            let (ch, width) = match next_scalar(&chunk[pos..]) {
                Utf8Step::Scalar(ch, width) => (ch, width),
                Utf8Step::Incomplete if !eof => break,
                Utf8Step::Incomplete | Utf8Step::Invalid => (char::REPLACEMENT_CHARACTER, 1),
            };

            match self.index.find(ch) {
                Some(pair) => self.scratch.extend_from_slice(&pair.native.to_be_bytes()),
                None => self.scratch.push(UNMAPPED),
            }
            pos += width;
        }

        (pos, self.scratch.as_slice())
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Utf8Step {
    /// A complete scalar and its encoded length
    Scalar(char, usize),
    /// A valid prefix cut off by the end of input
    Incomplete,
    /// Not UTF-8
    Invalid,
}

/// Decode the scalar at the start of `input`
fn next_scalar(input: &[u8]) -> Utf8Step {
    let window = &input[..input.len().min(4)];
    let valid = match std::str::from_utf8(window) {
        Ok(text) => text,
        Err(e) if e.valid_up_to() > 0 => {
            std::str::from_utf8(&window[..e.valid_up_to()]).unwrap_or_default()
        }
        Err(e) if e.error_len().is_none() => return Utf8Step::Incomplete,
        Err(_) => return Utf8Step::Invalid,
    };
    match valid.chars().next() {
        Some(ch) => Utf8Step::Scalar(ch, ch.len_utf8()),
        None => Utf8Step::Invalid,
    }
}
