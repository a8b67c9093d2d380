//! CP949 to UTF-8 translation
//!
//! Bytes below 0x80 are ASCII and copied as-is. Any other byte leads a
//! two-byte code, looked up in the native-ordered index; codes missing from
//! the table become U+FFFD.

use std::sync::Arc;

use crate::Translate;
use crate::table::{ByNative, Index};

/// Streaming CP949 to UTF-8 translator.
///
/// Owns its output buffer: use one decoder per stream. Decoders built from
/// the same [`TableCache`](crate::TableCache) share one index.
#[derive(Debug)]
pub struct Decoder {
    index: Arc<Index<ByNative>>,
    scratch: Vec<u8>,
}

impl Decoder {
    /// Create a decoder over a native-ordered index
    pub fn new(index: Arc<Index<ByNative>>) -> Self {
        Self {
            index,
            scratch: Vec::new(),
        }
    }

    /// Index this decoder searches
    pub fn index(&self) -> &Index<ByNative> {
        &self.index
    }
}

impl Translate for Decoder {
    fn translate(&mut self, chunk: &[u8], eof: bool) -> (usize, &[u8]) {
        self.scratch.clear();
        self.scratch.reserve(chunk.len() * 3 / 2);

        let mut pos = 0;
        while pos < chunk.len() {
            let lead = chunk[pos];
            if lead < 0x80 {
                self.scratch.push(lead);
                pos += 1;
                continue;
            }

            let Some(&trail) = chunk.get(pos + 1) else {
                // Lead byte split from its trail byte
                if eof {
                    push_char(&mut self.scratch, char::REPLACEMENT_CHARACTER);
                    pos += 1;
                }
                break;
            };

            let code = u16::from_be_bytes([lead, trail]);
            let ch = self
                .index
                .find(code)
                .map_or(char::REPLACEMENT_CHARACTER, |pair| pair.scalar);
            push_char(&mut self.scratch, ch);
            pos += 2;
        }

        (pos, self.scratch.as_slice())
    }
}

#[inline]
fn push_char(out: &mut Vec<u8>, ch: char) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
}
