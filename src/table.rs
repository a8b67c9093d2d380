//! Binary mapping table support
//!
//! The packaged table (`cp949.dat`) stores the native-to-Unicode mapping as a
//! list of runs. Each run names its first native code and carries the UTF-8
//! text of the characters for that code and the codes that follow it:
//!
//! ```text
//! Header: CodeCnt:u16, ChunkCnt:u16          (big-endian)
//! repeated ChunkCnt times:
//!   StartCode:u16, ByteLen:u16, Payload:ByteLen bytes of UTF-8 text
//! ```
//!
//! [`parse`] turns the file into [`CodePair`]s in file order, [`write`] does
//! the reverse and [`Index`] is the binary-searchable view each translation
//! direction keeps.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use crate::{Error, Result};

/// One character's mapping between the native encoding and Unicode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodePair {
    /// Two-byte native code, lead byte in the high half
    pub native: u16,
    /// Unicode scalar value
    pub scalar: char,
}

impl CodePair {
    /// Create a new code pair
    pub const fn new(native: u16, scalar: char) -> Self {
        Self { native, scalar }
    }
}

impl fmt::Display for CodePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X} <-> U+{:04X}", self.native, self.scalar as u32)
    }
}

/// Key extractor an [`Index`] is ordered and searched by
pub trait SortKey {
    /// Key type
    type Key: Ord + Copy + fmt::Debug;

    /// Extract the key of a pair
    fn key(pair: &CodePair) -> Self::Key;
}

/// Orders an index by native code (decode direction)
#[derive(Debug, Clone, Copy, Default)]
pub struct ByNative;

impl SortKey for ByNative {
    type Key = u16;

    #[inline]
    fn key(pair: &CodePair) -> u16 {
        pair.native
    }
}

/// Orders an index by Unicode scalar (encode direction)
#[derive(Debug, Clone, Copy, Default)]
pub struct ByScalar;

impl SortKey for ByScalar {
    type Key = char;

    #[inline]
    fn key(pair: &CodePair) -> char {
        pair.scalar
    }
}

/// Immutable, sorted array of code pairs searched by lower-bound binary search
#[derive(Debug, Clone)]
pub struct Index<K: SortKey> {
    pairs: Box<[CodePair]>,
    _key: PhantomData<K>,
}

impl<K: SortKey> Index<K> {
    /// Copy `pairs` and sort them by `K`.
    ///
    /// The sort is stable: pairs with equal keys keep their input order, and
    /// [`find`](Self::find) returns the first of them.
    pub fn build(pairs: &[CodePair]) -> Self {
        let mut pairs = pairs.to_vec();
        pairs.sort_by_key(K::key);
        Self {
            pairs: pairs.into_boxed_slice(),
            _key: PhantomData,
        }
    }

    /// Look up the pair whose key equals `key`.
    ///
    /// Returns `None` when the key falls in a gap between stored keys, is
    /// below the smallest key or above the largest one.
    #[inline]
    pub fn find(&self, key: K::Key) -> Option<CodePair> {
        let at = self.pairs.partition_point(|pair| K::key(pair) < key);
        // `at == len` when every stored key is smaller
        self.pairs
            .get(at)
            .copied()
            .filter(|pair| K::key(pair) == key)
    }

    /// Number of pairs
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True when the index holds no pairs
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pair with the smallest key
    pub fn first(&self) -> Option<&CodePair> {
        self.pairs.first()
    }

    /// Pair with the largest key
    pub fn last(&self) -> Option<&CodePair> {
        self.pairs.last()
    }
}

impl Index<ByNative> {
    /// Wrap pairs that are expected to already be in native order.
    ///
    /// The pairs are not sorted. Any pair whose native code is not strictly
    /// greater than its predecessor's is reported as [`Error::Integrity`]:
    /// the data file runs are out of order or overlap.
    pub fn from_ordered(pairs: Vec<CodePair>) -> Result<Self> {
        if let Some(index) = first_out_of_order(&pairs) {
            return Err(Error::Integrity {
                index,
                previous: pairs[index - 1].native,
                current: pairs[index].native,
            });
        }
        Ok(Self {
            pairs: pairs.into_boxed_slice(),
            _key: PhantomData,
        })
    }
}

impl Index<ByScalar> {
    /// Number of scalars that are mapped from more than one native code
    pub fn duplicate_scalars(&self) -> usize {
        self.pairs
            .windows(2)
            .filter(|w| w[0].scalar == w[1].scalar)
            .count()
    }
}

/// Position of the first pair whose native code does not strictly exceed the
/// previous one
fn first_out_of_order(pairs: &[CodePair]) -> Option<usize> {
    pairs
        .windows(2)
        .position(|w| w[0].native >= w[1].native)
        .map(|i| i + 1)
}

/// Big-endian cursor over the raw table bytes
struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.buf.len() < n {
            return None;
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Some(head)
    }

    fn read_u16(&mut self) -> Option<u16> {
        self.take(2).map(|b| u16::from_be_bytes([b[0], b[1]]))
    }
}

/// Parse a binary table into code pairs, in file order.
///
/// The header's code count is only used as a capacity hint. Bytes after the
/// last chunk are ignored.
pub fn parse(raw: &[u8]) -> Result<Vec<CodePair>> {
    let mut reader = Reader::new(raw);

    let (Some(code_count), Some(chunk_count)) = (reader.read_u16(), reader.read_u16()) else {
        return Err(Error::Format(format!(
            "truncated header: need 4 bytes, have {}",
            raw.len()
        )));
    };

    let mut pairs = Vec::with_capacity(code_count as usize);

    for chunk in 0..chunk_count {
        let (Some(start), Some(len)) = (reader.read_u16(), reader.read_u16()) else {
            return Err(Error::Format(format!("chunk {chunk}: truncated chunk header")));
        };

        let available = reader.remaining();
        let payload = reader.take(len as usize).ok_or_else(|| {
            Error::Format(format!(
                "chunk {chunk}: declared length {len} exceeds remaining {available} bytes"
            ))
        })?;

        let text = std::str::from_utf8(payload).map_err(|e| {
            Error::Format(format!(
                "chunk {chunk}: invalid UTF-8 at payload offset {}",
                e.valid_up_to()
            ))
        })?;

        for (offset, scalar) in text.chars().enumerate() {
            let native = u16::try_from(offset)
                .ok()
                .and_then(|offset| start.checked_add(offset))
                .ok_or_else(|| {
                    Error::Format(format!(
                        "chunk {chunk}: run starting at 0x{start:04X} runs past 0xFFFF"
                    ))
                })?;
            pairs.push(CodePair::new(native, scalar));
        }
    }

    Ok(pairs)
}

/// Serialize code pairs into the binary table format.
///
/// Pairs are ordered by native code; when a native code appears more than
/// once the first occurrence is kept. Contiguous codes are grouped into runs,
/// and a run is split before its payload would exceed `u16::MAX` bytes.
pub fn write(pairs: &[CodePair]) -> Vec<u8> {
    let mut sorted = pairs.to_vec();
    sorted.sort_by_key(|pair| pair.native);
    sorted.dedup_by_key(|pair| pair.native);

    // (start code, code count, payload)
    let mut runs: Vec<(u16, u32, String)> = Vec::new();
    for pair in &sorted {
        match runs.last_mut() {
            Some((start, count, text))
                if u32::from(*start) + *count == u32::from(pair.native)
                    && text.len() + pair.scalar.len_utf8() <= u16::MAX as usize =>
            {
                text.push(pair.scalar);
                *count += 1;
            }
            _ => runs.push((pair.native, 1, pair.scalar.to_string())),
        }
    }

    // Distinct u16 codes bound both counts well below u16::MAX runs
    let code_count = u16::try_from(sorted.len()).unwrap_or(u16::MAX);
    let chunk_count = u16::try_from(runs.len()).unwrap_or(u16::MAX);

    let payload_len: usize = runs.iter().map(|(_, _, text)| 4 + text.len()).sum();
    let mut out = Vec::with_capacity(4 + payload_len);
    out.extend_from_slice(&code_count.to_be_bytes());
    out.extend_from_slice(&chunk_count.to_be_bytes());
    for (start, _, text) in runs.iter().take(chunk_count as usize) {
        out.extend_from_slice(&start.to_be_bytes());
        out.extend_from_slice(&(text.len() as u16).to_be_bytes());
        out.extend_from_slice(text.as_bytes());
    }
    out
}

/// Parse a mapping listing in the Unicode consortium `CP949.TXT` layout.
///
/// Each line holds a hex native code and a hex Unicode scalar separated by
/// whitespace, optionally followed by a `#` comment. Blank lines, comment
/// lines and lines with only a native code (undefined positions) are skipped,
/// as are single-byte codes, which the translators pass through or never
/// produce. A native code mapped on more than one line is an error.
pub fn parse_mapping_text(text: &str) -> Result<Vec<CodePair>> {
    let mut pairs = Vec::new();
    // native code -> line it was first mapped on
    let mut seen: HashMap<u16, usize> = HashMap::new();

    for (number, line) in text.lines().enumerate() {
        let line_no = number + 1;
        let content = line.split('#').next().unwrap_or_default().trim();
        let mut fields = content.split_whitespace();
        let (Some(native), Some(scalar)) = (fields.next(), fields.next()) else {
            continue;
        };

        let native = parse_hex(native).ok_or_else(|| Error::Mapping {
            line: line_no,
            reason: format!("invalid native code {native:?}"),
        })?;
        if native <= 0xFF {
            continue;
        }
        let native = u16::try_from(native).map_err(|_| Error::Mapping {
            line: line_no,
            reason: format!("native code 0x{native:X} does not fit in two bytes"),
        })?;

        let scalar = parse_hex(scalar)
            .and_then(char::from_u32)
            .ok_or_else(|| Error::Mapping {
                line: line_no,
                reason: format!("invalid Unicode scalar {scalar:?}"),
            })?;

        if let Some(first) = seen.insert(native, line_no) {
            return Err(Error::Mapping {
                line: line_no,
                reason: format!("native code 0x{native:04X} already mapped on line {first}"),
            });
        }
        pairs.push(CodePair::new(native, scalar));
    }

    Ok(pairs)
}

fn parse_hex(field: &str) -> Option<u32> {
    let digits = field
        .strip_prefix("0x")
        .or_else(|| field.strip_prefix("0X"))?;
    u32::from_str_radix(digits, 16).ok()
}
