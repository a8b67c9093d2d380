//! # cp949-codec - Table-Driven CP949 Character Encoding Codec
//!
//! Converts byte streams between CP949 (Unified Hangul Code, one or two bytes
//! per character) and UTF-8. The mapping is not computed: it is loaded from a
//! compact binary data file (`cp949.dat`) the first time a translator is
//! requested, sorted once per direction and shared by every translator after
//! that.
//!
//! ## Features
//!
//! - **Streaming translators** that consume a chunk and produce a chunk
//! - **ASCII passthrough** in both directions
//! - **Substitution, never failure** on unmapped characters (U+FFFD / `?`)
//! - **Compute-once tables** shared read-only across threads
//! - **Registry** mapping encoding names to translator factories
//!
//! ## Quick Start
//!
//! ```rust
//! use cp949_codec::{CodePair, TableCache, TableSource, Translate, table};
//!
//! // A one-character table: 0xA141 <-> U+AC00 ('가')
//! let dat = table::write(&[CodePair::new(0xA141, '가')]);
//! let cache = TableCache::new(TableSource::Bytes(dat));
//!
//! let mut decoder = cache.decoder().unwrap();
//! let (consumed, output) = decoder.translate(&[b'A', 0xA1, 0x41], true);
//! assert_eq!(consumed, 3);
//! assert_eq!(std::str::from_utf8(output).unwrap(), "A가");
//!
//! let mut encoder = cache.encoder().unwrap();
//! let (_, output) = encoder.translate("가".as_bytes(), true);
//! assert_eq!(output, &[0xA1, 0x41]);
//! ```

#![deny(missing_docs)]

use std::path::PathBuf;

pub mod cache;
pub mod config;
pub mod decode;
pub mod encode;
pub mod registry;
pub mod stream;
pub mod table;

pub use cache::{TableCache, TableSource};
pub use config::CodecConfig;
pub use decode::Decoder;
pub use encode::Encoder;
pub use registry::Registry;
pub use stream::StreamTranslator;
pub use table::{ByNative, ByScalar, CodePair, Index};

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or looking up a codec.
///
/// Translation itself never fails; every variant here is raised while a
/// table is being loaded or a translator is being constructed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The table data is structurally invalid
    #[error("malformed table data: {0}")]
    Format(String),

    /// The table data could not be read
    #[error("failed to read table {}: {source}", .path.display())]
    Io {
        /// Path that was being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The native-ordered table is not strictly ascending
    #[error(
        "table is not sorted by native code: 0x{current:04X} follows 0x{previous:04X} at index {index}"
    )]
    Integrity {
        /// Position of the offending pair
        index: usize,
        /// Native code of the preceding pair
        previous: u16,
        /// Native code of the offending pair
        current: u16,
    },

    /// No encoding is registered under this name
    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),

    /// Neither or both sides of a conversion are UTF-8
    #[error("unsupported conversion from {from} to {to}")]
    UnsupportedConversion {
        /// Source encoding name
        from: String,
        /// Target encoding name
        to: String,
    },

    /// A line of a mapping listing could not be parsed
    #[error("mapping line {line}: {reason}")]
    Mapping {
        /// 1-based line number
        line: usize,
        /// What was wrong with it
        reason: String,
    },

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// A streaming translator between two encodings.
///
/// `translate` is called repeatedly with successive chunks of a longer stream.
/// It returns how many input bytes were consumed and a view of the output
/// produced for them. The output borrows a scratch buffer owned by the
/// translator and is overwritten by the next call, so copy it before
/// translating again.
///
/// When `eof` is false a character split across the end of `chunk` is left
/// unconsumed; present those bytes again at the start of the next chunk. When
/// `eof` is true every byte is consumed.
pub trait Translate: Send {
    /// Translate one chunk of input
    fn translate(&mut self, chunk: &[u8], eof: bool) -> (usize, &[u8]);
}

impl<T: Translate + ?Sized> Translate for Box<T> {
    fn translate(&mut self, chunk: &[u8], eof: bool) -> (usize, &[u8]) {
        (**self).translate(chunk, eof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrity_error_message() {
        let err = Error::Integrity {
            index: 3,
            previous: 0xA142,
            current: 0xA141,
        };
        assert_eq!(
            err.to_string(),
            "table is not sorted by native code: 0xA141 follows 0xA142 at index 3"
        );
    }

    #[test]
    fn test_io_error_keeps_source() {
        use std::error::Error as _;

        let err = Error::Io {
            path: PathBuf::from("cp949.dat"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().starts_with("failed to read table cp949.dat"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_translators_are_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Decoder>();
        assert_send::<Encoder>();
        assert_send::<Box<dyn Translate>>();
    }
}
