//! Lazily built, shared lookup tables
//!
//! A [`TableCache`] owns one compute-once slot per translation direction.
//! The first request for a direction reads the table bytes from its
//! [`TableSource`], parses them and builds that direction's [`Index`];
//! concurrent first callers block until the build finishes and then share
//! the same `Arc`. A slot is never invalidated once populated. A failed build
//! leaves the slot empty and hands the error to the caller.
//!
//! [`global`] is the process-wide cache used by the [`Registry`](crate::Registry)
//! factories.

use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::config::CodecConfig;
use crate::decode::Decoder;
use crate::encode::Encoder;
use crate::table::{self, ByNative, ByScalar, CodePair, Index};
use crate::{Error, Result};

/// Where a cache reads its table bytes from
#[derive(Debug, Clone)]
pub enum TableSource {
    /// Binary table file on disk
    File(PathBuf),
    /// Table bytes held in memory
    Bytes(Vec<u8>),
    /// Table bytes compiled into the binary
    Static(&'static [u8]),
}

impl TableSource {
    /// Read the raw table bytes
    pub fn read(&self) -> Result<Cow<'_, [u8]>> {
        match self {
            TableSource::File(path) => std::fs::read(path)
                .map(Cow::Owned)
                .map_err(|source| Error::Io {
                    path: path.clone(),
                    source,
                }),
            TableSource::Bytes(bytes) => Ok(Cow::Borrowed(bytes.as_slice())),
            TableSource::Static(bytes) => Ok(Cow::Borrowed(*bytes)),
        }
    }
}

impl fmt::Display for TableSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableSource::File(path) => write!(f, "{}", path.display()),
            TableSource::Bytes(bytes) => write!(f, "<{} bytes in memory>", bytes.len()),
            TableSource::Static(bytes) => write!(f, "<{} static bytes>", bytes.len()),
        }
    }
}

/// Summary of a loaded table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableStats {
    /// Number of mapped native codes
    pub pairs: usize,
    /// Smallest and largest native code
    pub native_range: Option<(u16, u16)>,
    /// Smallest and largest mapped scalar
    pub scalar_range: Option<(u32, u32)>,
    /// Scalars reachable from more than one native code
    pub duplicate_scalars: usize,
}

/// Per-direction memoized indices over one table source
pub struct TableCache {
    source: TableSource,
    native: OnceCell<Arc<Index<ByNative>>>,
    scalar: OnceCell<Arc<Index<ByScalar>>>,
}

impl TableCache {
    /// Create an empty cache; nothing is read until a direction is requested
    pub fn new(source: TableSource) -> Self {
        Self {
            source,
            native: OnceCell::new(),
            scalar: OnceCell::new(),
        }
    }

    /// Create a cache reading the table configured in `config`
    pub fn from_config(config: &CodecConfig) -> Self {
        Self::new(config.table_source())
    }

    /// Table source of this cache
    pub fn source(&self) -> &TableSource {
        &self.source
    }

    /// Native-ordered index for decoding, built on first call.
    ///
    /// The table's runs are taken in file order and must already be strictly
    /// ascending; otherwise the data file is inconsistent and
    /// [`Error::Integrity`] is returned.
    pub fn native_index(&self) -> Result<Arc<Index<ByNative>>> {
        self.native
            .get_or_try_init(|| {
                let pairs = self.load()?;
                match Index::<ByNative>::from_ordered(pairs) {
                    Ok(index) => {
                        debug!(pairs = index.len(), "built native-ordered index");
                        Ok(Arc::new(index))
                    }
                    Err(e) => {
                        error!(source = %self.source, error = %e, "table data is inconsistent");
                        Err(e)
                    }
                }
            })
            .cloned()
    }

    /// Scalar-ordered index for encoding, built on first call
    pub fn scalar_index(&self) -> Result<Arc<Index<ByScalar>>> {
        self.scalar
            .get_or_try_init(|| {
                let pairs = self.load()?;
                let index = Index::<ByScalar>::build(&pairs);
                let duplicates = index.duplicate_scalars();
                if duplicates > 0 {
                    warn!(duplicates, "scalars mapped from several native codes; first in table order wins");
                }
                debug!(pairs = index.len(), "built scalar-ordered index");
                Ok(Arc::new(index))
            })
            .cloned()
    }

    /// New decoder sharing this cache's native-ordered index
    pub fn decoder(&self) -> Result<Decoder> {
        Ok(Decoder::new(self.native_index()?))
    }

    /// New encoder sharing this cache's scalar-ordered index
    pub fn encoder(&self) -> Result<Encoder> {
        Ok(Encoder::new(self.scalar_index()?))
    }

    /// Statistics over both indices (builds them if needed)
    pub fn stats(&self) -> Result<TableStats> {
        let native = self.native_index()?;
        let scalar = self.scalar_index()?;
        Ok(TableStats {
            pairs: native.len(),
            native_range: native.first().zip(native.last()).map(|(a, b)| (a.native, b.native)),
            scalar_range: scalar
                .first()
                .zip(scalar.last())
                .map(|(a, b)| (a.scalar as u32, b.scalar as u32)),
            duplicate_scalars: scalar.duplicate_scalars(),
        })
    }

    fn load(&self) -> Result<Vec<CodePair>> {
        let start = Instant::now();
        let raw = self.source.read()?;
        let pairs = table::parse(&raw)?;
        debug!(
            source = %self.source,
            bytes = raw.len(),
            pairs = pairs.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "loaded code table"
        );
        Ok(pairs)
    }
}

impl fmt::Debug for TableCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableCache")
            .field("source", &self.source)
            .field("native_loaded", &self.native.get().is_some())
            .field("scalar_loaded", &self.scalar.get().is_some())
            .finish()
    }
}

static GLOBAL: OnceCell<TableCache> = OnceCell::new();

/// Process-wide cache.
///
/// Configured from the environment on first access unless
/// [`install_global`] ran earlier. An invalid environment is returned as
/// [`Error::Config`] and the cache stays uninitialized.
pub fn global() -> Result<&'static TableCache> {
    GLOBAL.get_or_try_init(|| cache_from_lookup(|key| std::env::var(key).ok()))
}

fn cache_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<TableCache> {
    match CodecConfig::from_lookup(lookup) {
        Ok(config) => Ok(TableCache::from_config(&config)),
        Err(e) => {
            error!(error = %e, "invalid codec environment configuration");
            Err(e)
        }
    }
}

/// Install the process-wide cache.
///
/// Returns the cache back if the global cache was already initialized.
pub fn install_global(cache: TableCache) -> std::result::Result<(), TableCache> {
    GLOBAL.set(cache)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Translate;

    #[test]
    fn test_environment_cache_keeps_configured_table() {
        let cache = cache_from_lookup(|key| match key {
            crate::config::TABLE_ENV => Some("/opt/tables/cp949.dat".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cache.source().to_string(), "/opt/tables/cp949.dat");
    }

    #[test]
    fn test_invalid_environment_is_not_replaced_by_defaults() {
        let err = cache_from_lookup(|key| match key {
            crate::config::TABLE_ENV => Some("/opt/tables/cp949.dat".to_string()),
            crate::config::BUFFER_SIZE_ENV => Some("2".to_string()),
            _ => None,
        })
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    fn fixture() -> TableCache {
        TableCache::new(TableSource::Bytes(table::write(&[
            CodePair::new(0xA141, '\u{AC00}'),
            CodePair::new(0xA142, '\u{AC01}'),
            CodePair::new(0xB0A1, '\u{AC00}'),
        ])))
    }

    #[test]
    fn test_indices_are_built_once() {
        let cache = fixture();
        let a = cache.native_index().unwrap();
        let b = cache.native_index().unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let a = cache.scalar_index().unwrap();
        let b = cache.scalar_index().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_concurrent_first_use_shares_one_index() {
        let cache = Arc::new(fixture());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.scalar_index().unwrap())
            })
            .collect();
        let indices: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for index in &indices[1..] {
            assert!(Arc::ptr_eq(&indices[0], index));
        }
    }

    #[test]
    fn test_translators_share_the_index() {
        let cache = fixture();
        let mut first = cache.decoder().unwrap();
        let mut second = cache.decoder().unwrap();
        assert_eq!(first.translate(&[0xA1, 0x42], true).1, "\u{AC01}".as_bytes());
        assert_eq!(second.translate(&[0xA1, 0x41], true).1, "\u{AC00}".as_bytes());
    }

    #[test]
    fn test_unsorted_table_is_rejected() {
        // Two runs in descending order
        let mut raw = vec![0x00, 0x02, 0x00, 0x02];
        for (code, ch) in [(0xB0A1u16, '가'), (0xA141, '각')] {
            raw.extend_from_slice(&code.to_be_bytes());
            raw.extend_from_slice(&(ch.len_utf8() as u16).to_be_bytes());
            raw.extend_from_slice(ch.to_string().as_bytes());
        }
        let cache = TableCache::new(TableSource::Bytes(raw));

        assert!(matches!(cache.decoder(), Err(Error::Integrity { index: 1, .. })));
        // The slot stays empty; no unsorted index is ever handed out
        assert!(cache.native.get().is_none());
        // Encoding sorts explicitly and is unaffected
        assert!(cache.encoder().is_ok());
    }

    #[test]
    fn test_malformed_table_propagates() {
        let cache = TableCache::new(TableSource::Static(&[0x00]));
        assert!(matches!(cache.decoder(), Err(Error::Format(_))));
        assert!(matches!(cache.encoder(), Err(Error::Format(_))));
    }

    #[test]
    fn test_missing_file() {
        let cache = TableCache::new(TableSource::File(PathBuf::from(
            "/nonexistent/cp949-codec/cp949.dat",
        )));
        assert!(matches!(cache.decoder(), Err(Error::Io { .. })));
    }

    #[test]
    fn test_stats() {
        let stats = fixture().stats().unwrap();
        assert_eq!(
            stats,
            TableStats {
                pairs: 3,
                native_range: Some((0xA141, 0xB0A1)),
                scalar_range: Some((0xAC00, 0xAC01)),
                duplicate_scalars: 1,
            }
        );
    }

    #[test]
    fn test_source_display() {
        assert_eq!(TableSource::File(PathBuf::from("cp949.dat")).to_string(), "cp949.dat");
        assert_eq!(TableSource::Bytes(vec![0; 4]).to_string(), "<4 bytes in memory>");
    }
}
