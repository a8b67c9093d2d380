//! Encoding registry
//!
//! Maps encoding names to a pair of translator factories, one per direction.
//! Names are matched case-insensitively against the canonical name and its
//! aliases.

use crate::{Error, Result, Translate, cache};

/// Builds a translator; the argument is an encoding-specific option string
pub type Factory = fn(&str) -> Result<Box<dyn Translate>>;

/// Canonical name of UTF-8, the other side of every registered conversion
pub const UTF8: &str = "utf-8";

/// A registered encoding
#[derive(Debug, Clone, Copy)]
pub struct EncodingEntry {
    /// Canonical name
    pub name: &'static str,
    /// Alternative names
    pub aliases: &'static [&'static str],
    /// Human-readable description
    pub description: &'static str,
    /// Factory for native-to-UTF-8 translators
    pub decoder: Factory,
    /// Factory for UTF-8-to-native translators
    pub encoder: Factory,
}

impl EncodingEntry {
    /// Whether `name` refers to this encoding
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(name))
    }
}

/// CP949 backed by the process-wide [`TableCache`](crate::TableCache)
pub const CP949: EncodingEntry = EncodingEntry {
    name: "cp949",
    aliases: &["uhc", "windows-949", "ks_c_5601-1987", "ms949"],
    description: "Unified Hangul Code (Korean), EUC-KR superset",
    decoder: cp949_decoder,
    encoder: cp949_encoder,
};

fn cp949_decoder(_arg: &str) -> Result<Box<dyn Translate>> {
    Ok(Box::new(cache::global()?.decoder()?))
}

fn cp949_encoder(_arg: &str) -> Result<Box<dyn Translate>> {
    Ok(Box::new(cache::global()?.encoder()?))
}

/// Name-to-factory lookup
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<EncodingEntry>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in encodings
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(CP949);
        registry
    }

    /// Register an encoding; a later entry shadows earlier ones with the same name
    pub fn register(&mut self, entry: EncodingEntry) {
        self.entries.insert(0, entry);
    }

    /// Registered encodings, most recent first
    pub fn entries(&self) -> impl Iterator<Item = &EncodingEntry> + '_ {
        self.entries.iter()
    }

    /// Find the entry for `name`
    pub fn lookup(&self, name: &str) -> Result<&EncodingEntry> {
        self.entries
            .iter()
            .find(|entry| entry.matches(name))
            .ok_or_else(|| Error::UnknownEncoding(name.to_string()))
    }

    /// Native-to-UTF-8 translator for `name`
    pub fn decoder(&self, name: &str, arg: &str) -> Result<Box<dyn Translate>> {
        (self.lookup(name)?.decoder)(arg)
    }

    /// UTF-8-to-native translator for `name`
    pub fn encoder(&self, name: &str, arg: &str) -> Result<Box<dyn Translate>> {
        (self.lookup(name)?.encoder)(arg)
    }

    /// Translator converting `from` into `to`; one side must be UTF-8
    pub fn converter(&self, from: &str, to: &str) -> Result<Box<dyn Translate>> {
        match (is_utf8(from), is_utf8(to)) {
            (false, true) => self.decoder(from, ""),
            (true, false) => self.encoder(to, ""),
            _ => Err(Error::UnsupportedConversion {
                from: from.to_string(),
                to: to.to_string(),
            }),
        }
    }
}

fn is_utf8(name: &str) -> bool {
    name.eq_ignore_ascii_case(UTF8) || name.eq_ignore_ascii_case("utf8")
}
