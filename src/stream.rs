//! Driving translators over readers and buffers

use std::io::{self, Read, Write};

use serde::Serialize;

use crate::Translate;
use crate::config::{DEFAULT_BUFFER_SIZE, MIN_BUFFER_SIZE};

/// Byte counts of a finished stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    /// Bytes read from the input
    pub bytes_read: u64,
    /// Bytes written to the output
    pub bytes_written: u64,
}

/// Streaming converter for processing large inputs in fixed-size reads
pub struct StreamTranslator<T> {
    translator: T,
    buffer_size: usize,
}

impl<T: Translate> StreamTranslator<T> {
    /// Create a stream translator reading `buffer_size` bytes at a time
    pub fn new(translator: T, buffer_size: usize) -> Self {
        Self {
            translator,
            buffer_size: buffer_size.max(MIN_BUFFER_SIZE),
        }
    }

    /// Create with default 64KB buffer
    pub fn with_default_buffer(translator: T) -> Self {
        Self::new(translator, DEFAULT_BUFFER_SIZE)
    }

    /// Read everything from `reader`, translate it and write it to `writer`.
    ///
    /// Bytes the translator leaves unconsumed at the end of a read (a
    /// character split by the read boundary) are carried into the next one.
    pub fn run<R: Read, W: Write>(&mut self, mut reader: R, mut writer: W) -> io::Result<StreamStats> {
        let mut buffer = vec![0u8; self.buffer_size];
        let mut filled = 0;
        let mut stats = StreamStats::default();

        loop {
            // At most three carried bytes, so this slice is never empty
            let read = match reader.read(&mut buffer[filled..]) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            let eof = read == 0;
            filled += read;
            stats.bytes_read += read as u64;

            let (consumed, output) = self.translator.translate(&buffer[..filled], eof);
            writer.write_all(output)?;
            stats.bytes_written += output.len() as u64;

            buffer.copy_within(consumed..filled, 0);
            filled -= consumed;

            if eof {
                break;
            }
        }

        writer.flush()?;
        Ok(stats)
    }

    /// Recover the wrapped translator
    pub fn into_inner(self) -> T {
        self.translator
    }
}

/// Translate a complete buffer in one call
pub fn convert(translator: &mut dyn Translate, input: &[u8]) -> Vec<u8> {
    let (_, output) = translator.translate(input, true);
    output.to_vec()
}
