//! First-pass statistics accumulation and transport
//!
//! During the first pass the native encoder emits binary statistics
//! fragments alongside (or instead of) frame packets. They are collected
//! here in emission order and handed to the last pass as a printable text
//! artifact that survives storage, transmission, and process restarts.

use crate::{Error, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// Growable buffer collecting first-pass statistics fragments
#[derive(Debug, Default)]
pub struct StatsAccumulator {
    buf: Vec<u8>,
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one fragment. Fragments are never reordered or dropped.
    pub fn append(&mut self, fragment: &[u8]) -> Result<()> {
        self.buf
            .try_reserve(fragment.len())
            .map_err(|_| Error::Allocation(fragment.len()))?;
        self.buf.extend_from_slice(fragment);
        Ok(())
    }

    /// Total bytes accumulated so far
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Encode the accumulated bytes into the text artifact handed to the
    /// last pass.
    pub fn finalize(&self) -> String {
        BASE64.encode(&self.buf)
    }

    /// Discard everything collected so far
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

/// Decode a text artifact back into the statistics bytes it was built from.
///
/// The decoded length, not any caller-side estimate, is what sizes the
/// buffer handed to the native rate-control pass.
pub fn from_text(text: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(text.trim_end())
        .map_err(|e| Error::Config(format!("statistics decode failed: {e}")))
}
