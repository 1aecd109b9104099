//! blockenc - Block-video encoder adapter
//!
//! Adapts a generic encoding pipeline to a block-based image encoder with a
//! packet-oriented, possibly-buffered output protocol:
//! - `config`: translate a generic rate-control/GOP configuration into the
//!   encoder's native parameter set
//! - `session`: encoder lifecycle (init, full reinit, per-frame submission,
//!   close) over a pluggable native codec
//! - `queue`: reconcile the encoder's multi-packet emission with a strict
//!   one-packet-per-call output contract
//! - `stats`: first-pass statistics accumulation and the text transport
//!   artifact handed to the second pass
//!
//! The compression algorithm itself lives behind the [`NativeCodec`] /
//! [`NativeEncoder`] traits and is supplied by the caller.

pub mod config;
pub mod error;
pub mod native;
pub mod queue;
pub mod session;
pub mod stats;

pub use config::{
    translate, ArnrFilter, EncodeConfig, LegacyOptions, TuningOptions, LEGACY_AUTO_ALT_REF,
    LEGACY_ERROR_RESILIENT,
};
pub use error::{Error, Result};
pub use native::{
    ControlId, NativeCodec, NativeConfig, NativeEncoder, NativeError, NativeFrame, NativePacket,
    RateControl, RawImage, MAX_LOOKAHEAD,
};
pub use queue::{OutputQueue, PacketInfo};
pub use session::EncoderSession;
pub use stats::StatsAccumulator;

/// Rational number, used for stream timebases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rational {
    pub num: u32,
    pub den: u32,
}

impl Rational {
    pub fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self { num: 1, den: 30 }
    }
}

/// Rate-control pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassMode {
    /// Single-pass encoding
    #[default]
    Single,
    /// First pass: collect statistics for a later pass
    First,
    /// Last pass: consume statistics collected by a first pass
    Last,
}

/// How long the encoder may spend on one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Deadline {
    /// Finish within one frame interval
    Realtime,
    /// Balanced speed and quality
    #[default]
    Good,
    /// No time limit
    Best,
}

impl Deadline {
    /// Per-frame budget in microseconds as the native encoder expects it
    /// (zero means unconstrained).
    pub fn as_micros(self) -> u64 {
        match self {
            Deadline::Realtime => 1,
            Deadline::Good => 1_000_000,
            Deadline::Best => 0,
        }
    }
}
