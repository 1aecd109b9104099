//! Native encoder boundary
//!
//! The compression algorithm is owned by a native encoder library; this
//! module defines the seam the rest of the crate talks through. A codec
//! binding implements [`NativeCodec`] (default parameter set plus
//! construction) and [`NativeEncoder`] (one live encoder instance).

use crate::{PassMode, Rational};

/// Largest lookahead the native encoder accepts; larger values make
/// construction fail, so translation clamps to this.
pub const MAX_LOOKAHEAD: u32 = 25;

/// Rate-control policy of the native encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateControl {
    /// Variable bitrate
    #[default]
    Vbr,
    /// Constant bitrate
    Cbr,
    /// Constant quality
    Cq,
}

/// The native encoder's parameter set.
///
/// Populated once per session by [`crate::translate`], starting from the
/// codec's [`NativeCodec::default_config`]. It is never patched in place;
/// changing any field means a full session reinit.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeConfig {
    pub width: u32,
    pub height: u32,
    pub time_base: Rational,
    /// Thread-count hint; internal threading stays opaque to the adapter
    pub threads: u32,
    pub profile: u32,
    pub error_resilient: bool,
    pub pass: PassMode,
    /// Frames buffered internally before output is emitted
    pub lag_in_frames: u32,
    pub rate_control: RateControl,
    /// Target bitrate in kilobits per second
    pub target_bitrate_kbps: u32,
    pub min_quantizer: u32,
    pub max_quantizer: u32,
    pub drop_frame_threshold: u32,
    pub undershoot_pct: u32,
    /// Decoder buffer model in milliseconds of payload at the target bitrate
    pub buffer_size_ms: u64,
    pub buffer_initial_ms: u64,
    pub buffer_optimal_ms: u64,
    pub vbr_bias_pct: u32,
    pub vbr_min_section_pct: u32,
    pub vbr_max_section_pct: u32,
    /// Minimum keyframe spacing; must equal the maximum for automatic
    /// keyframe placement to stay enabled
    pub keyframe_min_interval: u32,
    pub keyframe_max_interval: u32,
    /// Decoded first-pass statistics, required for [`PassMode::Last`]
    pub two_pass_stats: Option<Vec<u8>>,
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            time_base: Rational::default(),
            threads: 1,
            profile: 0,
            error_resilient: false,
            pass: PassMode::Single,
            lag_in_frames: 0,
            rate_control: RateControl::Vbr,
            target_bitrate_kbps: 256,
            min_quantizer: 4,
            max_quantizer: 63,
            drop_frame_threshold: 0,
            undershoot_pct: 100,
            buffer_size_ms: 6000,
            buffer_initial_ms: 4000,
            buffer_optimal_ms: 5000,
            vbr_bias_pct: 50,
            vbr_min_section_pct: 0,
            vbr_max_section_pct: 400,
            keyframe_min_interval: 0,
            keyframe_max_interval: 128,
            two_pass_stats: None,
        }
    }
}

/// Error reported by the native library: a status code plus the library's
/// message and optional detail string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeError {
    pub code: i32,
    pub message: String,
    pub detail: Option<String>,
}

impl NativeError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl std::fmt::Display for NativeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)?;
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}

impl std::error::Error for NativeError {}

/// Tuning knobs applied after construction, one native call each.
///
/// Failures are soft: the session logs them and keeps the native default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlId {
    /// Quality/speed trade-off
    CpuUsed,
    /// Enable alternate reference frames
    EnableAutoAltRef,
    /// Alt-ref noise reduction: frame count
    ArnrMaxFrames,
    /// Alt-ref noise reduction: filter strength
    ArnrStrength,
    /// Alt-ref noise reduction: filter type
    ArnrType,
    NoiseSensitivity,
    /// Number of independently decodable token partitions, as a log2
    TokenPartitions,
    /// Motion threshold below which blocks are skipped
    StaticThreshold,
    /// Quantizer level for constant-quality mode
    CqLevel,
}

impl std::fmt::Display for ControlId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ControlId::CpuUsed => "cpu-used",
            ControlId::EnableAutoAltRef => "enable-auto-alt-ref",
            ControlId::ArnrMaxFrames => "arnr-max-frames",
            ControlId::ArnrStrength => "arnr-strength",
            ControlId::ArnrType => "arnr-type",
            ControlId::NoiseSensitivity => "noise-sensitivity",
            ControlId::TokenPartitions => "token-partitions",
            ControlId::StaticThreshold => "static-threshold",
            ControlId::CqLevel => "cq-level",
        };
        f.write_str(name)
    }
}

/// Raw planar image for one submission.
///
/// The adapter reads the planes synchronously during a single
/// [`crate::EncoderSession::encode`] call and never extends their lifetime.
#[derive(Debug, Clone, Copy)]
pub struct RawImage<'a> {
    /// Y, U, V planes
    pub planes: [&'a [u8]; 3],
    /// Per-plane stride in bytes
    pub strides: [usize; 3],
    /// Presentation timestamp in timebase units
    pub pts: i64,
    /// Display duration in timebase units
    pub duration: u64,
    /// Frame is externally marked as an intra frame
    pub intra: bool,
}

/// One unit of native output.
///
/// Borrows the encoder, so the payload is only reachable until the next
/// native call; anything kept longer must be copied first.
#[derive(Debug)]
pub enum NativePacket<'a> {
    /// A compressed frame
    Frame(NativeFrame<'a>),
    /// A first-pass statistics fragment
    Stats(&'a [u8]),
    /// A kind the adapter does not handle; discarded silently
    Unsupported,
}

/// Compressed-frame payload and timing
#[derive(Debug, Clone, Copy)]
pub struct NativeFrame<'a> {
    pub data: &'a [u8],
    pub pts: i64,
    pub duration: u64,
    pub keyframe: bool,
}

/// A codec interface: hands out the default parameter set and constructs
/// encoder instances from a translated configuration.
pub trait NativeCodec: Send {
    /// Codec name for diagnostics
    fn name(&self) -> &'static str;

    /// The parameter set construction starts from; translation overrides
    /// only what the generic configuration specifies
    fn default_config(&self) -> NativeConfig;

    /// Construct one encoder instance
    fn open(&self, config: &NativeConfig) -> std::result::Result<Box<dyn NativeEncoder>, NativeError>;
}

/// One live native encoder instance.
///
/// Dropping the instance releases the native resources.
pub trait NativeEncoder: Send {
    /// Apply one tuning control
    fn control(&mut self, id: ControlId, value: i32) -> std::result::Result<(), NativeError>;

    /// Submit one image, or `None` to signal end-of-stream and flush
    fn submit(
        &mut self,
        image: Option<&RawImage<'_>>,
        force_keyframe: bool,
        deadline_us: u64,
    ) -> std::result::Result<(), NativeError>;

    /// Pull the next pending output packet, if any. The encoder may emit
    /// zero, one, or several packets per submission.
    fn next_packet(&mut self) -> Option<NativePacket<'_>>;
}
