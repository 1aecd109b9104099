//! Generic encoder configuration and its translation to the native
//! parameter set
//!
//! `EncodeConfig` is the canonical schema the surrounding pipeline fills
//! in; unset knobs are `Option` or zero rather than sentinel values.
//! [`translate`] maps it onto a [`NativeConfig`], starting from the codec's
//! defaults and overriding only what the configuration specifies.

use crate::native::{NativeConfig, RateControl, MAX_LOOKAHEAD};
use crate::{stats, Deadline, Error, PassMode, Rational, Result};

/// Generic encoding configuration handed in by the pipeline
#[derive(Debug, Clone)]
pub struct EncodeConfig {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Timestamp unit for submitted frames
    pub time_base: Rational,
    /// Thread-count hint for the native encoder
    pub threads: u32,
    /// Target bitrate in bits per second
    pub bitrate: u64,
    /// Minimum bitrate in bits per second (0 = unconstrained)
    pub min_rate: u64,
    /// Maximum bitrate in bits per second (0 = unconstrained)
    pub max_rate: u64,
    /// Lowest allowed quantizer; 0 leaves the native default
    pub quantizer_min: u32,
    /// Highest allowed quantizer; 0 leaves the native default
    pub quantizer_max: u32,
    /// Frame-drop threshold, passed through unchanged
    pub drop_frame_threshold: u32,
    /// Decoder buffer size in the byte-rate model (0 = native default)
    pub buffer_size: u64,
    /// Initial decoder buffer occupancy (0 = native default)
    pub buffer_initial_occupancy: u64,
    /// How aggressively the rate control may undershoot the buffer, 0.0-1.0
    pub buffer_aggressiveness: f32,
    /// Minimum keyframe distance; only honored when equal to `gop_size`
    pub keyint_min: Option<u32>,
    /// Maximum keyframe distance (GOP size)
    pub gop_size: Option<u32>,
    pub pass: PassMode,
    /// First-pass statistics artifact, required for [`PassMode::Last`]
    pub stats_in: Option<String>,
    /// Frames to buffer for forward-looking rate control, clamped to
    /// [`MAX_LOOKAHEAD`]
    pub lookahead: Option<u32>,
    /// Quantizer curve compression factor, 0.0 (CBR-like) to 1.0 (VBR-like)
    pub quality_compression: f32,
    /// Quality level for constant-quality mode
    pub constant_quality: Option<u32>,
    /// Codec profile; unset keeps the native default
    pub profile: Option<u32>,
    pub error_resilient: bool,
    pub deadline: Deadline,
    pub tuning: TuningOptions,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            time_base: Rational::default(),
            threads: 1,
            bitrate: 256_000,
            min_rate: 0,
            max_rate: 0,
            quantizer_min: 0,
            quantizer_max: 0,
            drop_frame_threshold: 0,
            buffer_size: 0,
            buffer_initial_occupancy: 0,
            buffer_aggressiveness: 1.0,
            keyint_min: None,
            gop_size: None,
            pass: PassMode::Single,
            stats_in: None,
            lookahead: Some(MAX_LOOKAHEAD),
            quality_compression: 0.5,
            constant_quality: None,
            profile: None,
            error_resilient: false,
            deadline: Deadline::Good,
            tuning: TuningOptions::default(),
        }
    }
}

/// Knobs applied as individual soft control calls after construction
#[derive(Debug, Clone, Copy, Default)]
pub struct TuningOptions {
    /// Quality/speed ratio modifier (cpu-used), -16 to 16
    pub speed: Option<i32>,
    /// Enable alternate reference frames
    pub auto_alt_ref: Option<bool>,
    /// Alt-ref noise reduction max frame count
    pub arnr_max_frames: Option<u32>,
    /// Alt-ref noise reduction filter strength
    pub arnr_strength: Option<u32>,
    /// Alt-ref noise reduction filter type
    pub arnr_filter: Option<ArnrFilter>,
    /// Temporal noise sensitivity
    pub noise_sensitivity: u32,
    /// Requested slice count; mapped to log2 token partitions
    pub slices: u32,
    /// Motion threshold below which blocks are skipped
    pub static_threshold: u32,
}

/// Alt-ref noise reduction filter type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArnrFilter {
    Backward = 1,
    Forward = 2,
    Centered = 3,
}

/// Legacy error-resilience flag bit
pub const LEGACY_ERROR_RESILIENT: u32 = 1 << 0;
/// Legacy auto-alt-ref flag bit
pub const LEGACY_AUTO_ALT_REF: u32 = 1 << 1;

/// Options from the era when the surrounding pipeline carried them in
/// shared global fields with codec-dependent meaning.
///
/// They are folded into the canonical schema by
/// [`EncodeConfig::apply_legacy`] at the boundary; nothing below it ever
/// inspects a legacy field.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyOptions {
    /// Packed flag bits ([`LEGACY_ERROR_RESILIENT`], [`LEGACY_AUTO_ALT_REF`])
    pub flags: u32,
    /// Pipeline-global lookahead; negative means unset
    pub rc_lookahead: Option<i32>,
    /// Pipeline-global quality factor; negative means unset
    pub crf: Option<i32>,
}

impl EncodeConfig {
    /// Normalize legacy options into the canonical schema
    pub fn apply_legacy(&mut self, legacy: &LegacyOptions) {
        if legacy.flags & LEGACY_ERROR_RESILIENT != 0 {
            self.error_resilient = true;
        }
        if legacy.flags & LEGACY_AUTO_ALT_REF != 0 {
            self.tuning.auto_alt_ref = Some(true);
        }
        if let Some(lookahead) = legacy.rc_lookahead {
            if lookahead >= 0 {
                self.lookahead = Some((lookahead as u32).min(MAX_LOOKAHEAD));
            }
        }
        if let Some(crf) = legacy.crf {
            if crf >= 0 {
                self.constant_quality = Some(crf as u32);
            }
        }
    }
}

/// Translate a generic configuration into the native parameter set.
///
/// Deterministic: the result depends only on `cfg` and `base` (the codec's
/// default parameter set). Fails with [`Error::Config`] before any native
/// call when the configuration cannot be honored, in particular for a last
/// pass without first-pass statistics.
pub fn translate(cfg: &EncodeConfig, base: &NativeConfig) -> Result<NativeConfig> {
    if cfg.width == 0 || cfg.height == 0 {
        return Err(Error::Config("frame dimensions must be nonzero".to_string()));
    }
    if cfg.bitrate == 0 {
        return Err(Error::Config("target bitrate must be nonzero".to_string()));
    }

    let mut native = base.clone();
    native.width = cfg.width;
    native.height = cfg.height;
    native.time_base = cfg.time_base;
    native.threads = cfg.threads;
    native.pass = cfg.pass;

    if let Some(lookahead) = cfg.lookahead {
        // values past the supported range make construction fail
        native.lag_in_frames = lookahead.min(MAX_LOOKAHEAD);
    }

    if cfg.min_rate == cfg.max_rate && cfg.min_rate == cfg.bitrate {
        native.rate_control = RateControl::Cbr;
    } else if cfg.constant_quality.is_some() {
        native.rate_control = RateControl::Cq;
    }

    native.target_bitrate_kbps = rescale_kbps(cfg.bitrate);
    if cfg.quantizer_min > 0 {
        native.min_quantizer = cfg.quantizer_min;
    }
    if cfg.quantizer_max > 0 {
        native.max_quantizer = cfg.quantizer_max;
    }
    native.drop_frame_threshold = cfg.drop_frame_threshold;

    // 0-100 (0 => CBR, 100 => VBR)
    native.vbr_bias_pct = (cfg.quality_compression * 100.0).round() as u32;
    native.vbr_min_section_pct = (cfg.min_rate * 100 / cfg.bitrate) as u32;
    if cfg.max_rate != 0 {
        native.vbr_max_section_pct = (cfg.max_rate * 100 / cfg.bitrate) as u32;
    }

    if cfg.buffer_size != 0 {
        native.buffer_size_ms = cfg.buffer_size * 1000 / cfg.bitrate;
    }
    if cfg.buffer_initial_occupancy != 0 {
        native.buffer_initial_ms = cfg.buffer_initial_occupancy * 1000 / cfg.bitrate;
    }
    native.buffer_optimal_ms = native.buffer_size_ms * 5 / 6;
    native.undershoot_pct = (cfg.buffer_aggressiveness * 100.0).round() as u32;

    // construction balks when the minimum distance differs from the maximum
    // while automatic keyframe placement is active
    if let (Some(keyint_min), Some(gop_size)) = (cfg.keyint_min, cfg.gop_size) {
        if keyint_min == gop_size {
            native.keyframe_min_interval = keyint_min;
        }
    }
    if let Some(gop_size) = cfg.gop_size {
        native.keyframe_max_interval = gop_size;
    }

    match cfg.pass {
        PassMode::Single => {}
        // statistics collection and lookahead are mutually exclusive
        PassMode::First => native.lag_in_frames = 0,
        PassMode::Last => {
            let text = cfg.stats_in.as_deref().ok_or_else(|| {
                Error::Config("last pass requires first-pass statistics".to_string())
            })?;
            native.two_pass_stats = Some(stats::from_text(text)?);
        }
    }

    if let Some(profile) = cfg.profile {
        native.profile = profile;
    }
    native.error_resilient = cfg.error_resilient;

    Ok(native)
}

/// Bits-per-second to kilobits-per-second, rounding halves to even
fn rescale_kbps(bits_per_sec: u64) -> u32 {
    let quotient = bits_per_sec / 1000;
    let remainder = bits_per_sec % 1000;
    let rounded = match (remainder * 2).cmp(&1000) {
        std::cmp::Ordering::Less => quotient,
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal => quotient + (quotient & 1),
    };
    rounded as u32
}
