//! Encoder session lifecycle
//!
//! `EncoderSession` owns one native encoder instance together with the
//! output queue and statistics buffer that belong to it. The three form a
//! single unit of mutable state: they are created by `init()`, released
//! together by `close()` or a re-init, and must be driven from one thread
//! at a time.

use tracing::{debug, info, warn};

use crate::config::{translate, EncodeConfig, TuningOptions};
use crate::native::{ControlId, NativeCodec, NativeEncoder, NativeError, RawImage};
use crate::queue::{OutputQueue, PacketInfo};
use crate::stats::StatsAccumulator;
use crate::{Deadline, Error, PassMode, Result};

/// Encoding session over a pluggable native codec.
///
/// Lifecycle: `new` -> `init` -> `encode`* -> `close`. Calling `init` on an
/// initialized session performs a full re-init: the native instance and all
/// owned buffers are released before anything is rebuilt, so every
/// configuration starts from a clean encoder.
pub struct EncoderSession {
    codec: Box<dyn NativeCodec>,
    /// `Some` exactly while the session is initialized
    encoder: Option<Box<dyn NativeEncoder>>,
    queue: OutputQueue,
    stats: StatsAccumulator,
    stats_out: Option<String>,
    pass: PassMode,
    deadline: Deadline,
}

impl EncoderSession {
    /// Create an uninitialized session for the given codec
    pub fn new(codec: Box<dyn NativeCodec>) -> Self {
        Self {
            codec,
            encoder: None,
            queue: OutputQueue::new(),
            stats: StatsAccumulator::new(),
            stats_out: None,
            pass: PassMode::Single,
            deadline: Deadline::Good,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.encoder.is_some()
    }

    /// Translate the configuration and construct the native encoder.
    ///
    /// On failure the session is left uninitialized; `encode` refuses to
    /// run until a later `init` succeeds. Tuning knobs are applied as
    /// individual soft control calls afterwards: a control the encoder
    /// rejects is logged and left at its native default.
    pub fn init(&mut self, cfg: &EncodeConfig) -> Result<()> {
        if self.encoder.is_some() {
            debug!(codec = self.codec.name(), "doing full encoder re-init");
            self.teardown();
        }

        let native_cfg = translate(cfg, &self.codec.default_config())?;
        debug!(config = ?native_cfg, "native encoder configuration");
        info!(
            "initializing {} encoder: {}x{} @ {} kbps",
            self.codec.name(),
            native_cfg.width,
            native_cfg.height,
            native_cfg.target_bitrate_kbps
        );

        let mut encoder = match self.codec.open(&native_cfg) {
            Ok(encoder) => encoder,
            Err(err) => {
                log_native_error(&err, "failed to initialize encoder");
                return Err(Error::Init(err));
            }
        };

        apply_tuning(encoder.as_mut(), &cfg.tuning, cfg.constant_quality);

        self.encoder = Some(encoder);
        self.pass = cfg.pass;
        self.deadline = cfg.deadline;
        Ok(())
    }

    /// Submit one image, or `None` as the end-of-stream flush, and drain
    /// the encoder's output.
    ///
    /// The force-keyframe request is OR'd with the image's own intra
    /// marker. Returns the metadata of the one packet written into `out`,
    /// or `Ok(None)` while the encoder is still buffering. A submission
    /// failure is fatal: the session must be re-initialized before further
    /// `encode` calls.
    ///
    /// At the end of a first pass (flush submission), the statistics text
    /// artifact becomes available through [`EncoderSession::stats_out`].
    pub fn encode(
        &mut self,
        image: Option<&RawImage<'_>>,
        force_keyframe: bool,
        out: &mut [u8],
    ) -> Result<Option<PacketInfo>> {
        let encoder = self.encoder.as_mut().ok_or(Error::NotInitialized)?;

        let force = force_keyframe || image.is_some_and(|img| img.intra);
        if let Err(err) = encoder.submit(image, force, self.deadline.as_micros()) {
            log_native_error(&err, "error encoding frame");
            return Err(Error::Encode(err));
        }

        let delivered = self.queue.drain(encoder.as_mut(), &mut self.stats, out)?;

        if image.is_none() && self.pass == PassMode::First {
            self.stats_out = Some(self.stats.finalize());
        }
        Ok(delivered)
    }

    /// Text artifact collected by a first pass; present once the
    /// end-of-stream submission has been encoded
    pub fn stats_out(&self) -> Option<&str> {
        self.stats_out.as_deref()
    }

    /// Release the native instance and every owned buffer.
    ///
    /// Idempotent: closing an already-closed or never-initialized session
    /// is a no-op. Packets still queued for delivery are discarded.
    pub fn close(&mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        // dropping the instance releases the native resources
        self.encoder = None;
        self.queue.clear();
        self.stats.clear();
        self.stats_out = None;
    }
}

fn apply_tuning(encoder: &mut dyn NativeEncoder, tuning: &TuningOptions, cq_level: Option<u32>) {
    if let Some(speed) = tuning.speed {
        apply_control(encoder, ControlId::CpuUsed, speed);
    }
    if let Some(enable) = tuning.auto_alt_ref {
        apply_control(encoder, ControlId::EnableAutoAltRef, enable as i32);
    }
    if let Some(frames) = tuning.arnr_max_frames {
        apply_control(encoder, ControlId::ArnrMaxFrames, frames as i32);
    }
    if let Some(strength) = tuning.arnr_strength {
        apply_control(encoder, ControlId::ArnrStrength, strength as i32);
    }
    if let Some(filter) = tuning.arnr_filter {
        apply_control(encoder, ControlId::ArnrType, filter as i32);
    }
    apply_control(encoder, ControlId::NoiseSensitivity, tuning.noise_sensitivity as i32);
    apply_control(
        encoder,
        ControlId::TokenPartitions,
        tuning.slices.max(1).ilog2() as i32,
    );
    apply_control(encoder, ControlId::StaticThreshold, tuning.static_threshold as i32);
    if let Some(level) = cq_level {
        apply_control(encoder, ControlId::CqLevel, level as i32);
    }
}

fn apply_control(encoder: &mut dyn NativeEncoder, id: ControlId, value: i32) {
    debug!(%id, value, "applying codec control");
    if let Err(err) = encoder.control(id, value) {
        warn!(%id, error = %err, "failed to set codec control, keeping native default");
    }
}

fn log_native_error(err: &NativeError, desc: &str) {
    tracing::error!(code = err.code, "{desc}: {}", err.message);
    if let Some(detail) = &err.detail {
        tracing::error!("  additional information: {detail}");
    }
}
