//! Common test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use blockenc::{
    ControlId, NativeCodec, NativeConfig, NativeEncoder, NativeError, NativeFrame, NativePacket,
    RawImage,
};

/// One scripted unit of native output
#[derive(Debug, Clone)]
pub enum Emit {
    Frame {
        data: Vec<u8>,
        pts: i64,
        duration: u64,
        keyframe: bool,
    },
    Stats(Vec<u8>),
    Unsupported,
}

impl Emit {
    pub fn frame(data: &[u8], pts: i64) -> Self {
        Emit::Frame {
            data: data.to_vec(),
            pts,
            duration: 1,
            keyframe: false,
        }
    }

    pub fn keyframe(data: &[u8], pts: i64) -> Self {
        Emit::Frame {
            data: data.to_vec(),
            pts,
            duration: 1,
            keyframe: true,
        }
    }

    pub fn stats(data: &[u8]) -> Self {
        Emit::Stats(data.to_vec())
    }
}

/// One observed submission
#[derive(Debug, Clone)]
pub struct Submission {
    pub flush: bool,
    pub force_keyframe: bool,
    pub deadline_us: u64,
    pub pts: Option<i64>,
}

/// Everything the scripted backend observed, shared with the test
#[derive(Debug, Default)]
pub struct Recorder {
    pub opened: Vec<NativeConfig>,
    pub controls: Vec<(ControlId, i32)>,
    pub submissions: Vec<Submission>,
    pub dropped_encoders: usize,
}

pub type SharedRecorder = Arc<Mutex<Recorder>>;

/// Scripted stand-in for a native codec binding.
///
/// Each `open()` hands a fresh encoder the same batch script: batch N is
/// emitted in response to submission N, which makes multi-packet and
/// zero-packet behavior reproducible.
pub struct ScriptedCodec {
    pub batches: Vec<Vec<Emit>>,
    pub recorder: SharedRecorder,
    pub fail_open: Option<NativeError>,
    pub fail_submit: Option<NativeError>,
    pub reject_controls: Vec<ControlId>,
}

impl ScriptedCodec {
    pub fn new(batches: Vec<Vec<Emit>>) -> (Self, SharedRecorder) {
        let recorder = SharedRecorder::default();
        let codec = Self {
            batches,
            recorder: Arc::clone(&recorder),
            fail_open: None,
            fail_submit: None,
            reject_controls: Vec::new(),
        };
        (codec, recorder)
    }
}

impl NativeCodec for ScriptedCodec {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn default_config(&self) -> NativeConfig {
        NativeConfig::default()
    }

    fn open(&self, config: &NativeConfig) -> Result<Box<dyn NativeEncoder>, NativeError> {
        self.recorder.lock().unwrap().opened.push(config.clone());
        if let Some(err) = &self.fail_open {
            return Err(err.clone());
        }
        Ok(Box::new(ScriptedEncoder {
            batches: self.batches.clone().into(),
            current: VecDeque::new(),
            live: None,
            fail_submit: self.fail_submit.clone(),
            reject_controls: self.reject_controls.clone(),
            recorder: Arc::clone(&self.recorder),
        }))
    }
}

pub struct ScriptedEncoder {
    batches: VecDeque<Vec<Emit>>,
    current: VecDeque<Emit>,
    live: Option<Emit>,
    fail_submit: Option<NativeError>,
    reject_controls: Vec<ControlId>,
    recorder: SharedRecorder,
}

impl NativeEncoder for ScriptedEncoder {
    fn control(&mut self, id: ControlId, value: i32) -> Result<(), NativeError> {
        self.recorder.lock().unwrap().controls.push((id, value));
        if self.reject_controls.contains(&id) {
            return Err(NativeError::new(8, "invalid parameter").with_detail("control unsupported"));
        }
        Ok(())
    }

    fn submit(
        &mut self,
        image: Option<&RawImage<'_>>,
        force_keyframe: bool,
        deadline_us: u64,
    ) -> Result<(), NativeError> {
        self.recorder.lock().unwrap().submissions.push(Submission {
            flush: image.is_none(),
            force_keyframe,
            deadline_us,
            pts: image.map(|img| img.pts),
        });
        if let Some(err) = &self.fail_submit {
            return Err(err.clone());
        }
        match self.batches.pop_front() {
            Some(batch) => self.current = batch.into(),
            None => self.current.clear(),
        }
        Ok(())
    }

    fn next_packet(&mut self) -> Option<NativePacket<'_>> {
        self.live = self.current.pop_front();
        match &self.live {
            Some(Emit::Frame {
                data,
                pts,
                duration,
                keyframe,
            }) => Some(NativePacket::Frame(NativeFrame {
                data,
                pts: *pts,
                duration: *duration,
                keyframe: *keyframe,
            })),
            Some(Emit::Stats(data)) => Some(NativePacket::Stats(data)),
            Some(Emit::Unsupported) => Some(NativePacket::Unsupported),
            None => None,
        }
    }
}

impl Drop for ScriptedEncoder {
    fn drop(&mut self) {
        self.recorder.lock().unwrap().dropped_encoders += 1;
    }
}

/// Minimal planar image borrowing one buffer for all three planes
pub fn test_image(buf: &[u8], pts: i64) -> RawImage<'_> {
    RawImage {
        planes: [buf, buf, buf],
        strides: [8, 4, 4],
        pts,
        duration: 1,
        intra: false,
    }
}
