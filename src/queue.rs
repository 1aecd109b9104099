//! Output reconciliation queue
//!
//! The native encoder may emit zero, one, or several packets per
//! submission, while the external contract returns at most one packet per
//! call. `OutputQueue` bridges the two: the first frame packet of a call is
//! written straight into the caller's buffer, everything else is copied into
//! an owned FIFO and delivered by later calls, in exactly the order the
//! encoder emitted it.

use std::collections::VecDeque;

use crate::native::{NativeEncoder, NativeFrame, NativePacket};
use crate::stats::StatsAccumulator;
use crate::{Error, Result};

/// Metadata of a packet delivered into the caller's buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketInfo {
    /// Bytes written to the output buffer
    pub size: usize,
    /// Presentation timestamp in timebase units
    pub pts: i64,
    /// Display duration in timebase units
    pub duration: u64,
    pub keyframe: bool,
}

/// A packet held back for a later call; owns a deep copy of the payload
#[derive(Debug)]
struct QueuedPacket {
    data: Vec<u8>,
    pts: i64,
    duration: u64,
    keyframe: bool,
}

impl QueuedPacket {
    fn info(&self) -> PacketInfo {
        PacketInfo {
            size: self.data.len(),
            pts: self.pts,
            duration: self.duration,
            keyframe: self.keyframe,
        }
    }
}

/// FIFO of packets awaiting delivery
#[derive(Debug, Default)]
pub struct OutputQueue {
    pending: VecDeque<QueuedPacket>,
}

impl OutputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Packets currently held back
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop all held-back packets
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Deliver at most one packet into `out` and absorb everything else the
    /// encoder has pending.
    ///
    /// A packet held back by an earlier call goes out first. The encoder is
    /// then pulled dry no matter what: native payloads are only valid until
    /// the next native call, so every frame packet not returned right now is
    /// deep-copied into the queue, statistics fragments are forwarded to
    /// `stats`, and unrecognized packet kinds are discarded.
    ///
    /// Returns `Ok(None)` when no frame packet is available this call (the
    /// encoder may be buffering internally). On [`Error::BufferTooSmall`]
    /// nothing is lost: the packet that did not fit stays at the queue head
    /// and a later call with a large enough buffer delivers it.
    pub fn drain(
        &mut self,
        native: &mut dyn NativeEncoder,
        stats: &mut StatsAccumulator,
        out: &mut [u8],
    ) -> Result<Option<PacketInfo>> {
        let mut delivered: Option<PacketInfo> = None;
        let mut too_small: Option<Error> = None;

        if let Some(head) = self.pending.front() {
            if head.data.len() > out.len() {
                too_small = Some(Error::BufferTooSmall {
                    size: head.data.len(),
                    capacity: out.len(),
                });
            }
        }
        if too_small.is_none() {
            // pop only once the copy is known to fit
            if let Some(head) = self.pending.pop_front() {
                out[..head.data.len()].copy_from_slice(&head.data);
                delivered = Some(head.info());
            }
        }

        while let Some(pkt) = native.next_packet() {
            match pkt {
                NativePacket::Frame(frame) => {
                    if delivered.is_none() && too_small.is_none() {
                        if frame.data.len() <= out.len() {
                            out[..frame.data.len()].copy_from_slice(frame.data);
                            delivered = Some(PacketInfo {
                                size: frame.data.len(),
                                pts: frame.pts,
                                duration: frame.duration,
                                keyframe: frame.keyframe,
                            });
                        } else {
                            // the payload expires at the next native call,
                            // so keep it before reporting the error
                            let capacity = out.len();
                            let size = frame.data.len();
                            self.push_copy(&frame)?;
                            too_small = Some(Error::BufferTooSmall { size, capacity });
                        }
                    } else {
                        self.push_copy(&frame)?;
                    }
                }
                NativePacket::Stats(fragment) => stats.append(fragment)?,
                NativePacket::Unsupported => {}
            }
        }

        match too_small {
            Some(err) => Err(err),
            None => Ok(delivered),
        }
    }

    fn push_copy(&mut self, frame: &NativeFrame<'_>) -> Result<()> {
        let mut data = Vec::new();
        data.try_reserve_exact(frame.data.len())
            .map_err(|_| Error::Allocation(frame.data.len()))?;
        data.extend_from_slice(frame.data);
        self.pending.push_back(QueuedPacket {
            data,
            pts: frame.pts,
            duration: frame.duration,
            keyframe: frame.keyframe,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::{ControlId, NativeError, RawImage};

    /// Encoder that has a fixed set of packets pending and accepts no input
    struct Preloaded {
        frames: VecDeque<(Vec<u8>, i64)>,
        live: Option<(Vec<u8>, i64)>,
    }

    impl Preloaded {
        fn new(frames: &[(&[u8], i64)]) -> Self {
            Self {
                frames: frames
                    .iter()
                    .map(|(d, pts)| (d.to_vec(), *pts))
                    .collect(),
                live: None,
            }
        }
    }

    impl NativeEncoder for Preloaded {
        fn control(&mut self, _id: ControlId, _value: i32) -> std::result::Result<(), NativeError> {
            Ok(())
        }

        fn submit(
            &mut self,
            _image: Option<&RawImage<'_>>,
            _force_keyframe: bool,
            _deadline_us: u64,
        ) -> std::result::Result<(), NativeError> {
            Ok(())
        }

        fn next_packet(&mut self) -> Option<NativePacket<'_>> {
            self.live = self.frames.pop_front();
            self.live.as_ref().map(|(data, pts)| {
                NativePacket::Frame(NativeFrame {
                    data,
                    pts: *pts,
                    duration: 1,
                    keyframe: false,
                })
            })
        }
    }

    #[test]
    fn test_first_packet_goes_direct_rest_queue() {
        let mut native = Preloaded::new(&[
            (b"aaaa".as_slice(), 0),
            (b"bb".as_slice(), 1),
            (b"cccccc".as_slice(), 2),
        ]);
        let mut queue = OutputQueue::new();
        let mut stats = StatsAccumulator::new();
        let mut out = [0u8; 64];

        let info = queue.drain(&mut native, &mut stats, &mut out).unwrap().unwrap();
        assert_eq!((info.size, info.pts), (4, 0));
        assert_eq!(&out[..4], b"aaaa");
        assert_eq!(queue.len(), 2);

        // later calls serve the queue in emission order
        let info = queue.drain(&mut native, &mut stats, &mut out).unwrap().unwrap();
        assert_eq!((info.size, info.pts), (2, 1));
        let info = queue.drain(&mut native, &mut stats, &mut out).unwrap().unwrap();
        assert_eq!((info.size, info.pts), (6, 2));
        assert!(queue.drain(&mut native, &mut stats, &mut out).unwrap().is_none());
    }

    #[test]
    fn test_oversized_head_stays_queued() {
        let mut native = Preloaded::new(&[(b"0123456789".as_slice(), 5)]);
        let mut queue = OutputQueue::new();
        let mut stats = StatsAccumulator::new();

        let mut small = [0u8; 4];
        let err = queue.drain(&mut native, &mut stats, &mut small).unwrap_err();
        assert!(matches!(
            err,
            Error::BufferTooSmall { size: 10, capacity: 4 }
        ));
        assert_eq!(queue.len(), 1);

        let mut big = [0u8; 16];
        let mut dry = Preloaded::new(&[]);
        let info = queue.drain(&mut dry, &mut stats, &mut big).unwrap().unwrap();
        assert_eq!((info.size, info.pts), (10, 5));
        assert_eq!(&big[..10], b"0123456789");
        assert!(queue.is_empty());
    }
}
