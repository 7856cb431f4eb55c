//! Byte-oriented frame synchronizer

use tracing::trace;

use super::checksum::frame_checksum;
use crate::types::{Frame, HEADER_LEN};

/// Two-byte marker that opens every frame.
pub const SYNC_MARKER: [u8; 2] = [b'$', b'@'];

/// Behaviour switches for the synchronizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Drop frames whose CRC does not match the header checksum field
    pub verify_checksum: bool,
}

/// Counters kept per connection for diagnostics only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Frames handed out
    pub frames: u64,
    /// First marker byte seen but not followed by the second one
    pub sync_misses: u64,
    /// Headers rejected for an out-of-range length
    pub bad_lengths: u64,
    /// Frames dropped by checksum verification
    pub checksum_failures: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Looking for the first marker byte
    Hunting,
    /// First marker byte seen, next byte must be the second one
    Marker,
    /// Collecting the remaining header bytes
    Header { filled: usize },
    /// Collecting `length - 8` payload bytes
    Payload { length: u16 },
}

/// Sans-IO synchronizer turning byte chunks into [`Frame`]s.
///
/// Partial headers and payloads survive across [`feed`](FrameSync::feed) calls, so chunk
/// boundaries never influence which frames come out. A marker byte followed by anything other
/// than the second marker byte sends the synchronizer back to hunting starting at the *next*
/// byte; the mismatching byte itself is not reconsidered as a marker.
#[derive(Debug)]
pub struct FrameSync {
    state: State,
    header: [u8; HEADER_LEN],
    payload: Vec<u8>,
    options: SyncOptions,
    stats: SyncStats,
}

impl Default for FrameSync {
    fn default() -> Self {
        Self::new(SyncOptions::default())
    }
}

impl FrameSync {
    pub fn new(options: SyncOptions) -> Self {
        Self {
            state: State::Hunting,
            header: [0; HEADER_LEN],
            payload: Vec::new(),
            options,
            stats: SyncStats::default(),
        }
    }

    /// Diagnostic counters since creation.
    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    /// Whether a frame is partially collected.
    pub fn is_mid_frame(&self) -> bool {
        matches!(self.state, State::Header { .. } | State::Payload { .. })
    }

    /// Consume bytes from `input` until one frame completes or the input runs out.
    ///
    /// Returns how many bytes were consumed and the completed frame, if any. Bytes after a
    /// completed frame are left for the next call.
    pub fn feed(&mut self, input: &[u8]) -> (usize, Option<Frame>) {
        let mut consumed = 0;

        while consumed < input.len() {
            match self.state {
                State::Hunting => {
                    match input[consumed..].iter().position(|&b| b == SYNC_MARKER[0]) {
                        Some(pos) => {
                            consumed += pos + 1;
                            self.state = State::Marker;
                        }
                        None => consumed = input.len(),
                    }
                }
                State::Marker => {
                    let byte = input[consumed];
                    consumed += 1;
                    if byte == SYNC_MARKER[1] {
                        self.header[..2].copy_from_slice(&SYNC_MARKER);
                        self.state = State::Header { filled: 2 };
                    } else {
                        self.stats.sync_misses += 1;
                        self.state = State::Hunting;
                    }
                }
                State::Header { filled } => {
                    let take = (HEADER_LEN - filled).min(input.len() - consumed);
                    self.header[filled..filled + take]
                        .copy_from_slice(&input[consumed..consumed + take]);
                    consumed += take;

                    let filled = filled + take;
                    if filled < HEADER_LEN {
                        self.state = State::Header { filled };
                        continue;
                    }

                    let length = u16::from_le_bytes([self.header[6], self.header[7]]);
                    if !Frame::is_valid_length(length) {
                        // Resume hunting right here; nothing is skipped on a bad length
                        self.stats.bad_lengths += 1;
                        trace!("Rejected frame header with length {}", length);
                        self.state = State::Hunting;
                        continue;
                    }

                    self.payload = Vec::with_capacity(length as usize - HEADER_LEN);
                    self.state = State::Payload { length };
                    if length as usize == HEADER_LEN {
                        if let Some(frame) = self.finish() {
                            return (consumed, Some(frame));
                        }
                    }
                }
                State::Payload { length } => {
                    let needed = length as usize - HEADER_LEN - self.payload.len();
                    let take = needed.min(input.len() - consumed);
                    self.payload.extend_from_slice(&input[consumed..consumed + take]);
                    consumed += take;

                    if take == needed {
                        if let Some(frame) = self.finish() {
                            return (consumed, Some(frame));
                        }
                    }
                }
            }
        }

        (consumed, None)
    }

    /// Build the frame from the collected header and payload and go back to hunting.
    fn finish(&mut self) -> Option<Frame> {
        self.state = State::Hunting;
        let payload = std::mem::take(&mut self.payload);
        let checksum = u16::from_le_bytes([self.header[2], self.header[3]]);
        let raw_type = u16::from_le_bytes([self.header[4], self.header[5]]);

        if self.options.verify_checksum {
            let computed = frame_checksum(&self.header[4..], &payload);
            if computed != checksum {
                self.stats.checksum_failures += 1;
                trace!(
                    "Dropped frame type {} with checksum {:#06x} (computed {:#06x})",
                    raw_type, checksum, computed
                );
                return None;
            }
        }

        self.stats.frames += 1;
        Some(Frame::new(raw_type, checksum, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{build_frame, build_frame_with_checksum};
    use proptest::prelude::*;

    /// Feed a whole buffer, collecting every frame that comes out.
    fn feed_all(sync: &mut FrameSync, mut input: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        while !input.is_empty() {
            let (consumed, frame) = sync.feed(input);
            frames.extend(frame);
            input = &input[consumed..];
        }
        frames
    }

    #[test]
    fn single_frame_is_emitted() {
        let bytes = build_frame(4014, &[1, 2, 3, 4]);
        let frames = feed_all(&mut FrameSync::default(), &bytes);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].record_type, 4014);
        assert_eq!(frames[0].length, 12);
        assert_eq!(frames[0].payload, vec![1, 2, 3, 4]);
    }

    #[test]
    fn header_only_frame_has_empty_payload() {
        let bytes = build_frame(4027, &[]);
        let frames = feed_all(&mut FrameSync::default(), &bytes);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].payload.is_empty());
        assert_eq!(frames[0].length, 8);
    }

    #[test]
    fn leading_garbage_is_skipped() {
        let mut bytes = b"garbage\x00\xFF$x".to_vec();
        bytes.extend(build_frame(4092, &[0; 9]));
        let mut sync = FrameSync::default();
        let frames = feed_all(&mut sync, &bytes);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].record_type, 4092);
        assert_eq!(sync.stats().sync_misses, 1);
    }

    #[test]
    fn failed_second_marker_byte_is_not_reexamined() {
        // "$$@..." : the second '$' fails the continuation and is consumed with it, so the
        // following '@' is seen while hunting and the frame is lost.
        let mut bytes = vec![b'$'];
        bytes.extend(build_frame(4014, &[0; 16]));
        let frames = feed_all(&mut FrameSync::default(), &bytes);
        assert!(frames.is_empty());

        // One extra byte between the stray marker and the frame restores sync
        let mut bytes = vec![b'$', 0x00];
        bytes.extend(build_frame(4014, &[0; 16]));
        let frames = feed_all(&mut FrameSync::default(), &bytes);
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn out_of_range_lengths_are_rejected_without_skipping() {
        let mut too_short = vec![b'$', b'@', 0, 0, 0xAE, 0x0F];
        too_short.extend(7u16.to_le_bytes());
        let mut too_long = vec![b'$', b'@', 0, 0, 0xAE, 0x0F];
        too_long.extend(8193u16.to_le_bytes());

        let mut bytes = too_short;
        bytes.extend(too_long);
        bytes.extend(build_frame(4082, &[0; 9]));

        let mut sync = FrameSync::default();
        let frames = feed_all(&mut sync, &bytes);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].record_type, 4082);
        assert_eq!(sync.stats().bad_lengths, 2);
    }

    #[test]
    fn revision_bits_are_masked() {
        let bytes = build_frame(0x2000 | 4059, &[0; 20]);
        let frames = feed_all(&mut FrameSync::default(), &bytes);
        assert_eq!(frames[0].record_type, 4059);
        assert_eq!(frames[0].revision, 1);
    }

    #[test]
    fn checksums_are_ignored_by_default() {
        let bytes = build_frame_with_checksum(4014, 0xDEAD, &[0; 16]);
        let frames = feed_all(&mut FrameSync::default(), &bytes);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].checksum, 0xDEAD);
    }

    #[test]
    fn checksum_verification_drops_corrupt_frames() {
        let mut sync = FrameSync::new(SyncOptions { verify_checksum: true });
        let mut bytes = build_frame_with_checksum(4014, 0xDEAD, &[0; 16]);
        bytes.extend(build_frame(4014, &[7; 16]));

        let frames = feed_all(&mut sync, &bytes);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, vec![7; 16]);
        assert_eq!(sync.stats().checksum_failures, 1);
        assert_eq!(sync.stats().frames, 1);
    }

    #[test]
    fn bytes_after_a_frame_are_left_unconsumed() {
        let mut bytes = build_frame(4027, &[0; 7]);
        let first_len = bytes.len();
        bytes.extend(build_frame(4027, &[1; 7]));

        let mut sync = FrameSync::default();
        let (consumed, frame) = sync.feed(&bytes);
        assert_eq!(consumed, first_len);
        assert!(frame.is_some());
        assert!(!sync.is_mid_frame());
    }

    proptest! {
        #[test]
        fn streams_without_marker_yield_nothing(
            bytes in prop::collection::vec(any::<u8>().prop_filter("no marker", |b| *b != b'$'), 0..2048)
        ) {
            let frames = feed_all(&mut FrameSync::default(), &bytes);
            prop_assert!(frames.is_empty());
        }

        #[test]
        fn payload_length_matches_declared_length(
            payload in prop::collection::vec(any::<u8>(), 0..=(8192 - HEADER_LEN)),
            raw_type in any::<u16>(),
        ) {
            let bytes = build_frame(raw_type, &payload);
            let frames = feed_all(&mut FrameSync::default(), &bytes);
            prop_assert_eq!(frames.len(), 1);
            prop_assert_eq!(frames[0].payload.len(), frames[0].length as usize - HEADER_LEN);
            prop_assert_eq!(frames[0].record_type, raw_type & 0x1FFF);
        }

        #[test]
        fn chunking_does_not_change_output(
            payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 1..8),
            chunk in 1usize..32,
        ) {
            let mut bytes = Vec::new();
            for payload in &payloads {
                bytes.extend(build_frame(4027, payload));
            }

            let whole = feed_all(&mut FrameSync::default(), &bytes);

            let mut sync = FrameSync::default();
            let mut chunked = Vec::new();
            for piece in bytes.chunks(chunk) {
                chunked.extend(feed_all(&mut sync, piece));
            }

            prop_assert_eq!(whole.len(), payloads.len());
            prop_assert_eq!(whole, chunked);
        }

        #[test]
        fn invalid_lengths_never_emit_frames(
            length in prop_oneof![0u16..8, 8193u16..=u16::MAX],
            raw_type in any::<u16>(),
        ) {
            let mut bytes = vec![b'$', b'@', 0, 0];
            bytes.extend(raw_type.to_le_bytes());
            bytes.extend(length.to_le_bytes());
            let mut sync = FrameSync::default();
            let frames = feed_all(&mut sync, &bytes);
            prop_assert!(frames.is_empty());
            prop_assert_eq!(sync.stats().bad_lengths, 1);
        }
    }
}
