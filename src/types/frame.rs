//! Frame type produced by the scanner

/// Number of bytes in a frame header (sync marker, checksum, type, length).
pub const HEADER_LEN: usize = 8;

/// Largest total frame length accepted from the wire, header included.
pub const MAX_FRAME_LEN: usize = 8192;

/// Mask selecting the record-type bits of the raw type field.
pub const RECORD_TYPE_MASK: u16 = 0x1FFF;

/// One validated protocol unit cut from a receiver stream.
///
/// Frames are built by the scanner and consumed immediately by the decoder; nothing keeps
/// them around after that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Record type with the revision bits already stripped
    pub record_type: u16,

    /// Format revision carried in the top 3 bits of the raw type field
    pub revision: u8,

    /// Declared total length, header included
    pub length: u16,

    /// Checksum field as read from the header (validated only when enabled)
    pub checksum: u16,

    /// Payload bytes, always `length - 8` long
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a frame from a raw 16-bit type field, checksum and payload.
    ///
    /// The declared length is derived from the payload so the length invariant holds by
    /// construction. Callers must keep the payload within [`MAX_FRAME_LEN`] minus the header.
    pub fn new(raw_type: u16, checksum: u16, payload: Vec<u8>) -> Self {
        debug_assert!(
            payload.len() <= MAX_FRAME_LEN - HEADER_LEN,
            "payload of {} bytes exceeds the frame length limit",
            payload.len()
        );
        let length = (payload.len() + HEADER_LEN) as u16;
        Self {
            record_type: raw_type & RECORD_TYPE_MASK,
            revision: (raw_type >> 13) as u8,
            length,
            checksum,
            payload,
        }
    }

    /// Whether a declared total length is acceptable.
    pub fn is_valid_length(length: u16) -> bool {
        (HEADER_LEN..=MAX_FRAME_LEN).contains(&(length as usize))
    }
}
