//! Record decoding: from a frame payload to named samples.
//!
//! Each supported record type has a fixed layout plan, a list of [`FieldLayout`] entries that
//! say where a field lives, how it is encoded and how long the payload must be before the
//! field may be read. Decoding walks the plan and emits one [`Sample`] per field whose guard
//! passes:
//!
//! - unknown record types produce no samples
//! - payloads shorter than a field's guard skip that field only
//!
//! ```rust
//! use gnss_exporter::decoder::decode;
//! use gnss_exporter::types::MetricKind;
//!
//! let mut payload = vec![0u8; 9];
//! payload[8] = 0x03;
//! let samples = decode(4092, &payload);
//! assert_eq!(samples[0].metric, MetricKind::JammingStatus);
//! assert_eq!(samples[0].value, 2.0);
//! ```

mod layout;

pub use layout::{Encoding, FieldLayout, RecordType};

use crate::types::{Frame, Sample};

/// Decode a payload given its (already masked) record type.
pub fn decode(record_type: u16, payload: &[u8]) -> Vec<Sample> {
    let Some(record) = RecordType::from_id(record_type) else {
        return Vec::new();
    };

    record.layout().iter().filter_map(|field| field.extract(payload)).collect()
}

/// Decode a frame produced by the scanner.
pub fn decode_frame(frame: &Frame) -> Vec<Sample> {
    decode(frame.record_type, &frame.payload)
}
