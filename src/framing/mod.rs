//! Frame synchronization over an unstructured receiver byte stream.
//!
//! The receiver emits self-describing records, each introduced by the two-byte marker `$@`:
//!
//! ```text
//!  0     2          4              6               8
//!  +-----+----------+--------------+---------------+---------------------+
//!  | $ @ | checksum | type (LE u16)| length (LE u16)| payload (length - 8) |
//!  +-----+----------+--------------+---------------+---------------------+
//! ```
//!
//! The top 3 bits of the type field are a format revision and are stripped before dispatch.
//! Lengths outside `8..=8192` are rejected without skipping any bytes.
//!
//! Synchronization is split in two layers:
//! - [`FrameSync`] is a sans-IO state machine fed with arbitrary byte chunks
//! - [`FrameScanner`] drives it from any [`tokio::io::AsyncRead`] and yields frames lazily
//!
//! Checksums are carried on each [`Frame`](crate::types::Frame) but only validated when
//! [`SyncOptions::verify_checksum`] is enabled.

mod checksum;
mod scanner;
mod sync;

pub use checksum::{CRC16, frame_checksum};
pub use scanner::FrameScanner;
pub use sync::{FrameSync, SYNC_MARKER, SyncOptions, SyncStats};
