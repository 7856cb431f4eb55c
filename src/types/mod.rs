//! Core types for receiver telemetry.
//!
//! This module holds the data that flows through a station worker:
//! - [`Station`] identifies one monitored receiver (name, host, port)
//! - [`Frame`] is one validated protocol unit cut from the byte stream
//! - [`Sample`] pairs a [`MetricKind`] with the value decoded from a frame
//! - [`RfFlags`] and [`JammingState`] interpret the RF status bit field
//! - [`ConnectionState`] is the per-station connectivity published to the sink
//!
//! ## Usage Example
//!
//! ```rust
//! use gnss_exporter::types::{Frame, MetricKind, Sample, Station};
//!
//! let station = Station::new("base1", "10.0.0.5", 28784);
//! assert_eq!(station.address(), "10.0.0.5:28784");
//!
//! let frame = Frame::new(4014, 0x0000, vec![0u8; 16]);
//! assert_eq!(frame.length, 24);
//!
//! let sample = Sample::new(MetricKind::CpuLoad, 42.0);
//! assert_eq!(sample.metric.name(), "gnss_cpu_load_percent");
//! ```

mod frame;
mod metric;
mod rf_flags;

pub use frame::*;
pub use metric::*;
pub use rf_flags::*;

use serde::{Deserialize, Serialize};

/// One monitored receiver.
///
/// The name is unique across the configuration and is used verbatim as the `station` label
/// on every exported gauge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Station {
    pub name: String,
    pub host: String,
    pub port: u16,
}

impl Station {
    /// Create a new station description.
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self { name: name.into(), host: host.into(), port }
    }

    /// Socket address string suitable for `TcpStream::connect`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Connectivity of a single station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionState {
    /// Numeric value exported on the connectivity gauge.
    pub fn as_gauge(self) -> f64 {
        match self {
            ConnectionState::Disconnected => 0.0,
            ConnectionState::Connected => 1.0,
        }
    }

    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}
