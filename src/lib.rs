//! Live metrics exporter for GNSS receivers.
//!
//! Receivers stream self-describing binary records over a long-lived TCP connection. This
//! crate keeps one worker per receiver connected, cuts the byte stream into frames, decodes a
//! handful of health and quality fields and publishes them as station-labelled gauges.
//!
//! # Pipeline
//!
//! ```text
//! StationSupervisor -> bytes -> FrameScanner -> Frame -> decoder -> Sample -> MetricSink
//! ```
//!
//! - [`framing`]: resynchronizing frame scanner (`$@` marker, 8-byte header, length bounds)
//! - [`decoder`]: fixed per-record layouts turning payloads into [`types::Sample`]s
//! - [`supervisor`]: connect / stream / reconnect loop, one task per station
//! - [`sink`]: the seam to the metrics registry; [`metrics::PrometheusSink`] implements it
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gnss_exporter::{Config, PrometheusSink, SupervisorSet, TcpConnector};
//!
//! #[tokio::main]
//! async fn main() -> gnss_exporter::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let sink = Arc::new(PrometheusSink::new()?);
//!
//!     let supervisors = SupervisorSet::spawn(
//!         &config.stations,
//!         Arc::new(TcpConnector),
//!         sink.clone(),
//!         Default::default(),
//!     );
//!
//!     tokio::signal::ctrl_c().await.ok();
//!     supervisors.shutdown().await;
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Stream processing
pub mod decoder;
pub mod framing;

// Station workers and their collaborators
pub mod config;
pub mod connector;
pub mod metrics;
pub mod server;
pub mod sink;
pub mod supervisor;

pub use error::*;

pub use config::Config;
pub use connector::{Connector, TcpConnector};
pub use framing::{FrameScanner, FrameSync, SyncOptions};
pub use metrics::PrometheusSink;
pub use sink::MetricSink;
pub use supervisor::{ReconnectPolicy, StationSupervisor, SupervisorOptions, SupervisorSet};
