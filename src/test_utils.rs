//! Test utilities: synthetic frames, a recording sink and a scripted connector
//!
//! These helpers are shared by unit tests across the crate and by the benchmarks.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::time::Instant;

use crate::connector::Connector;
use crate::framing::{CRC16, SYNC_MARKER};
use crate::sink::MetricSink;
use crate::types::{HEADER_LEN, MetricKind, Sample, Station};
use crate::{ExporterError, Result};

/// Encode a frame with a correct checksum.
pub fn build_frame(raw_type: u16, payload: &[u8]) -> Vec<u8> {
    let length = (payload.len() + HEADER_LEN) as u16;
    let mut body = Vec::with_capacity(4 + payload.len());
    body.extend(raw_type.to_le_bytes());
    body.extend(length.to_le_bytes());
    body.extend_from_slice(payload);
    let checksum = CRC16.checksum(&body);

    let mut frame = SYNC_MARKER.to_vec();
    frame.extend(checksum.to_le_bytes());
    frame.extend(body);
    frame
}

/// Encode a frame with an arbitrary checksum field.
pub fn build_frame_with_checksum(raw_type: u16, checksum: u16, payload: &[u8]) -> Vec<u8> {
    let mut frame = build_frame(raw_type, payload);
    frame[2..4].copy_from_slice(&checksum.to_le_bytes());
    frame
}

/// A receiver-status frame carrying the given CPU load, uptime and temperature.
pub fn receiver_status_frame(cpu: u8, uptime: u32, temperature: i8) -> Vec<u8> {
    let mut payload = vec![0u8; 16];
    payload[6] = cpu;
    payload[7..11].copy_from_slice(&uptime.to_le_bytes());
    payload[15] = temperature as u8;
    build_frame(4014, &payload)
}

/// Everything a [`RecordingSink`] saw, in call order.
#[derive(Debug, Default)]
struct Recorded {
    gauges: Vec<(MetricKind, String, f64)>,
    sets: Vec<(String, Vec<Sample>)>,
}

/// Sink that keeps every call for later inspection.
#[derive(Debug, Default)]
pub struct RecordingSink {
    recorded: Mutex<Recorded>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `set_gauge` call as `(metric, station, value)`.
    pub fn gauges(&self) -> Vec<(MetricKind, String, f64)> {
        self.lock().gauges.clone()
    }

    /// Every per-frame sample set forwarded for `station`.
    pub fn sample_sets(&self, station: &str) -> Vec<Vec<Sample>> {
        self.lock()
            .sets
            .iter()
            .filter(|(name, _)| name == station)
            .map(|(_, samples)| samples.clone())
            .collect()
    }

    /// Values written to the connectivity gauge for `station`, in order.
    pub fn connectivity(&self, station: &str) -> Vec<f64> {
        self.values(MetricKind::ReceiverConnected, station)
    }

    /// Values written to `metric` for `station`, in order.
    pub fn values(&self, metric: MetricKind, station: &str) -> Vec<f64> {
        self.lock()
            .gauges
            .iter()
            .filter(|(kind, name, _)| *kind == metric && name == station)
            .map(|(_, _, value)| *value)
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MetricSink for RecordingSink {
    fn set_gauge(&self, metric: MetricKind, station: &str, value: f64) {
        self.lock().gauges.push((metric, station.to_string(), value));
    }

    fn record(&self, station: &str, samples: &[Sample]) {
        self.lock().sets.push((station.to_string(), samples.to_vec()));
        for sample in samples {
            self.set_gauge(sample.metric, station, sample.value);
        }
    }
}

/// Outcome of one scripted connect attempt.
#[derive(Debug, Clone)]
pub enum ConnectScript {
    /// Refuse the connection
    Fail,
    /// Never complete (exercises the connect timeout)
    Hang,
    /// Connect and serve these bytes, then close
    Serve(Vec<u8>),
}

/// Connector replaying a fixed script; once exhausted every attempt fails.
#[derive(Debug, Default)]
pub struct ScriptedConnector {
    script: Mutex<VecDeque<ConnectScript>>,
    attempts: Mutex<Vec<Instant>>,
}

impl ScriptedConnector {
    pub fn new(script: impl IntoIterator<Item = ConnectScript>) -> Self {
        Self { script: Mutex::new(script.into_iter().collect()), attempts: Mutex::default() }
    }

    /// A connector whose attempts always fail.
    pub fn refusing() -> Self {
        Self::default()
    }

    /// Times at which `connect` was called.
    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }
}

#[async_trait::async_trait]
impl Connector for ScriptedConnector {
    type Conn = std::io::Cursor<Vec<u8>>;

    async fn connect(&self, station: &Station) -> Result<Self::Conn> {
        self.attempts.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).push(Instant::now());
        let next = self
            .script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .unwrap_or(ConnectScript::Fail);

        match next {
            ConnectScript::Fail => {
                Err(ExporterError::connection_failed(format!("{} refused", station.address())))
            }
            ConnectScript::Hang => std::future::pending().await,
            ConnectScript::Serve(bytes) => Ok(std::io::Cursor::new(bytes)),
        }
    }
}
