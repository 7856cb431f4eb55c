//! Station supervision: one long-lived worker per receiver.
//!
//! A [`StationSupervisor`] owns the whole lifecycle of one station's connection:
//!
//! ```text
//!        +--------------+  connect ok   +-----------+
//!  ----> | Disconnected | ------------> | Connected |
//!        +--------------+               +-----------+
//!          ^    |  connect failed /          |
//!          |    |  timed out: wait 10s       | stream ended: wait 5s
//!          |    +----------------------------+----> retry
//! ```
//!
//! While connected, every frame is decoded and its samples forwarded to the shared
//! [`MetricSink`] under the station's name. Connectivity is published on every transition,
//! both to the sink (as `gnss_receiver_connected`) and to a watch channel.
//!
//! Workers never talk to each other. [`SupervisorSet`] only spawns them and cancels them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, trace, warn};

use crate::connector::Connector;
use crate::decoder::decode_frame;
use crate::framing::{FrameScanner, SyncOptions, SyncStats};
use crate::sink::MetricSink;
use crate::types::{ConnectionState, MetricKind, Station};
use crate::ExporterError;

#[cfg(test)]
mod tests;

/// Upper bound for establishing a connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay before retrying after a failed connect.
pub const RETRY_DELAY: Duration = Duration::from_secs(10);

/// Delay before reconnecting after an established stream ends.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Fixed timing of the supervision loop. There is no backoff and no retry limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub connect_timeout: Duration,
    pub retry_delay: Duration,
    pub reconnect_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            connect_timeout: CONNECT_TIMEOUT,
            retry_delay: RETRY_DELAY,
            reconnect_delay: RECONNECT_DELAY,
        }
    }
}

/// Options shared by every supervisor in a set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupervisorOptions {
    pub policy: ReconnectPolicy,
    pub sync: SyncOptions,
}

/// How one connected session ended.
#[derive(Debug)]
enum SessionEnd {
    /// Source closed (or ended mid-frame)
    Closed(SessionSummary),
    /// Source failed with a read error
    Failed(SessionSummary, ExporterError),
    /// Shutdown requested while connected
    Cancelled,
}

#[derive(Debug, Clone, Copy, Default)]
struct SessionSummary {
    samples: u64,
    stats: SyncStats,
}

/// Supervises the connection to one station until cancelled.
pub struct StationSupervisor<C: Connector> {
    station: Station,
    connector: Arc<C>,
    sink: Arc<dyn MetricSink>,
    options: SupervisorOptions,
    state_tx: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
}

impl<C: Connector> StationSupervisor<C> {
    pub fn new(station: Station, connector: Arc<C>, sink: Arc<dyn MetricSink>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            station,
            connector,
            sink,
            options: SupervisorOptions::default(),
            state_tx,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_options(mut self, options: SupervisorOptions) -> Self {
        self.options = options;
        self
    }

    /// Use an externally owned cancellation token (e.g. a child of a process-wide one).
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The station this supervisor owns.
    pub fn station(&self) -> &Station {
        &self.station
    }

    /// Watch connectivity transitions of this station.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the supervision loop until the cancellation token fires.
    pub async fn run(self) {
        let span = info_span!("station", station = %self.station.name);
        self.supervise().instrument(span).await
    }

    async fn supervise(self) {
        let policy = self.options.policy;
        info!("Supervising {}", self.station.address());
        self.set_state(ConnectionState::Disconnected);

        loop {
            let attempt = tokio::select! {
                _ = self.cancel.cancelled() => break,
                attempt = tokio::time::timeout(
                    policy.connect_timeout,
                    self.connector.connect(&self.station),
                ) => attempt,
            };

            let conn = match attempt {
                Ok(Ok(conn)) => conn,
                Ok(Err(e)) => {
                    warn!("Connection failed: {}. Retrying in {:?}", e, policy.retry_delay);
                    if !self.pause(policy.retry_delay).await {
                        break;
                    }
                    continue;
                }
                Err(_) => {
                    let e = ExporterError::Timeout { duration: policy.connect_timeout };
                    warn!("Connection failed: {}. Retrying in {:?}", e, policy.retry_delay);
                    if !self.pause(policy.retry_delay).await {
                        break;
                    }
                    continue;
                }
            };

            self.set_state(ConnectionState::Connected);
            info!("Connected to {}", self.station.name);

            let end = self.stream_frames(conn).await;
            self.set_state(ConnectionState::Disconnected);

            match end {
                SessionEnd::Cancelled => break,
                SessionEnd::Closed(summary) => {
                    info!(
                        "Connection lost after {} frames. Reconnecting in {:?}",
                        summary.stats.frames, policy.reconnect_delay
                    );
                    summary.log_diagnostics();
                }
                SessionEnd::Failed(summary, e) => {
                    warn!(
                        "Connection lost after {} frames: {}. Reconnecting in {:?}",
                        summary.stats.frames, e, policy.reconnect_delay
                    );
                    summary.log_diagnostics();
                }
            }

            if !self.pause(policy.reconnect_delay).await {
                break;
            }
        }

        info!("Supervisor for {} stopped", self.station.name);
    }

    /// Feed one connection through the scanner and decoder until it ends.
    async fn stream_frames(&self, conn: C::Conn) -> SessionEnd {
        let mut scanner = FrameScanner::with_options(conn, self.options.sync);
        let mut samples = 0u64;

        loop {
            let next = tokio::select! {
                _ = self.cancel.cancelled() => return SessionEnd::Cancelled,
                next = scanner.next_frame() => next,
            };

            match next {
                Ok(Some(frame)) => {
                    let decoded = decode_frame(&frame);
                    trace!(
                        "Frame type {} ({} bytes) -> {} samples",
                        frame.record_type,
                        frame.length,
                        decoded.len()
                    );
                    samples += decoded.len() as u64;
                    self.sink.record(&self.station.name, &decoded);
                }
                Ok(None) => {
                    return SessionEnd::Closed(SessionSummary { samples, stats: scanner.stats() });
                }
                Err(e) => {
                    let summary = SessionSummary { samples, stats: scanner.stats() };
                    return SessionEnd::Failed(summary, e);
                }
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.sink.set_gauge(MetricKind::ReceiverConnected, &self.station.name, state.as_gauge());
        self.state_tx.send_replace(state);
    }

    /// Sleep for `delay`; returns `false` if cancelled first.
    async fn pause(&self, delay: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}

impl SessionSummary {
    fn log_diagnostics(&self) {
        debug!(
            "Session: {} frames, {} samples, {} sync misses, {} bad lengths, {} checksum failures",
            self.stats.frames,
            self.samples,
            self.stats.sync_misses,
            self.stats.bad_lengths,
            self.stats.checksum_failures
        );
    }
}

/// A running group of station supervisors sharing one sink.
pub struct SupervisorSet {
    handles: Vec<(String, JoinHandle<()>)>,
    states: HashMap<String, watch::Receiver<ConnectionState>>,
    cancel: CancellationToken,
}

impl SupervisorSet {
    /// Spawn one supervisor task per station.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<C: Connector>(
        stations: &[Station],
        connector: Arc<C>,
        sink: Arc<dyn MetricSink>,
        options: SupervisorOptions,
    ) -> Self {
        let cancel = CancellationToken::new();
        let mut handles = Vec::with_capacity(stations.len());
        let mut states = HashMap::with_capacity(stations.len());

        for station in stations {
            let supervisor = StationSupervisor::new(station.clone(), connector.clone(), sink.clone())
                .with_options(options)
                .with_cancellation(cancel.child_token());

            states.insert(station.name.clone(), supervisor.subscribe());
            handles.push((station.name.clone(), tokio::spawn(supervisor.run())));
        }

        info!("Spawned {} station supervisors", handles.len());
        Self { handles, states, cancel }
    }

    /// Number of supervised stations.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Latest connectivity of a station.
    pub fn state(&self, station: &str) -> Option<ConnectionState> {
        self.states.get(station).map(|rx| *rx.borrow())
    }

    /// Watch connectivity transitions of a station.
    pub fn subscribe(&self, station: &str) -> Option<watch::Receiver<ConnectionState>> {
        self.states.get(station).cloned()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel every supervisor and wait for them to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for (station, handle) in std::mem::take(&mut self.handles) {
            if let Err(e) = handle.await {
                warn!("Supervisor for {} ended abnormally: {}", station, e);
            }
        }
    }
}

impl Drop for SupervisorSet {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
