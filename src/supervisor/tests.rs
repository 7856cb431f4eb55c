//! Supervision loop tests
//!
//! All tests run on a paused clock, so the fixed 5s/10s delays elapse instantly while
//! still being observable through `tokio::time::Instant`.

use super::*;
use crate::test_utils::{
    ConnectScript, RecordingSink, ScriptedConnector, build_frame, receiver_status_frame,
};
use crate::types::Sample;
use std::time::Duration;

fn station() -> Station {
    Station::new("base1", "10.0.0.5", 28784)
}

fn spawn_supervisor(
    connector: Arc<ScriptedConnector>,
    sink: Arc<RecordingSink>,
) -> (JoinHandle<()>, watch::Receiver<ConnectionState>, CancellationToken) {
    let supervisor = StationSupervisor::new(station(), connector, sink);
    assert_eq!(supervisor.station(), &station());
    let states = supervisor.subscribe();
    let cancel = supervisor.cancellation_token();
    (tokio::spawn(supervisor.run()), states, cancel)
}

#[tokio::test(start_paused = true)]
async fn refused_connections_retry_every_ten_seconds() {
    let connector = Arc::new(ScriptedConnector::refusing());
    let sink = Arc::new(RecordingSink::new());
    let (handle, states, cancel) = spawn_supervisor(connector.clone(), sink.clone());

    let start = tokio::time::Instant::now();
    tokio::time::sleep(Duration::from_secs(35)).await;

    let attempts = connector.attempts();
    assert_eq!(attempts.len(), 4);
    for pair in attempts.windows(2) {
        assert!(pair[1] - pair[0] >= RETRY_DELAY);
    }
    assert!(start.elapsed() >= RETRY_DELAY * (attempts.len() as u32 - 1));

    assert_eq!(*states.borrow(), ConnectionState::Disconnected);
    assert!(sink.connectivity("base1").iter().all(|value| *value == 0.0));
    assert!(!sink.connectivity("base1").is_empty());

    cancel.cancel();
    handle.await.expect("supervisor task");
}

#[tokio::test(start_paused = true)]
async fn connect_timeout_counts_as_failed_attempt() {
    let connector = Arc::new(ScriptedConnector::new([ConnectScript::Hang]));
    let sink = Arc::new(RecordingSink::new());
    let (handle, _states, cancel) = spawn_supervisor(connector.clone(), sink.clone());

    tokio::time::sleep(Duration::from_secs(16)).await;

    let attempts = connector.attempts();
    assert_eq!(attempts.len(), 2);
    let gap = attempts[1] - attempts[0];
    assert!(gap >= CONNECT_TIMEOUT + RETRY_DELAY && gap < CONNECT_TIMEOUT + RETRY_DELAY * 2);
    assert!(sink.connectivity("base1").iter().all(|value| *value == 0.0));

    cancel.cancel();
    handle.await.expect("supervisor task");
}

#[tokio::test(start_paused = true)]
async fn every_decoded_frame_is_forwarded_before_disconnect() {
    let mut bytes = receiver_status_frame(42, 100_000, -5);
    // Unknown record type: decodes to an empty sample set
    bytes.extend(build_frame(4999, &[0; 12]));
    // Receiver status too short for any field
    bytes.extend(build_frame(4014, &[0; 10]));
    bytes.extend(build_frame(4092, &[0, 0, 0, 0, 0, 0, 0, 0, 0x03]));

    let connector = Arc::new(ScriptedConnector::new([ConnectScript::Serve(bytes)]));
    let sink = Arc::new(RecordingSink::new());
    let (handle, states, cancel) = spawn_supervisor(connector.clone(), sink.clone());

    tokio::time::sleep(Duration::from_secs(1)).await;

    let sets = sink.sample_sets("base1");
    assert_eq!(sets.len(), 4);
    assert_eq!(
        sets[0],
        vec![
            Sample::new(MetricKind::CpuLoad, 42.0),
            Sample::new(MetricKind::Uptime, 100_000.0),
            Sample::new(MetricKind::Temperature, -5.0),
        ]
    );
    assert!(sets[1].is_empty());
    assert!(sets[2].is_empty());
    assert_eq!(sets[3], vec![Sample::new(MetricKind::JammingStatus, 2.0)]);

    // Connectivity went 0 -> 1 -> 0, and the drop came after the last sample
    assert_eq!(sink.connectivity("base1"), vec![0.0, 1.0, 0.0]);
    let gauges = sink.gauges();
    let last = gauges.last().expect("gauges recorded");
    assert_eq!((last.0, last.2), (MetricKind::ReceiverConnected, 0.0));
    assert_eq!(*states.borrow(), ConnectionState::Disconnected);

    cancel.cancel();
    handle.await.expect("supervisor task");
}

#[tokio::test(start_paused = true)]
async fn lost_stream_reconnects_after_five_seconds() {
    let connector = Arc::new(ScriptedConnector::new([
        ConnectScript::Serve(receiver_status_frame(1, 1, 1)),
        ConnectScript::Serve(receiver_status_frame(2, 2, 2)),
    ]));
    let sink = Arc::new(RecordingSink::new());
    let (handle, _states, cancel) = spawn_supervisor(connector.clone(), sink.clone());

    tokio::time::sleep(Duration::from_secs(6)).await;

    let attempts = connector.attempts();
    assert_eq!(attempts.len(), 2);
    let gap = attempts[1] - attempts[0];
    assert!(gap >= RECONNECT_DELAY && gap < RETRY_DELAY);
    assert_eq!(sink.values(MetricKind::CpuLoad, "base1"), vec![1.0, 2.0]);
    assert_eq!(sink.connectivity("base1"), vec![0.0, 1.0, 0.0, 1.0, 0.0]);

    cancel.cancel();
    handle.await.expect("supervisor task");
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_a_waiting_supervisor() {
    let connector = Arc::new(ScriptedConnector::refusing());
    let sink = Arc::new(RecordingSink::new());
    let (handle, _states, cancel) = spawn_supervisor(connector.clone(), sink);

    tokio::time::sleep(Duration::from_secs(1)).await;
    cancel.cancel();

    tokio::time::timeout(Duration::from_millis(10), handle)
        .await
        .expect("supervisor should stop without waiting out its delay")
        .expect("supervisor task");
    assert_eq!(connector.attempts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn stations_in_a_set_are_independent() {
    let stations = [Station::new("base1", "10.0.0.5", 28784), Station::new("rover", "10.0.0.6", 28784)];

    // Attempts interleave across stations; the first one served wins the bytes and the
    // other station is refused. Either way exactly one station streams.
    let connector = Arc::new(ScriptedConnector::new([ConnectScript::Serve(
        receiver_status_frame(55, 10, 20),
    )]));
    let sink = Arc::new(RecordingSink::new());
    let set = SupervisorSet::spawn(&stations, connector.clone(), sink.clone(), SupervisorOptions::default());
    assert_eq!(set.len(), 2);

    tokio::time::sleep(Duration::from_secs(1)).await;

    let streamed: Vec<_> = stations
        .iter()
        .filter(|station| !sink.sample_sets(&station.name).is_empty())
        .collect();
    assert_eq!(streamed.len(), 1);

    for station in &stations {
        assert_eq!(set.state(&station.name), Some(ConnectionState::Disconnected));
        assert_eq!(sink.connectivity(&station.name).last(), Some(&0.0));
    }
    assert_eq!(set.state("unknown"), None);

    let mut base1 = set.subscribe("base1").expect("base1 is supervised");
    assert_eq!(*base1.borrow_and_update(), ConnectionState::Disconnected);
    assert!(set.subscribe("unknown").is_none());

    set.shutdown().await;
}
