//! Metric sink seam between station workers and the metrics registry

use crate::types::{MetricKind, Sample};

/// Destination for decoded values.
///
/// One sink is shared by every station worker, so implementations must accept concurrent
/// calls. Within one station, calls arrive in the order the worker made them and the last
/// write for a `(metric, station)` pair wins.
pub trait MetricSink: Send + Sync + 'static {
    /// Set the current value of `metric` for `station`.
    fn set_gauge(&self, metric: MetricKind, station: &str, value: f64);

    /// Forward every sample decoded from one frame.
    fn record(&self, station: &str, samples: &[Sample]) {
        for sample in samples {
            self.set_gauge(sample.metric, station, sample.value);
        }
    }
}
