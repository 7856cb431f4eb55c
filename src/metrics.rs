//! Prometheus-backed metric sink

use std::collections::BTreeMap;

use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use tracing::warn;

use crate::Result;
use crate::sink::MetricSink;
use crate::types::MetricKind;

/// Label carried by every exported gauge.
pub const STATION_LABEL: &str = "station";

/// Registry holding one station-labelled gauge per [`MetricKind`].
///
/// `GaugeVec` is internally synchronized, so the sink can be shared across station workers
/// behind an `Arc` without extra locking.
#[derive(Clone)]
pub struct PrometheusSink {
    registry: Registry,
    gauges: BTreeMap<MetricKind, GaugeVec>,
}

impl PrometheusSink {
    /// Build a fresh registry with every gauge registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let mut gauges = BTreeMap::new();

        for kind in MetricKind::ALL {
            let gauge = GaugeVec::new(Opts::new(kind.name(), kind.help()), &[STATION_LABEL])?;
            registry.register(Box::new(gauge.clone()))?;
            gauges.insert(kind, gauge);
        }

        Ok(Self { registry, gauges })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Current value of a gauge for `station` (0 when never set).
    ///
    /// Returns `None` only when the label set is rejected by the registry.
    pub fn value(&self, metric: MetricKind, station: &str) -> Option<f64> {
        let gauge = self.gauges.get(&metric)?;
        gauge.get_metric_with_label_values(&[station]).ok().map(|g| g.get())
    }

    /// Render the registry in the Prometheus text exposition format.
    pub fn encode_text(&self) -> Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf)
            .map_err(|e| crate::ExporterError::Metrics { details: e.to_string() })
    }
}

impl MetricSink for PrometheusSink {
    fn set_gauge(&self, metric: MetricKind, station: &str, value: f64) {
        match self.gauges.get(&metric) {
            Some(gauge) => gauge.with_label_values(&[station]).set(value),
            None => warn!("No gauge registered for {:?}", metric),
        }
    }
}
