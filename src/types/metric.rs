//! Exported metric kinds and decoded samples

/// Every gauge the exporter publishes. All gauges carry a single `station` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKind {
    SatellitesUsed,
    SatellitesTracked,
    JammingStatus,
    ReceiverConnected,
    CpuLoad,
    Temperature,
    Uptime,
    DiskFree,
    QualityOverall,
    QualitySignals,
    QualityRf,
}

impl MetricKind {
    /// All metric kinds, in registration order.
    pub const ALL: [MetricKind; 11] = [
        MetricKind::SatellitesTracked,
        MetricKind::SatellitesUsed,
        MetricKind::JammingStatus,
        MetricKind::ReceiverConnected,
        MetricKind::CpuLoad,
        MetricKind::Temperature,
        MetricKind::Uptime,
        MetricKind::DiskFree,
        MetricKind::QualityOverall,
        MetricKind::QualitySignals,
        MetricKind::QualityRf,
    ];

    /// Exported metric name.
    pub fn name(self) -> &'static str {
        match self {
            MetricKind::SatellitesUsed => "gnss_satellites_used_total",
            MetricKind::SatellitesTracked => "gnss_satellites_tracked_total",
            MetricKind::JammingStatus => "gnss_jamming_status_code",
            MetricKind::ReceiverConnected => "gnss_receiver_connected",
            MetricKind::CpuLoad => "gnss_cpu_load_percent",
            MetricKind::Temperature => "gnss_temperature_celsius",
            MetricKind::Uptime => "gnss_uptime_seconds",
            MetricKind::DiskFree => "gnss_disk_free_bytes",
            MetricKind::QualityOverall => "gnss_quality_overall",
            MetricKind::QualitySignals => "gnss_quality_signals",
            MetricKind::QualityRf => "gnss_quality_rf",
        }
    }

    /// Help text shown next to the metric.
    pub fn help(self) -> &'static str {
        match self {
            MetricKind::SatellitesUsed => "Satellites used in solution",
            MetricKind::SatellitesTracked => "Satellites visible",
            MetricKind::JammingStatus => "0=None, 1=Warning, 2=Critical",
            MetricKind::ReceiverConnected => "Connection status",
            MetricKind::CpuLoad => "CPU Load (0-100)",
            MetricKind::Temperature => "Internal Temperature",
            MetricKind::Uptime => "Receiver Uptime",
            MetricKind::DiskFree => "Free internal disk space",
            MetricKind::QualityOverall => "Overall Quality Indicator (0-10)",
            MetricKind::QualitySignals => "GNSS Signal Quality (0-10)",
            MetricKind::QualityRf => "RF Power Quality (0-10)",
        }
    }
}

/// One value decoded from a frame, not yet attributed to a station.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub metric: MetricKind,
    pub value: f64,
}

impl Sample {
    pub fn new(metric: MetricKind, value: f64) -> Self {
        Self { metric, value }
    }
}
