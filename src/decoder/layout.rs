//! Fixed per-record layout plans

use crate::types::{MetricKind, RfFlags, Sample};

/// Record types the exporter understands, keyed by their 13-bit block id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    PvtGeodetic,
    ReceiverStatus,
    MeasEpoch,
    DiskStatus,
    QualityInd,
    RfStatus,
}

impl RecordType {
    pub const ALL: [RecordType; 6] = [
        RecordType::PvtGeodetic,
        RecordType::ReceiverStatus,
        RecordType::MeasEpoch,
        RecordType::DiskStatus,
        RecordType::QualityInd,
        RecordType::RfStatus,
    ];

    /// Block id on the wire (after masking the revision bits).
    pub fn id(self) -> u16 {
        match self {
            RecordType::PvtGeodetic => 4007,
            RecordType::ReceiverStatus => 4014,
            RecordType::MeasEpoch => 4027,
            RecordType::DiskStatus => 4059,
            RecordType::QualityInd => 4082,
            RecordType::RfStatus => 4092,
        }
    }

    pub fn from_id(id: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|record| record.id() == id)
    }

    /// Field plan for this record type.
    pub fn layout(self) -> &'static [FieldLayout] {
        match self {
            RecordType::PvtGeodetic => PVT_GEODETIC,
            RecordType::ReceiverStatus => RECEIVER_STATUS,
            RecordType::MeasEpoch => MEAS_EPOCH,
            RecordType::DiskStatus => DISK_STATUS,
            RecordType::QualityInd => QUALITY_IND,
            RecordType::RfStatus => RF_STATUS,
        }
    }
}

// Payload offsets below count from the first byte after the 8-byte header, i.e. TOW is at 0
// and WNc at 4 for every block.

const PVT_GEODETIC: &[FieldLayout] =
    &[FieldLayout::new(MetricKind::SatellitesUsed, 66, Encoding::U8, 67)];

const MEAS_EPOCH: &[FieldLayout] =
    &[FieldLayout::new(MetricKind::SatellitesTracked, 6, Encoding::U8, 7)];

const RF_STATUS: &[FieldLayout] =
    &[FieldLayout::new(MetricKind::JammingStatus, 8, Encoding::JammingFlags, 9)];

const RECEIVER_STATUS: &[FieldLayout] = &[
    FieldLayout::new(MetricKind::CpuLoad, 6, Encoding::U8, 16),
    FieldLayout::new(MetricKind::Uptime, 7, Encoding::U32Le, 16),
    FieldLayout::new(MetricKind::Temperature, 15, Encoding::I8, 16),
];

const QUALITY_IND: &[FieldLayout] = &[
    FieldLayout::new(MetricKind::QualityOverall, 6, Encoding::U8, 9),
    FieldLayout::new(MetricKind::QualitySignals, 7, Encoding::U8, 9),
    FieldLayout::new(MetricKind::QualityRf, 8, Encoding::U8, 9),
];

// Capacity at 9, used at 13, both in megabytes
const DISK_STATUS: &[FieldLayout] =
    &[FieldLayout::new(MetricKind::DiskFree, 9, Encoding::FreeSpaceMb { used_offset: 13 }, 20)];

/// How the bytes of a field turn into a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    U8,
    I8,
    U32Le,
    /// RF interference flags reduced to a jamming code
    JammingFlags,
    /// Capacity (at the field offset) minus used (at `used_offset`), megabytes to bytes.
    /// The subtraction wraps in `u32` when the receiver reports more used than capacity.
    FreeSpaceMb { used_offset: usize },
}

/// One field of a record layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub metric: MetricKind,
    pub offset: usize,
    pub encoding: Encoding,
    /// Minimum payload length before this field may be read
    pub min_len: usize,
}

impl FieldLayout {
    pub const fn new(metric: MetricKind, offset: usize, encoding: Encoding, min_len: usize) -> Self {
        Self { metric, offset, encoding, min_len }
    }

    /// Read this field from a payload, or `None` if the payload is too short.
    pub fn extract(&self, payload: &[u8]) -> Option<Sample> {
        if payload.len() < self.min_len {
            return None;
        }

        let value = match self.encoding {
            Encoding::U8 => *payload.get(self.offset)? as f64,
            Encoding::I8 => *payload.get(self.offset)? as i8 as f64,
            Encoding::U32Le => read_u32_le(payload, self.offset)? as f64,
            Encoding::JammingFlags => RfFlags(*payload.get(self.offset)?).jamming_state().code(),
            Encoding::FreeSpaceMb { used_offset } => {
                let capacity = read_u32_le(payload, self.offset)?;
                let used = read_u32_le(payload, used_offset)?;
                capacity.wrapping_sub(used) as f64 * 1024.0 * 1024.0
            }
        };

        Some(Sample::new(self.metric, value))
    }
}

fn read_u32_le(payload: &[u8], offset: usize) -> Option<u32> {
    let bytes = payload.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_lookup() {
        for record in RecordType::ALL {
            assert_eq!(RecordType::from_id(record.id()), Some(record));
        }
        assert_eq!(RecordType::from_id(4006), None);
    }

    #[test]
    fn every_field_fits_inside_its_guard() {
        for record in RecordType::ALL {
            for field in record.layout() {
                let width = match field.encoding {
                    Encoding::U8 | Encoding::I8 | Encoding::JammingFlags => 1,
                    Encoding::U32Le => 4,
                    Encoding::FreeSpaceMb { used_offset } => used_offset + 4 - field.offset,
                };
                assert!(
                    field.offset + width <= field.min_len,
                    "{:?} field {:?} reads past its guard",
                    record,
                    field.metric
                );
            }
        }
    }
}
