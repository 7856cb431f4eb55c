//! RF status bit field and the jamming state derived from it

/// Raw interference flags byte from an RF status record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RfFlags(pub u8);

impl RfFlags {
    /// Interference detected and mitigated.
    pub const WARNING: u8 = 0x01;
    /// Interference detected and not mitigated.
    pub const CRITICAL: u8 = 0x02;

    /// Check if a specific flag is set using a bitmask.
    pub fn has_flag(&self, flag: u8) -> bool {
        (self.0 & flag) != 0
    }

    /// Reduce the flags to a single jamming state. Critical wins over warning.
    pub fn jamming_state(&self) -> JammingState {
        if self.has_flag(Self::CRITICAL) {
            JammingState::Critical
        } else if self.has_flag(Self::WARNING) {
            JammingState::Warning
        } else {
            JammingState::None
        }
    }
}

/// Exported jamming status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JammingState {
    None = 0,
    Warning = 1,
    Critical = 2,
}

impl JammingState {
    pub fn code(self) -> f64 {
        self as u8 as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_overrides_warning() {
        assert_eq!(RfFlags(0x00).jamming_state(), JammingState::None);
        assert_eq!(RfFlags(0x01).jamming_state(), JammingState::Warning);
        assert_eq!(RfFlags(0x02).jamming_state(), JammingState::Critical);
        assert_eq!(RfFlags(0x03).jamming_state(), JammingState::Critical);
        assert_eq!(RfFlags(0x03).jamming_state().code(), 2.0);
    }

    #[test]
    fn unrelated_bits_are_ignored() {
        assert_eq!(RfFlags(0xFC).jamming_state(), JammingState::None);
        assert_eq!(RfFlags(0xF1).jamming_state(), JammingState::Warning);
    }
}
