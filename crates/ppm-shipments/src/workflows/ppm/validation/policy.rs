use crate::config::PpmConfig;

use super::super::domain::Cents;

const DEFAULT_ADVANCE_CAP_PERCENT: u8 = PpmConfig::DEFAULT_ADVANCE_CAP_PERCENT;

/// Policy dial bounding how much of the estimated incentive may be requested as an advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvancePolicy {
    cap_percent: u8,
}

impl AdvancePolicy {
    pub fn new(cap_percent: u8) -> Self {
        let sanitized = if cap_percent > 0 && cap_percent <= 100 {
            cap_percent
        } else {
            DEFAULT_ADVANCE_CAP_PERCENT
        };

        Self {
            cap_percent: sanitized,
        }
    }

    pub fn cap_percent(&self) -> u8 {
        self.cap_percent
    }

    pub fn max_advance_for(&self, estimated_incentive: Cents) -> Cents {
        if estimated_incentive.0 <= 0 {
            return Cents(0);
        }

        let max = i128::from(estimated_incentive.0) * i128::from(self.cap_percent) / 100;
        Cents(i64::try_from(max).unwrap_or(i64::MAX))
    }
}

impl Default for AdvancePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ADVANCE_CAP_PERCENT)
    }
}

impl From<&PpmConfig> for AdvancePolicy {
    fn from(config: &PpmConfig) -> Self {
        Self::new(config.advance_cap_percent)
    }
}
