//! Simulated processing latency.

use std::time::Duration;

/// Delay applied before a cache miss is sent to the backend.
///
/// The delay is `unit × clamp(context_size / chars_per_unit, min_units,
/// max_units)`, with integer division. The defaults give one second per 200
/// characters, between one and five seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatencyModel {
    /// Length of one latency unit. Default: 1 second.
    pub unit: Duration,
    /// Context characters per unit. Default: 200.
    pub chars_per_unit: usize,
    /// Lower clamp in units. Default: 1.
    pub min_units: u32,
    /// Upper clamp in units. Default: 5.
    pub max_units: u32,
}

impl Default for LatencyModel {
    fn default() -> Self {
        Self {
            unit: Duration::from_secs(1),
            chars_per_unit: 200,
            min_units: 1,
            max_units: 5,
        }
    }
}

impl LatencyModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A model that never sleeps.
    pub fn none() -> Self {
        Self {
            unit: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn unit(mut self, unit: Duration) -> Self {
        self.unit = unit;
        self
    }

    pub fn chars_per_unit(mut self, chars: usize) -> Self {
        self.chars_per_unit = chars;
        self
    }

    pub fn clamp_units(mut self, min: u32, max: u32) -> Self {
        self.min_units = min;
        self.max_units = max;
        self
    }

    /// Delay for a request with the given context size.
    pub fn delay_for(&self, context_size: usize) -> Duration {
        let raw = context_size
            .checked_div(self.chars_per_unit)
            .unwrap_or(usize::MAX);
        let units = u32::try_from(raw)
            .unwrap_or(u32::MAX)
            .max(self.min_units)
            .min(self.max_units);
        self.unit.saturating_mul(units)
    }
}
