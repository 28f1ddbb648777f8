//! Oscillator frequencies with unit parsing, display, and tick conversion.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An oscillator frequency stored in Hertz.
///
/// Simulated clocks run at human-visible rates, so the useful range is
/// fractions of a hertz up to a few kilohertz. Parses strings like `"1Hz"`,
/// `"0.5hz"`, `"2kHz"`, and bare numbers (interpreted as Hz).
#[derive(Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frequency(f64);

impl Frequency {
    /// Creates a new frequency from a value in Hertz.
    pub const fn new(hz: f64) -> Self {
        Self(hz)
    }

    /// Returns the frequency in Hertz.
    pub fn hz(&self) -> f64 {
        self.0
    }

    /// Returns true for a finite, strictly positive frequency.
    pub fn is_valid(&self) -> bool {
        self.0.is_finite() && self.0 > 0.0
    }

    /// Returns the full period in milliseconds.
    pub fn period_ms(&self) -> f64 {
        1000.0 / self.0
    }

    /// Number of external ticks in half a period, never less than one.
    ///
    /// One half period in ticks is `round((1000 / hz) / 2 / tick_interval_ms)`.
    /// Invalid frequencies or intervals yield a single tick.
    pub fn half_period_ticks(&self, tick_interval_ms: u64) -> u64 {
        if !self.is_valid() || tick_interval_ms == 0 {
            return 1;
        }
        let ticks = (self.period_ms() / 2.0 / tick_interval_ms as f64).round();
        if ticks.is_finite() && ticks >= 1.0 {
            ticks as u64
        } else {
            1
        }
    }

    /// Returns this frequency clamped into `[min, max]`.
    pub fn clamped(&self, min: Frequency, max: Frequency) -> Self {
        Self(self.0.clamp(min.0, max.0))
    }
}

impl Default for Frequency {
    fn default() -> Self {
        Self(1.0)
    }
}

impl fmt::Debug for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frequency({self})")
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hz = self.0;
        if hz >= 1_000.0 {
            write!(f, "{}kHz", hz / 1_000.0)
        } else {
            write!(f, "{hz}Hz")
        }
    }
}

/// Error type for parsing frequency strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid frequency: '{input}'")]
pub struct ParseFrequencyError {
    /// The input string that failed to parse.
    pub input: String,
}

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseFrequencyError {
            input: s.to_string(),
        };

        let lower = s.to_ascii_lowercase();
        let (num, scale) = if let Some(num) = lower.strip_suffix("khz") {
            (num, 1_000.0)
        } else if let Some(num) = lower.strip_suffix("hz") {
            (num, 1.0)
        } else {
            (lower.as_str(), 1.0)
        };
        let val: f64 = num.trim().parse().map_err(|_| err())?;
        let freq = Frequency(val * scale);
        if freq.is_valid() {
            Ok(freq)
        } else {
            Err(err())
        }
    }
}
