//! Configuration types deserialized from `gatesim.toml`.

use gatesim_common::Frequency;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// The top-level simulator configuration parsed from `gatesim.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulatorConfig {
    /// Evaluation limits and the external tick interval.
    #[serde(default)]
    pub engine: EngineLimits,
    /// Oscillator settings.
    #[serde(default)]
    pub clock: ClockConfig,
    /// Defaults for batch runs.
    #[serde(default)]
    pub run: RunConfig,
}

impl SimulatorConfig {
    /// The limits the tick evaluator runs under.
    pub fn limits(&self) -> EngineLimits {
        self.engine
    }
}

/// Bounds on evaluation work, plus the real-time tick interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineLimits {
    /// Maximum propagation passes per evaluation of one circuit level.
    pub max_passes: u32,
    /// Composite nesting depth beyond which evaluation returns immediately.
    pub max_depth: u32,
    /// Interval between external ticks, in milliseconds. Oscillator half
    /// periods are counted in these ticks.
    pub tick_interval_ms: u64,
}

impl EngineLimits {
    /// The tick interval as a [`Duration`].
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_passes: 10,
            max_depth: 20,
            tick_interval_ms: 50,
        }
    }
}

/// Oscillator configuration.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClockConfig {
    /// When set, every oscillator in a loaded circuit runs at this frequency
    /// instead of the one saved with it. Accepts `"2Hz"`, `"0.5hz"` or a
    /// bare number of hertz.
    #[serde(default, deserialize_with = "deserialize_frequency")]
    pub frequency: Option<Frequency>,
}

/// Defaults for batch runs.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Number of ticks to run when none is given on the command line.
    pub ticks: u64,
    /// Whether to pace ticks in real time.
    pub realtime: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ticks: 1,
            realtime: false,
        }
    }
}

/// Deserializes a frequency given either as a unit string or a number of hertz.
fn deserialize_frequency<'de, D>(deserializer: D) -> Result<Option<Frequency>, D::Error>
where
    D: Deserializer<'de>,
{
    struct FrequencyVisitor;

    impl<'de> Visitor<'de> for FrequencyVisitor {
        type Value = Frequency;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a frequency such as \"1Hz\" or a number of hertz")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            v.parse().map_err(E::custom)
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(Frequency::new(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Frequency::new(v as f64))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Frequency::new(v as f64))
        }
    }

    deserializer.deserialize_any(FrequencyVisitor).map(Some)
}
