use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::NodeId;

/// Text shown for a metric with no usable reading.
pub const PLACEHOLDER: &str = "—";

/// One monitored quantity of a node.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum MetricChannel {
    CpuLoad,
    IoWait,
    NicError,
    Network,
    Congestion,
}

impl MetricChannel {
    /// Channels that carry a user-settable ceiling filter.
    pub const LOAD_CHANNELS: [Self; 4] = [Self::CpuLoad, Self::IoWait, Self::NicError, Self::Congestion];
}

/// A single channel reading: parsed value plus the text as delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReading {
    /// `None` means unknown. Never coerced to zero.
    pub value: Option<f64>,
    pub display: String,
}

impl Default for MetricReading {
    fn default() -> Self {
        Self::unknown()
    }
}

impl MetricReading {
    pub fn unknown() -> Self {
        Self {
            value: None,
            display: PLACEHOLDER.to_owned(),
        }
    }

    /// The value if it is known and finite.
    pub fn known(&self) -> Option<f64> {
        self.value.filter(|v| v.is_finite())
    }

    /// Display text for a table cell; bare network numbers get an ` MB` unit.
    pub fn rendered(&self, channel: MetricChannel) -> String {
        let raw = self.display.trim();
        if raw.is_empty() || raw == PLACEHOLDER {
            return PLACEHOLDER.to_owned();
        }
        let bare_number = raw.chars().all(|c| c.is_ascii_digit() || c == '.');
        if channel == MetricChannel::Network && bare_number {
            format!("{raw} MB")
        } else {
            raw.to_owned()
        }
    }
}

/// All channel readings for one node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSnapshot {
    pub cpu_load: MetricReading,
    pub io_wait: MetricReading,
    pub nic_error: MetricReading,
    pub network: MetricReading,
    pub congestion: MetricReading,
}

impl MetricSnapshot {
    pub fn get(&self, channel: MetricChannel) -> &MetricReading {
        match channel {
            MetricChannel::CpuLoad => &self.cpu_load,
            MetricChannel::IoWait => &self.io_wait,
            MetricChannel::NicError => &self.nic_error,
            MetricChannel::Network => &self.network,
            MetricChannel::Congestion => &self.congestion,
        }
    }

    pub fn value(&self, channel: MetricChannel) -> Option<f64> {
        self.get(channel).known()
    }
}

/// Session-wide metric map, replaced wholesale on every refresh.
pub type MetricsTable = HashMap<NodeId, MetricSnapshot>;
