//! Data structures for extracted metrics and directionality configuration.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A measured value: numeric for anything comparable, text for
/// categorical data such as a template name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

impl MetricValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            MetricValue::Number(n) => Some(*n),
            MetricValue::Text(_) => None,
        }
    }
}

impl From<f64> for MetricValue {
    fn from(n: f64) -> Self {
        MetricValue::Number(n)
    }
}

impl From<&str> for MetricValue {
    fn from(s: &str) -> Self {
        MetricValue::Text(s.to_string())
    }
}

/// A single measurement. Its name is the key in the owning [`MetricSet`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metric {
    pub value: MetricValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Named metrics extracted from one trace, keyed uniquely by metric name.
///
/// Constructed once per analyzed trace and treated as read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricSet {
    pub label: String,
    pub metrics: BTreeMap<String, Metric>,
}

impl MetricSet {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            metrics: BTreeMap::new(),
        }
    }

    /// Insert a metric. The map key enforces name uniqueness; inserting
    /// an existing name replaces the previous entry.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<MetricValue>,
        unit: Option<&str>,
    ) {
        self.metrics.insert(
            name.into(),
            Metric {
                value: value.into(),
                unit: unit.map(|u| u.to_string()),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&Metric> {
        self.metrics.get(name)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

/// Which way a metric should move to count as an improvement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    LowerIsBetter,
    HigherIsBetter,
}

/// Explicit per-metric directionality declarations.
///
/// Unlisted metrics default to lower-is-better. Directions are declared by
/// exact metric name, never inferred from name substrings.
#[derive(Debug, Clone, Default)]
pub struct DirectionTable {
    entries: HashMap<String, Direction>,
}

impl DirectionTable {
    /// Table pre-populated with the metrics known to be higher-is-better.
    pub fn with_defaults() -> Self {
        let mut table = Self::default();
        table.declare("frame_rate", Direction::HigherIsBetter);
        table.declare("fps", Direction::HigherIsBetter);
        table
    }

    pub fn declare(&mut self, name: impl Into<String>, direction: Direction) {
        self.entries.insert(name.into(), direction);
    }

    pub fn direction_of(&self, name: &str) -> Direction {
        self.entries
            .get(name)
            .copied()
            .unwrap_or(Direction::LowerIsBetter)
    }
}
