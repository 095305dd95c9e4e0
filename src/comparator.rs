//! Compare two metric sets and classify each change.

use crate::error::{Error, Result};
use crate::extractor::{self, ExtractOptions};
use crate::metric::{Direction, DirectionTable, MetricSet, MetricValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Outcome for a single metric, relative to its declared better-direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Improved,
    Regressed,
    Unchanged,
    MissingInOneSide,
}

/// One metric's change between baseline and current.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonEntry {
    pub name: String,
    pub baseline: Option<MetricValue>,
    pub current: Option<MetricValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// `current - baseline`; absent for non-numeric or one-sided metrics.
    pub abs_delta: Option<f64>,
    /// Percentage change; absent when the baseline is zero.
    pub pct_delta: Option<f64>,
    pub classification: Classification,
}

/// Full comparison over the union of metric names from both sets.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ComparisonResult {
    pub baseline_label: String,
    pub current_label: String,
    pub entries: Vec<ComparisonEntry>,
    pub improved_count: usize,
    pub regressed_count: usize,
    pub unchanged_count: usize,
    pub missing_count: usize,
}

impl ComparisonResult {
    pub fn has_regressions(&self) -> bool {
        self.regressed_count > 0
    }

    fn add_entry(&mut self, entry: ComparisonEntry) {
        match entry.classification {
            Classification::Improved => self.improved_count += 1,
            Classification::Regressed => self.regressed_count += 1,
            Classification::Unchanged => self.unchanged_count += 1,
            Classification::MissingInOneSide => self.missing_count += 1,
        }
        self.entries.push(entry);
    }
}

/// Comparison settings.
#[derive(Debug, Clone)]
pub struct CompareOptions {
    /// Percentage change below which a metric counts as unchanged.
    pub tolerance_pct: f64,
    pub directions: DirectionTable,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            tolerance_pct: 1.0,
            directions: DirectionTable::with_defaults(),
        }
    }
}

/// Extract both inputs and compare them.
///
/// An extraction failure on either side aborts the whole comparison;
/// a diff against a partially parsed side would be meaningless.
pub fn compare_files(
    baseline_path: &Path,
    current_path: &Path,
    extract_options: &ExtractOptions,
    options: &CompareOptions,
) -> Result<ComparisonResult> {
    let baseline = extractor::load_file(baseline_path, extract_options)?;
    let current = extractor::load_file(current_path, extract_options)?;

    compare(&baseline, &current, options)
}

/// Compare two metric sets.
pub fn compare(
    baseline: &MetricSet,
    current: &MetricSet,
    options: &CompareOptions,
) -> Result<ComparisonResult> {
    if baseline.is_empty() && current.is_empty() {
        return Err(Error::Comparison(
            "both metric sets are empty".to_string(),
        ));
    }

    let mut result = ComparisonResult {
        baseline_label: baseline.label.clone(),
        current_label: current.label.clone(),
        ..Default::default()
    };

    let names: BTreeSet<&String> = baseline
        .metrics
        .keys()
        .chain(current.metrics.keys())
        .collect();

    for name in names {
        let old = baseline.get(name);
        let new = current.get(name);
        let unit = new
            .and_then(|m| m.unit.clone())
            .or_else(|| old.and_then(|m| m.unit.clone()));

        let entry = match (old, new) {
            (Some(old), Some(new)) => {
                let direction = options.directions.direction_of(name);
                classify_pair(name, &old.value, &new.value, unit, direction, options)
            }
            // Present on one side only: reported, never skipped.
            (old, new) => ComparisonEntry {
                name: name.clone(),
                baseline: old.map(|m| m.value.clone()),
                current: new.map(|m| m.value.clone()),
                unit,
                abs_delta: None,
                pct_delta: None,
                classification: Classification::MissingInOneSide,
            },
        };

        result.add_entry(entry);
    }

    Ok(result)
}

fn classify_pair(
    name: &str,
    old: &MetricValue,
    new: &MetricValue,
    unit: Option<String>,
    direction: Direction,
    options: &CompareOptions,
) -> ComparisonEntry {
    let mut entry = ComparisonEntry {
        name: name.to_string(),
        baseline: Some(old.clone()),
        current: Some(new.clone()),
        unit,
        abs_delta: None,
        pct_delta: None,
        classification: Classification::Unchanged,
    };

    match (old.as_number(), new.as_number()) {
        (Some(b), Some(c)) => {
            let abs = c - b;
            let pct = if b != 0.0 { Some(abs / b * 100.0) } else { None };

            entry.abs_delta = Some(abs);
            entry.pct_delta = pct;
            entry.classification = classify_numeric(abs, pct, direction, options.tolerance_pct);
        }
        // Categorical or type-changed values carry no deltas; any
        // difference is surfaced as a regression for review.
        _ => {
            if old != new {
                entry.classification = Classification::Regressed;
            }
        }
    }

    entry
}

fn classify_numeric(
    abs: f64,
    pct: Option<f64>,
    direction: Direction,
    tolerance_pct: f64,
) -> Classification {
    let within_tolerance = match pct {
        Some(p) => p.abs() < tolerance_pct,
        // Zero baseline: the percentage is undefined, so only an exactly
        // unchanged value avoids classification by direction.
        None => abs == 0.0,
    };

    if within_tolerance {
        return Classification::Unchanged;
    }

    let improved = match direction {
        Direction::LowerIsBetter => abs < 0.0,
        Direction::HigherIsBetter => abs > 0.0,
    };

    if improved {
        Classification::Improved
    } else {
        Classification::Regressed
    }
}
