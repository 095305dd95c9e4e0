//! Render pipeline results as text or JSON.

use crate::comparator::{Classification, ComparisonEntry, ComparisonResult};
use crate::error::Error;
use crate::metric::{MetricSet, MetricValue};
use crate::toc::TraceAnalysis;
use crate::xctrace::RecordOutcome;
use colored::Colorize;
use serde::Serialize;

/// Output format options.
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonPretty,
}

impl OutputFormat {
    pub fn is_machine_readable(&self) -> bool {
        !matches!(self, OutputFormat::Text)
    }
}

/// Format any serializable value as JSON.
pub fn to_json<T: Serialize>(value: &T, pretty: bool) -> String {
    if pretty {
        serde_json::to_string_pretty(value).unwrap_or_default()
    } else {
        serde_json::to_string(value).unwrap_or_default()
    }
}

fn render<T: Serialize>(value: &T, format: OutputFormat, text: impl FnOnce() -> String) -> String {
    match format {
        OutputFormat::Json => to_json(value, false),
        OutputFormat::JsonPretty => to_json(value, true),
        OutputFormat::Text => text(),
    }
}

fn fmt_number(n: f64) -> String {
    if n.fract().abs() < 1e-9 {
        format!("{n:.0}")
    } else {
        format!("{n:.2}")
    }
}

fn fmt_value(value: &MetricValue) -> String {
    match value {
        MetricValue::Number(n) => fmt_number(*n),
        MetricValue::Text(s) => s.clone(),
    }
}

/// Format an extracted metric set.
pub fn format_metric_set(set: &MetricSet, format: OutputFormat) -> String {
    render(set, format, || {
        let mut output = String::new();
        output.push_str(&format!("Metrics: {}\n", set.label.bold()));

        for (name, metric) in &set.metrics {
            let unit = metric
                .unit
                .as_deref()
                .map(|u| format!(" {u}"))
                .unwrap_or_default();
            output.push_str(&format!(
                "  {}: {}{}\n",
                name.cyan(),
                fmt_value(&metric.value),
                unit.dimmed()
            ));
        }

        output
    })
}

fn fmt_side(value: &Option<MetricValue>) -> String {
    match value {
        Some(v) => fmt_value(v),
        None => "-".to_string(),
    }
}

fn fmt_entry(entry: &ComparisonEntry) -> String {
    let delta = match entry.abs_delta {
        Some(abs) => {
            let pct = match entry.pct_delta {
                Some(p) => format!("{p:+.1}%"),
                None => "n/a%".to_string(),
            };
            format!(" ({}{}, {})", if abs >= 0.0 { "+" } else { "" }, fmt_number(abs), pct)
        }
        None => String::new(),
    };
    let unit = entry
        .unit
        .as_deref()
        .map(|u| format!(" {u}"))
        .unwrap_or_default();

    format!(
        "  {}: {} -> {}{}{}\n",
        entry.name.cyan(),
        fmt_side(&entry.baseline),
        fmt_side(&entry.current),
        delta.dimmed(),
        unit.dimmed()
    )
}

/// Format a comparison, grouping entries by classification.
pub fn format_comparison(result: &ComparisonResult, format: OutputFormat) -> String {
    render(result, format, || {
        let mut output = String::new();
        output.push_str(&format!(
            "Trace Comparison: {} vs {}\n\n",
            result.baseline_label.bold(),
            result.current_label.bold()
        ));

        let groups: [(Classification, colored::ColoredString); 3] = [
            (Classification::Regressed, "REGRESSIONS".red().bold()),
            (Classification::Improved, "IMPROVEMENTS".green().bold()),
            (
                Classification::MissingInOneSide,
                "MISSING IN ONE SIDE".yellow().bold(),
            ),
        ];

        for (classification, heading) in groups {
            let entries: Vec<_> = result
                .entries
                .iter()
                .filter(|e| e.classification == classification)
                .collect();
            if entries.is_empty() {
                continue;
            }

            output.push_str(&format!("{heading}\n"));
            for entry in entries {
                output.push_str(&fmt_entry(entry));
            }
            output.push('\n');
        }

        output.push_str(&format!(
            "Summary: {} regressed, {} improved, {} unchanged, {} missing\n",
            if result.regressed_count > 0 {
                result.regressed_count.to_string().red().bold().to_string()
            } else {
                "0".to_string()
            },
            if result.improved_count > 0 {
                result.improved_count.to_string().green().to_string()
            } else {
                "0".to_string()
            },
            result.unchanged_count,
            result.missing_count
        ));

        output
    })
}

/// Format a trace analysis summary.
pub fn format_analysis(analysis: &TraceAnalysis, verbose: bool, format: OutputFormat) -> String {
    render(analysis, format, || {
        let mut output = String::new();
        output.push_str(&format!("Trace Analysis: {}\n", analysis.file.bold()));
        output.push_str(&format!("Size: {} MB\n", analysis.size_mb));
        output.push_str(&format!("Runs: {}\n\n", analysis.run_count));

        if !analysis.insights.is_empty() {
            output.push_str("Insights:\n");
            for insight in &analysis.insights {
                output.push_str(&format!("  - {insight}\n"));
            }
            output.push('\n');
        }

        output.push_str("Available data types:\n");
        for schema in analysis.available_data.iter().take(10) {
            output.push_str(&format!("  - {schema}\n"));
        }
        if analysis.available_data.len() > 10 {
            output.push_str(&format!(
                "  ... and {} more\n",
                analysis.available_data.len() - 10
            ));
        }
        output.push('\n');

        if verbose {
            for run in &analysis.runs {
                output.push_str(&format!("Run {}:\n", run.number));
                for table in &run.tables {
                    output.push_str(&format!("  - {table}\n"));
                }
            }
            output.push('\n');
        }

        output.push_str("Next steps:\n");
        for step in &analysis.next_steps {
            output.push_str(&format!("  {step}\n"));
        }

        output
    })
}

#[derive(Serialize)]
struct TemplateList<'a> {
    templates: &'a [String],
    count: usize,
}

/// Format the installed template list.
pub fn format_templates(templates: &[String], format: OutputFormat) -> String {
    let list = TemplateList {
        templates,
        count: templates.len(),
    };

    render(&list, format, || {
        let mut output = format!("Available templates ({}):\n\n", templates.len());
        for template in templates {
            output.push_str(&format!("  {template}\n"));
        }
        output
    })
}

/// Format the outcome of a recording.
pub fn format_record(outcome: &RecordOutcome, format: OutputFormat) -> String {
    render(outcome, format, || {
        format!(
            "Trace saved: {} ({:.2} MB)\nOpen in Instruments: open '{}'\n",
            outcome.output.display().to_string().bold(),
            outcome.size_mb,
            outcome.output.display()
        )
    })
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    stage: &'a str,
    message: String,
}

#[derive(Serialize)]
struct ErrorReport<'a> {
    error: ErrorBody<'a>,
}

/// Structured error object for machine-readable modes.
///
/// Failures never produce partial data; this is the whole payload.
pub fn format_error(error: &Error, format: OutputFormat) -> String {
    let report = ErrorReport {
        error: ErrorBody {
            stage: error.stage(),
            message: error.to_string(),
        },
    };

    render(&report, format, || format!("Error: {error}"))
}
