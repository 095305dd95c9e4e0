//! Trace table-of-contents parsing and trace-level analysis.
//!
//! `xctrace export --toc` prints an XML document describing each recorded
//! run and the data tables it contains. Only the run/table subset of that
//! document is a stable contract, so this reader extracts exactly that and
//! fails closed on anything that does not look like a TOC.

use crate::error::{Error, Result};
use crate::xctrace::{self, CommandRunner};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One recorded run and the schemas of its data tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TocRun {
    pub number: String,
    pub tables: Vec<String>,
}

/// Parsed table of contents of a trace file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TraceToc {
    pub runs: Vec<TocRun>,
}

impl TraceToc {
    /// Distinct table schemas across all runs, in first-seen order.
    pub fn schemas(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for run in &self.runs {
            for schema in &run.tables {
                if !seen.contains(schema) {
                    seen.push(schema.clone());
                }
            }
        }
        seen
    }
}

fn line_of(text: &str, offset: usize) -> usize {
    text[..offset].matches('\n').count() + 1
}

/// Parse TOC XML into its run/table structure.
pub fn parse_toc(xml: &str) -> Result<TraceToc> {
    if !xml.contains("<trace-toc") {
        return Err(Error::Parse {
            line: 1,
            message: "not a trace table-of-contents document".to_string(),
        });
    }

    // The run/table nesting is flat enough that attribute scanning in
    // document order reconstructs it without a full XML parser.
    let tag = Regex::new(r#"<run\b[^>]*?\bnumber="([^"]*)"|<table\b[^>]*?\bschema="([^"]*)""#)
        .expect("invalid TOC regex");

    let mut toc = TraceToc::default();
    for capture in tag.captures_iter(xml) {
        if let Some(number) = capture.get(1) {
            toc.runs.push(TocRun {
                number: number.as_str().to_string(),
                tables: Vec::new(),
            });
        } else if let Some(schema) = capture.get(2) {
            let offset = capture.get(0).map(|m| m.start()).unwrap_or(0);
            match toc.runs.last_mut() {
                Some(run) => run.tables.push(schema.as_str().to_string()),
                None => {
                    return Err(Error::Parse {
                        line: line_of(xml, offset),
                        message: "table element outside of any run".to_string(),
                    })
                }
            }
        }
    }

    Ok(toc)
}

/// Summary of what a trace contains and what to look at next.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceAnalysis {
    pub file: String,
    pub size_mb: f64,
    pub run_count: usize,
    pub runs: Vec<TocRun>,
    pub available_data: Vec<String>,
    pub insights: Vec<String>,
    pub next_steps: Vec<String>,
}

/// What each well-known table schema means for the investigation.
const SCHEMA_INSIGHTS: &[(&str, &str)] = &[
    ("time-profile", "CPU profiling data available - look for hot functions"),
    ("allocations", "Memory allocation data - check for excessive allocations"),
    ("leaks", "Memory leak detection - review any leaked objects"),
    ("hangs", "Hang/hitch data - identifies UI responsiveness issues"),
    ("os-signpost", "OS-level signposts - system performance data"),
    ("signpost", "Signpost intervals - custom performance markers"),
    ("kdebug", "Kernel debug data - low-level system tracing"),
    ("metal-gpu", "Metal GPU data - graphics performance"),
    ("core-animation", "Core Animation commits - UI rendering"),
];

/// Export and summarize the TOC of a trace file.
pub fn analyze_trace(runner: &dyn CommandRunner, input: &Path) -> Result<TraceAnalysis> {
    let meta = std::fs::metadata(input).map_err(|source| Error::FileRead {
        path: input.to_path_buf(),
        source,
    })?;
    let size_mb = (meta.len() as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0;

    let xml = xctrace::export_toc(runner, input)?;
    let toc = parse_toc(&xml)?;

    Ok(analyze_toc(&input.display().to_string(), size_mb, &toc))
}

/// Build the analysis for an already-parsed TOC.
pub fn analyze_toc(file: &str, size_mb: f64, toc: &TraceToc) -> TraceAnalysis {
    let available_data = toc.schemas();

    let mut insights = Vec::new();
    for schema in &available_data {
        let schema_lower = schema.to_lowercase();
        if let Some((_, insight)) = SCHEMA_INSIGHTS
            .iter()
            .find(|(key, _)| schema_lower.contains(key))
        {
            if !insights.contains(&insight.to_string()) {
                insights.push(insight.to_string());
            }
        }
    }

    if insights.is_empty() {
        insights.push(format!(
            "Trace contains {} data tables. Open in Instruments.app for detailed analysis.",
            available_data.len()
        ));
    }

    let next_steps = vec![
        format!("Open in Instruments: open '{file}'"),
        format!("Export specific data: tracelens export --input '{file}' --xpath '<query>'"),
    ];

    TraceAnalysis {
        file: file.to_string(),
        size_mb,
        run_count: toc.runs.len(),
        runs: toc.runs.clone(),
        available_data,
        insights,
        next_steps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOC_XML: &str = r#"<?xml version="1.0"?>
<trace-toc>
  <run number="1">
    <info></info>
    <data>
      <table schema="time-profile" target-pid="123"/>
      <table schema="counters-profile"/>
    </data>
  </run>
  <run number="2">
    <data>
      <table schema="time-profile"/>
    </data>
  </run>
</trace-toc>"#;

    #[test]
    fn test_parse_toc_reads_runs_and_schemas() {
        let toc = parse_toc(TOC_XML).unwrap();

        assert_eq!(toc.runs.len(), 2);
        assert_eq!(toc.runs[0].number, "1");
        assert_eq!(toc.runs[0].tables, vec!["time-profile", "counters-profile"]);
        assert_eq!(toc.runs[1].tables, vec!["time-profile"]);
        assert_eq!(toc.schemas(), vec!["time-profile", "counters-profile"]);
    }

    #[test]
    fn test_non_toc_document_is_rejected() {
        let err = parse_toc("<trace-query-result/>").unwrap_err();

        match err {
            Error::Parse { line, .. } => assert_eq!(line, 1),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_table_outside_run_is_rejected() {
        let xml = "<trace-toc>\n<table schema=\"time-profile\"/>\n</trace-toc>";
        let err = parse_toc(xml).unwrap_err();

        match err {
            Error::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_analysis_maps_schemas_to_insights() {
        let toc = parse_toc(TOC_XML).unwrap();
        let analysis = analyze_toc("run.trace", 1.5, &toc);

        assert_eq!(analysis.run_count, 2);
        assert!(analysis.insights[0].contains("hot functions"));
        assert!(analysis.next_steps[0].contains("run.trace"));
    }

    #[test]
    fn test_unknown_schemas_get_generic_insight() {
        let toc = parse_toc(
            "<trace-toc><run number=\"1\"><table schema=\"custom-thing\"/></run></trace-toc>",
        )
        .unwrap();
        let analysis = analyze_toc("run.trace", 0.1, &toc);

        assert_eq!(analysis.insights.len(), 1);
        assert!(analysis.insights[0].contains("Instruments.app"));
    }
}
