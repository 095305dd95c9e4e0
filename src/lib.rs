//! # tracelens
//!
//! Library for driving `xcrun xctrace` and analyzing what it records:
//! thin wrappers for recording, exporting, and listing templates, plus a
//! pipeline that parses exported trace tables into named metrics and
//! diffs two traces into a classified comparison report.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tracelens::{comparator, extractor, output};
//! use std::path::Path;
//!
//! let options = extractor::ExtractOptions::default();
//! let result = comparator::compare_files(
//!     Path::new("before.txt"),
//!     Path::new("after.txt"),
//!     &options,
//!     &comparator::CompareOptions::default(),
//! )
//! .unwrap();
//! println!("{}", output::format_comparison(&result, output::OutputFormat::Text));
//! ```

pub mod comparator;
pub mod error;
pub mod extractor;
pub mod metric;
pub mod output;
pub mod toc;
pub mod xctrace;

pub use comparator::{
    compare, compare_files, Classification, CompareOptions, ComparisonEntry, ComparisonResult,
};
pub use error::{Error, Result};
pub use extractor::{extract_table, load_file, ExtractOptions, TraceCategory};
pub use metric::{Direction, DirectionTable, Metric, MetricSet, MetricValue};
pub use output::{
    format_analysis, format_comparison, format_error, format_metric_set, format_record,
    format_templates, to_json, OutputFormat,
};
pub use toc::{analyze_trace, parse_toc, TocRun, TraceAnalysis, TraceToc};
pub use xctrace::{CommandRunner, RecordOutcome, RecordRequest, RecordTarget, SystemRunner};
