//! Convert exported trace table text into a [`MetricSet`].
//!
//! The input is the row-based table format produced by post-processing
//! `xctrace export` output: a tab-separated header line naming columns,
//! then one record per non-empty line. The reader is strict-schema and
//! fails closed; a malformed row is a [`Error::Parse`] carrying its line
//! number, never silently dropped.

use crate::error::{Error, Result};
use crate::metric::MetricSet;
use std::collections::HashMap;
use std::path::Path;

/// Trace category the exported table came from. Decides which count
/// aggregate and weight unit the extracted set carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceCategory {
    TimeProfile,
    Allocations,
    Animation,
}

impl TraceCategory {
    /// Name of the per-category count metric.
    pub fn count_metric(&self) -> &'static str {
        match self {
            TraceCategory::TimeProfile => "sample_count",
            TraceCategory::Allocations => "allocation_count",
            TraceCategory::Animation => "hitch_count",
        }
    }

    pub fn count_unit(&self) -> &'static str {
        match self {
            TraceCategory::TimeProfile => "samples",
            TraceCategory::Allocations => "events",
            TraceCategory::Animation => "hitches",
        }
    }

    pub fn weight_unit(&self) -> &'static str {
        match self {
            TraceCategory::TimeProfile | TraceCategory::Animation => "ms",
            TraceCategory::Allocations => "bytes",
        }
    }
}

/// Extraction settings.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub category: TraceCategory,
    /// Number of hotspot entries to keep.
    pub top_n: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            category: TraceCategory::TimeProfile,
            top_n: 10,
        }
    }
}

/// Load a metric set from a file path.
///
/// A `.json` file is read back as a previously extracted [`MetricSet`];
/// anything else is parsed as raw export table text labeled with the path.
pub fn load_file(path: &Path, options: &ExtractOptions) -> Result<MetricSet> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    if path.extension().map_or(false, |e| e == "json") {
        return Ok(serde_json::from_str(&text)?);
    }

    extract_table(&text, &path.display().to_string(), options)
}

/// Parse export table text into a [`MetricSet`] in a single pass.
pub fn extract_table(text: &str, label: &str, options: &ExtractOptions) -> Result<MetricSet> {
    let mut lines = text.lines().enumerate();

    let header = match lines.next() {
        Some((_, line)) if !line.trim().is_empty() => line,
        _ => {
            return Err(Error::Parse {
                line: 1,
                message: "missing header row".to_string(),
            })
        }
    };

    let columns = parse_header(header)?;

    let mut row_count: usize = 0;
    let mut total_weight: f64 = 0.0;
    // Accumulated weight per symbol, in first-seen order so that ties
    // stay stable when sorted.
    let mut symbols: Vec<(String, f64)> = Vec::new();
    let mut symbol_index: HashMap<String, usize> = HashMap::new();

    for (idx, line) in lines {
        if line.trim().is_empty() {
            continue;
        }

        let line_number = idx + 1;
        let (symbol, weight) = parse_row(line, line_number, &columns)?;

        row_count += 1;
        total_weight += weight;

        match symbol_index.get(&symbol) {
            Some(&i) => symbols[i].1 += weight,
            None => {
                symbol_index.insert(symbol.clone(), symbols.len());
                symbols.push((symbol, weight));
            }
        }
    }

    // Stable sort keeps first-seen order for equal weights.
    symbols.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    symbols.truncate(options.top_n);

    let category = options.category;
    let mut set = MetricSet::new(label);
    set.insert(
        category.count_metric(),
        row_count as f64,
        Some(category.count_unit()),
    );
    set.insert("total_weight", total_weight, Some(category.weight_unit()));

    for (symbol, weight) in symbols {
        let pct = if total_weight > 0.0 {
            weight / total_weight * 100.0
        } else {
            0.0
        };
        set.insert(format!("hotspot_pct.{symbol}"), pct, Some("%"));
    }

    Ok(set)
}

/// Resolved positions of the required columns.
struct ColumnLayout {
    symbol: usize,
    weight: usize,
}

fn parse_header(header: &str) -> Result<ColumnLayout> {
    let names: Vec<String> = header
        .split('\t')
        .map(|c| c.trim().to_lowercase())
        .collect();

    let position = |wanted: &str| -> Result<usize> {
        names
            .iter()
            .position(|n| n == wanted)
            .ok_or_else(|| Error::Parse {
                line: 1,
                message: format!("header is missing required column '{wanted}'"),
            })
    };

    Ok(ColumnLayout {
        symbol: position("symbol")?,
        weight: position("weight")?,
    })
}

fn parse_row(line: &str, line_number: usize, columns: &ColumnLayout) -> Result<(String, f64)> {
    let fields: Vec<&str> = line.split('\t').collect();
    let needed = columns.symbol.max(columns.weight) + 1;

    if fields.len() < needed {
        return Err(Error::Parse {
            line: line_number,
            message: format!("expected at least {needed} fields, found {}", fields.len()),
        });
    }

    let symbol = fields[columns.symbol].trim();
    if symbol.is_empty() {
        return Err(Error::Parse {
            line: line_number,
            message: "empty symbol field".to_string(),
        });
    }

    let weight_text = fields[columns.weight].trim();
    let weight: f64 = weight_text.parse().map_err(|_| Error::Parse {
        line: line_number,
        message: format!("invalid weight '{weight_text}'"),
    })?;

    Ok((symbol.to_string(), weight))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::MetricValue;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn options(top_n: usize) -> ExtractOptions {
        ExtractOptions {
            category: TraceCategory::TimeProfile,
            top_n,
        }
    }

    #[test]
    fn test_row_count_matches_data_rows() {
        let text = "Symbol\tWeight\n\
                    main\t10.0\n\
                    render\t5.0\n\
                    main\t2.5\n";

        let set = extract_table(text, "test", &options(10)).unwrap();

        assert_eq!(
            set.get("sample_count").unwrap().value,
            MetricValue::Number(3.0)
        );
        assert_eq!(
            set.get("total_weight").unwrap().value,
            MetricValue::Number(17.5)
        );
    }

    #[test]
    fn test_hotspots_aggregate_and_rank_by_weight() {
        let text = "symbol\tweight\n\
                    a\t1.0\n\
                    b\t6.0\n\
                    a\t5.0\n\
                    c\t4.0\n";

        let set = extract_table(text, "test", &options(2)).unwrap();

        // a accumulates 6.0 and ties with b; first-seen order wins.
        assert_eq!(
            set.get("hotspot_pct.a").unwrap().value,
            MetricValue::Number(6.0 / 16.0 * 100.0)
        );
        assert_eq!(
            set.get("hotspot_pct.b").unwrap().value,
            MetricValue::Number(6.0 / 16.0 * 100.0)
        );
        assert!(set.get("hotspot_pct.c").is_none());
    }

    #[test]
    fn test_missing_header_is_parse_error_at_line_one() {
        let err = extract_table("", "test", &options(10)).unwrap_err();

        match err {
            Error::Parse { line, .. } => assert_eq!(line, 1),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_required_column_is_rejected() {
        let err = extract_table("symbol\tcount\nmain\t3\n", "test", &options(10)).unwrap_err();

        match err {
            Error::Parse { line, message } => {
                assert_eq!(line, 1);
                assert!(message.contains("weight"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_row_reports_its_line() {
        let text = "symbol\tweight\nmain\t1.0\nrender\tfast\n";
        let err = extract_table(text, "test", &options(10)).unwrap_err();

        match err {
            Error::Parse { line, message } => {
                assert_eq!(line, 3);
                assert!(message.contains("fast"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_extra_columns_are_tolerated() {
        let text = "Category\tSymbol\tWeight\nUI\tmain\t4.0\n";
        let set = extract_table(text, "test", &options(10)).unwrap();

        assert_eq!(
            set.get("hotspot_pct.main").unwrap().value,
            MetricValue::Number(100.0)
        );
    }

    #[test]
    fn test_allocation_category_uses_allocation_count() {
        let opts = ExtractOptions {
            category: TraceCategory::Allocations,
            top_n: 10,
        };
        let set = extract_table("symbol\tweight\nmalloc\t1024\n", "test", &opts).unwrap();

        assert_eq!(
            set.get("allocation_count").unwrap().value,
            MetricValue::Number(1.0)
        );
        assert_eq!(
            set.get("total_weight").unwrap().unit.as_deref(),
            Some("bytes")
        );
    }

    #[test]
    fn test_load_file_round_trips_metric_set_json() {
        let text = "symbol\tweight\nmain\t4.0\n";
        let set = extract_table(text, "baseline", &options(10)).unwrap();

        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        write!(file, "{}", serde_json::to_string(&set).unwrap()).unwrap();

        let loaded = load_file(file.path(), &options(10)).unwrap();
        assert_eq!(loaded, set);
    }
}
