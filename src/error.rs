//! Error types shared across the tracelens pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for extraction, comparison, and xctrace invocation.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed (exit {status}): {stderr}")]
    Invocation {
        tool: String,
        status: i32,
        stderr: String,
    },

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Comparison error: {0}")]
    Comparison(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Stage name used in machine-readable error reports.
    pub fn stage(&self) -> &'static str {
        match self {
            Error::Io(_) | Error::FileRead { .. } | Error::Invocation { .. } => "invocation",
            Error::Parse { .. } | Error::Json(_) => "parse",
            Error::Comparison(_) => "comparison",
        }
    }

    /// Process exit code for this failure.
    ///
    /// Callers can distinguish "trace not available" (2) from "trace
    /// malformed" (3) and "inputs not comparable" (4). Exit code 1 is
    /// reserved for policy failures such as `--fail-on-regression`.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Io(_) | Error::FileRead { .. } | Error::Invocation { .. } => 2,
            Error::Parse { .. } | Error::Json(_) => 3,
            Error::Comparison(_) => 4,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_per_stage() {
        let invocation = Error::Invocation {
            tool: "xctrace".to_string(),
            status: 1,
            stderr: "no device".to_string(),
        };
        let parse = Error::Parse {
            line: 1,
            message: "missing header".to_string(),
        };
        let comparison = Error::Comparison("empty metric sets".to_string());

        assert_eq!(invocation.exit_code(), 2);
        assert_eq!(parse.exit_code(), 3);
        assert_eq!(comparison.exit_code(), 4);

        assert_eq!(invocation.stage(), "invocation");
        assert_eq!(parse.stage(), "parse");
        assert_eq!(comparison.stage(), "comparison");
    }
}
