//! Invocation of `xcrun xctrace` through a pluggable command runner.
//!
//! All subprocess work funnels through [`CommandRunner`] so the wrappers
//! can be exercised in tests without a macOS toolchain. Recording has no
//! timeout machinery of its own; duration control is delegated to
//! `xctrace --time-limit`.

use crate::error::{Error, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Captured outcome of one external command.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Runs an executable with an ordered argument list and captures its output.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<RunOutput>;
}

/// Runner backed by `std::process::Command`.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<RunOutput> {
        let output = Command::new(program).args(args).output()?;

        Ok(RunOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

fn run_xctrace(runner: &dyn CommandRunner, args: &[String]) -> Result<RunOutput> {
    let mut full_args = vec!["xctrace".to_string()];
    full_args.extend_from_slice(args);

    let output = runner.run("xcrun", &full_args)?;
    if output.status != 0 {
        return Err(Error::Invocation {
            tool: "xctrace".to_string(),
            status: output.status,
            stderr: output.stderr.trim().to_string(),
        });
    }

    Ok(output)
}

/// Export a trace's table of contents as raw XML.
pub fn export_toc(runner: &dyn CommandRunner, input: &Path) -> Result<String> {
    let args = vec![
        "export".to_string(),
        "--input".to_string(),
        input.display().to_string(),
        "--toc".to_string(),
    ];

    Ok(run_xctrace(runner, &args)?.stdout)
}

/// Export specific trace data selected by an XPath query.
///
/// Returns the captured data when no output path is given, `None` when
/// xctrace wrote the result to `output` directly.
pub fn export_xpath(
    runner: &dyn CommandRunner,
    input: &Path,
    xpath: &str,
    output: Option<&Path>,
) -> Result<Option<String>> {
    let mut args = vec![
        "export".to_string(),
        "--input".to_string(),
        input.display().to_string(),
        "--xpath".to_string(),
        xpath.to_string(),
    ];
    if let Some(path) = output {
        args.push("--output".to_string());
        args.push(path.display().to_string());
    }

    let run = run_xctrace(runner, &args)?;
    Ok(match output {
        Some(_) => None,
        None => Some(run.stdout),
    })
}

/// List the installed Instruments templates.
pub fn list_templates(runner: &dyn CommandRunner) -> Result<Vec<String>> {
    let run = run_xctrace(runner, &["list".to_string(), "templates".to_string()])?;

    let templates = run
        .stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("=="))
        .map(str::to_string)
        .collect();

    Ok(templates)
}

/// What process the recording attaches to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordTarget {
    /// Attach to a running process by name or PID.
    Attach(String),
    /// Launch a command under instrumentation.
    Launch(Vec<String>),
    AllProcesses,
}

/// A `record` invocation to build and run.
#[derive(Debug, Clone)]
pub struct RecordRequest {
    pub template: String,
    pub output: Option<PathBuf>,
    pub target: RecordTarget,
    pub time_limit: Option<String>,
    pub device: Option<String>,
}

/// Result of a completed recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub output: PathBuf,
    pub size_mb: f64,
    pub template: String,
}

/// Default output name: template slug plus timestamp.
fn default_output_name(template: &str) -> PathBuf {
    let slug = template.to_lowercase().replace(' ', "_");
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from(format!("{slug}_{timestamp}.trace"))
}

/// Build the argument list for a record request.
pub fn record_args(request: &RecordRequest, output: &Path) -> Vec<String> {
    let mut args = vec![
        "record".to_string(),
        "--template".to_string(),
        request.template.clone(),
        "--output".to_string(),
        output.display().to_string(),
    ];

    if let Some(device) = &request.device {
        args.push("--device".to_string());
        args.push(device.clone());
    }

    if let Some(limit) = &request.time_limit {
        args.push("--time-limit".to_string());
        args.push(limit.clone());
    }

    match &request.target {
        RecordTarget::Attach(target) => {
            args.push("--attach".to_string());
            args.push(target.clone());
        }
        RecordTarget::Launch(command) => {
            args.push("--launch".to_string());
            args.push("--".to_string());
            args.extend(command.iter().cloned());
        }
        RecordTarget::AllProcesses => args.push("--all-processes".to_string()),
    }

    args.push("--no-prompt".to_string());
    args
}

/// Record a trace and report where it landed.
///
/// xctrace saves the trace even when interrupted, so success is judged by
/// the output file existing rather than by the exit status alone.
pub fn record(runner: &dyn CommandRunner, request: &RecordRequest) -> Result<RecordOutcome> {
    let output = request
        .output
        .clone()
        .unwrap_or_else(|| default_output_name(&request.template));

    let mut full_args = vec!["xctrace".to_string()];
    full_args.extend(record_args(request, &output));
    let run = runner.run("xcrun", &full_args)?;

    match std::fs::metadata(&output) {
        Ok(meta) => Ok(RecordOutcome {
            output,
            size_mb: meta.len() as f64 / (1024.0 * 1024.0),
            template: request.template.clone(),
        }),
        Err(_) => Err(Error::Invocation {
            tool: "xctrace".to_string(),
            status: run.status,
            stderr: if run.stderr.trim().is_empty() {
                "recording produced no trace file".to_string()
            } else {
                run.stderr.trim().to_string()
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records invocations and replays canned output.
    pub struct FakeRunner {
        pub calls: RefCell<Vec<(String, Vec<String>)>>,
        pub status: i32,
        pub stdout: String,
        pub stderr: String,
        /// File to create when invoked, to simulate a saved trace.
        pub touch: Option<PathBuf>,
    }

    impl FakeRunner {
        fn ok(stdout: &str) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                status: 0,
                stdout: stdout.to_string(),
                stderr: String::new(),
                touch: None,
            }
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, program: &str, args: &[String]) -> Result<RunOutput> {
            self.calls
                .borrow_mut()
                .push((program.to_string(), args.to_vec()));

            if let Some(path) = &self.touch {
                std::fs::write(path, b"trace").unwrap();
            }

            Ok(RunOutput {
                status: self.status,
                stdout: self.stdout.clone(),
                stderr: self.stderr.clone(),
            })
        }
    }

    #[test]
    fn test_export_toc_builds_expected_invocation() {
        let runner = FakeRunner::ok("<trace-toc/>");
        let xml = export_toc(&runner, Path::new("run.trace")).unwrap();

        assert_eq!(xml, "<trace-toc/>");
        let calls = runner.calls.borrow();
        assert_eq!(calls[0].0, "xcrun");
        assert_eq!(
            calls[0].1,
            vec!["xctrace", "export", "--input", "run.trace", "--toc"]
        );
    }

    #[test]
    fn test_non_zero_exit_is_invocation_error() {
        let runner = FakeRunner {
            status: 1,
            stderr: "no such trace".to_string(),
            ..FakeRunner::ok("")
        };

        let err = export_toc(&runner, Path::new("missing.trace")).unwrap_err();
        match err {
            Error::Invocation { status, stderr, .. } => {
                assert_eq!(status, 1);
                assert_eq!(stderr, "no such trace");
            }
            other => panic!("expected invocation error, got {other:?}"),
        }
    }

    #[test]
    fn test_list_templates_skips_separator_lines() {
        let runner = FakeRunner::ok(
            "== Standard Templates ==\n\
             Time Profiler\n\
             Allocations\n\
             \n\
             == Custom Templates ==\n\
             My Template\n",
        );

        let templates = list_templates(&runner).unwrap();
        assert_eq!(templates, vec!["Time Profiler", "Allocations", "My Template"]);
    }

    #[test]
    fn test_record_args_for_attach_target() {
        let request = RecordRequest {
            template: "Time Profiler".to_string(),
            output: None,
            target: RecordTarget::Attach("MyApp".to_string()),
            time_limit: Some("10s".to_string()),
            device: None,
        };

        let args = record_args(&request, Path::new("out.trace"));
        assert_eq!(
            args,
            vec![
                "record",
                "--template",
                "Time Profiler",
                "--output",
                "out.trace",
                "--time-limit",
                "10s",
                "--attach",
                "MyApp",
                "--no-prompt",
            ]
        );
    }

    #[test]
    fn test_record_args_for_launch_target() {
        let request = RecordRequest {
            template: "App Launch".to_string(),
            output: None,
            target: RecordTarget::Launch(vec!["/bin/app".to_string(), "--flag".to_string()]),
            time_limit: None,
            device: None,
        };

        let args = record_args(&request, Path::new("out.trace"));
        let tail: Vec<_> = args.iter().map(String::as_str).collect();
        assert!(tail.ends_with(&["--launch", "--", "/bin/app", "--flag", "--no-prompt"]));
    }

    #[test]
    fn test_record_succeeds_when_trace_file_appears() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("run.trace");

        let runner = FakeRunner {
            touch: Some(out.clone()),
            ..FakeRunner::ok("")
        };
        let request = RecordRequest {
            template: "Allocations".to_string(),
            output: Some(out.clone()),
            target: RecordTarget::AllProcesses,
            time_limit: None,
            device: None,
        };

        let outcome = record(&runner, &request).unwrap();
        assert_eq!(outcome.output, out);
        assert_eq!(outcome.template, "Allocations");
    }

    #[test]
    fn test_record_without_trace_file_is_invocation_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FakeRunner::ok("");
        let request = RecordRequest {
            template: "Allocations".to_string(),
            output: Some(dir.path().join("never.trace")),
            target: RecordTarget::AllProcesses,
            time_limit: None,
            device: None,
        };

        let err = record(&runner, &request).unwrap_err();
        assert!(matches!(err, Error::Invocation { .. }));
    }
}
