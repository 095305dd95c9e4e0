//! CLI entry point for the tracelens toolkit.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracelens::{
    comparator, extractor, output, toc, xctrace, CompareOptions, Direction, Error, ExtractOptions,
    OutputFormat, RecordRequest, RecordTarget, SystemRunner, TraceCategory,
};

#[derive(Parser)]
#[command(name = "tracelens")]
#[command(author, version, about = "xctrace wrapper and trace comparison toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize what a trace file contains
    Analyze {
        /// Input .trace file
        #[arg(long, short)]
        input: PathBuf,

        /// Show per-run table detail
        #[arg(long, short)]
        verbose: bool,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },

    /// Extract metrics from exported trace table text
    Extract {
        /// Exported table file (or a previously extracted .json metric set)
        #[arg(long, short)]
        input: PathBuf,

        /// Trace category the table came from
        #[arg(long, short, value_enum, default_value = "time-profile")]
        category: Category,

        /// Number of hotspot entries to keep
        #[arg(long, default_value = "10")]
        top_n: usize,

        /// Label for the metric set (defaults to the input path)
        #[arg(long)]
        label: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },

    /// Compare metrics between a baseline and a current trace export
    Compare {
        /// Baseline export file or .json metric set
        #[arg(long, short)]
        baseline: PathBuf,

        /// Current export file or .json metric set
        #[arg(long, short)]
        current: PathBuf,

        /// Trace category the tables came from
        #[arg(long, value_enum, default_value = "time-profile")]
        category: Category,

        /// Number of hotspot entries to keep per side
        #[arg(long, default_value = "10")]
        top_n: usize,

        /// Percentage change below which a metric counts as unchanged
        #[arg(long, default_value = "1.0")]
        tolerance: f64,

        /// Declare a metric where an increase is an improvement (repeatable)
        #[arg(long, value_name = "METRIC")]
        higher_is_better: Vec<String>,

        /// Declare a metric where a decrease is an improvement (repeatable)
        #[arg(long, value_name = "METRIC")]
        lower_is_better: Vec<String>,

        /// Fail with exit code 1 if any metric regressed
        #[arg(long, default_value = "false")]
        fail_on_regression: bool,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },

    /// Export trace data (table of contents or an XPath selection)
    Export {
        /// Input .trace file
        #[arg(long, short)]
        input: PathBuf,

        /// Export the table of contents (default when no --xpath)
        #[arg(long)]
        toc: bool,

        /// XPath query selecting specific data
        #[arg(long)]
        xpath: Option<String>,

        /// Write exported data to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },

    /// Record a performance trace
    Record {
        /// Instruments template name
        #[arg(long, short)]
        template: String,

        /// Output .trace file path
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Attach to a process by name or PID
        #[arg(long, short)]
        attach: Option<String>,

        /// Launch a command under instrumentation
        #[arg(long, num_args = 1.., value_name = "COMMAND")]
        launch: Option<Vec<String>>,

        /// Record all processes
        #[arg(long)]
        all_processes: bool,

        /// Recording time limit (e.g. 10s, 5m)
        #[arg(long)]
        time_limit: Option<String>,

        /// Device name or UDID
        #[arg(long)]
        device: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },

    /// List available Instruments templates
    Templates {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
    JsonPretty,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
            Format::JsonPretty => OutputFormat::JsonPretty,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Category {
    TimeProfile,
    Allocations,
    Animation,
}

impl From<Category> for TraceCategory {
    fn from(c: Category) -> Self {
        match c {
            Category::TimeProfile => TraceCategory::TimeProfile,
            Category::Allocations => TraceCategory::Allocations,
            Category::Animation => TraceCategory::Animation,
        }
    }
}

fn fail(error: &Error, format: OutputFormat) -> ExitCode {
    if format.is_machine_readable() {
        println!("{}", output::format_error(error, format));
    }
    eprintln!("Error: {error}");
    ExitCode::from(error.exit_code())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let runner = SystemRunner;

    match cli.command {
        Commands::Analyze {
            input,
            verbose,
            format,
        } => match toc::analyze_trace(&runner, &input) {
            Ok(analysis) => {
                println!("{}", output::format_analysis(&analysis, verbose, format.into()));
                ExitCode::SUCCESS
            }
            Err(e) => fail(&e, format.into()),
        },

        Commands::Extract {
            input,
            category,
            top_n,
            label,
            format,
        } => {
            let options = ExtractOptions {
                category: category.into(),
                top_n,
            };

            let result = extractor::load_file(&input, &options).map(|mut set| {
                if let Some(label) = label {
                    set.label = label;
                }
                set
            });

            match result {
                Ok(set) => {
                    println!("{}", output::format_metric_set(&set, format.into()));
                    ExitCode::SUCCESS
                }
                Err(e) => fail(&e, format.into()),
            }
        }

        Commands::Compare {
            baseline,
            current,
            category,
            top_n,
            tolerance,
            higher_is_better,
            lower_is_better,
            fail_on_regression,
            format,
        } => {
            let extract_options = ExtractOptions {
                category: category.into(),
                top_n,
            };
            let mut compare_options = CompareOptions {
                tolerance_pct: tolerance,
                ..Default::default()
            };
            for name in higher_is_better {
                compare_options
                    .directions
                    .declare(name, Direction::HigherIsBetter);
            }
            for name in lower_is_better {
                compare_options
                    .directions
                    .declare(name, Direction::LowerIsBetter);
            }

            match comparator::compare_files(&baseline, &current, &extract_options, &compare_options)
            {
                Ok(result) => {
                    println!("{}", output::format_comparison(&result, format.into()));

                    if fail_on_regression && result.has_regressions() {
                        ExitCode::from(1)
                    } else {
                        ExitCode::SUCCESS
                    }
                }
                Err(e) => fail(&e, format.into()),
            }
        }

        Commands::Export {
            input,
            toc: want_toc,
            xpath,
            output: output_path,
            format,
        } => {
            let result = if want_toc || xpath.is_none() {
                xctrace::export_toc(&runner, &input)
                    .and_then(|xml| toc::parse_toc(&xml))
                    .map(|parsed| {
                        let format: OutputFormat = format.into();
                        if format.is_machine_readable() {
                            output::to_json(&parsed, matches!(format, OutputFormat::JsonPretty))
                        } else {
                            let mut text = format!(
                                "Trace: {}\nRuns: {}\n\n",
                                input.display(),
                                parsed.runs.len()
                            );
                            for run in &parsed.runs {
                                text.push_str(&format!("  Run {}:\n", run.number));
                                for table in &run.tables {
                                    text.push_str(&format!("    - {table}\n"));
                                }
                            }
                            text
                        }
                    })
            } else {
                let xpath = xpath.as_deref().unwrap_or_default();
                xctrace::export_xpath(&runner, &input, xpath, output_path.as_deref()).map(|data| {
                    match data {
                        Some(data) => data,
                        None => format!(
                            "Exported to: {}",
                            output_path
                                .as_ref()
                                .map(|p| p.display().to_string())
                                .unwrap_or_default()
                        ),
                    }
                })
            };

            match result {
                Ok(text) => {
                    println!("{text}");
                    ExitCode::SUCCESS
                }
                Err(e) => fail(&e, format.into()),
            }
        }

        Commands::Record {
            template,
            output: output_path,
            attach,
            launch,
            all_processes: _,
            time_limit,
            device,
            format,
        } => {
            let target = if let Some(process) = attach {
                RecordTarget::Attach(process)
            } else if let Some(command) = launch {
                RecordTarget::Launch(command)
            } else {
                // --all-processes and the no-target default behave the same.
                RecordTarget::AllProcesses
            };

            let request = RecordRequest {
                template,
                output: output_path,
                target,
                time_limit: time_limit.clone(),
                device,
            };

            let format: OutputFormat = format.into();
            if !format.is_machine_readable() {
                println!("Recording with template: {}", request.template);
                if let Some(limit) = &time_limit {
                    println!("Time limit: {limit}");
                }
                println!("Recording... (Ctrl+C to stop)\n");
            }

            match xctrace::record(&runner, &request) {
                Ok(outcome) => {
                    println!("{}", output::format_record(&outcome, format));
                    ExitCode::SUCCESS
                }
                Err(e) => fail(&e, format),
            }
        }

        Commands::Templates { format } => match xctrace::list_templates(&runner) {
            Ok(templates) => {
                println!("{}", output::format_templates(&templates, format.into()));
                ExitCode::SUCCESS
            }
            Err(e) => fail(&e, format.into()),
        },
    }
}
