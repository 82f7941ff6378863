use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use slog::{error, o, Logger};
use sloggers::terminal::{Destination, TerminalLoggerBuilder};
use sloggers::types::Severity;
use sloggers::Build;

use lib::{analysis, dumper, runner};

#[derive(Parser)]
#[command(
    name = "ce-bench",
    about = "Benchmark driver and timing analysis for the verifier's counterexample evaluation"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Benchmark every manifest file against a warmed-up verifier server
    RunBenchmarks {
        /// Suffix included in the output file name
        suffix: Option<String>,

        /// CSV manifest; the first column lists the files to benchmark
        #[arg(long, default_value = runner::DEFAULT_MANIFEST)]
        manifest: PathBuf,
    },
    /// Dump counterexample output for every source file under a directory
    GetCounterexampleOutputs {
        source_dir: PathBuf,
        target_dir: PathBuf,
    },
    /// Compare a baseline timing record against a counterexample-enabled one
    AnalyzeTimings {
        baseline: PathBuf,
        counterexample: PathBuf,

        /// Where to write the summary CSV
        #[arg(long, default_value = "benchmark.csv")]
        out: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let logger = build_logger();

    let result = match cli.command {
        Command::RunBenchmarks { suffix, manifest } => {
            runner::run_benchmarks(&manifest, suffix.as_deref(), &logger).map(|_| ())
        }
        Command::GetCounterexampleOutputs {
            source_dir,
            target_dir,
        } => dumper::dump_counterexamples(&source_dir, &target_dir, &logger),
        Command::AnalyzeTimings {
            baseline,
            counterexample,
            out,
        } => analysis::run_analysis(&baseline, &counterexample, &out, &logger),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(logger, "{}", err);
            ExitCode::FAILURE
        }
    }
}

fn build_logger() -> Logger {
    let mut builder = TerminalLoggerBuilder::new();
    builder.level(Severity::Info);
    builder.destination(Destination::Stderr);
    builder
        .build()
        .unwrap_or_else(|_| Logger::root(slog::Discard, o!()))
}
