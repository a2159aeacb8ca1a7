//! Jane Semantic Checker
//!
//! Type resolution, generic instantiation and constant folding for Jane packages.

mod feedback;
mod frontend;
mod sema;
mod types;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::PathBuf;
use std::process;

use feedback::CheckFeedback;
use sema::{check_package, CheckOptions};
use types::WordSize;

/// Jane semantic checker
#[derive(Parser, Debug)]
#[command(name = "janec")]
#[command(version = "0.1.0")]
#[command(about = "Jane semantic checker - types, generics and constants of a package")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check the files of one package
    Check {
        /// Source files of the package
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,

        /// Emit a JSON report instead of `path:row:column message` lines
        #[arg(long)]
        json: bool,

        /// Do not report unused variables, aliases and labels
        #[arg(long)]
        no_unused: bool,

        /// Word size of `int`, `uint` and `uintptr`
        #[arg(long, value_enum, default_value = "64")]
        word_size: Bits,

        /// Nesting limit of generic instantiation
        #[arg(long, default_value = "64")]
        max_depth: usize,
    },
    /// Print version information
    Version,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Bits {
    #[value(name = "64")]
    B64,
    #[value(name = "32")]
    B32,
}

impl From<Bits> for WordSize {
    fn from(bits: Bits) -> Self {
        match bits {
            Bits::B64 => WordSize::Bits64,
            Bits::B32 => WordSize::Bits32,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let code = match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };
    process::exit(code);
}

/// Exit code: 0 clean, 1 semantic errors, 2 unparseable input
fn run(cli: &Cli) -> Result<i32> {
    match &cli.command {
        Commands::Check {
            files,
            json,
            no_unused,
            word_size,
            max_depth,
        } => {
            let opts = CheckOptions {
                report_unused: !no_unused,
                max_instantiation_depth: *max_depth,
                word_size: (*word_size).into(),
            };
            check_files(files, &opts, *json)
        }
        Commands::Version => {
            println!("janec 0.1.0");
            println!("Jane semantic checker");
            Ok(0)
        }
    }
}

fn check_files(files: &[PathBuf], opts: &CheckOptions, json: bool) -> Result<i32> {
    let mut sources = Vec::with_capacity(files.len());
    for path in files {
        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        sources.push((path.display().to_string(), source));
    }
    log::info!("checking {} file(s)", sources.len());

    let report = check_package(&sources, opts);
    if json {
        println!("{}", CheckFeedback::from_report(&report).to_json());
    } else {
        for line in report.render() {
            println!("{}", line);
        }
    }
    let code = if report.files.iter().any(|f| f.fatal.is_some()) {
        2
    } else if report.has_errors() {
        1
    } else {
        0
    };
    Ok(code)
}
