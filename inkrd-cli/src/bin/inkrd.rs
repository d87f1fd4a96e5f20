//! inkrd Command Line Interface

#![deny(missing_docs)]

use std::ffi::OsString;
use std::fmt::Write;
use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use clap::{crate_version, ArgAction, Parser, Subcommand};
use itertools::izip;
use tracing::instrument;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use inkrd::ink::{Ink, TraceItem};
use inkrd::{Reader, ReaderOptions};

#[derive(Parser, Debug)]
#[command(author, about, long_about = None,
    disable_help_flag = true,
    disable_version_flag = true,
    next_help_heading="Global Options",
    version=crate_version!())]
struct InkrdArgs {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, global = true, action=ArgAction::Help,
        help = "Print help")]
    help: (),

    #[arg(long, short='V', action=ArgAction::Version,
        help = "Print version")]
    version: (),
}

#[derive(Subcommand, Debug)]
enum Commands {
    Read(ReadConfig),
}

/// Decode InkML files and print the traces' X, Y and T samples
#[derive(Parser, Debug)]
#[command(long_about = None)]
struct ReadConfig {
    /// One or more paths to InkML files
    inkml_path: Vec<OsString>,

    /// Resolve reference attributes in the same document even when they
    /// lack the leading '#'
    #[arg(long, short = 'a', default_value_t = false)]
    assume_local_refs: bool,
}

#[instrument]
fn read(config: &ReadConfig) -> Result<()> {
    for path in &config.inkml_path {
        let path = PathBuf::from(path);
        if path.is_dir() {
            println!("{} is a directory, skipping.", path.display());
            continue;
        }

        let content = fs::read_to_string(&path)?;
        let mut reader = Reader::new(ReaderOptions {
            assume_local_refs: config.assume_local_refs,
        });
        let ink = reader.read(&content)?;
        print!("{}", render_traces(&ink)?);
    }
    Ok(())
}

/// Formats every top-level trace as `X, Y, T` lines with three fractional
/// digits. Traces missing any of the three channels print a header only.
fn render_traces(ink: &Ink) -> Result<String> {
    let mut out = String::new();
    let empty: Vec<f64> = Vec::new();

    for (index, item) in ink.traces.iter().enumerate() {
        let TraceItem::Trace(trace) = item else {
            continue;
        };

        let channel = |name: &str| trace.channels.get(name).unwrap_or(&empty);
        writeln!(out, "trace #{index}")?;
        for (x, y, t) in izip!(channel("X"), channel("Y"), channel("T")) {
            writeln!(out, "{x:.3}, {y:.3}, {t:.3}")?;
        }
        writeln!(out)?;
    }
    Ok(out)
}

#[instrument]
fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::WARN)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let args = InkrdArgs::parse();

    match &args.command {
        Commands::Read(config) => read(config),
    }
}

#[test]
fn verify_args() {
    use clap::CommandFactory;
    InkrdArgs::command().debug_assert();
}
