use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;

use vmil_translator::driver::{self, Options};

/// Translate VM code (a .vm file or a directory of them) into Hack assembly.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// A .vm file, or a directory whose .vm files make up one program.
    input: PathBuf,
    /// Where to write the assembly.
    #[arg(short, long, env = "VMIL_OUTPUT", value_name = "FILE")]
    output: Option<PathBuf>,
    /// Emit the bootstrap code that calls Sys.init (default for directories).
    #[arg(long, conflicts_with = "no_bootstrap")]
    bootstrap: bool,
    /// Never emit bootstrap code.
    #[arg(long)]
    no_bootstrap: bool,
    /// Increase output verbosity.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let bootstrap = match (cli.bootstrap, cli.no_bootstrap) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    };
    let written = driver::run(&Options {
        input: cli.input,
        output: cli.output,
        bootstrap,
    })?;
    info!(output = %written.display(), "done");
    Ok(())
}
