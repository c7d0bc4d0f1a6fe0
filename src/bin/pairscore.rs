//! pairscore CLI: pairwise embedding-similarity evaluation
//!
//! This is a thin shell that delegates to library functions.
//! All logic lives in `pairscore::cli` for testability.

use clap::Parser;
use pairscore::cli::{run, Args};

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose, args.quiet);

    match run(args) {
        Ok(result) => println!("{}", result.message.trim_end()),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// `RUST_LOG` wins when set; otherwise `--verbose` selects debug and
/// `--quiet` selects warnings only.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
