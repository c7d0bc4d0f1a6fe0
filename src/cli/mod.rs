//! CLI module for pairscore
//!
//! All logic lives in this module for testability. The binary
//! (`src/bin/pairscore.rs`) is a thin shell that only installs logging and
//! calls `cli::run()`.
//!
//! ```text
//! src/cli/
//! ├── mod.rs       # This file - module exports
//! ├── args.rs      # Argument parsing with clap
//! ├── commands.rs  # Command implementations
//! └── output.rs    # Output formatters (text, json)
//! ```

pub mod args;
pub mod commands;
pub mod output;

pub use args::{Args, Command};
pub use commands::{run, CliError, CliResult, CommandResult};
pub use output::OutputFormat;
