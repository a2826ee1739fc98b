//! devalue CLI - command-line access to the four library entry points
//!
//! This binary exposes `stringify`/`uneval`/`parse`/`unflatten` over
//! stdin/stdout, for scripting and manual inspection: a `clap::Subcommand`
//! per operation, stdin-or-nothing input, structured JSON diagnostics on
//! failure.
//!
//! # Usage
//!
//! ```bash
//! echo '{"message":"hello"}' | devalue-cli stringify
//! echo '{"message":"hello"}' | devalue-cli uneval
//! devalue-cli stringify | devalue-cli parse
//! ```

use std::io::{self, Read};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use devalue::core::errors::DevalueError;
use devalue::core::flatten::Flattener;
use devalue::core::reducers::{ReducerSet, ReviverSet};
use devalue::core::value::Value;
use devalue::emitters;

#[derive(Parser)]
#[command(author, version, about = "Serialize and revive value graphs devalue-style", long_about = None)]
struct Cli {
    /// Enable tracing output on stderr (equivalent to RUST_LOG=devalue=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a plain-JSON value from stdin and render it as a flat devalue document
    Stringify {
        /// Recursion depth limit (§5)
        #[arg(long, default_value_t = 1000)]
        max_depth: usize,
        /// Pretty-print the JSON output (not script-safe; for human inspection only)
        #[arg(long)]
        pretty: bool,
    },
    /// Read a plain-JSON value from stdin and render it as a self-evaluating JS expression
    Uneval {
        /// Recursion depth limit (§5)
        #[arg(long, default_value_t = 1000)]
        max_depth: usize,
    },
    /// Read a devalue document (as produced by `stringify`) from stdin and re-emit it canonically
    Parse {
        #[arg(long)]
        pretty: bool,
    },
    /// Read an already-parsed devalue JSON array from stdin and re-emit it canonically
    Unflatten {
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("error reading stdin: {0}")]
    Io(#[from] io::Error),
    #[error("invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Devalue(#[from] DevalueError),
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("devalue=debug")),
            )
            .init();
    }

    let result = match &cli.command {
        Commands::Stringify { max_depth, pretty } => run_stringify(*max_depth, *pretty),
        Commands::Uneval { max_depth } => run_uneval(*max_depth),
        Commands::Parse { pretty } => run_parse(*pretty),
        Commands::Unflatten { pretty } => run_unflatten(*pretty),
    };

    if let Err(err) = result {
        report_error(&err);
        std::process::exit(1);
    }
}

fn read_stdin() -> io::Result<String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}

fn run_stringify(max_depth: usize, pretty: bool) -> Result<(), CliError> {
    let input = read_stdin()?;
    let json: serde_json::Value = serde_json::from_str(&input)?;
    let value = Value::from_json(json);
    let flattened = Flattener::with_max_depth(max_depth).flatten(&value, &ReducerSet::new())?;
    if pretty {
        let json = emitters::data::to_json(&flattened);
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        println!("{}", emitters::data::stringify(&flattened));
    }
    Ok(())
}

fn run_uneval(max_depth: usize) -> Result<(), CliError> {
    let input = read_stdin()?;
    let json: serde_json::Value = serde_json::from_str(&input)?;
    let value = Value::from_json(json);
    let flattened = Flattener::with_max_depth(max_depth).flatten(&value, &ReducerSet::new())?;
    println!("{}", emitters::code::uneval(&flattened));
    Ok(())
}

fn run_parse(pretty: bool) -> Result<(), CliError> {
    let input = read_stdin()?;
    let revived = devalue::revive::parse(&input, &ReviverSet::new())?;
    print_canonical(&revived, pretty)
}

fn run_unflatten(pretty: bool) -> Result<(), CliError> {
    let input = read_stdin()?;
    let json: serde_json::Value = serde_json::from_str(&input)?;
    let revived = devalue::revive::unflatten(json, &ReviverSet::new())?;
    print_canonical(&revived, pretty)
}

/// Re-flattens a revived value and prints it as a canonical devalue
/// document — `parse`/`unflatten` round-trip through the same Flattener
/// `stringify` uses, so this doubles as a format-normalizer.
fn print_canonical(value: &Value, pretty: bool) -> Result<(), CliError> {
    let flattened = Flattener::new().flatten(value, &ReducerSet::new())?;
    if pretty {
        let json = emitters::data::to_json(&flattened);
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        println!("{}", emitters::data::stringify(&flattened));
    }
    Ok(())
}

fn report_error(err: &CliError) {
    match err {
        CliError::Devalue(inner) => {
            eprintln!("{}", serde_json::to_string_pretty(&inner.to_json()).unwrap_or_else(|_| inner.to_string()));
        }
        other => eprintln!("{other}"),
    }
}
