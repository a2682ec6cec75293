mod check;
mod run;

pub use check::*;
pub use run::*;

use std::path::PathBuf;

use clap::{arg, command, crate_authors, value_parser, Command};
use rx_harness::{Failure, InstrumentedAllocator};
use yansi::Color::Red;
use yansi::Paint;

use crate::{help, APP_HELP_TEMPLATE};

/// The run completed, whatever the outcome of each match.
pub const EXIT_SUCCESS: i32 = 0;
/// Some object couldn't be created.
pub const EXIT_RESOURCE_FAILURE: i32 = 2;
/// The pattern doesn't compile.
pub const EXIT_COMPILE_FAILURE: i32 = 3;

pub fn command(name: &'static str) -> Command {
    Command::new(name).help_template(
        r#"{about-with-newline}
{usage-heading}
  {usage}

{all-args}
"#,
    )
}

pub fn cli() -> Command {
    command!()
        .name("rxh")
        .author(crate_authors!("\n")) // requires `cargo` feature
        .arg_required_else_help(true)
        .arg(
            arg!(-C --config <CONFIG_FILE> "Config file")
                .value_parser(value_parser!(PathBuf))
                .long_help(help::CONFIG_FILE),
        )
        .help_template(APP_HELP_TEMPLATE)
        .subcommand_required(true)
        .subcommands(vec![run(), check()])
}

/// Prints `failure` and returns the exit code for it.
fn report_failure(pattern: &str, failure: &Failure) -> i32 {
    eprintln!("{} {}", "error:".paint(Red).bold(), failure);
    match failure {
        Failure::Resource(_) => EXIT_RESOURCE_FAILURE,
        Failure::Compile(err) => {
            // Point at the offending byte when it's part of the pattern.
            if let Some(prefix) = pattern.get(..err.offset) {
                eprintln!("  {}", pattern);
                eprintln!("  {}^", " ".repeat(prefix.chars().count()));
            }
            EXIT_COMPILE_FAILURE
        }
    }
}

fn print_allocations(allocator: &InstrumentedAllocator, verbose: bool) {
    if verbose {
        for event in allocator.events() {
            println!("{}", event);
        }
    }

    let stats = allocator.stats();

    println!(
        "allocations: {}, releases: {}, failed: {}, outstanding: {}",
        stats.allocations,
        stats.releases,
        stats.failed_allocations,
        stats.outstanding.len()
    );
}
