use clap::{arg, ArgMatches, Command};
use rx_harness::{Config, Harness, InstrumentedAllocator};
use yansi::Color::{Green, Yellow};
use yansi::Paint;

use super::{report_failure, EXIT_SUCCESS};

pub fn check() -> Command {
    super::command("check")
        .about("Check if a pattern compiles")
        .arg(arg!(<PATTERN>).help("Pattern to compile"))
}

pub fn exec_check(args: &ArgMatches, config: Config) -> anyhow::Result<i32> {
    let pattern = args.get_one::<String>("PATTERN").unwrap();

    // The subject is empty and the scan is off, only the compilation is
    // relevant here.
    let report = Harness::from_config(&config)
        .pattern(pattern.as_str())
        .subject("")
        .jit_stack(Some((config.jit.stack_min, config.jit.stack_max)))
        .workspace_slots(None)
        .run(&InstrumentedAllocator::new());

    if let Some(failure) = &report.failure {
        return Ok(report_failure(pattern, failure));
    }

    if let Some(count) = report.capture_count {
        println!("{} capture groups: {}", "[ OK ]".paint(Green).bold(), count);
    }

    match &report.jit_compile_error {
        Some(err) => println!("{} {}", "[ WARN ]".paint(Yellow).bold(), err),
        None => println!("{} JIT compiled", "[ OK ]".paint(Green).bold()),
    }

    Ok(EXIT_SUCCESS)
}
