use clap::{arg, value_parser, ArgMatches, Command};
use rx_harness::{Config, Harness, InstrumentedAllocator, MatchOutcome};
use yansi::Color::{Green, Yellow};
use yansi::Paint;

use crate::help;

use super::{print_allocations, report_failure, EXIT_SUCCESS};

pub fn run() -> Command {
    super::command("run")
        .about("Run a pattern over a subject in both execution modes")
        .long_about(help::RUN_LONG_HELP)
        .arg(
            arg!([PATTERN])
                .help("Pattern to compile, the config file's pattern if missing"),
        )
        .arg(
            arg!([SUBJECT])
                .help("Subject to match, the config file's subject if missing"),
        )
        // Keep options sorted alphabetically by their long name.
        .arg(
            arg!(--"jit-stack-max" <BYTES>)
                .help("Maximum size of the JIT stack")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            arg!(--"jit-stack-min" <BYTES>)
                .help("Initial size of the JIT stack")
                .value_parser(value_parser!(usize)),
        )
        .arg(arg!(--"no-jit").help("Don't JIT-compile nor run the JIT match"))
        .arg(arg!(--"no-scan").help("Don't run the restartable scan"))
        .arg(
            arg!(-a --"print-allocations")
                .help("Print every allocation and release")
                .long_help(help::PRINT_ALLOCATIONS_LONG_HELP),
        )
        .arg(
            arg!(--"workspace-slots" <NUM_SLOTS>)
                .help("Number of candidate slots in the scan workspace")
                .long_help(help::WORKSPACE_SLOTS_LONG_HELP)
                .value_parser(value_parser!(usize)),
        )
}

pub fn exec_run(args: &ArgMatches, mut config: Config) -> anyhow::Result<i32> {
    if let Some(pattern) = args.get_one::<String>("PATTERN") {
        config.pattern = pattern.clone();
    }

    if let Some(subject) = args.get_one::<String>("SUBJECT") {
        config.subject = subject.clone();
    }

    if let Some(min) = args.get_one::<usize>("jit-stack-min") {
        config.jit.stack_min = *min;
    }

    if let Some(max) = args.get_one::<usize>("jit-stack-max") {
        config.jit.stack_max = *max;
    }

    if let Some(slots) = args.get_one::<usize>("workspace-slots") {
        config.scan.workspace_slots = *slots;
    }

    if args.get_flag("no-jit") {
        config.jit.enabled = false;
    }

    if args.get_flag("no-scan") {
        config.scan.enabled = false;
    }

    println!("pattern: {}", config.pattern);
    println!("subject: {}", config.subject);

    let allocator = InstrumentedAllocator::new();
    let report = Harness::from_config(&config).run(&allocator);

    if let Some(count) = report.capture_count {
        println!("capture groups: {}", count);
    }

    if let Some(err) = &report.jit_compile_error {
        println!("{} {}", "warning:".paint(Yellow).bold(), err);
    }

    if let Some(scan) = &report.scan {
        println!("{}", "[scan]".paint(Green).bold());
        for step in &scan.steps {
            println!("{}", step);
        }
    }

    if let Some(outcome) = &report.jit {
        println!("{}", "[jit]".paint(Green).bold());
        println!("{}", outcome);
        if let MatchOutcome::Match { truncated: true, .. } = outcome {
            println!("match data too small for every capture group");
        }
    }

    print_allocations(&allocator, args.get_flag("print-allocations"));

    match &report.failure {
        Some(failure) => Ok(report_failure(&config.pattern, failure)),
        None => Ok(EXIT_SUCCESS),
    }
}
