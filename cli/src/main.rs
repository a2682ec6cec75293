mod commands;
mod help;

#[cfg(test)]
mod tests;

use std::path::PathBuf;
use std::{io, panic, process};

use crossterm::tty::IsTty;
use rx_harness::{load_config_from_file, Config};
use yansi::Color::Red;
use yansi::Paint;

use crate::commands::cli;

const APP_HELP_TEMPLATE: &str = r#"rxh {version}, runs regular expressions through a JIT and a restartable DFA matcher.

{author-with-newline}
{before-help}{usage-heading}
  {usage}

{all-args}{after-help}
"#;

const EXIT_ERROR: i32 = 1;
const CONFIG_FILE: &str = ".rx-harness.toml";

fn main() -> anyhow::Result<()> {
    // Enable support for ANSI escape codes in Windows. In other platforms
    // this is a no-op.
    if let Err(err) = enable_ansi_support::enable_ansi_support() {
        println!("could not enable ANSI support: {}", err)
    }

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .init();

    // Turn off colors when stdout is redirected.
    if !io::stdout().is_tty() {
        yansi::disable();
    }

    // Usage errors exit with EXIT_ERROR instead of clap's default, help and
    // version go to stdout and exit with 0.
    let args = match cli().try_get_matches_from(wild::args()) {
        Ok(args) => args,
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => {
            let _ = err.print();
            process::exit(EXIT_ERROR);
        }
    };

    let orig_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        orig_hook(panic_info);
        process::exit(EXIT_ERROR);
    }));

    let config = match args.get_one::<PathBuf>("config") {
        Some(path) => load_config_from_file(path),
        None => Ok(match home::home_dir() {
            Some(home_path) if !home_path.as_os_str().is_empty() => {
                load_config_from_file(&home_path.join(CONFIG_FILE))
                    .unwrap_or_default()
            }
            _ => Config::default(),
        }),
    };

    let result = config.map_err(anyhow::Error::from).and_then(|config| {
        match args.subcommand() {
            Some(("run", args)) => commands::exec_run(args, config),
            Some(("check", args)) => commands::exec_check(args, config),
            _ => unreachable!(),
        }
    });

    match result {
        Ok(code) => process::exit(code),
        Err(err) => {
            if let Some(source) = err.source() {
                eprintln!("{} {}: {}", "error:".paint(Red).bold(), err, source);
            } else {
                eprintln!("{} {}", "error:".paint(Red).bold(), err);
            }
            process::exit(EXIT_ERROR);
        }
    }
}
