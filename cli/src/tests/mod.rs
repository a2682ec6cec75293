use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

/// Returns the `rxh` command with an empty home directory, so that no
/// config file is picked up from the environment.
fn rxh(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("rxh").unwrap();
    cmd.env("HOME", home.path()).env("RUST_LOG", "off");
    cmd
}

#[test]
fn cli_run_scenario() {
    let home = TempDir::new().unwrap();

    rxh(&home)
        .arg("run")
        .arg(r"\d+(sens|respons)e")
        .arg("h123response")
        .assert()
        .success()
        .stdout(predicate::str::contains("capture groups: 1"))
        .stdout(predicate::str::contains("partial matching index: 1\n"))
        .stdout(predicate::str::contains("partial matching index: 10\n"))
        .stdout(predicate::str::contains(
            "[jit]\nMatching from 1 to 12\n",
        ))
        .stdout(predicate::str::contains(
            "allocations: 8, releases: 8, failed: 0, outstanding: 0",
        ));
}

#[test]
fn cli_run_defaults() {
    let home = TempDir::new().unwrap();

    rxh(&home)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("subject: h123response"))
        .stdout(predicate::str::contains("Matching from 1 to 12"));
}

#[test]
fn cli_run_no_match() {
    let home = TempDir::new().unwrap();

    rxh(&home)
        .arg("run")
        .arg(r"\d+(sens|respons)e")
        .arg("hello world")
        .assert()
        .success()
        .code(0)
        .stdout(predicate::str::contains("[jit]\nNo matching\n"))
        .stdout(predicate::str::contains("Matching from").not());
}

#[test]
fn cli_run_compile_error() {
    let home = TempDir::new().unwrap();

    rxh(&home)
        .arg("run")
        .arg(r"\d+(sens|respons")
        .arg("h123response")
        .assert()
        .failure()
        .code(3)
        .stdout(predicate::str::contains("[scan]").not())
        .stdout(predicate::str::contains("outstanding: 0"))
        .stderr(predicate::str::contains("missing closing parenthesis"));
}

#[test]
fn cli_run_invalid_jit_stack() {
    let home = TempDir::new().unwrap();

    rxh(&home)
        .arg("run")
        .arg("--jit-stack-min=0")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("invalid size"));
}

#[test]
fn cli_run_disabled_modes() {
    let home = TempDir::new().unwrap();

    rxh(&home)
        .arg("run")
        .arg("--no-jit")
        .assert()
        .success()
        .stdout(predicate::str::contains("[scan]"))
        .stdout(predicate::str::contains("[jit]").not());

    rxh(&home)
        .arg("run")
        .arg("--no-scan")
        .assert()
        .success()
        .stdout(predicate::str::contains("[scan]").not())
        .stdout(predicate::str::contains("[jit]"));
}

#[test]
fn cli_run_workspace_overflow() {
    let home = TempDir::new().unwrap();

    rxh(&home)
        .arg("run")
        .arg("--workspace-slots=1")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Error: workspace size exceeded in DFA matching",
        ))
        .stdout(predicate::str::contains("[jit]\nMatching from 1 to 12\n"));
}

#[test]
fn cli_run_print_allocations() {
    let home = TempDir::new().unwrap();

    rxh(&home)
        .arg("run")
        .arg("-a")
        .assert()
        .success()
        .stdout(predicate::str::is_match("(?m)^malloc [0-9]+, ret: 0x").unwrap())
        .stdout(predicate::str::is_match("(?m)^free 0x").unwrap());
}

#[test]
fn cli_run_config_file() {
    let home = TempDir::new().unwrap();
    let config_file = home.child("config.toml");

    config_file
        .write_str(
            r#"
            subject = "hello world"

            [jit]
            enabled = false
            "#,
        )
        .unwrap();

    rxh(&home)
        .arg("--config")
        .arg(config_file.path())
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("subject: hello world"))
        .stdout(predicate::str::contains("[jit]").not());

    // Command-line arguments take precedence over the config file.
    rxh(&home)
        .arg("--config")
        .arg(config_file.path())
        .arg("run")
        .arg(r"\d+")
        .arg("abc123")
        .assert()
        .success()
        .stdout(predicate::str::contains("Matching from 3 to 6"));
}

#[test]
fn cli_home_config_file() {
    let home = TempDir::new().unwrap();

    home.child(".rx-harness.toml")
        .write_str("subject = \"abc123sense\"\n")
        .unwrap();

    rxh(&home)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("subject: abc123sense"))
        .stdout(predicate::str::contains("[jit]\nMatching from 3 to 11\n"));
}

#[test]
fn cli_missing_config_file() {
    let home = TempDir::new().unwrap();

    rxh(&home)
        .arg("--config")
        .arg(home.path().join("missing.toml"))
        .arg("run")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn cli_usage_error() {
    let home = TempDir::new().unwrap();

    rxh(&home)
        .arg("run")
        .arg("--workspace-slots=many")
        .assert()
        .failure()
        .code(1);
}

#[test]
fn cli_check() {
    let home = TempDir::new().unwrap();

    rxh(&home)
        .arg("check")
        .arg("(a)(b)c")
        .assert()
        .success()
        .stdout("[ OK ] capture groups: 2\n[ OK ] JIT compiled\n");

    rxh(&home)
        .arg("check")
        .arg("a[z-a]")
        .assert()
        .failure()
        .code(3)
        .stdout("")
        .stderr(predicate::str::contains(
            "error: compilation failed at offset 2: invalid range in character class",
        ));
}

#[test]
fn cli_check_caret_after_multibyte_chars() {
    let home = TempDir::new().unwrap();

    rxh(&home)
        .arg("check")
        .arg("é[z-a]")
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("  é[z-a]\n    ^\n"));
}
