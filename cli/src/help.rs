pub const CONFIG_FILE: &str = r#"Config file for rxh

Specifies a config file with the pattern, the subject and the settings of each
execution mode. If config file is not specified, ${HOME}/.rx-harness.toml is
used. If it does not exist the default options are applied.

Example:

pattern = '\d+(sens|respons)e'
subject = "h123response"

[jit]
enabled = true
stack_min = 16384
stack_max = 131072

[scan]
enabled = true
workspace_slots = 20"#;

pub const RUN_LONG_HELP: &str = r#"Run a pattern over a subject in both execution modes

The pattern is compiled, then the subject is scanned one byte at a time with the
restartable DFA matcher, and finally matched in a single call with the JIT
matcher. Every object is released before exiting.

Exit codes:

0  the run completed, even if nothing matched
1  invalid arguments or config file
2  some object couldn't be created
3  the pattern doesn't compile"#;

pub const PRINT_ALLOCATIONS_LONG_HELP: &str = r#"Print every allocation and release

Each call to the memory services is printed in the order in which it happened,
followed by the summary."#;

pub const WORKSPACE_SLOTS_LONG_HELP: &str = r#"Number of candidate slots in the scan workspace

The scan fails with a workspace size error when more candidates are alive at
the same time."#;
