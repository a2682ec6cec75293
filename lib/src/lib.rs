/*! Drives a compiled regular expression engine in two execution modes while
accounting every allocation made on its behalf.

The objects involved in matching form a hierarchy that starts with a
[`GeneralContext`], which binds the [`MemoryServices`] used for allocating
every other object. Patterns are compiled under a [`CompileContext`] into a
[`CompiledPattern`], which can be executed in two ways:

* [`CompiledPattern::jit_match`] runs the JIT code of the pattern over a
  complete subject, using the [`JitStack`] assigned to a [`MatchContext`].
* [`CompiledPattern::dfa_match`] scans a subject that arrives in chunks,
  carrying the state of the scan from one chunk to the next in a
  [`Workspace`].

Both write their results to a [`MatchData`].

The [`Harness`] puts everything together: it creates the objects, runs both
modes over a subject and releases the objects in the reverse order of
creation.

# Example

```rust
use rx_harness::{Harness, InstrumentedAllocator, MatchOutcome};

let allocator = InstrumentedAllocator::new();
let report = Harness::new(r"\d+(sens|respons)e", "h123response").run(&allocator);

assert_eq!(
    report.jit,
    Some(MatchOutcome::Match { start: 1, end: 12, truncated: false })
);

// Every allocation was released.
assert!(allocator.stats().is_balanced());
```
*/

pub use config::load_config_from_file;
pub use config::Config;
pub use config::JitConfig;
pub use config::ScanConfig;

pub use context::Bsr;
pub use context::CharacterTables;
pub use context::CompileContext;
pub use context::GeneralContext;
pub use context::JitStack;
pub use context::MatchContext;
pub use context::Newline;

pub use engine::DfaOptions;
pub use engine::MatchStatus;
pub use engine::Workspace;

pub use errors::CompileError;
pub use errors::CompileErrorKind;
pub use errors::JitCompileError;
pub use errors::MatchErrorKind;
pub use errors::ResourceError;
pub use errors::ResourceKind;

pub use harness::match_jit;
pub use harness::scan_restartable;
pub use harness::Failure;
pub use harness::Harness;
pub use harness::MatchOutcome;
pub use harness::RunReport;
pub use harness::ScanPhase;
pub use harness::ScanReport;
pub use harness::ScanStep;

pub use match_data::MatchData;
pub use match_data::UNSET;

pub use memory::AllocationEvent;
pub use memory::AllocationStats;
pub use memory::InstrumentedAllocator;
pub use memory::Managed;
pub use memory::MemoryServices;
pub use memory::SystemMemory;

pub use pattern::CompiledPattern;
pub use pattern::JitMode;

pub mod context;
pub mod errors;
pub mod memory;

mod config;
mod engine;
mod harness;
mod match_data;
mod pattern;

#[cfg(test)]
mod tests;
