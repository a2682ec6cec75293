/*! Drives a pattern through both execution modes.

[`Harness::run`] creates every object needed for matching, runs the
restartable scan and the JIT match over one subject, and tears everything
down in the reverse order of creation. The objects are created in this
order:

1. [`GeneralContext`], bound to the memory services passed to `run`.
2. [`CompileContext`], configured with a fixed set of options.
3. [`JitStack`], if JIT mode is enabled.
4. [`MatchContext`], with the JIT stack assigned to it.
5. [`CompiledPattern`], which is then JIT-compiled.
6. [`MatchData`], sized from the pattern.

A failure while creating any of them stops the run. Objects created so far
are released as the stages unwind. A failed JIT compilation is not fatal,
only the JIT match is skipped.

The building blocks [`match_jit`] and [`scan_restartable`] can also be used
on their own.
*/

use std::fmt::{Display, Formatter};

use log::*;
use thiserror::Error;

use crate::config::Config;
use crate::context::{
    Bsr, CharacterTables, CompileContext, GeneralContext, JitStack,
    MatchContext, Newline,
};
use crate::engine::{DfaOptions, MatchStatus, Workspace};
use crate::errors::{
    CompileError, JitCompileError, MatchErrorKind, ResourceError,
    ResourceKind,
};
use crate::match_data::MatchData;
use crate::memory::MemoryServices;
use crate::pattern::{CompiledPattern, JitMode};

/// Nesting limit for groups used by the harness.
pub const PARENS_NEST_LIMIT: u32 = 250;

/// Outcome of a single match call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// A complete match.
    Match {
        start: usize,
        end: usize,
        /// The match data had too few pairs for every capture group. Only
        /// the overall boundaries are reliable.
        truncated: bool,
    },
    /// No match.
    NoMatch,
    /// The input ended in the middle of a possible match that begins at
    /// `start`.
    Partial { start: usize },
    /// The engine failed.
    Error(MatchErrorKind),
}

impl MatchOutcome {
    /// Boundaries of a complete match.
    pub fn boundaries(&self) -> Option<(usize, usize)> {
        match self {
            MatchOutcome::Match { start, end, .. } => Some((*start, *end)),
            _ => None,
        }
    }
}

impl Display for MatchOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchOutcome::Match { start, end, .. } => {
                write!(f, "Matching from {} to {}", start, end)
            }
            MatchOutcome::NoMatch => write!(f, "No matching"),
            MatchOutcome::Partial { start } => {
                write!(f, "partial matching from {}", start)
            }
            MatchOutcome::Error(kind) => write!(f, "Error: {}", kind),
        }
    }
}

/// One step of a restartable scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanStep {
    /// Position of the byte fed in this step.
    pub index: usize,
    /// Whether the step continued the session of the previous steps.
    pub restart: bool,
    /// What the engine reported.
    pub outcome: MatchOutcome,
}

impl Display for ScanStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.outcome {
            MatchOutcome::Partial { .. } => {
                write!(f, "partial matching index: {}", self.index)
            }
            outcome => write!(f, "{}", outcome),
        }
    }
}

/// Result of [`scan_restartable`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Every step, in order.
    pub steps: Vec<ScanStep>,
    /// True if an engine error stopped the scan before the end of the
    /// subject.
    pub terminated_early: bool,
}

impl ScanReport {
    /// Boundaries of the complete matches reported by the scan.
    pub fn matches(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.steps.iter().filter_map(|step| step.outcome.boundaries())
    }

    /// Positions of the steps that reported a partial match.
    pub fn partial_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.steps.iter().filter_map(|step| match step.outcome {
            MatchOutcome::Partial { .. } => Some(step.index),
            _ => None,
        })
    }
}

/// Phase of a restartable scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    /// No byte was fed yet.
    Fresh,
    /// Some bytes were fed, the next step continues the session.
    Continuing,
    /// The subject is exhausted, or the scan was stopped by an error.
    Done,
}

/// State of a restartable scan.
struct ScanState {
    cursor: usize,
    workspace: Workspace,
    phase: ScanPhase,
}

impl ScanState {
    fn new(workspace_slots: usize) -> Self {
        Self {
            cursor: 0,
            workspace: Workspace::new(workspace_slots),
            phase: ScanPhase::Fresh,
        }
    }

    /// Feeds the byte at the cursor and advances it.
    fn step(
        &mut self,
        pattern: &CompiledPattern,
        match_data: &mut MatchData<'_>,
        mcontext: &MatchContext<'_, '_>,
        subject: &[u8],
    ) -> ScanStep {
        let index = self.cursor;
        let restart = self.phase == ScanPhase::Continuing;

        let status = pattern.dfa_match(
            &subject[index..index + 1],
            DfaOptions::partial_soft().restart(restart),
            match_data,
            mcontext,
            &mut self.workspace,
        );

        let outcome = match status {
            MatchStatus::Success(_) => match match_data.pair(0) {
                Some((start, end)) => {
                    MatchOutcome::Match { start, end, truncated: false }
                }
                None => MatchOutcome::Error(MatchErrorKind::Internal),
            },
            MatchStatus::NoMatch => MatchOutcome::NoMatch,
            MatchStatus::Partial => MatchOutcome::Partial {
                start: match_data.pair(0).map_or(index, |(start, _)| start),
            },
            MatchStatus::Error(kind) => MatchOutcome::Error(kind),
        };

        self.cursor += 1;
        self.phase = if matches!(outcome, MatchOutcome::Error(_))
            || self.cursor == subject.len()
        {
            ScanPhase::Done
        } else {
            ScanPhase::Continuing
        };

        ScanStep { index, restart, outcome }
    }
}

/// Runs the JIT code of `pattern` once over the whole `subject`.
///
/// The pattern must have been JIT-compiled, otherwise the outcome is
/// [`MatchErrorKind::JitBadOption`].
pub fn match_jit(
    pattern: &CompiledPattern,
    match_data: &mut MatchData<'_>,
    mcontext: &mut MatchContext<'_, '_>,
    subject: &[u8],
) -> MatchOutcome {
    let outcome = match pattern.jit_match(subject, 0, match_data, mcontext) {
        MatchStatus::Success(rc) => match match_data.pair(0) {
            Some((start, end)) => {
                if rc == 0 {
                    warn!(
                        "match data is too small for every capture group, \
                         only the overall match is reliable"
                    );
                }
                MatchOutcome::Match { start, end, truncated: rc == 0 }
            }
            None => MatchOutcome::Error(MatchErrorKind::Internal),
        },
        MatchStatus::NoMatch => MatchOutcome::NoMatch,
        // Complete JIT code never reports partial matches.
        MatchStatus::Partial => MatchOutcome::Partial {
            start: match_data.pair(0).map_or(0, |(start, _)| start),
        },
        MatchStatus::Error(kind) => {
            warn!("JIT match failed: {}", kind);
            MatchOutcome::Error(kind)
        }
    };

    info!("JIT match: {}", outcome);
    outcome
}

/// Scans `subject` one byte at a time, as if each byte were a new chunk of
/// a stream, with soft partial matching.
///
/// Every byte after the first continues the session of the previous ones.
/// The scan doesn't stop at complete matches, only an engine error stops it
/// before the end of the subject.
pub fn scan_restartable(
    pattern: &CompiledPattern,
    match_data: &mut MatchData<'_>,
    mcontext: &MatchContext<'_, '_>,
    subject: &[u8],
    workspace_slots: usize,
) -> ScanReport {
    let mut state = ScanState::new(workspace_slots);
    let mut report = ScanReport::default();

    if subject.is_empty() {
        state.phase = ScanPhase::Done;
    }

    while state.phase != ScanPhase::Done {
        let step = state.step(pattern, match_data, mcontext, subject);

        match step.outcome {
            MatchOutcome::Error(kind) => {
                warn!("scan stopped at index {}: {}", step.index, kind);
                report.terminated_early = state.cursor < subject.len();
            }
            _ => info!("{}", step),
        }

        report.steps.push(step);
    }

    report
}

/// Reason why a run stopped before matching.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Some object couldn't be created.
    #[error(transparent)]
    Resource(#[from] ResourceError),
    /// The pattern didn't compile.
    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// Everything that happened during a [`Harness::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Objects created, in creation order.
    pub created: Vec<ResourceKind>,
    /// The failure that stopped the run, if any.
    pub failure: Option<Failure>,
    /// Why JIT compilation failed, if it did.
    pub jit_compile_error: Option<JitCompileError>,
    /// Number of capture groups in the pattern, if it compiled.
    pub capture_count: Option<usize>,
    /// Result of the restartable scan, if it ran.
    pub scan: Option<ScanReport>,
    /// Result of the JIT match, if it ran.
    pub jit: Option<MatchOutcome>,
}

impl RunReport {
    /// True if the run got to the matching stages.
    pub fn completed(&self) -> bool {
        self.failure.is_none()
    }
}

/// Runs a pattern over a subject in both execution modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Harness {
    pattern: String,
    subject: Vec<u8>,
    jit_stack: Option<(usize, usize)>,
    workspace_slots: Option<usize>,
}

impl Harness {
    /// Creates a harness with both modes enabled, a 16 KiB to 128 KiB JIT
    /// stack, and a 20 slot scan workspace.
    pub fn new<P: Into<String>, S: Into<Vec<u8>>>(pattern: P, subject: S) -> Self {
        Self::from_config(&Config {
            pattern: pattern.into(),
            subject: String::new(),
            ..Default::default()
        })
        .subject(subject)
    }

    /// Creates a harness from a configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            pattern: config.pattern.clone(),
            subject: config.subject.clone().into_bytes(),
            jit_stack: config
                .jit
                .enabled
                .then_some((config.jit.stack_min, config.jit.stack_max)),
            workspace_slots: config
                .scan
                .enabled
                .then_some(config.scan.workspace_slots),
        }
    }

    /// Sets the pattern.
    pub fn pattern<P: Into<String>>(mut self, pattern: P) -> Self {
        self.pattern = pattern.into();
        self
    }

    /// Sets the subject.
    pub fn subject<S: Into<Vec<u8>>>(mut self, subject: S) -> Self {
        self.subject = subject.into();
        self
    }

    /// Enables JIT mode with a stack of the given bounds, or disables it
    /// with `None`.
    pub fn jit_stack(mut self, bounds: Option<(usize, usize)>) -> Self {
        self.jit_stack = bounds;
        self
    }

    /// Enables the restartable scan with a workspace of the given number of
    /// slots, or disables it with `None`.
    pub fn workspace_slots(mut self, slots: Option<usize>) -> Self {
        self.workspace_slots = slots;
        self
    }

    /// Runs the harness. Every object is allocated with `memory`.
    pub fn run(&self, memory: &dyn MemoryServices) -> RunReport {
        let mut report = RunReport::default();
        if let Err(failure) = self.run_stages(memory, &mut report) {
            report.failure = Some(failure);
        }
        info!("cleanup finished");
        report
    }

    fn run_stages(
        &self,
        memory: &dyn MemoryServices,
        report: &mut RunReport,
    ) -> Result<(), Failure> {
        let general = track(
            report,
            ResourceKind::GeneralContext,
            GeneralContext::new(memory),
        )?;

        let mut ccontext = track(
            report,
            ResourceKind::CompileContext,
            CompileContext::new(&general),
        )?;

        ccontext
            .set_character_tables(CharacterTables::Default)
            .set_bsr(Bsr::AnyCrlf)
            .set_max_pattern_length(None)
            .set_newline(Newline::Lf)
            .set_parens_nest_limit(PARENS_NEST_LIMIT);

        let mut jit_stack = match self.jit_stack {
            Some((min, max)) => Some(track(
                report,
                ResourceKind::JitStack,
                JitStack::new(min, max, &general),
            )?),
            None => None,
        };

        let mut mcontext = track(
            report,
            ResourceKind::MatchContext,
            MatchContext::new(&general),
        )?;

        mcontext.assign_jit_stack(jit_stack.as_deref_mut());

        let mut pattern = track(
            report,
            ResourceKind::CompiledPattern,
            CompiledPattern::compile(&self.pattern, &ccontext),
        )?;

        report.capture_count = Some(pattern.capture_count());

        if self.jit_stack.is_some() {
            if let Err(err) = pattern.jit_compile(JitMode::Complete) {
                warn!("{}, JIT match will be skipped", err);
                report.jit_compile_error = Some(err);
            }
        }

        let mut match_data = track(
            report,
            ResourceKind::MatchData,
            MatchData::from_pattern(&pattern, &general),
        )?;

        if let Some(slots) = self.workspace_slots {
            info!("do dfa match");
            report.scan = Some(scan_restartable(
                &pattern,
                &mut match_data,
                &mcontext,
                &self.subject,
                slots,
            ));
        }

        if pattern.is_jit_compiled() {
            info!("do jit match");
            report.jit = Some(match_jit(
                &pattern,
                &mut match_data,
                &mut mcontext,
                &self.subject,
            ));
        }

        info!("start cleanup");
        Ok(())
    }
}

/// Records the creation of an object in `report`, or logs the failure to
/// create it.
fn track<T, E: Into<Failure>>(
    report: &mut RunReport,
    kind: ResourceKind,
    result: Result<T, E>,
) -> Result<T, Failure> {
    match result {
        Ok(value) => {
            report.created.push(kind);
            Ok(value)
        }
        Err(err) => {
            let failure = err.into();
            error!("{}", failure);
            info!("start cleanup");
            Err(failure)
        }
    }
}
