use std::cmp::Reverse;

use log::*;
use regex_automata::dfa::{dense, Automaton};
use regex_automata::util::primitives::StateID;
use regex_automata::util::start;
use regex_automata::Anchored;

use super::workspace::Overflow;
use super::{DfaOptions, MatchStatus, Workspace};
use crate::context::MatchContext;
use crate::errors::MatchErrorKind;
use crate::match_data::MatchData;
use crate::pattern::CompiledPattern;

type Dfa = dense::DFA<Vec<u32>>;

impl From<Overflow> for MatchErrorKind {
    fn from(_: Overflow) -> Self {
        MatchErrorKind::DfaWorkspaceSize
    }
}

impl CompiledPattern {
    /// Scans `chunk` as the next piece of a longer input.
    ///
    /// Without [`DfaOptions::restart`] a new session starts in `workspace`
    /// and `chunk` is the beginning of the input. With it, `chunk` continues
    /// the session started by a previous call that used the same workspace.
    ///
    /// The end of each chunk is treated as the end of the input for the
    /// purpose of completing matches, but the session remembers every
    /// candidate that could continue in the next chunk. A match that ended
    /// at the end of the previous chunk, but whose trailing assertions could
    /// only be checked against the first byte of this one, is completed by
    /// this call. When several matches complete in a chunk, the one that
    /// starts first is reported, and among those the longest one, except
    /// that a match completed late at the start of the chunk goes before
    /// the ones that end later. A match is never reported twice in a row.
    ///
    /// Match boundaries are offsets from the start of the session, and are
    /// written to pair 0 of `match_data`. For partial matches pair 0 holds
    /// the start of the earliest candidate and the end of the chunk.
    ///
    /// After an error the session is over, and restarting it fails with
    /// [`MatchErrorKind::DfaBadRestart`].
    pub fn dfa_match(
        &self,
        chunk: &[u8],
        options: DfaOptions,
        match_data: &mut MatchData<'_>,
        mcontext: &MatchContext<'_, '_>,
        workspace: &mut Workspace,
    ) -> MatchStatus {
        match self.dfa_scan(chunk, options, mcontext, workspace) {
            Ok(Scan::Match(start, end)) => {
                match_data.clear();
                match_data.set_pair(0, start, end);
                workspace.last_reported = Some((start, end));
                MatchStatus::Success(1)
            }
            Ok(Scan::Partial(start)) => {
                match_data.clear();
                match_data.set_pair(0, start, workspace.offset);
                MatchStatus::Partial
            }
            Ok(Scan::NoMatch) => MatchStatus::NoMatch,
            Err(kind) => {
                workspace.invalidate();
                MatchStatus::Error(kind)
            }
        }
    }

    fn dfa_scan(
        &self,
        chunk: &[u8],
        options: DfaOptions,
        mcontext: &MatchContext<'_, '_>,
        ws: &mut Workspace,
    ) -> Result<Scan, MatchErrorKind> {
        if ws.slots() == 0 {
            return Err(MatchErrorKind::DfaWorkspaceSize);
        }

        if options.restart {
            if !ws.is_initialized() {
                return Err(MatchErrorKind::DfaBadRestart);
            }
        } else {
            ws.reset();
        }

        let dfa = self.dfa();
        let limit = mcontext.match_limit();
        let chunk_start = ws.offset;

        let mut best: Option<Candidate> = None;
        let mut consider = |candidate: Candidate, last: Option<(usize, usize)>| {
            if Some((candidate.start, candidate.end)) == last {
                return;
            }
            if best.map_or(true, |b| candidate.rank() < b.rank()) {
                best = Some(candidate);
            }
        };

        for &byte in chunk {
            let start = start_state(dfa, ws.last_byte)?;
            ws.current.insert(start, ws.offset)?;

            let at_boundary = ws.offset == chunk_start;

            for &(state, match_start) in ws.current.iter() {
                ws.transitions += 1;
                if ws.transitions > limit {
                    return Err(MatchErrorKind::MatchLimit);
                }

                let next = dfa.next_state(state, byte);

                // Matches are delayed by one byte, this match ended right
                // before `byte`. At the start of the chunk, matches that the
                // previous call completed at its end were already considered.
                if dfa.is_match_state(next)
                    && !(at_boundary
                        && ws.boundary_matches.contains(&match_start))
                {
                    consider(
                        Candidate {
                            start: match_start,
                            end: ws.offset,
                            late: at_boundary,
                        },
                        ws.last_reported,
                    );
                }

                if dfa.is_dead_state(next) || dfa.is_quit_state(next) {
                    continue;
                }

                ws.next.insert(next, match_start)?;
            }

            ws.swap();
            ws.offset += 1;
            ws.last_byte = Some(byte);
        }

        ws.boundary_matches.clear();

        // Matches that complete at the end of the chunk.
        for &(state, match_start) in ws.current.iter() {
            if dfa.is_match_state(dfa.next_eoi_state(state)) {
                ws.boundary_matches.push(match_start);
                consider(
                    Candidate { start: match_start, end: ws.offset, late: false },
                    ws.last_reported,
                );
            }
        }

        // The empty match at the end of the chunk. The next call starts a
        // candidate here.
        let start = start_state(dfa, ws.last_byte)?;
        if dfa.is_match_state(dfa.next_eoi_state(start)) {
            ws.boundary_matches.push(ws.offset);
            consider(
                Candidate { start: ws.offset, end: ws.offset, late: false },
                ws.last_reported,
            );
        }

        let partial_start = ws
            .current
            .iter()
            .filter(|(state, _)| can_extend(dfa, *state))
            .map(|(_, start)| *start)
            .min();

        trace!(
            "scanned {} bytes, {} candidates, best match: {:?}",
            ws.offset,
            ws.current.len(),
            best
        );

        let scan = match (best, partial_start) {
            (_, Some(start)) if options.partial_hard => Scan::Partial(start),
            (Some(m), _) => Scan::Match(m.start, m.end),
            (None, Some(start)) if options.partial_soft => Scan::Partial(start),
            _ => Scan::NoMatch,
        };

        Ok(scan)
    }
}

/// A match found while scanning a chunk.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    start: usize,
    end: usize,
    /// The match ended where the previous chunk ended.
    late: bool,
}

impl Candidate {
    /// Lower is better.
    fn rank(&self) -> (usize, bool, Reverse<usize>) {
        (self.start, !self.late, Reverse(self.end))
    }
}

/// Outcome of scanning a chunk.
enum Scan {
    Match(usize, usize),
    Partial(usize),
    NoMatch,
}

fn start_state(
    dfa: &Dfa,
    look_behind: Option<u8>,
) -> Result<StateID, MatchErrorKind> {
    let config = start::Config::new()
        .anchored(Anchored::Yes)
        .look_behind(look_behind);

    dfa.start_state(&config).map_err(|err| {
        warn!("failed to compute DFA start state: {}", err);
        MatchErrorKind::Internal
    })
}

/// True if `state` can consume more input and remain a candidate, or if
/// some byte would complete a match that the end of input doesn't.
fn can_extend(dfa: &Dfa, state: StateID) -> bool {
    let matches_at_eoi = dfa.is_match_state(dfa.next_eoi_state(state));
    (0..=u8::MAX).any(|byte| {
        let next = dfa.next_state(state, byte);
        is_live(dfa, next) || (dfa.is_match_state(next) && !matches_at_eoi)
    })
}

/// True if some match could still go through `state`.
///
/// Match states with no way forward only report a match that ended one byte
/// earlier.
fn is_live(dfa: &Dfa, state: StateID) -> bool {
    if dfa.is_dead_state(state) || dfa.is_quit_state(state) {
        return false;
    }
    if !dfa.is_match_state(state) {
        return true;
    }
    (0..=u8::MAX).any(|byte| {
        let next = dfa.next_state(state, byte);
        !dfa.is_dead_state(next) && !dfa.is_quit_state(next)
    })
}
