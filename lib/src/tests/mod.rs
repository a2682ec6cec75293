/*! End-to-end tests. */
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::memory::{MemoryServices, SystemMemory};

/// Memory services that fail the n-th allocation (1-based) and forward
/// every other call to the system allocator.
pub(crate) struct FailAt {
    n: usize,
    count: AtomicUsize,
    inner: SystemMemory,
}

impl FailAt {
    pub fn new(n: usize) -> Self {
        Self { n, count: AtomicUsize::new(0), inner: SystemMemory::new() }
    }
}

impl MemoryServices for FailAt {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        if self.count.fetch_add(1, Ordering::Relaxed) + 1 == self.n {
            return None;
        }
        self.inner.allocate(size)
    }

    fn release(&self, ptr: NonNull<u8>) {
        self.inner.release(ptr)
    }
}

mod harness {
    use pretty_assertions::assert_eq;

    use super::FailAt;
    use crate::errors::{
        CompileError, CompileErrorKind, MatchErrorKind, ResourceError,
        ResourceKind,
    };
    use crate::harness::{match_jit, scan_restartable, Failure, Harness};
    use crate::memory::{AllocationEvent, InstrumentedAllocator};
    use crate::{
        CompileContext, CompiledPattern, GeneralContext, JitMode, JitStack,
        MatchContext, MatchData, MatchOutcome,
    };

    const PATTERN: &str = r"\d+(sens|respons)e";
    const SUBJECT: &str = "h123response";

    const ALL_OBJECTS: [ResourceKind; 6] = [
        ResourceKind::GeneralContext,
        ResourceKind::CompileContext,
        ResourceKind::JitStack,
        ResourceKind::MatchContext,
        ResourceKind::CompiledPattern,
        ResourceKind::MatchData,
    ];

    #[test]
    fn scenario_match() {
        let allocator = InstrumentedAllocator::new();
        let report = Harness::new(PATTERN, SUBJECT).run(&allocator);

        assert_eq!(report.failure, None);
        assert_eq!(report.created, ALL_OBJECTS.to_vec());
        assert_eq!(report.capture_count, Some(1));
        assert_eq!(report.jit_compile_error, None);

        assert_eq!(
            report.jit,
            Some(MatchOutcome::Match { start: 1, end: 12, truncated: false })
        );

        let scan = report.scan.unwrap();
        assert!(!scan.terminated_early);
        assert_eq!(scan.steps.len(), SUBJECT.len());
        assert_eq!(scan.steps[0].outcome, MatchOutcome::NoMatch);
        assert_eq!(
            scan.partial_indices().collect::<Vec<_>>(),
            (1..=10).collect::<Vec<_>>()
        );
        assert_eq!(scan.matches().collect::<Vec<_>>(), vec![(1, 12)]);
        assert_eq!(scan.steps[11].to_string(), "Matching from 1 to 12");
        assert_eq!(scan.steps[3].to_string(), "partial matching index: 3");

        let stats = allocator.stats();
        assert_eq!(stats.allocations, 8);
        assert!(stats.is_balanced());
    }

    #[test]
    fn scenario_no_match() {
        let allocator = InstrumentedAllocator::new();
        let report = Harness::new(PATTERN, "hello world").run(&allocator);

        assert_eq!(report.jit, Some(MatchOutcome::NoMatch));

        let scan = report.scan.unwrap();
        assert_eq!(scan.steps.len(), 11);
        assert_eq!(scan.matches().count(), 0);
        assert!(scan.steps.iter().all(|step| matches!(
            step.outcome,
            MatchOutcome::NoMatch | MatchOutcome::Partial { .. }
        )));

        assert!(allocator.stats().is_balanced());
    }

    #[test]
    fn scenario_unbalanced_group() {
        let pattern = r"\d+(sens|respons";
        let allocator = InstrumentedAllocator::new();
        let report = Harness::new(pattern, SUBJECT).run(&allocator);

        match report.failure {
            Some(Failure::Compile(CompileError {
                kind: CompileErrorKind::UnclosedGroup,
                offset,
            })) => assert!(offset < pattern.len()),
            other => panic!("unexpected failure: {:?}", other),
        }

        assert_eq!(report.created, ALL_OBJECTS[..4].to_vec());
        assert_eq!(report.scan, None);
        assert_eq!(report.jit, None);

        // General context, compile context, JIT stack region and object,
        // match context.
        let stats = allocator.stats();
        assert_eq!(stats.allocations, 5);
        assert!(stats.is_balanced());
    }

    #[test]
    fn teardown_in_reverse_order() {
        let allocator = InstrumentedAllocator::new();
        Harness::new(PATTERN, SUBJECT).run(&allocator);

        let events = allocator.events();

        let allocated: Vec<usize> = events
            .iter()
            .filter_map(|event| match event {
                AllocationEvent::Alloc { address, .. } => *address,
                _ => None,
            })
            .collect();

        let released: Vec<usize> = events
            .iter()
            .filter_map(|event| match event {
                AllocationEvent::Free { address } => Some(*address),
                _ => None,
            })
            .collect();

        // Objects are released in reverse order, buffers owned by an
        // object are released right before the object itself.
        let expected: Vec<usize> =
            [7, 8, 6, 5, 3, 4, 2, 1].iter().map(|i| allocated[i - 1]).collect();

        assert_eq!(released, expected);
    }

    #[test]
    fn failure_at_each_creation_point() {
        let expected = [
            (Failure::Resource(ResourceError::OutOfMemory(ResourceKind::GeneralContext)), 0),
            (Failure::Resource(ResourceError::OutOfMemory(ResourceKind::CompileContext)), 1),
            (Failure::Resource(ResourceError::OutOfMemory(ResourceKind::JitStack)), 2),
            (Failure::Resource(ResourceError::OutOfMemory(ResourceKind::JitStack)), 2),
            (Failure::Resource(ResourceError::OutOfMemory(ResourceKind::MatchContext)), 3),
            (
                Failure::Compile(CompileError {
                    kind: CompileErrorKind::NoMemory,
                    offset: 0,
                }),
                4,
            ),
            (Failure::Resource(ResourceError::OutOfMemory(ResourceKind::MatchData)), 5),
            (Failure::Resource(ResourceError::OutOfMemory(ResourceKind::MatchData)), 5),
        ];

        for (i, (failure, created)) in expected.into_iter().enumerate() {
            let n = i + 1;
            let allocator = InstrumentedAllocator::wrap(FailAt::new(n));
            let report = Harness::new(PATTERN, SUBJECT).run(&allocator);

            assert_eq!(report.failure, Some(failure), "failing allocation {}", n);
            assert_eq!(report.created, ALL_OBJECTS[..created].to_vec());
            assert_eq!(report.scan, None);
            assert_eq!(report.jit, None);

            let stats = allocator.stats();
            assert_eq!(stats.allocations, n - 1);
            assert_eq!(stats.failed_allocations, 1);
            assert!(stats.is_balanced(), "failing allocation {}", n);
        }
    }

    #[test]
    fn cross_mode_consistency() {
        let cases: &[(&str, &str)] = &[
            (PATTERN, SUBJECT),
            (r"\d+", "ab12cd"),
            ("abc", "xxabcxx"),
            ("a|ab", "zab"),
            ("colou?r", "the colour red"),
            ("[a-z]+@[a-z]+", "mail: joe@host now"),
            (r"a\B", "ab"),
            (r"\b", " a"),
            (r"a\B", "xab"),
            (r"\bfoo\b", "a foo."),
        ];

        for (pattern, subject) in cases {
            let allocator = InstrumentedAllocator::new();
            let report = Harness::new(*pattern, *subject).run(&allocator);

            let jit = report.jit.and_then(|outcome| outcome.boundaries());
            let jit = jit.unwrap_or_else(|| {
                panic!("`{}` doesn't match `{}`", pattern, subject)
            });

            let scan = report.scan.unwrap();
            assert!(
                scan.matches().any(|m| m == jit),
                "{:?} not reported by the scan of `{}` with `{}`",
                jit,
                subject,
                pattern
            );
            assert!(allocator.stats().is_balanced());
        }
    }

    #[test]
    fn restart_flags() {
        for subject in ["x", "h123response", "hello world"] {
            let allocator = InstrumentedAllocator::new();
            let report = Harness::new(PATTERN, subject).run(&allocator);
            let scan = report.scan.unwrap();

            assert_eq!(scan.steps.len(), subject.len());
            for (i, step) in scan.steps.iter().enumerate() {
                assert_eq!(step.index, i);
                assert_eq!(step.restart, i > 0);
            }
        }
    }

    #[test]
    fn empty_subject() {
        let allocator = InstrumentedAllocator::new();
        let report = Harness::new(PATTERN, "").run(&allocator);

        assert_eq!(report.scan.unwrap().steps.len(), 0);
        assert_eq!(report.jit, Some(MatchOutcome::NoMatch));
    }

    #[test]
    fn workspace_overflow_stops_scan() {
        let allocator = InstrumentedAllocator::new();
        let report = Harness::new(PATTERN, SUBJECT)
            .workspace_slots(Some(1))
            .run(&allocator);

        let scan = report.scan.unwrap();
        assert!(scan.terminated_early);
        assert_eq!(scan.steps.len(), 3);
        assert_eq!(
            scan.steps[2].outcome,
            MatchOutcome::Error(MatchErrorKind::DfaWorkspaceSize)
        );

        // The JIT match still runs.
        assert_eq!(
            report.jit,
            Some(MatchOutcome::Match { start: 1, end: 12, truncated: false })
        );
        assert!(allocator.stats().is_balanced());
    }

    #[test]
    fn modes_can_be_disabled() {
        let allocator = InstrumentedAllocator::new();
        let report = Harness::new(PATTERN, SUBJECT)
            .jit_stack(None)
            .run(&allocator);

        assert_eq!(report.jit, None);
        assert!(report.scan.is_some());
        assert!(!report.created.contains(&ResourceKind::JitStack));
        assert!(allocator.stats().is_balanced());

        let allocator = InstrumentedAllocator::new();
        let report = Harness::new(PATTERN, SUBJECT)
            .workspace_slots(None)
            .run(&allocator);

        assert_eq!(report.scan, None);
        assert!(report.jit.is_some());
    }

    #[test]
    fn jit_idempotence() {
        let allocator = InstrumentedAllocator::new();
        let general = GeneralContext::new(&allocator).unwrap();
        let ccontext = CompileContext::new(&general).unwrap();
        let mut stack = JitStack::new(16 * 1024, 128 * 1024, &general).unwrap();
        let mut mcontext = MatchContext::new(&general).unwrap();
        mcontext.assign_jit_stack(Some(&mut *stack));

        let mut pattern = CompiledPattern::compile(PATTERN, &ccontext).unwrap();
        pattern.jit_compile(JitMode::Complete).unwrap();

        let mut match_data = MatchData::from_pattern(&pattern, &general).unwrap();

        let first = match_jit(&pattern, &mut match_data, &mut mcontext, b"h123response");
        let first_ovector = match_data.ovector().to_vec();
        let second = match_jit(&pattern, &mut match_data, &mut mcontext, b"h123response");

        assert_eq!(first, second);
        assert_eq!(first_ovector, match_data.ovector().to_vec());
    }

    #[test]
    fn jit_match_data_too_small() {
        let allocator = InstrumentedAllocator::new();
        let general = GeneralContext::new(&allocator).unwrap();
        let ccontext = CompileContext::new(&general).unwrap();
        let mut mcontext = MatchContext::new(&general).unwrap();

        let mut pattern = CompiledPattern::compile(PATTERN, &ccontext).unwrap();
        pattern.jit_compile(JitMode::Complete).unwrap();

        let mut match_data = MatchData::new(1, &general).unwrap();

        assert_eq!(
            match_jit(&pattern, &mut match_data, &mut mcontext, b"h123response"),
            MatchOutcome::Match { start: 1, end: 12, truncated: true }
        );
    }

    #[test]
    fn jit_compile_failure_is_not_fatal() {
        let allocator = InstrumentedAllocator::new();
        {
            let general = GeneralContext::new(&allocator).unwrap();
            let mut ccontext = CompileContext::new(&general).unwrap();
            ccontext.set_jit_size_limit(Some(64));

            let mut stack = JitStack::new(16 * 1024, 128 * 1024, &general).unwrap();
            let mut mcontext = MatchContext::new(&general).unwrap();
            mcontext.assign_jit_stack(Some(&mut *stack));

            let mut pattern = CompiledPattern::compile(PATTERN, &ccontext).unwrap();
            assert!(pattern.jit_compile(JitMode::Complete).is_err());

            let mut match_data = MatchData::from_pattern(&pattern, &general).unwrap();

            let scan = scan_restartable(
                &pattern,
                &mut match_data,
                &mcontext,
                SUBJECT.as_bytes(),
                20,
            );
            assert_eq!(scan.matches().collect::<Vec<_>>(), vec![(1, 12)]);

            assert_eq!(
                match_jit(&pattern, &mut match_data, &mut mcontext, SUBJECT.as_bytes()),
                MatchOutcome::Error(MatchErrorKind::JitBadOption)
            );
        }
        assert!(allocator.stats().is_balanced());
    }

    #[test]
    fn concurrent_matchers() {
        let allocator = InstrumentedAllocator::new();
        {
            let general = GeneralContext::new(&allocator).unwrap();
            let ccontext = CompileContext::new(&general).unwrap();
            let mut pattern = CompiledPattern::compile(PATTERN, &ccontext).unwrap();
            pattern.jit_compile(JitMode::Complete).unwrap();

            let general = &general;
            let pattern = &pattern;

            std::thread::scope(|s| {
                for _ in 0..4 {
                    s.spawn(move || {
                        let mut stack =
                            JitStack::new(16 * 1024, 128 * 1024, general).unwrap();
                        let mut mcontext = MatchContext::new(general).unwrap();
                        mcontext.assign_jit_stack(Some(&mut *stack));

                        let mut match_data =
                            MatchData::from_pattern(pattern, general).unwrap();

                        for _ in 0..10 {
                            assert_eq!(
                                match_jit(
                                    pattern,
                                    &mut match_data,
                                    &mut mcontext,
                                    SUBJECT.as_bytes()
                                ),
                                MatchOutcome::Match {
                                    start: 1,
                                    end: 12,
                                    truncated: false
                                }
                            );
                        }

                        let scan = scan_restartable(
                            pattern,
                            &mut match_data,
                            &mcontext,
                            SUBJECT.as_bytes(),
                            20,
                        );
                        assert_eq!(scan.matches().collect::<Vec<_>>(), vec![(1, 12)]);
                    });
                }
            });
        }
        assert!(allocator.stats().is_balanced());
    }
}
