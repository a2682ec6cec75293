use std::fmt::{Display, Formatter};
use std::ptr::NonNull;

use log::*;
use parking_lot::Mutex;

use super::{MemoryServices, SystemMemory};

/// A call made to an [`InstrumentedAllocator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationEvent {
    /// A block of `size` bytes was requested. `address` is `None` when the
    /// underlying allocator failed.
    Alloc {
        /// Requested size.
        size: usize,
        /// Address of the block, if any.
        address: Option<usize>,
    },
    /// The block at `address` is about to be released.
    Free {
        /// Address of the block.
        address: usize,
    },
}

impl Display for AllocationEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AllocationEvent::Alloc { size, address: Some(address) } => {
                write!(f, "malloc {}, ret: {:#x}", size, address)
            }
            AllocationEvent::Alloc { size, address: None } => {
                write!(f, "malloc {}, ret: (nil)", size)
            }
            AllocationEvent::Free { address } => {
                write!(f, "free {:#x}", address)
            }
        }
    }
}

/// Summary of the events recorded by an [`InstrumentedAllocator`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AllocationStats {
    /// Successful allocations.
    pub allocations: usize,
    /// Allocations that returned a null block.
    pub failed_allocations: usize,
    /// Releases.
    pub releases: usize,
    /// Addresses allocated but not released yet, in allocation order.
    pub outstanding: Vec<usize>,
}

impl AllocationStats {
    /// True if every successful allocation has a matching release.
    pub fn is_balanced(&self) -> bool {
        self.outstanding.is_empty() && self.allocations == self.releases
    }
}

/// Wraps some [`MemoryServices`] and records every call made to them.
///
/// Each call produces an [`AllocationEvent`], which is appended to the event
/// log and written to the `log` facade at debug level before `allocate`
/// returns, or before the block is actually released.
pub struct InstrumentedAllocator<M: MemoryServices = SystemMemory> {
    inner: M,
    events: Mutex<Vec<AllocationEvent>>,
}

impl InstrumentedAllocator<SystemMemory> {
    /// Creates an allocator that forwards to the system allocator.
    pub fn new() -> Self {
        Self::wrap(SystemMemory::new())
    }
}

impl Default for InstrumentedAllocator<SystemMemory> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: MemoryServices> InstrumentedAllocator<M> {
    /// Creates an allocator that forwards to `inner`.
    pub fn wrap(inner: M) -> Self {
        Self { inner, events: Mutex::new(Vec::new()) }
    }

    /// Returns a copy of the events recorded so far, in the order in which
    /// they happened.
    pub fn events(&self) -> Vec<AllocationEvent> {
        self.events.lock().clone()
    }

    /// Computes statistics over the recorded events.
    pub fn stats(&self) -> AllocationStats {
        let events = self.events.lock();
        let mut stats = AllocationStats::default();

        for event in events.iter() {
            match event {
                AllocationEvent::Alloc { address: Some(address), .. } => {
                    stats.allocations += 1;
                    stats.outstanding.push(*address);
                }
                AllocationEvent::Alloc { address: None, .. } => {
                    stats.failed_allocations += 1;
                }
                AllocationEvent::Free { address } => {
                    stats.releases += 1;
                    if let Some(pos) =
                        stats.outstanding.iter().position(|a| a == address)
                    {
                        stats.outstanding.remove(pos);
                    }
                }
            }
        }

        stats
    }

    fn record(&self, event: AllocationEvent) {
        debug!("{}", event);
        self.events.lock().push(event);
    }
}

impl<M: MemoryServices> MemoryServices for InstrumentedAllocator<M> {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        let ptr = self.inner.allocate(size);
        self.record(AllocationEvent::Alloc {
            size,
            address: ptr.map(|ptr| ptr.as_ptr() as usize),
        });
        ptr
    }

    fn release(&self, ptr: NonNull<u8>) {
        self.record(AllocationEvent::Free { address: ptr.as_ptr() as usize });
        self.inner.release(ptr);
    }
}
