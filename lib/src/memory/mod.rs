/*! Memory services used by every object the harness creates.

The harness never allocates its objects with `Box`. Instead, everything goes
through an implementation of [`MemoryServices`], which is bound to the
[`crate::GeneralContext`] when it is created. This mirrors the way in which
C regex engines accept custom `malloc`/`free` callbacks, and allows
[`InstrumentedAllocator`] to observe every allocation and release.

Objects are owned by [`Managed`] boxes and auxiliary buffers by [`Block`]s.
Both release their memory when dropped, so early returns during setup free
exactly the objects that were created.
*/

use std::alloc::{GlobalAlloc, Layout, System};
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};

use log::*;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::errors::{ResourceError, ResourceKind};

pub use instrumented::{AllocationEvent, AllocationStats, InstrumentedAllocator};

mod instrumented;


/// Alignment guaranteed for every block returned by
/// [`MemoryServices::allocate`].
pub const MIN_ALIGN: usize = 16;

/// Raw allocation primitives.
///
/// Blocks returned by `allocate` must be aligned to [`MIN_ALIGN`] and remain
/// valid until passed to `release`. A `None` return signals that the memory
/// could not be obtained, callers treat it as a fatal error for the object
/// being created.
pub trait MemoryServices: Send + Sync {
    /// Allocates a block of `size` bytes.
    fn allocate(&self, size: usize) -> Option<NonNull<u8>>;

    /// Releases a block previously returned by `allocate`.
    fn release(&self, ptr: NonNull<u8>);
}

/// [`MemoryServices`] backed by the system allocator.
///
/// The layout of each block is remembered so that `release` only needs the
/// block's address.
#[derive(Default)]
pub struct SystemMemory {
    layouts: Mutex<FxHashMap<usize, Layout>>,
}

impl SystemMemory {
    /// Creates a new [`SystemMemory`].
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryServices for SystemMemory {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        let layout = Layout::from_size_align(size.max(1), MIN_ALIGN).ok()?;
        // SAFETY: the layout has a non-zero size.
        let ptr = NonNull::new(unsafe { System.alloc(layout) })?;
        self.layouts.lock().insert(ptr.as_ptr() as usize, layout);
        Some(ptr)
    }

    fn release(&self, ptr: NonNull<u8>) {
        match self.layouts.lock().remove(&(ptr.as_ptr() as usize)) {
            // SAFETY: the block was allocated by `System` with this layout
            // and it's removed from the map, so it can't be released twice.
            Some(layout) => unsafe { System.dealloc(ptr.as_ptr(), layout) },
            None => warn!("release of unknown block {:p} ignored", ptr),
        }
    }
}

impl Drop for SystemMemory {
    fn drop(&mut self) {
        let layouts = self.layouts.get_mut();
        if !layouts.is_empty() {
            warn!("{} blocks were never released", layouts.len());
        }
    }
}

/// Trait implemented by every object that lives in a [`Managed`] box.
pub trait Resource {
    /// Kind of object, used in diagnostics and errors.
    const KIND: ResourceKind;
}

/// A raw block of memory obtained from [`MemoryServices`] and released
/// when dropped.
pub(crate) struct Block<'m> {
    ptr: NonNull<u8>,
    size: usize,
    memory: &'m dyn MemoryServices,
}

// SAFETY: a block is exclusively owned, and the memory services it refers
// to are `Send + Sync`.
unsafe impl Send for Block<'_> {}
unsafe impl Sync for Block<'_> {}

impl<'m> Block<'m> {
    /// Allocates a block of `size` bytes. Returns `None` if the memory
    /// services can't provide it.
    pub fn allocate(memory: &'m dyn MemoryServices, size: usize) -> Option<Self> {
        let ptr = memory.allocate(size)?;
        if ptr.as_ptr() as usize % MIN_ALIGN != 0 {
            warn!("memory services returned a misaligned block {:p}", ptr);
            memory.release(ptr);
            return None;
        }
        Some(Self { ptr, size, memory })
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Drop for Block<'_> {
    fn drop(&mut self) {
        self.memory.release(self.ptr);
    }
}

/// Owning box for an object whose storage comes from [`MemoryServices`].
///
/// The lifetime `'m` ties the box to the memory services, and therefore to
/// the [`crate::GeneralContext`] that handed them out. The compiler rejects
/// any attempt to drop the general context while a box created from it is
/// still alive.
pub struct Managed<'m, T: Resource> {
    ptr: NonNull<T>,
    memory: &'m dyn MemoryServices,
    _owned: PhantomData<T>,
}

// SAFETY: the box owns its value exclusively, like `Box<T>`.
unsafe impl<T: Resource + Send> Send for Managed<'_, T> {}
unsafe impl<T: Resource + Sync> Sync for Managed<'_, T> {}

impl<'m, T: Resource> Managed<'m, T> {
    /// Moves `value` into memory obtained from `memory`.
    ///
    /// If the memory can't be obtained `value` is dropped, which releases
    /// any block it already owns.
    pub(crate) fn new_in(
        value: T,
        memory: &'m dyn MemoryServices,
    ) -> Result<Self, ResourceError> {
        let layout = Layout::new::<T>();
        debug_assert!(layout.align() <= MIN_ALIGN);

        let block = Block::allocate(memory, layout.size())
            .ok_or(ResourceError::OutOfMemory(T::KIND))?;

        let ptr = block.ptr.cast::<T>();
        // Ownership of the memory moves from the block to the box.
        std::mem::forget(block);

        // SAFETY: the block is large enough and aligned for `T`.
        unsafe { ptr.as_ptr().write(value) };

        debug!("created {} at {:p}", T::KIND, ptr);

        Ok(Self { ptr, memory, _owned: PhantomData })
    }
}

impl<T: Resource> Deref for Managed<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: the value is initialized for the whole life of the box.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: Resource> DerefMut for Managed<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the box has exclusive access to the value.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T: Resource> Drop for Managed<'_, T> {
    fn drop(&mut self) {
        debug!("releasing {} at {:p}", T::KIND, self.ptr);
        // SAFETY: the value is initialized and is never used again.
        unsafe { ptr::drop_in_place(self.ptr.as_ptr()) };
        self.memory.release(self.ptr.cast());
    }
}
