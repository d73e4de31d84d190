//! Support for memory allocation.

use core::alloc::Layout;
use core::fmt;
use core::ptr::{self, NonNull};

#[cfg(feature = "zeroize")]
use core::slice;

#[cfg(feature = "alloc")]
use alloc_crate::alloc::{
    alloc as raw_alloc, dealloc as raw_dealloc, realloc as raw_realloc,
};

#[cfg(feature = "zeroize")]
use zeroize::Zeroize;

#[cfg(all(not(test), feature = "alloc"))]
pub use alloc_crate::alloc::handle_alloc_error;

#[cfg(any(test, not(feature = "alloc")))]
/// Custom allocation error handler.
pub fn handle_alloc_error(layout: Layout) -> ! {
    panic!("memory allocation of {} bytes failed", layout.size());
}

/// The error returned when an allocation fails, whether from resource
/// exhaustion or an unsupported request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AllocError;

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("memory allocation failed")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AllocError {}

#[cfg(feature = "alloc")]
#[inline]
pub(crate) fn layout_dangling(layout: Layout) -> NonNull<u8> {
    // SAFETY: layout alignments are guaranteed to be non-zero.
    unsafe { NonNull::new_unchecked(ptr::null_mut::<u8>().wrapping_add(layout.align())) }
}

/// An implementation of `Allocator` can allocate, grow, shrink, and
/// deallocate blocks of raw memory described via `Layout`.
///
/// Zero-sized allocations are permitted and return a dangling, aligned
/// pointer without consulting the underlying allocator.
///
/// `grow` is the *reallocate* entry point of the crate: it transfers the
/// contents of the old block to the new one as raw bytes, and is free to
/// extend the existing block in place. Containers route all growth through
/// it, so values are bulk-relocated rather than moved one at a time.
///
/// # Safety
///
/// - Blocks returned from an allocator must remain valid until deallocated,
///   grown, or shrunk through the same allocator (or one of its clones).
/// - Cloning or moving the allocator must not invalidate its live blocks; a
///   clone must behave as the same allocator.
/// - `grow` and `shrink` either return a block holding the old contents and
///   release the old block, or fail leaving the old block intact.
pub unsafe trait Allocator {
    /// Try to allocate a block of memory for `layout`.
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError>;

    /// Release a block produced by this allocator.
    ///
    /// # Safety
    /// `ptr` must denote a live block produced by this allocator and
    /// `layout` must be the layout it was last allocated or resized with.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Try to allocate a block of zeroed memory for `layout`.
    #[inline]
    fn allocate_zeroed(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        let ptr = self.allocate(layout)?;
        // SAFETY: the result of `allocate` covers `layout.size()` bytes
        unsafe { ptr::write_bytes(ptr.cast::<u8>().as_ptr(), 0, layout.size()) };
        Ok(ptr)
    }

    /// Try to extend a block to a new, larger layout, relocating its
    /// contents as raw bytes.
    ///
    /// The default implementation allocates a fresh block, copies the old
    /// contents over, and releases the old block. Implementations backed by
    /// `realloc` may instead extend the block in place; see
    /// [`ReallocAllocator`].
    ///
    /// # Safety
    /// `ptr`/`old_layout` must denote a live block per [`Self::deallocate`],
    /// and `new_layout.size()` must not be smaller than `old_layout.size()`.
    unsafe fn grow(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<[u8]>, AllocError> {
        debug_assert!(
            new_layout.size() >= old_layout.size(),
            "`new_layout.size()` must be greater than or equal to `old_layout.size()`"
        );
        let new_ptr = self.allocate(new_layout)?;
        if old_layout.size() > 0 {
            ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.as_ptr().cast(), old_layout.size());
        }
        self.deallocate(ptr, old_layout);
        Ok(new_ptr)
    }

    /// Try to reduce a block to a new, smaller layout, relocating its
    /// contents as raw bytes.
    ///
    /// # Safety
    /// `ptr`/`old_layout` must denote a live block per [`Self::deallocate`],
    /// and `new_layout.size()` must not be greater than `old_layout.size()`.
    unsafe fn shrink(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<[u8]>, AllocError> {
        debug_assert!(
            new_layout.size() <= old_layout.size(),
            "`new_layout.size()` must be smaller than or equal to `old_layout.size()`"
        );
        let new_ptr = self.allocate(new_layout)?;
        if new_layout.size() > 0 {
            ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.as_ptr().cast(), new_layout.size());
        }
        self.deallocate(ptr, old_layout);
        Ok(new_ptr)
    }

    /// Obtain a reference to this allocator type.
    #[inline(always)]
    fn by_ref(&self) -> &Self
    where
        Self: Sized,
    {
        self
    }
}

unsafe impl<A: Allocator + ?Sized> Allocator for &A {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        (**self).allocate(layout)
    }

    #[inline]
    fn allocate_zeroed(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        (**self).allocate_zeroed(layout)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        (**self).deallocate(ptr, layout)
    }

    #[inline]
    unsafe fn grow(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<[u8]>, AllocError> {
        (**self).grow(ptr, old_layout, new_layout)
    }

    #[inline]
    unsafe fn shrink(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<[u8]>, AllocError> {
        (**self).shrink(ptr, old_layout, new_layout)
    }
}

/// Marker for allocators whose [`grow`][Allocator::grow] and
/// [`shrink`][Allocator::shrink] are backed by `realloc` and may resize the
/// block in place instead of always copying to a fresh allocation.
pub trait ReallocAllocator: Allocator {}

/// A trait implemented by allocators supporting a constant initializer,
/// enabling const-constructible empty containers.
pub trait AllocatorDefault: Allocator + Clone + Default {
    /// The constant initializer for this allocator.
    const DEFAULT: Self;
}

/// A marker trait for allocators which zeroize on deallocation.
#[cfg(feature = "zeroize")]
pub trait AllocatorZeroizes: Allocator {}

/// The global memory allocator.
///
/// Forwards to the allocator registered with the `#[global_allocator]`
/// attribute, or the `std` default. Growth and shrinking go through
/// `realloc`, so resizing a block may succeed in place.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Global;

#[cfg(feature = "alloc")]
unsafe impl Allocator for Global {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        let ptr = if layout.size() == 0 {
            layout_dangling(layout)
        } else {
            let Some(ptr) = NonNull::new(unsafe { raw_alloc(layout) }) else {
                return Err(AllocError);
            };
            ptr
        };
        Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() > 0 {
            raw_dealloc(ptr.as_ptr(), layout);
        }
    }

    #[inline]
    unsafe fn grow(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<[u8]>, AllocError> {
        debug_assert!(
            new_layout.size() >= old_layout.size(),
            "`new_layout.size()` must be greater than or equal to `old_layout.size()`"
        );
        if old_layout.size() == 0 {
            return self.allocate(new_layout);
        }
        if new_layout.align() == old_layout.align() {
            let Some(raw) = NonNull::new(raw_realloc(ptr.as_ptr(), old_layout, new_layout.size()))
            else {
                return Err(AllocError);
            };
            Ok(NonNull::slice_from_raw_parts(raw, new_layout.size()))
        } else {
            let new_ptr = self.allocate(new_layout)?;
            ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.as_ptr().cast(), old_layout.size());
            self.deallocate(ptr, old_layout);
            Ok(new_ptr)
        }
    }

    #[inline]
    unsafe fn shrink(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<[u8]>, AllocError> {
        debug_assert!(
            new_layout.size() <= old_layout.size(),
            "`new_layout.size()` must be smaller than or equal to `old_layout.size()`"
        );
        if new_layout.size() == 0 {
            self.deallocate(ptr, old_layout);
            return Ok(NonNull::slice_from_raw_parts(layout_dangling(new_layout), 0));
        }
        if old_layout.size() == 0 {
            return self.allocate(new_layout);
        }
        if new_layout.align() == old_layout.align() {
            let Some(raw) = NonNull::new(raw_realloc(ptr.as_ptr(), old_layout, new_layout.size()))
            else {
                return Err(AllocError);
            };
            Ok(NonNull::slice_from_raw_parts(raw, new_layout.size()))
        } else {
            let new_ptr = self.allocate(new_layout)?;
            ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.as_ptr().cast(), new_layout.size());
            self.deallocate(ptr, old_layout);
            Ok(new_ptr)
        }
    }
}

#[cfg(not(feature = "alloc"))]
// Stub implementation to allow Global as the default allocator type even
// when the `alloc` feature is not enabled. Any usage as an allocator will
// result in a panic.
unsafe impl Allocator for Global {
    fn allocate(&self, _layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        unimplemented!();
    }

    unsafe fn deallocate(&self, _ptr: NonNull<u8>, _layout: Layout) {
        unimplemented!();
    }
}

#[cfg(feature = "alloc")]
impl ReallocAllocator for Global {}

impl AllocatorDefault for Global {
    const DEFAULT: Self = Global;
}

#[cfg(feature = "allocator-api2")]
/// Adapter admitting any `allocator_api2::alloc::Allocator` as an allocator
/// for the containers of this crate.
///
/// ```
/// # #[cfg(all(feature = "alloc", feature = "allocator-api2"))] {
/// use reloc_vec::{alloc::ExternAlloc, DynArray};
///
/// let alloc = ExternAlloc(allocator_api2::alloc::Global);
/// let mut v = DynArray::new_in(alloc);
/// v.push(1);
/// # }
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct ExternAlloc<A>(pub A);

#[cfg(feature = "allocator-api2")]
unsafe impl<A: allocator_api2::alloc::Allocator> Allocator for ExternAlloc<A> {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        self.0.allocate(layout).map_err(|_| AllocError)
    }

    #[inline]
    fn allocate_zeroed(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        self.0.allocate_zeroed(layout).map_err(|_| AllocError)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.0.deallocate(ptr, layout)
    }

    #[inline]
    unsafe fn grow(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<[u8]>, AllocError> {
        self.0
            .grow(ptr, old_layout, new_layout)
            .map_err(|_| AllocError)
    }

    #[inline]
    unsafe fn shrink(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<[u8]>, AllocError> {
        self.0
            .shrink(ptr, old_layout, new_layout)
            .map_err(|_| AllocError)
    }
}

#[cfg(feature = "zeroize")]
/// An allocator which allocates via `A` and zeroizes all buffers when they
/// are released, including intermediate buffers released during growth.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZeroizingAlloc<A>(pub A);

#[cfg(feature = "zeroize")]
unsafe impl<A: Allocator> Allocator for ZeroizingAlloc<A> {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        self.0.allocate(layout)
    }

    // The inherited `grow`/`shrink` always allocate a new block and release
    // the old one, allowing it to be zeroized below.

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() > 0 {
            let mem = slice::from_raw_parts_mut(ptr.as_ptr(), layout.size());
            mem.zeroize();
        }
        self.0.deallocate(ptr, layout)
    }
}

#[cfg(feature = "zeroize")]
impl<A: AllocatorDefault> AllocatorDefault for ZeroizingAlloc<A> {
    const DEFAULT: Self = ZeroizingAlloc(A::DEFAULT);
}

#[cfg(feature = "zeroize")]
impl<A: Allocator> AllocatorZeroizes for ZeroizingAlloc<A> {}
