use core::alloc::Layout;
use core::mem::{size_of, ManuallyDrop, MaybeUninit};
use core::ptr::NonNull;
use core::slice;

use const_default::ConstDefault;

use crate::alloc::{Allocator, AllocatorDefault};
use crate::error::StorageError;

#[cfg(feature = "bounds-checks")]
mod debug {
    use core::sync::atomic::{AtomicUsize, Ordering};

    /// Metadata stamped immediately before the element block of every live
    /// allocation. `id` identifies the allocation; `len` mirrors the
    /// container length and bounds element access through cursors.
    #[derive(Clone, Copy, Debug)]
    pub(crate) struct AllocHeader {
        pub id: usize,
        pub len: usize,
    }

    // The high and low bits are forced set so that a live id is never zero
    // and never matches a null or zero-fill byte pattern.
    const ID_TAG: usize = (1 << (usize::BITS - 1)) | 1;

    static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

    /// Ids are globally monotonic and never reused, so a stale cursor is
    /// detected even when a new allocation lands at the same address.
    pub(crate) fn next_allocation_id() -> usize {
        (NEXT_ID.fetch_add(1, Ordering::Relaxed) << 1) | ID_TAG
    }
}

#[cfg(feature = "bounds-checks")]
use self::debug::{next_allocation_id, AllocHeader};

#[cfg(feature = "bounds-checks")]
const fn data_offset<Header, Data>() -> usize {
    let header = size_of::<Header>();
    let data_align = core::mem::align_of::<Data>();
    header.wrapping_add(data_align).wrapping_sub(1) & !data_align.wrapping_sub(1)
}

const fn max_usize(a: usize, b: usize) -> usize {
    if a > b {
        a
    } else {
        b
    }
}

/// An owned heap allocation holding the element pointer, capacity, length,
/// and allocator instance.
///
/// The buffer manages raw memory only; elements in `[0, length)` are the
/// owning container's responsibility and must be dropped before the buffer.
/// With the `bounds-checks` feature, every non-empty allocation is prefixed
/// with an `AllocHeader` and `data` points past it at the first element
/// slot.
#[derive(Debug)]
pub(crate) struct HeapBuffer<T, A: Allocator> {
    data: NonNull<T>,
    capacity: usize,
    length: usize,
    pub(crate) alloc: A,
}

impl<T, A: Allocator> HeapBuffer<T, A> {
    #[cfg(feature = "bounds-checks")]
    const DATA_OFFSET: usize = data_offset::<AllocHeader, T>();
    #[cfg(not(feature = "bounds-checks"))]
    const DATA_OFFSET: usize = 0;

    #[cfg(feature = "bounds-checks")]
    const BLOCK_ALIGN: usize =
        max_usize(core::mem::align_of::<T>(), core::mem::align_of::<AllocHeader>());
    #[cfg(not(feature = "bounds-checks"))]
    const BLOCK_ALIGN: usize = max_usize(core::mem::align_of::<T>(), 1);

    const IS_ZST: bool = size_of::<T>() == 0;

    #[inline]
    pub const fn dangling(alloc: A) -> Self {
        Self {
            data: NonNull::dangling(),
            capacity: if Self::IS_ZST { usize::MAX } else { 0 },
            length: 0,
            alloc,
        }
    }

    #[inline]
    fn has_allocation(&self) -> bool {
        !Self::IS_ZST && self.capacity != 0
    }

    /// The layout of the whole allocated block, header included.
    fn block_layout(capacity: usize) -> Result<Layout, StorageError> {
        let data = Layout::array::<T>(capacity)?;
        if data.size() == 0 {
            return Ok(data);
        }
        let size = data
            .size()
            .checked_add(Self::DATA_OFFSET)
            .ok_or(StorageError::CapacityLimit)?;
        Ok(Layout::from_size_align(size, Self::BLOCK_ALIGN)?)
    }

    /// Pointer to the start of the allocated block.
    #[inline]
    fn block_ptr(&self) -> NonNull<u8> {
        unsafe {
            NonNull::new_unchecked(self.data.as_ptr().cast::<u8>().sub(Self::DATA_OFFSET))
        }
    }

    #[cfg(feature = "bounds-checks")]
    #[inline]
    fn header_ptr(&self) -> *mut AllocHeader {
        unsafe {
            self.data
                .as_ptr()
                .cast::<u8>()
                .sub(size_of::<AllocHeader>())
                .cast::<AllocHeader>()
        }
    }

    /// Install a freshly allocated block and stamp its header.
    unsafe fn install_block(&mut self, block: NonNull<[u8]>, requested: usize, exact: bool) {
        let data = block.cast::<u8>().as_ptr().add(Self::DATA_OFFSET).cast::<T>();
        self.data = NonNull::new_unchecked(data);
        self.capacity = if exact {
            requested
        } else {
            (block.len() - Self::DATA_OFFSET) / size_of::<T>()
        };
        #[cfg(feature = "bounds-checks")]
        self.header_ptr().write(AllocHeader {
            id: next_allocation_id(),
            len: self.length,
        });
    }

    /// Zero the identity stamp of the current block, so that cursors holding
    /// the old id can no longer validate. The write is volatile so it is not
    /// elided ahead of the block's release.
    #[inline]
    fn retire_header(&mut self) {
        #[cfg(feature = "bounds-checks")]
        unsafe {
            core::ptr::addr_of_mut!((*self.header_ptr()).id).write_volatile(0);
        }
    }

    pub fn allocate_in(capacity: usize, alloc: A, exact: bool) -> Result<Self, StorageError> {
        let layout = Self::block_layout(capacity)?;
        let mut buf = Self::dangling(alloc);
        if layout.size() > 0 {
            let block = buf.alloc.allocate(layout)?;
            unsafe { buf.install_block(block, capacity, exact) };
        }
        Ok(buf)
    }

    /// Resize to at least `new_capacity` elements through the allocator's
    /// `grow`, which may extend the block in place or relocate the contents
    /// (header included) as raw bytes.
    pub fn grow_buffer(&mut self, new_capacity: usize, exact: bool) -> Result<(), StorageError> {
        debug_assert!(new_capacity >= self.capacity);
        if Self::IS_ZST || new_capacity <= self.capacity {
            return Ok(());
        }
        let new_layout = Self::block_layout(new_capacity)?;
        if !self.has_allocation() {
            let block = self.alloc.allocate(new_layout)?;
            unsafe { self.install_block(block, new_capacity, exact) };
            return Ok(());
        }
        let old_layout = Self::block_layout(self.capacity)?;
        #[cfg(feature = "bounds-checks")]
        let old_id = unsafe { (*self.header_ptr()).id };
        self.retire_header();
        match unsafe { self.alloc.grow(self.block_ptr(), old_layout, new_layout) } {
            Ok(block) => {
                unsafe { self.install_block(block, new_capacity, exact) };
                Ok(())
            }
            Err(err) => {
                // The old block is untouched on failure; restore its stamp
                // so existing cursors stay valid.
                #[cfg(feature = "bounds-checks")]
                unsafe {
                    (*self.header_ptr()).id = old_id;
                }
                Err(err.into())
            }
        }
    }

    /// Resize to exactly `new_capacity` elements, releasing the allocation
    /// entirely when it reaches zero.
    pub fn shrink_buffer(&mut self, new_capacity: usize) -> Result<(), StorageError> {
        debug_assert!(new_capacity >= self.length);
        if Self::IS_ZST || new_capacity >= self.capacity {
            return Ok(());
        }
        if !self.has_allocation() {
            return Ok(());
        }
        let old_layout = Self::block_layout(self.capacity)?;
        if new_capacity == 0 {
            self.retire_header();
            unsafe { self.alloc.deallocate(self.block_ptr(), old_layout) };
            self.data = NonNull::dangling();
            self.capacity = 0;
            return Ok(());
        }
        let new_layout = Self::block_layout(new_capacity)?;
        #[cfg(feature = "bounds-checks")]
        let old_id = unsafe { (*self.header_ptr()).id };
        self.retire_header();
        match unsafe { self.alloc.shrink(self.block_ptr(), old_layout, new_layout) } {
            Ok(block) => {
                unsafe { self.install_block(block, new_capacity, true) };
                Ok(())
            }
            Err(err) => {
                #[cfg(feature = "bounds-checks")]
                unsafe {
                    (*self.header_ptr()).id = old_id;
                }
                Err(err.into())
            }
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Update the length of the initialized prefix.
    ///
    /// # Safety
    /// `len` must not exceed the capacity, and elements `[0, len)` must be
    /// initialized when the new length is observed.
    #[inline]
    pub unsafe fn set_length(&mut self, len: usize) {
        self.length = len;
        #[cfg(feature = "bounds-checks")]
        if self.has_allocation() {
            (*self.header_ptr()).len = len;
        }
    }

    #[inline]
    pub fn data_ptr(&self) -> *const T {
        self.data.as_ptr()
    }

    #[inline]
    pub fn data_ptr_mut(&mut self) -> *mut T {
        self.data.as_ptr()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.data_ptr(), self.length) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { slice::from_raw_parts_mut(self.data.as_ptr(), self.length) }
    }

    /// The full capacity of the buffer as uninitialized slots.
    #[inline]
    pub fn as_uninit_slice(&mut self) -> &mut [MaybeUninit<T>] {
        unsafe { slice::from_raw_parts_mut(self.data.as_ptr().cast(), self.capacity) }
    }

    /// The identity stamp of the current allocation; zero when there is
    /// none.
    #[cfg(feature = "bounds-checks")]
    #[inline]
    pub fn allocation_id(&self) -> usize {
        if self.has_allocation() {
            unsafe { (*self.header_ptr()).id }
        } else {
            0
        }
    }

    #[inline]
    pub fn from_parts(data: NonNull<T>, length: usize, capacity: usize, alloc: A) -> Self {
        Self {
            data,
            capacity,
            length,
            alloc,
        }
    }

    #[inline]
    pub fn into_parts(self) -> (NonNull<T>, usize, usize, A) {
        let slf = ManuallyDrop::new(self);
        (slf.data, slf.length, slf.capacity, unsafe {
            core::ptr::read(&slf.alloc)
        })
    }
}

impl<T, A: AllocatorDefault> ConstDefault for HeapBuffer<T, A> {
    const DEFAULT: Self = Self::dangling(A::DEFAULT);
}

impl<T, A: Allocator> Drop for HeapBuffer<T, A> {
    fn drop(&mut self) {
        if self.has_allocation() {
            let layout = Self::block_layout(self.capacity).expect("Layout error");
            self.retire_header();
            unsafe { self.alloc.deallocate(self.block_ptr(), layout) };
        }
    }
}

#[cfg(feature = "zeroize")]
impl<T, A: crate::alloc::AllocatorZeroizes> zeroize::ZeroizeOnDrop for HeapBuffer<T, A> {}
