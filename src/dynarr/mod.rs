//! A resizable, heap-backed array which moves its contents by bulk byte
//! relocation.
//!
//! [`DynArray`] is similar to `std::vec::Vec`, with a few twists:
//!
//! - All growth is routed through [`Allocator::grow`], so a
//!   `realloc`-capable allocator (the default [`Global`]) may extend the
//!   buffer in place instead of copying it.
//! - Fallible `try_` variants are provided for every operation that can
//!   allocate, reporting [`StorageError`] instead of panicking.
//! - With the `bounds-checks` feature, allocations carry an identity stamp
//!   and cursors (`DynArray::cursor`) detect use after reallocation.
//!
//! # Usage
//!
//! ```
//! # #[cfg(feature = "alloc")] {
//! use reloc_vec::DynArray;
//!
//! let mut v: DynArray<u32> = DynArray::new();
//! v.push(1);
//! v.extend([2, 3]);
//! v.insert(1, 9);
//! assert_eq!(v, [1, 9, 2, 3]);
//! # }
//! ```
//!
//! Custom allocators implement [`Allocator`] and are attached with the
//! `_in` constructors:
//!
//! ```
//! # #[cfg(feature = "alloc")] {
//! use reloc_vec::{alloc::Global, DynArray};
//!
//! let mut v = DynArray::with_capacity_in(10, Global);
//! v.push(7u8);
//! # }
//! ```

use core::borrow::{Borrow, BorrowMut};
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::mem::{self, ManuallyDrop, MaybeUninit};
use core::ops::{Bound, Deref, DerefMut, Range, RangeBounds};
use core::ptr::{self, NonNull};
use core::slice;

use const_default::ConstDefault;

use crate::alloc::{Allocator, AllocatorDefault, Global};
use crate::capacity::{max_capacity, Grow, GrowDoubling};
use crate::error::{StorageError, UpdateError};
use crate::relocate::TrivialReloc;
use crate::storage::HeapBuffer;
use crate::uninit::{destroy, relocate, Inserter};

#[cfg(feature = "bounds-checks")]
pub use self::cursor::Cursor;
pub use self::{drain::Drain, into_iter::IntoIter};

#[cfg(feature = "bounds-checks")]
mod cursor;
mod drain;
mod into_iter;

#[cold]
#[inline(never)]
pub(crate) fn index_panic() -> ! {
    panic!("Invalid element index");
}

#[inline]
fn bounds_to_range(range: impl RangeBounds<usize>, length: usize) -> Range<usize> {
    let start = match range.start_bound() {
        Bound::Unbounded => 0,
        Bound::Included(i) => *i,
        Bound::Excluded(i) => *i + 1,
    };
    let end = match range.end_bound() {
        Bound::Unbounded => length,
        Bound::Included(i) => *i + 1,
        Bound::Excluded(i) => *i,
    };
    Range { start, end }
}

/// Create a `DynArray<T>` by cloning `elem` `count` times.
#[cfg(feature = "alloc")]
#[inline]
pub fn from_elem<T: Clone>(elem: T, count: usize) -> DynArray<T> {
    from_elem_in(elem, count, Global)
}

/// Create a `DynArray<T, A>` by cloning `elem` `count` times into the
/// allocator `alloc`.
pub fn from_elem_in<T: Clone, A: Allocator>(elem: T, count: usize, alloc: A) -> DynArray<T, A> {
    let mut arr = DynArray::with_capacity_in(count, alloc);
    let mut insert = Inserter::new(arr.spare_capacity_mut());
    insert.push_repeat(&elem, count);
    insert.complete();
    // SAFETY: `count` elements were constructed into the reserved capacity
    unsafe { arr.buffer.set_length(count) };
    arr
}

/// Create a `DynArray<T>` by moving the elements of an array `[T; N]`.
#[cfg(feature = "alloc")]
#[inline]
pub fn from_array<T, const N: usize>(data: [T; N]) -> DynArray<T> {
    from_array_in(data, Global)
}

/// Create a `DynArray<T, A>` by moving the elements of an array `[T; N]`
/// into the allocator `alloc`. The transfer is a single bulk relocation.
pub fn from_array_in<T, A: Allocator, const N: usize>(data: [T; N], alloc: A) -> DynArray<T, A> {
    let mut arr = DynArray::with_capacity_in(N, alloc);
    unsafe {
        relocate(data.as_ptr(), N, arr.buffer.data_ptr_mut());
        arr.buffer.set_length(N);
    }
    mem::forget(data);
    arr
}

/// A resizable array with contiguous, heap-allocated storage.
///
/// See the [module documentation][self] for an overview.
pub struct DynArray<T, A: Allocator = Global> {
    buffer: HeapBuffer<T, A>,
}

impl<T, A: AllocatorDefault> DynArray<T, A> {
    /// Construct a new, empty `DynArray<T, A>`.
    ///
    /// No memory is allocated until elements are added.
    pub const fn new() -> Self {
        Self {
            buffer: HeapBuffer::DEFAULT,
        }
    }

    /// Construct a new `DynArray<T, A>` with space reserved for exactly
    /// `capacity` elements in a single allocation.
    ///
    /// This method will panic on any storage errors.
    pub fn with_capacity(capacity: usize) -> Self {
        match Self::try_with_capacity(capacity) {
            Ok(res) => res,
            Err(error) => error.panic(),
        }
    }

    /// Try to construct a new `DynArray<T, A>` with space reserved for
    /// exactly `capacity` elements.
    pub fn try_with_capacity(capacity: usize) -> Result<Self, StorageError> {
        Self::try_with_capacity_in(capacity, A::default())
    }

    /// Construct a new `DynArray<T, A>` and extend it by cloning the slice
    /// `data`.
    ///
    /// This method will panic on any storage errors.
    pub fn from_slice(data: &[T]) -> Self
    where
        T: Clone,
    {
        Self::from_slice_in(data, A::default())
    }

    /// Try to construct a new `DynArray<T, A>` and extend it by cloning the
    /// slice `data`.
    pub fn try_from_slice(data: &[T]) -> Result<Self, StorageError>
    where
        T: Clone,
    {
        Self::try_from_slice_in(data, A::default())
    }
}

impl<T, A: Allocator> DynArray<T, A> {
    /// Construct a new, empty `DynArray<T, A>` using the allocator `alloc`.
    pub fn new_in(alloc: A) -> Self {
        Self {
            buffer: HeapBuffer::dangling(alloc),
        }
    }

    /// Construct a new `DynArray<T, A>` in `alloc` with space reserved for
    /// exactly `capacity` elements.
    ///
    /// This method will panic on any storage errors.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        match Self::try_with_capacity_in(capacity, alloc) {
            Ok(res) => res,
            Err(error) => error.panic(),
        }
    }

    /// Try to construct a new `DynArray<T, A>` in `alloc` with space
    /// reserved for exactly `capacity` elements.
    pub fn try_with_capacity_in(capacity: usize, alloc: A) -> Result<Self, StorageError> {
        if capacity > max_capacity::<T>() {
            return Err(StorageError::CapacityLimit);
        }
        Ok(Self {
            buffer: HeapBuffer::allocate_in(capacity, alloc, true)?,
        })
    }

    /// Construct a new `DynArray<T, A>` in `alloc` and extend it by cloning
    /// the slice `data`.
    ///
    /// This method will panic on any storage errors.
    pub fn from_slice_in(data: &[T], alloc: A) -> Self
    where
        T: Clone,
    {
        let mut arr = Self::with_capacity_in(data.len(), alloc);
        arr.extend_from_slice(data);
        arr
    }

    /// Try to construct a new `DynArray<T, A>` in `alloc` and extend it by
    /// cloning the slice `data`.
    pub fn try_from_slice_in(data: &[T], alloc: A) -> Result<Self, StorageError>
    where
        T: Clone,
    {
        let mut arr = Self::try_with_capacity_in(data.len(), alloc)?;
        arr.try_extend_from_slice(data)?;
        Ok(arr)
    }

    /// Create a `DynArray<T, A>` from an iterator and an allocator.
    pub fn from_iter_in<I>(iter: I, alloc: A) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let iter = iter.into_iter();
        let (min_cap, _) = iter.size_hint();
        let mut arr = Self::with_capacity_in(min_cap, alloc);
        arr.extend(iter);
        arr
    }

    #[inline]
    fn into_inner(self) -> HeapBuffer<T, A> {
        let me = ManuallyDrop::new(self);
        unsafe { ptr::read(&me.buffer) }
    }

    /// Get a reference to the associated allocator instance.
    #[inline]
    pub fn allocator(&self) -> &A {
        &self.buffer.alloc
    }

    /// Creates a `DynArray<T, A>` directly from a pointer, a length, a
    /// capacity, and an allocator.
    ///
    /// # Safety
    /// The components must be the result of
    /// [`into_raw_parts_with_alloc`](DynArray::into_raw_parts_with_alloc);
    /// in particular the pointer addresses an allocation produced by this
    /// crate, whose block layout differs from a plain element array when
    /// `bounds-checks` is enabled.
    #[inline]
    pub unsafe fn from_raw_parts_in(
        data: *mut T,
        length: usize,
        capacity: usize,
        alloc: A,
    ) -> Self {
        Self {
            buffer: HeapBuffer::from_parts(
                NonNull::new(data).expect("Expected non-null pointer"),
                length,
                capacity,
                alloc,
            ),
        }
    }

    /// Decompose the array into its raw components:
    /// `(pointer, length, capacity, allocator)`.
    ///
    /// The caller becomes responsible for the memory; the only way to
    /// release it is to reassemble an array with
    /// [`from_raw_parts_in`](DynArray::from_raw_parts_in).
    #[inline]
    pub fn into_raw_parts_with_alloc(self) -> (*mut T, usize, usize, A) {
        let (ptr, len, cap, alloc) = self.into_inner().into_parts();
        (ptr.as_ptr(), len, cap, alloc)
    }

    /// Get a read pointer to the beginning of the element storage. This may
    /// be a dangling pointer if `T` is zero sized or the capacity is zero.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.buffer.data_ptr()
    }

    /// Get a mutable pointer to the beginning of the element storage. This
    /// may be a dangling pointer if `T` is zero sized or the capacity is
    /// zero.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.buffer.data_ptr_mut()
    }

    /// Access the contained elements as a slice reference.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.buffer.as_slice()
    }

    /// Access the contained elements as a mutable slice reference.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.buffer.as_mut_slice()
    }

    /// Get the current capacity, the number of elements the array can hold
    /// without reallocating.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Get the current number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.length()
    }

    /// Determine if the array is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear the array, dropping all contained elements. The capacity is
    /// unaffected.
    #[inline]
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Override the length of the initialized prefix.
    ///
    /// # Safety
    /// `length` must not exceed the capacity and all elements in
    /// `0..length` must be initialized.
    #[inline]
    pub unsafe fn set_len(&mut self, length: usize) {
        self.buffer.set_length(length)
    }

    /// Access the spare capacity of the array as a slice of
    /// `MaybeUninit<T>`.
    ///
    /// The returned slice can be used to fill the array with data before
    /// marking it as initialized using [`set_len`](DynArray::set_len).
    #[inline]
    pub fn spare_capacity_mut(&mut self) -> &mut [MaybeUninit<T>] {
        let length = self.len();
        &mut self.buffer.as_uninit_slice()[length..]
    }

    /// Returns the contents as a mutable slice, along with the spare
    /// capacity as a slice of `MaybeUninit<T>`.
    pub fn split_at_spare_mut(&mut self) -> (&mut [T], &mut [MaybeUninit<T>]) {
        let length = self.len();
        let (data, spare) = self.buffer.as_uninit_slice().split_at_mut(length);
        (
            // SAFETY: elements in the range 0..length are initialized
            unsafe { slice::from_raw_parts_mut(data.as_mut_ptr().cast::<T>(), length) },
            spare,
        )
    }

    /// Consume and leak the array, returning a mutable reference to its
    /// contents. The backing allocation is never released.
    #[inline]
    pub fn leak<'a>(self) -> &'a mut [T]
    where
        A: 'a,
    {
        let mut me = ManuallyDrop::new(self);
        unsafe { slice::from_raw_parts_mut(me.as_mut_ptr(), me.len()) }
    }

    /// Ensure capacity for at least `additional` more elements, growing by
    /// the doubling policy when a reallocation is needed.
    ///
    /// This method will panic on any storage errors.
    #[inline]
    pub fn reserve(&mut self, additional: usize) {
        match self.try_reserve(additional) {
            Ok(_) => (),
            Err(error) => error.panic(),
        }
    }

    /// Try to ensure capacity for at least `additional` more elements.
    #[inline]
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), StorageError> {
        self._try_reserve(additional, false)
    }

    /// Ensure capacity for at least `additional` more elements without
    /// growing beyond the requested size.
    ///
    /// This method will panic on any storage errors.
    #[inline]
    pub fn reserve_exact(&mut self, additional: usize) {
        match self.try_reserve_exact(additional) {
            Ok(_) => (),
            Err(error) => error.panic(),
        }
    }

    /// Try to ensure capacity for at least `additional` more elements
    /// without growing beyond the requested size.
    #[inline]
    pub fn try_reserve_exact(&mut self, additional: usize) -> Result<(), StorageError> {
        self._try_reserve(additional, true)
    }

    fn _try_reserve(&mut self, additional: usize, exact: bool) -> Result<(), StorageError> {
        let length = self.buffer.length();
        let Some(needed) = length.checked_add(additional) else {
            return Err(StorageError::CapacityLimit);
        };
        if self.buffer.capacity() >= needed {
            return Ok(());
        }
        if needed > max_capacity::<T>() {
            return Err(StorageError::CapacityLimit);
        }
        let capacity = if exact {
            needed
        } else {
            GrowDoubling::next_capacity::<T>(self.buffer.capacity(), needed)
                .min(max_capacity::<T>())
        };
        self.buffer.grow_buffer(capacity, exact)
    }

    /// Shrink the capacity with a lower bound of `min_capacity` elements.
    ///
    /// This method will panic on any storage errors.
    #[inline]
    pub fn shrink_to(&mut self, min_capacity: usize) {
        match self.try_shrink_to(min_capacity) {
            Ok(_) => (),
            Err(err) => err.panic(),
        }
    }

    /// Try to shrink the capacity with a lower bound of `min_capacity`
    /// elements.
    pub fn try_shrink_to(&mut self, min_capacity: usize) -> Result<(), StorageError> {
        let target = self.buffer.length().max(min_capacity);
        if self.buffer.capacity() > target {
            self.buffer.shrink_buffer(target)?;
        }
        Ok(())
    }

    /// Shrink the capacity to match the length, releasing the allocation
    /// entirely when the array is empty.
    #[inline]
    pub fn shrink_to_fit(&mut self) {
        match self.try_shrink_to_fit() {
            Ok(_) => (),
            Err(err) => err.panic(),
        }
    }

    /// Try to shrink the capacity to match the length.
    #[inline]
    pub fn try_shrink_to_fit(&mut self) -> Result<(), StorageError> {
        self.try_shrink_to(0)
    }

    /// Append an element to the end of the array.
    ///
    /// This method will panic on any storage errors.
    pub fn push(&mut self, item: T) {
        match self._try_reserve(1, false) {
            Ok(_) => (),
            Err(error) => error.panic(),
        }
        // SAFETY: the capacity has been established by `_try_reserve`
        unsafe { self.push_unchecked(item) };
    }

    /// Try to append an element to the end of the array, returning it
    /// inside an `UpdateError` when storage cannot be obtained.
    pub fn try_push(&mut self, item: T) -> Result<(), UpdateError<T>> {
        if let Err(error) = self._try_reserve(1, false) {
            return Err(UpdateError::new(error, item));
        }
        // SAFETY: the capacity has been established by `_try_reserve`
        unsafe { self.push_unchecked(item) };
        Ok(())
    }

    /// Append an element if spare capacity remains, otherwise return it.
    /// Never reallocates.
    pub fn push_within_capacity(&mut self, item: T) -> Result<(), T> {
        if self.len() < self.capacity() {
            // SAFETY: the capacity has been checked
            unsafe { self.push_unchecked(item) };
            Ok(())
        } else {
            Err(item)
        }
    }

    /// Append an element without adjusting or checking the capacity.
    ///
    /// # Safety
    /// The buffer must have spare capacity for at least one more element.
    #[inline]
    pub unsafe fn push_unchecked(&mut self, item: T) {
        let length = self.buffer.length();
        self.buffer.data_ptr_mut().add(length).write(item);
        self.buffer.set_length(length + 1);
    }

    /// Remove the last element from the array, if any, and return it.
    pub fn pop(&mut self) -> Option<T> {
        let length = self.buffer.length();
        if length > 0 {
            unsafe {
                self.buffer.set_length(length - 1);
                Some(ptr::read(self.buffer.data_ptr().add(length - 1)))
            }
        } else {
            None
        }
    }

    /// Insert an element at position `index`, relocating all later elements
    /// one slot to the right in a single bulk move.
    ///
    /// Panics if `index` is out of bounds or a storage error occurs.
    pub fn insert(&mut self, index: usize, value: T) {
        match self.try_insert(index, value) {
            Ok(_) => (),
            Err(error) => error.panic(),
        }
    }

    /// Try to insert an element at position `index`.
    ///
    /// Panics if `index` is out of bounds.
    pub fn try_insert(&mut self, index: usize, value: T) -> Result<(), UpdateError<T>> {
        let length = self.buffer.length();
        if index > length {
            index_panic();
        }
        if let Err(error) = self._try_reserve(1, false) {
            return Err(UpdateError::new(error, value));
        }
        let tail_count = length - index;
        unsafe {
            let head = self.buffer.data_ptr_mut().add(index);
            if tail_count > 0 {
                // Relocate the tail in one move, leaving a hole at `index`
                ptr::copy(head, head.add(1), tail_count);
            }
            head.write(value);
            self.buffer.set_length(length + 1);
        }
        Ok(())
    }

    /// Clone the elements of `other` into the array starting at `index`,
    /// relocating later elements to the right in a single bulk move.
    ///
    /// Panics if `index` is out of bounds or a storage error occurs.
    pub fn insert_slice(&mut self, index: usize, other: &[T])
    where
        T: Clone,
    {
        match self.try_insert_slice(index, other) {
            Ok(_) => (),
            Err(error) => error.panic(),
        }
    }

    /// Try to clone the elements of `other` into the array starting at
    /// `index`.
    ///
    /// If cloning an element panics, the constructed part of the insertion
    /// is dropped and the relocated tail is moved back to close the hole,
    /// leaving the array with its original contents.
    ///
    /// Panics if `index` is out of bounds.
    pub fn try_insert_slice(&mut self, index: usize, other: &[T]) -> Result<(), StorageError>
    where
        T: Clone,
    {
        let length = self.buffer.length();
        if index > length {
            index_panic();
        }
        let count = other.len();
        if count == 0 {
            return Ok(());
        }
        self._try_reserve(count, false)?;
        let tail_count = length - index;

        struct HoleGuard<'a, T, A: Allocator> {
            buffer: &'a mut HeapBuffer<T, A>,
            index: usize,
            hole: usize,
            tail_count: usize,
            filled: usize,
        }

        impl<T, A: Allocator> Drop for HoleGuard<'_, T, A> {
            fn drop(&mut self) {
                // Unwind path: drop the constructed part of the insertion,
                // relocate the tail back down, and restore the length.
                unsafe {
                    let head = self.buffer.data_ptr_mut().add(self.index);
                    destroy(head, self.filled);
                    if self.tail_count > 0 {
                        ptr::copy(head.add(self.hole), head, self.tail_count);
                    }
                    self.buffer.set_length(self.index + self.tail_count);
                }
            }
        }

        unsafe {
            // Disavow the tail while the hole is open
            self.buffer.set_length(index);
            let head = self.buffer.data_ptr_mut().add(index);
            if tail_count > 0 {
                ptr::copy(head, head.add(count), tail_count);
            }
            let mut guard = HoleGuard {
                buffer: &mut self.buffer,
                index,
                hole: count,
                tail_count,
                filled: 0,
            };
            for item in other {
                let head = guard.buffer.data_ptr_mut().add(guard.index);
                head.add(guard.filled).write(item.clone());
                guard.filled += 1;
            }
            mem::forget(guard);
            self.buffer.set_length(length + count);
        }
        Ok(())
    }

    /// Remove and return the element at position `index`, relocating all
    /// later elements one slot to the left in a single bulk move.
    ///
    /// Panics if `index` is out of bounds.
    pub fn remove(&mut self, index: usize) -> T {
        let length = self.buffer.length();
        if index >= length {
            index_panic();
        }
        let tail_count = length - index - 1;
        unsafe {
            let head = self.buffer.data_ptr_mut().add(index);
            let value = ptr::read(head);
            if tail_count > 0 {
                ptr::copy(head.add(1), head, tail_count);
            }
            self.buffer.set_length(length - 1);
            value
        }
    }

    /// Remove and return the element at position `index` without preserving
    /// order: the last element is relocated into the gap.
    ///
    /// This is O(1) regardless of position, performing exactly one element
    /// read and one relocation.
    ///
    /// Panics if `index` is out of bounds.
    pub fn swap_remove(&mut self, index: usize) -> T {
        let length = self.buffer.length();
        if index >= length {
            index_panic();
        }
        let last = length - 1;
        unsafe {
            let base = self.buffer.data_ptr_mut();
            let value = ptr::read(base.add(index));
            if index != last {
                ptr::copy_nonoverlapping(base.add(last), base.add(index), 1);
            }
            self.buffer.set_length(last);
            value
        }
    }

    /// Reduce the length to at most `length`, dropping any elements past
    /// it. The capacity is unchanged.
    pub fn truncate(&mut self, length: usize) {
        let old_len = self.buffer.length();
        if length < old_len {
            unsafe {
                self.buffer.set_length(length);
                destroy(self.buffer.data_ptr_mut().add(length), old_len - length);
            }
        }
    }

    /// Remove the elements in `range` from the array, returning an iterator
    /// over the removed elements. The tail is relocated down when the
    /// iterator is dropped.
    ///
    /// Panics if the range is out of bounds.
    #[inline]
    pub fn drain<R>(&mut self, range: R) -> Drain<'_, T, A>
    where
        R: RangeBounds<usize>,
    {
        let range = bounds_to_range(range, self.buffer.length());
        Drain::new(&mut self.buffer, range)
    }

    /// Retain only the elements for which the predicate returns `true`,
    /// preserving their order.
    #[inline]
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.retain_mut(|item| f(item))
    }

    /// Retain only the elements for which the predicate returns `true`,
    /// passing a mutable reference to each element.
    pub fn retain_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut T) -> bool,
    {
        let orig_len = self.buffer.length();
        if orig_len == 0 {
            return;
        }
        // Disavow all elements while the scan leaves gaps behind
        unsafe { self.buffer.set_length(0) };

        struct Sweep<'a, T, A: Allocator> {
            buffer: &'a mut HeapBuffer<T, A>,
            read: usize,
            kept: usize,
            orig_len: usize,
        }

        impl<T, A: Allocator> Drop for Sweep<'_, T, A> {
            fn drop(&mut self) {
                // Close the gap over any unvisited elements and restore the
                // length. Runs on completion and on unwind from the
                // predicate.
                unsafe {
                    let base = self.buffer.data_ptr_mut();
                    let rest = self.orig_len - self.read;
                    if rest > 0 && self.kept != self.read {
                        ptr::copy(base.add(self.read), base.add(self.kept), rest);
                    }
                    self.buffer.set_length(self.kept + rest);
                }
            }
        }

        let mut sweep = Sweep {
            buffer: &mut self.buffer,
            read: 0,
            kept: 0,
            orig_len,
        };
        while sweep.read < sweep.orig_len {
            unsafe {
                let base = sweep.buffer.data_ptr_mut();
                let cur = base.add(sweep.read);
                if f(&mut *cur) {
                    if sweep.kept != sweep.read {
                        ptr::copy_nonoverlapping(cur, base.add(sweep.kept), 1);
                    }
                    sweep.read += 1;
                    sweep.kept += 1;
                } else {
                    sweep.read += 1;
                    ptr::drop_in_place(cur);
                }
            }
        }
    }

    /// Resize so that the length equals `new_len`, cloning `value` into any
    /// added slots.
    ///
    /// This method will panic on any storage errors.
    #[inline]
    pub fn resize(&mut self, new_len: usize, value: T)
    where
        T: Clone,
    {
        match self.try_resize(new_len, value) {
            Ok(_) => (),
            Err(err) => err.panic(),
        }
    }

    /// Try to resize so that the length equals `new_len`, cloning `value`
    /// into any added slots.
    pub fn try_resize(&mut self, new_len: usize, value: T) -> Result<(), StorageError>
    where
        T: Clone,
    {
        let length = self.buffer.length();
        match new_len.cmp(&length) {
            Ordering::Greater => {
                let added = new_len - length;
                self._try_reserve(added, false)?;
                let mut insert = Inserter::new(self.spare_capacity_mut());
                insert.push_repeat(&value, added);
                insert.complete();
                // SAFETY: the capacity was established by `_try_reserve`
                unsafe { self.buffer.set_length(new_len) }
            }
            Ordering::Less => self.truncate(new_len),
            Ordering::Equal => {}
        }
        Ok(())
    }

    /// Resize so that the length equals `new_len`, filling any added slots
    /// with the results of the closure `f`.
    ///
    /// This method will panic on any storage errors.
    #[inline]
    pub fn resize_with<F>(&mut self, new_len: usize, f: F)
    where
        F: FnMut() -> T,
    {
        match self.try_resize_with(new_len, f) {
            Ok(_) => (),
            Err(err) => err.panic(),
        }
    }

    /// Try to resize so that the length equals `new_len`, filling any added
    /// slots with the results of the closure `f`.
    pub fn try_resize_with<F>(&mut self, new_len: usize, mut f: F) -> Result<(), StorageError>
    where
        F: FnMut() -> T,
    {
        let length = self.buffer.length();
        match new_len.cmp(&length) {
            Ordering::Greater => {
                let added = new_len - length;
                self._try_reserve(added, false)?;
                let mut insert = Inserter::new(self.spare_capacity_mut());
                for _ in 0..added {
                    insert.push(f());
                }
                insert.complete();
                // SAFETY: the capacity was established by `_try_reserve`
                unsafe { self.buffer.set_length(new_len) }
            }
            Ordering::Less => self.truncate(new_len),
            Ordering::Equal => {}
        }
        Ok(())
    }

    /// Replace the contents of the array with the elements of `source`.
    ///
    /// Existing storage is reused when large enough.
    pub fn assign<I>(&mut self, source: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.clear();
        self.extend(source);
    }

    /// Replace the contents of the array by cloning the slice `items`,
    /// assigning onto existing elements where possible and reusing the
    /// storage when it is large enough.
    ///
    /// This method will panic on any storage errors.
    pub fn assign_from_slice(&mut self, items: &[T])
    where
        T: Clone,
    {
        match self.try_assign_from_slice(items) {
            Ok(_) => (),
            Err(error) => error.panic(),
        }
    }

    /// Try to replace the contents of the array by cloning the slice
    /// `items`.
    pub fn try_assign_from_slice(&mut self, items: &[T]) -> Result<(), StorageError>
    where
        T: Clone,
    {
        let count = items.len();
        if self.capacity() < count {
            // Old elements may hold resources; release them before the
            // fresh allocation is filled
            self.clear();
            self._try_reserve(count, true)?;
        }
        let length = self.buffer.length();
        let overlap = length.min(count);
        let contents = self.as_mut_slice();
        for (dst, src) in contents[..overlap].iter_mut().zip(items) {
            dst.clone_from(src);
        }
        if count < length {
            self.truncate(count);
        } else if count > length {
            let mut insert = Inserter::new(self.spare_capacity_mut());
            insert.push_slice(&items[length..]);
            insert.complete();
            // SAFETY: capacity for `count` elements was established above
            unsafe { self.buffer.set_length(count) };
        }
        Ok(())
    }

    /// Clone each element of `items` onto the end of the array, reserving
    /// all required capacity up front.
    ///
    /// This method will panic on any storage errors.
    pub fn extend_from_slice(&mut self, items: &[T])
    where
        T: Clone,
    {
        match self.try_extend_from_slice(items) {
            Ok(_) => (),
            Err(error) => error.panic(),
        }
    }

    /// Try to clone each element of `items` onto the end of the array.
    ///
    /// Capacity is reserved up front, so when an error is returned no
    /// elements have been appended.
    pub fn try_extend_from_slice(&mut self, items: &[T]) -> Result<(), StorageError>
    where
        T: Clone,
    {
        self._try_reserve(items.len(), false)?;
        let length = self.buffer.length();
        let mut insert = Inserter::new(self.spare_capacity_mut());
        insert.push_slice(items);
        let added = insert.complete();
        if added > 0 {
            // SAFETY: the capacity was established by `_try_reserve`
            unsafe { self.buffer.set_length(length + added) };
        }
        Ok(())
    }

    /// Move the contents of another array onto the end of this one, leaving
    /// `other` empty. The elements are transferred by bulk relocation.
    pub fn append(&mut self, other: &mut Self) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            mem::swap(&mut self.buffer, &mut other.buffer);
            return;
        }
        let length = self.buffer.length();
        let moved = other.buffer.length();
        self.reserve(moved);
        unsafe {
            other.buffer.set_length(0);
            relocate(
                other.buffer.data_ptr(),
                moved,
                self.buffer.data_ptr_mut().add(length),
            );
            self.buffer.set_length(length + moved);
        }
    }

    fn try_extend(&mut self, iter: &mut impl Iterator<Item = T>) -> Result<(), UpdateError<T>> {
        loop {
            let length = self.buffer.length();
            let mut insert = Inserter::new(self.spare_capacity_mut());
            insert.push_iter(iter);
            let added = insert.complete();
            let new_len = length + added;
            if added > 0 {
                // SAFETY: the inserter stayed within the spare capacity
                unsafe { self.buffer.set_length(new_len) };
            }
            if new_len < self.buffer.capacity() {
                // ran out of items before filling the buffer
                break;
            }
            if let Some(item) = iter.next() {
                let min_reserve = iter.size_hint().0.saturating_add(1);
                match self._try_reserve(min_reserve, false) {
                    Ok(_) => unsafe {
                        self.buffer.data_ptr_mut().add(new_len).write(item);
                        self.buffer.set_length(new_len + 1);
                    },
                    Err(err) => return Err(UpdateError::new(err, item)),
                }
            } else {
                break;
            }
        }
        Ok(())
    }
}

impl<T, A: Allocator> AsRef<[T]> for DynArray<T, A> {
    #[inline]
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: Allocator> AsMut<[T]> for DynArray<T, A> {
    #[inline]
    fn as_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, A: Allocator> Borrow<[T]> for DynArray<T, A> {
    #[inline]
    fn borrow(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: Allocator> BorrowMut<[T]> for DynArray<T, A> {
    #[inline]
    fn borrow_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Clone, A: Allocator + Clone> Clone for DynArray<T, A> {
    fn clone(&self) -> Self {
        Self::from_slice_in(self.as_slice(), self.buffer.alloc.clone())
    }

    fn clone_from(&mut self, source: &Self) {
        self.assign_from_slice(source.as_slice());
    }
}

impl<T, A: AllocatorDefault> ConstDefault for DynArray<T, A> {
    const DEFAULT: Self = Self::new();
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for DynArray<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_slice().fmt(f)
    }
}

impl<T, A: AllocatorDefault> Default for DynArray<T, A> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A: Allocator> Deref for DynArray<T, A> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl<T, A: Allocator> DerefMut for DynArray<T, A> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl<T, A: Allocator> Drop for DynArray<T, A> {
    fn drop(&mut self) {
        let length = self.buffer.length();
        if length > 0 {
            unsafe {
                self.buffer.set_length(0);
                destroy(self.buffer.data_ptr_mut(), length);
            }
        }
    }
}

impl<T, A: Allocator> Extend<T> for DynArray<T, A> {
    #[inline]
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        match self.try_extend(&mut iter.into_iter()) {
            Ok(_) => (),
            Err(error) => error.panic(),
        }
    }
}

impl<'a, T: Clone + 'a, A: Allocator> Extend<&'a T> for DynArray<T, A> {
    #[inline]
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        match self.try_extend(&mut iter.into_iter().cloned()) {
            Ok(_) => (),
            Err(error) => error.panic(),
        }
    }
}

impl<T, A: AllocatorDefault> FromIterator<T> for DynArray<T, A> {
    #[inline]
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_iter_in(iter, A::default())
    }
}

impl<T: Clone, A: AllocatorDefault> From<&[T]> for DynArray<T, A> {
    #[inline]
    fn from(data: &[T]) -> Self {
        Self::from_slice(data)
    }
}

impl<T: Clone, A: AllocatorDefault> From<&mut [T]> for DynArray<T, A> {
    #[inline]
    fn from(data: &mut [T]) -> Self {
        Self::from_slice(data)
    }
}

impl<T: Clone, A: AllocatorDefault, const N: usize> From<&[T; N]> for DynArray<T, A> {
    #[inline]
    fn from(data: &[T; N]) -> Self {
        Self::from_slice(data)
    }
}

impl<T, A: AllocatorDefault, const N: usize> From<[T; N]> for DynArray<T, A> {
    #[inline]
    fn from(data: [T; N]) -> Self {
        from_array_in(data, A::default())
    }
}

impl<T, A: Allocator> IntoIterator for DynArray<T, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.into_inner())
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a DynArray<T, A> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a mut DynArray<T, A> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.as_mut_slice().iter_mut()
    }
}

impl<T1, A1, T2, A2> PartialEq<DynArray<T2, A2>> for DynArray<T1, A1>
where
    T1: PartialEq<T2>,
    A1: Allocator,
    A2: Allocator,
{
    #[inline]
    fn eq(&self, other: &DynArray<T2, A2>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T1, T2, A: Allocator> PartialEq<[T2]> for DynArray<T1, A>
where
    T1: PartialEq<T2>,
{
    #[inline]
    fn eq(&self, other: &[T2]) -> bool {
        self.as_slice() == other
    }
}

impl<T1, T2, A: Allocator> PartialEq<&[T2]> for DynArray<T1, A>
where
    T1: PartialEq<T2>,
{
    #[inline]
    fn eq(&self, other: &&[T2]) -> bool {
        self.as_slice() == *other
    }
}

impl<T1, T2, A: Allocator, const N: usize> PartialEq<[T2; N]> for DynArray<T1, A>
where
    T1: PartialEq<T2>,
{
    #[inline]
    fn eq(&self, other: &[T2; N]) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T1, T2, A: Allocator, const N: usize> PartialEq<&[T2; N]> for DynArray<T1, A>
where
    T1: PartialEq<T2>,
{
    #[inline]
    fn eq(&self, other: &&[T2; N]) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, A: Allocator> Eq for DynArray<T, A> {}

impl<T: PartialOrd, A1: Allocator, A2: Allocator> PartialOrd<DynArray<T, A2>>
    for DynArray<T, A1>
{
    #[inline]
    fn partial_cmp(&self, other: &DynArray<T, A2>) -> Option<Ordering> {
        self.as_slice().partial_cmp(other.as_slice())
    }
}

impl<T: Ord, A: Allocator> Ord for DynArray<T, A> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_slice().cmp(other.as_slice())
    }
}

impl<T: Hash, A: Allocator> Hash for DynArray<T, A> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state)
    }
}

unsafe impl<T: Send, A: Allocator + Send> Send for DynArray<T, A> {}

unsafe impl<T: Sync, A: Allocator + Sync> Sync for DynArray<T, A> {}

// The element pointer is heap-stable, so moving the handle is a plain byte
// copy whenever the allocator tolerates one.
unsafe impl<T, A: Allocator + TrivialReloc> TrivialReloc for DynArray<T, A> {}

#[cfg(feature = "zeroize")]
impl<T: zeroize::Zeroize, A: Allocator> zeroize::Zeroize for DynArray<T, A> {
    fn zeroize(&mut self) {
        self.as_mut_slice().zeroize()
    }
}

impl<T, A: AllocatorDefault> DynArray<T, A> {
    /// Creates a `DynArray<T, A>` directly from a pointer, a length, and a
    /// capacity.
    ///
    /// # Safety
    /// The components must be the result of
    /// [`into_raw_parts`](DynArray::into_raw_parts).
    #[inline]
    pub unsafe fn from_raw_parts(data: *mut T, length: usize, capacity: usize) -> Self {
        Self::from_raw_parts_in(data, length, capacity, A::DEFAULT)
    }

    /// Decompose the array into its raw components:
    /// `(pointer, length, capacity)`.
    #[inline]
    pub fn into_raw_parts(self) -> (*mut T, usize, usize) {
        let (ptr, len, cap, _alloc) = self.into_raw_parts_with_alloc();
        (ptr, len, cap)
    }
}
