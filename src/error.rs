//! Failure reporting for the container and allocator layers.

use core::alloc::LayoutError;
use core::fmt;

use crate::alloc::AllocError;

/// The reasons a storage operation can fail.
///
/// Infallible entry points turn these into panics through
/// [`panic`][StorageError::panic]; the `try_` variants return them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageError {
    /// The allocator could not provide a block for the requested layout.
    AllocError,
    /// The request passed the element-count ceiling for the type
    /// ([`max_capacity`][crate::capacity::max_capacity], checked before the
    /// allocator is consulted so size arithmetic cannot overflow), or the
    /// fixed capacity of an inline container.
    CapacityLimit,
    /// The block layout could not be computed. With `bounds-checks`
    /// enabled the block is the element array extended by the allocation
    /// header, and the extension itself can overflow.
    LayoutError(LayoutError),
}

impl StorageError {
    /// Raise this error as a panic, for the infallible entry points.
    #[cold]
    #[inline(never)]
    pub fn panic(self) -> ! {
        panic!("{}", self);
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocError => f.write_str("memory allocation failed"),
            Self::CapacityLimit => f.write_str("element capacity limit exceeded"),
            Self::LayoutError(err) => write!(f, "invalid block layout: {}", err),
        }
    }
}

impl From<AllocError> for StorageError {
    fn from(_err: AllocError) -> Self {
        Self::AllocError
    }
}

impl From<LayoutError> for StorageError {
    fn from(err: LayoutError) -> Self {
        Self::LayoutError(err)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for StorageError {}

/// A failed update carrying the value that could not be stored.
///
/// Returned by operations that take an element by value, such as
/// [`DynArray::try_push`][crate::DynArray::try_push] and
/// [`InplaceVec::try_insert`][crate::InplaceVec::try_insert], so a
/// rejection (a full inline container, a failed allocation) hands the
/// element back to the caller instead of dropping it on the error path.
#[derive(Clone)]
pub struct UpdateError<T> {
    pub(crate) error: StorageError,
    pub(crate) value: T,
}

impl<T> UpdateError<T> {
    pub(crate) fn new(error: StorageError, value: T) -> Self {
        Self { error, value }
    }

    /// Get a reference to the underlying [`StorageError`]
    pub fn error(&self) -> &StorageError {
        &self.error
    }

    /// Recover the value that could not be stored
    pub fn into_value(self) -> T {
        self.value
    }

    /// Split this error into the failure reason and the rejected value
    pub fn into_parts(self) -> (StorageError, T) {
        (self.error, self.value)
    }

    /// Raise this error as a panic, discarding the contained value
    #[cold]
    #[inline(never)]
    pub fn panic(self) -> ! {
        panic!("{}", self);
    }
}

impl<T> From<UpdateError<T>> for StorageError {
    /// Discard the contained value, keeping the failure reason.
    fn from(err: UpdateError<T>) -> Self {
        err.error
    }
}

impl<T> fmt::Debug for UpdateError<T> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateError")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Display for UpdateError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not store value: {}", self.error)
    }
}

#[cfg(feature = "std")]
impl<T> std::error::Error for UpdateError<T> {}
