#![cfg(all(feature = "alloc", feature = "zeroize"))]

use core::alloc::Layout;
use core::cell::RefCell;
use core::ptr::NonNull;
use core::slice;

use reloc_vec::{
    alloc::{AllocError, Allocator, Global, ZeroizingAlloc},
    DynArray,
};

/// Snapshots the contents of every released block.
#[derive(Debug, Default)]
struct ReleaseLog {
    released: RefCell<Vec<Vec<u8>>>,
}

unsafe impl Allocator for ReleaseLog {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        Global.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        let cp = Vec::from(slice::from_raw_parts(ptr.as_ptr(), layout.size()));
        self.released.borrow_mut().push(cp);
        Global.deallocate(ptr, layout)
    }
}

#[test]
fn release_log_captures_contents() {
    let alloc = ReleaseLog::default();
    let mut v = DynArray::new_in(&alloc);
    v.push(99usize);
    drop(v);
    let log = alloc.released.borrow();
    assert_eq!(log.len(), 1);
    assert!(log[0].windows(8).any(|w| w == 99usize.to_ne_bytes()));
}

#[test]
fn zeroizing_alloc_scrubs_on_drop() {
    let alloc = ReleaseLog::default();
    let mut v = DynArray::new_in(ZeroizingAlloc(&alloc));
    v.push(0x5a5a5a5au32);
    drop(v);
    let log = alloc.released.borrow();
    assert_eq!(log.len(), 1);
    assert!(log[0].iter().all(|byte| *byte == 0));
}

#[test]
fn zeroizing_alloc_scrubs_intermediate_buffers() {
    let alloc = ReleaseLog::default();
    let mut v = DynArray::new_in(ZeroizingAlloc(&alloc));
    // force at least one reallocation
    for i in 0..1000usize {
        v.push(i | 0x0101_0101);
    }
    drop(v);
    let log = alloc.released.borrow();
    assert!(log.len() >= 2);
    for block in log.iter() {
        assert!(block.iter().all(|byte| *byte == 0));
    }
}

#[test]
fn containers_zeroize_their_elements() {
    use zeroize::Zeroize;

    let mut v: DynArray<u64> = DynArray::from_slice(&[1, 2, 3]);
    v.zeroize();
    assert_eq!(v, [0, 0, 0]);

    let mut a: reloc_vec::InplaceVec<u64, 4> = reloc_vec::InplaceVec::new();
    a.extend([7, 8]);
    a.zeroize();
    assert_eq!(a, [0, 0]);
}
