use core::num::NonZeroU32;
use core::ptr::NonNull;
use std::rc::Rc;
use std::sync::Arc;

use reloc_vec::{trivially_relocatable, DynArray, InplaceVec, TrivialReloc};

fn assert_reloc<T: TrivialReloc>() {}

#[test]
fn primitives_and_pointers() {
    assert_reloc::<u8>();
    assert_reloc::<i128>();
    assert_reloc::<f64>();
    assert_reloc::<char>();
    assert_reloc::<*const str>();
    assert_reloc::<NonNull<[u8]>>();
    assert_reloc::<&'static [u8]>();
}

#[test]
fn composites_propagate() {
    assert_reloc::<Option<NonZeroU32>>();
    assert_reloc::<Result<u32, &'static str>>();
    assert_reloc::<[Option<u64>; 16]>();
    assert_reloc::<(u8, u16, u32, u64)>();
    assert_reloc::<core::mem::ManuallyDrop<(bool, char)>>();
}

#[test]
fn owning_pointers_and_collections() {
    assert_reloc::<Box<[u8]>>();
    assert_reloc::<Rc<str>>();
    assert_reloc::<Arc<Vec<u8>>>();
    assert_reloc::<String>();
    assert_reloc::<Vec<Box<u32>>>();
}

#[test]
fn containers_propagate_from_their_parameters() {
    // the heap array relocates whenever its allocator does
    assert_reloc::<DynArray<String>>();
    assert_reloc::<DynArray<Vec<u8>>>();
    // the inline array relocates only when its elements do
    assert_reloc::<InplaceVec<Box<u8>, 4>>();
    assert_reloc::<InplaceVec<(u8, Option<char>), 8, u8>>();
}

#[test]
fn macro_declares_user_types() {
    struct Fd(#[allow(dead_code)] i32);
    struct Pair(#[allow(dead_code)] u32, #[allow(dead_code)] u32);
    trivially_relocatable!(Fd, Pair);
    assert_reloc::<Fd>();
    assert_reloc::<Pair>();

    struct Generic<T>(T);
    unsafe impl<T: TrivialReloc> TrivialReloc for Generic<T> {}
    assert_reloc::<Generic<Fd>>();
}
