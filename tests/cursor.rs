#![cfg(feature = "alloc")]

use std::panic::{catch_unwind, AssertUnwindSafe};

use reloc_vec::{dynarr, DynArray};

#[test]
fn cursor_resolves_while_the_allocation_is_live() {
    let v = dynarr![10, 20, 30];
    let cur = v.cursor(1);
    assert_eq!(cur.index(), 1);
    assert_eq!(v.resolve(&cur), Some(&20));
    assert_eq!(*cur.get(&v), 20);
}

#[test]
fn cursor_survives_in_place_mutation() {
    let mut v: DynArray<i32> = DynArray::with_capacity(8);
    v.extend([1, 2, 3]);
    let cur = v.cursor(0);
    // pushes within capacity do not reallocate
    v.push(4);
    v.push(5);
    assert_eq!(v.resolve(&cur), Some(&1));
    *v.resolve_mut(&cur).unwrap() = 9;
    assert_eq!(v[0], 9);
}

#[test]
fn growth_invalidates_cursors() {
    let mut v: DynArray<i32> = DynArray::new();
    v.extend([1, 2, 3]);
    let cur = v.cursor(1);
    assert!(v.resolve(&cur).is_some());
    v.reserve_exact(v.capacity() * 4);
    assert_eq!(v.resolve(&cur), None);
}

#[test]
fn shrink_invalidates_cursors() {
    let mut v: DynArray<i32> = DynArray::with_capacity(32);
    v.extend([1, 2, 3]);
    let cur = v.cursor(2);
    v.shrink_to_fit();
    assert_eq!(v.resolve(&cur), None);
}

#[test]
fn releasing_the_allocation_invalidates_cursors() {
    let mut v: DynArray<i32> = DynArray::new();
    v.extend([1, 2, 3]);
    let cur = v.cursor(0);
    v.clear();
    v.shrink_to_fit();
    assert_eq!(v.resolve(&cur), None);
}

#[test]
fn truncation_invalidates_out_of_bounds_cursors_only() {
    let mut v: DynArray<i32> = DynArray::new();
    v.extend([1, 2, 3, 4]);
    let head = v.cursor(0);
    let tail = v.cursor(3);
    v.truncate(2);
    // no reallocation happened, so the in-bounds cursor stays valid
    assert_eq!(v.resolve(&head), Some(&1));
    assert_eq!(v.resolve(&tail), None);
}

#[test]
fn end_cursor_resolves_only_once_occupied() {
    let mut v: DynArray<i32> = DynArray::with_capacity(4);
    v.extend([1, 2]);
    let end = v.cursor(2);
    assert_eq!(v.resolve(&end), None);
    // the push stays within capacity, so the slot becomes a live element
    // of the same allocation
    v.push(3);
    assert_eq!(v.resolve(&end), Some(&3));
}

#[test]
fn get_panics_on_a_stale_cursor() {
    let mut v: DynArray<i32> = DynArray::new();
    v.extend([1, 2, 3]);
    let cur = v.cursor(1);
    v.reserve_exact(100);
    let result = catch_unwind(AssertUnwindSafe(|| *cur.get(&v)));
    assert!(result.is_err());
}

#[test]
fn cursors_do_not_cross_containers() {
    let a = dynarr![1, 2, 3];
    let b = dynarr![1, 2, 3];
    let cur = a.cursor(0);
    assert_eq!(a.resolve(&cur), Some(&1));
    assert_eq!(b.resolve(&cur), None);
}

#[test]
fn allocation_ids_are_unique_and_tagged() {
    let a = dynarr![1];
    let b = dynarr![2];
    assert_ne!(a.allocation_id(), 0);
    assert_ne!(a.allocation_id(), b.allocation_id());
    // high and low tag bits are forced set on live allocations
    assert_eq!(a.allocation_id() & 1, 1);
    assert_ne!(a.allocation_id() & (1 << (usize::BITS - 1)), 0);

    let empty: DynArray<i32> = DynArray::new();
    assert_eq!(empty.allocation_id(), 0);
}

#[test]
fn empty_container_cursors_compare() {
    let v: DynArray<i32> = DynArray::new();
    let a = v.cursor(0);
    let b = v.cursor(0);
    assert_eq!(a, b);
    assert_eq!(v.resolve(&a), None);
}
