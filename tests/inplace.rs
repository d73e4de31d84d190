use core::cell::Cell;
use core::mem::size_of;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use rstest::rstest;

use reloc_vec::{InplaceVec, StorageError};

#[derive(Debug)]
struct Counted {
    value: i32,
    drops: Rc<Cell<usize>>,
}

impl Counted {
    fn new(value: i32, drops: &Rc<Cell<usize>>) -> Self {
        Self {
            value,
            drops: drops.clone(),
        }
    }
}

impl Drop for Counted {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

#[test]
fn new_is_empty() {
    let v: InplaceVec<u32, 4> = InplaceVec::new();
    assert!(v.is_empty());
    assert_eq!(v.len(), 0);
    assert_eq!(v.capacity(), 4);
    assert!(!v.is_full());
}

#[test]
fn narrow_index_shrinks_the_container() {
    assert_eq!(size_of::<InplaceVec<u8, 12, u8>>(), 13);
    assert!(size_of::<InplaceVec<u8, 12, usize>>() > 13);
}

#[test]
fn push_to_capacity_then_fail() {
    let mut v: InplaceVec<u32, 3> = InplaceVec::new();
    v.push(1);
    v.push(2);
    v.push(3);
    assert!(v.is_full());
    let err = v.try_push(4).unwrap_err();
    assert_eq!(*err.error(), StorageError::CapacityLimit);
    assert_eq!(err.into_value(), 4);
    assert_eq!(v, [1, 2, 3]);
}

#[test]
fn push_past_capacity_panics() {
    let result = catch_unwind(|| {
        let mut v: InplaceVec<u32, 1> = InplaceVec::new();
        v.push(1);
        v.push(2);
    });
    assert!(result.is_err());
}

#[test]
fn extend_overflow_keeps_the_filled_prefix() {
    let mut v: InplaceVec<i32, 4> = InplaceVec::new();
    let result = catch_unwind(AssertUnwindSafe(|| {
        v.extend([1, 2, 3, 4, 5, 6]);
    }));
    assert!(result.is_err());
    // the first four elements of the input are present
    assert_eq!(v, [1, 2, 3, 4]);
}

#[test]
fn extend_until_full_returns_the_remainder() {
    let mut v: InplaceVec<i32, 4> = InplaceVec::new();
    v.push(1);
    let mut rest = v.extend_until_full([2, 3, 4, 5, 6]);
    assert_eq!(v, [1, 2, 3, 4]);
    assert_eq!(rest.next(), Some(5));
    assert_eq!(rest.next(), Some(6));
    assert_eq!(rest.next(), None);
}

#[test]
fn assign_until_full_replaces_contents() {
    let mut v: InplaceVec<i32, 3> = InplaceVec::new();
    v.extend([9, 9]);
    let mut rest = v.assign_until_full([1, 2, 3, 4]);
    assert_eq!(v, [1, 2, 3]);
    assert_eq!(rest.next(), Some(4));
}

#[test]
fn insert_remove_swap_remove() {
    let mut v: InplaceVec<i32, 8> = InplaceVec::new();
    v.extend([1, 2, 4]);
    v.insert(2, 3);
    assert_eq!(v, [1, 2, 3, 4]);
    assert_eq!(v.remove(0), 1);
    assert_eq!(v, [2, 3, 4]);
    assert_eq!(v.swap_remove(0), 2);
    assert_eq!(v, [4, 3]);
}

#[test]
fn insert_when_full_hands_back_the_value() {
    let mut v: InplaceVec<i32, 2> = InplaceVec::new();
    v.extend([1, 2]);
    let err = v.try_insert(1, 9).unwrap_err();
    assert_eq!(err.into_value(), 9);
    assert_eq!(v, [1, 2]);
}

#[test]
fn resize_within_and_past_capacity() {
    let mut v: InplaceVec<i32, 4> = InplaceVec::new();
    v.resize(3, 7);
    assert_eq!(v, [7, 7, 7]);
    v.resize(1, 0);
    assert_eq!(v, [7]);
    assert_eq!(v.try_resize(5, 0), Err(StorageError::CapacityLimit));
    assert_eq!(v, [7]);
}

#[test]
fn try_extend_from_slice_is_all_or_nothing() {
    let mut v: InplaceVec<i32, 4> = InplaceVec::new();
    v.push(1);
    assert_eq!(
        v.try_extend_from_slice(&[2, 3, 4, 5]),
        Err(StorageError::CapacityLimit)
    );
    assert_eq!(v, [1]);
    assert_eq!(v.try_extend_from_slice(&[2, 3]), Ok(()));
    assert_eq!(v, [1, 2, 3]);
}

#[test]
fn drain_relocates_the_tail() {
    let mut v: InplaceVec<i32, 8> = InplaceVec::new();
    v.extend(0..8);
    let removed: Vec<i32> = v.drain(2..5).collect();
    assert_eq!(removed, &[2, 3, 4]);
    assert_eq!(v, [0, 1, 5, 6, 7]);
}

#[test]
fn drain_drops_unconsumed_items() {
    let drops = Rc::new(Cell::new(0));
    let mut v: InplaceVec<Counted, 6> = InplaceVec::new();
    for i in 0..6 {
        v.push(Counted::new(i, &drops));
    }
    let mut drain = v.drain(1..5);
    assert_eq!(drain.next().map(|c| c.value), Some(1));
    drop(drain);
    assert_eq!(drops.get(), 4);
    let values: Vec<i32> = v.iter().map(|c| c.value).collect();
    assert_eq!(values, &[0, 5]);
}

#[test]
fn truncate_and_clear_drop_elements() {
    let drops = Rc::new(Cell::new(0));
    let mut v: InplaceVec<Counted, 4> = InplaceVec::new();
    for i in 0..4 {
        v.push(Counted::new(i, &drops));
    }
    v.truncate(1);
    assert_eq!(drops.get(), 3);
    v.clear();
    assert_eq!(drops.get(), 4);
}

#[test]
fn retain_keeps_matching_elements() {
    let mut v: InplaceVec<i32, 10> = InplaceVec::new();
    v.extend(0..10);
    v.retain(|item| item % 3 == 0);
    assert_eq!(v, [0, 3, 6, 9]);
}

#[test]
fn retain_panic_preserves_the_unvisited_tail() {
    let drops = Rc::new(Cell::new(0));
    let mut v: InplaceVec<Counted, 6> = InplaceVec::new();
    for i in 0..6 {
        v.push(Counted::new(i, &drops));
    }
    let result = catch_unwind(AssertUnwindSafe(|| {
        v.retain(|item| {
            if item.value == 2 {
                panic!("predicate failure");
            }
            item.value != 0
        });
    }));
    assert!(result.is_err());
    let values: Vec<i32> = v.iter().map(|c| c.value).collect();
    assert_eq!(values, &[1, 2, 3, 4, 5]);
    drop(v);
    assert_eq!(drops.get(), 6);
}

#[test]
fn into_iter_yields_and_drops() {
    let drops = Rc::new(Cell::new(0));
    let mut v: InplaceVec<Counted, 5> = InplaceVec::new();
    for i in 0..5 {
        v.push(Counted::new(i, &drops));
    }
    let mut iter = v.into_iter();
    assert_eq!(iter.next().map(|c| c.value), Some(0));
    assert_eq!(iter.next_back().map(|c| c.value), Some(4));
    drop(iter);
    assert_eq!(drops.get(), 5);
}

#[test]
fn from_full_array_moves_all_elements() {
    let v: InplaceVec<String, 3> = InplaceVec::from(["a".to_string(), "b".into(), "c".into()]);
    assert_eq!(v.as_slice(), &["a", "b", "c"]);
}

#[test]
fn from_iterator_collects() {
    let v: InplaceVec<i32, 8> = (0..5).collect();
    assert_eq!(v, [0, 1, 2, 3, 4]);
}

#[test]
fn clone_and_clone_from() {
    let mut a: InplaceVec<String, 4> = InplaceVec::new();
    a.extend(["x".to_string(), "y".into()]);
    let b = a.clone();
    assert_eq!(a, b);

    let mut c: InplaceVec<String, 4> = InplaceVec::new();
    c.extend(["1".to_string(), "2".into(), "3".into()]);
    a.clone_from(&c);
    assert_eq!(a, c);
}

#[test]
fn comparisons_between_capacities() {
    let mut a: InplaceVec<i32, 4> = InplaceVec::new();
    let mut b: InplaceVec<i32, 9, u8> = InplaceVec::new();
    a.extend([1, 2]);
    b.extend([1, 2]);
    assert_eq!(a, b);
    b.push(3);
    assert_ne!(a, b);
    assert!(a < b);
    assert_eq!(a, [1, 2]);
}

#[test]
fn pop_returns_in_reverse() {
    let mut v: InplaceVec<i32, 4> = InplaceVec::new();
    v.extend([1, 2, 3]);
    assert_eq!(v.pop(), Some(3));
    assert_eq!(v.pop(), Some(2));
    assert_eq!(v.pop(), Some(1));
    assert_eq!(v.pop(), None);
}

#[rstest]
#[case::start(0)]
#[case::middle(2)]
#[case::end(4)]
fn insert_at_any_position(#[case] index: usize) {
    let mut v: InplaceVec<i32, 8, u8> = InplaceVec::new();
    v.extend(0..4);
    v.insert(index, 99);
    assert_eq!(v[index], 99);
    assert_eq!(v.remove(index), 99);
    assert_eq!(v, [0, 1, 2, 3]);
}

#[test]
fn spare_capacity_and_set_len() {
    let mut v: InplaceVec<u32, 4> = InplaceVec::new();
    for (i, slot) in v.spare_capacity_mut().iter_mut().enumerate() {
        slot.write(i as u32);
    }
    unsafe { v.set_len(4) };
    assert_eq!(v, [0, 1, 2, 3]);
}

#[test]
fn const_construction() {
    const EMPTY: InplaceVec<u8, 8> = InplaceVec::new();
    let mut v = EMPTY;
    v.push(1);
    assert_eq!(v, [1]);
}
