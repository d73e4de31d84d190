#[macro_use]
extern crate criterion;

use criterion::{black_box, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

use reloc_vec::{DynArray, InplaceVec};

fn push_compare(c: &mut Criterion) {
    const SMALL_COUNT: usize = 100;
    const LARGE_COUNT: usize = 1000;

    for count in [SMALL_COUNT, LARGE_COUNT] {
        c.bench_function(&format!("dynarray push {} values", count), |b| {
            b.iter(|| {
                let mut arr = DynArray::<usize>::new();
                for value in 0..count {
                    arr.push(black_box(value));
                }
            });
        });

        c.bench_function(
            &format!("dynarray with_capacity({0}) push {0} values", count),
            |b| {
                b.iter(|| {
                    let mut arr = DynArray::<usize>::with_capacity(count);
                    for value in 0..count {
                        arr.push(black_box(value));
                    }
                });
            },
        );

        if count == SMALL_COUNT {
            c.bench_function(
                &format!("inplace({}) push {} values", SMALL_COUNT, count),
                |b| {
                    b.iter(|| {
                        let mut arr = InplaceVec::<usize, SMALL_COUNT>::new();
                        for value in 0..count {
                            arr.push(black_box(value));
                        }
                    });
                },
            );
        }

        c.bench_function(&format!("stdvec push {} values", count), |b| {
            b.iter(|| {
                let mut vec = Vec::<usize>::new();
                for value in 0..count {
                    vec.push(black_box(value));
                }
            });
        });
    }
}

fn insert_remove_compare(c: &mut Criterion) {
    const COUNT: usize = 500;

    let mut rng = StdRng::seed_from_u64(7);
    let positions: Vec<usize> = (0..COUNT).map(|i| rng.gen_range(0..=i)).collect();

    c.bench_function("dynarray insert/remove at random positions", |b| {
        b.iter(|| {
            let mut arr = DynArray::<usize>::new();
            for (i, pos) in positions.iter().enumerate() {
                arr.insert(*pos, black_box(i));
            }
            while !arr.is_empty() {
                black_box(arr.remove(arr.len() / 2));
            }
        });
    });

    c.bench_function("stdvec insert/remove at random positions", |b| {
        b.iter(|| {
            let mut vec = Vec::<usize>::new();
            for (i, pos) in positions.iter().enumerate() {
                vec.insert(*pos, black_box(i));
            }
            while !vec.is_empty() {
                black_box(vec.remove(vec.len() / 2));
            }
        });
    });

    c.bench_function("dynarray swap_remove", |b| {
        b.iter(|| {
            let mut arr: DynArray<usize> = (0..COUNT).collect();
            while !arr.is_empty() {
                black_box(arr.swap_remove(0));
            }
        });
    });
}

criterion_group!(benches, push_compare, insert_remove_compare);
criterion_main!(benches);
