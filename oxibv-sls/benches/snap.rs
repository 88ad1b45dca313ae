//! Micro-benchmarks for the directional snap operations.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use num_bigint::BigInt;
use oxibv_sls::{BitVec, Valuation};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn ranged(bw: u32) -> Valuation {
    let mut v = Valuation::new(bw);
    let hi = BigInt::from(3) << (bw as usize - 2);
    v.add_range(&BigInt::from(17), &hi);
    for i in (0..bw as usize / 4).step_by(3) {
        v.pin_bit(i, i % 2 == 0);
    }
    v.init_fixed();
    v
}

fn bench_snaps(c: &mut Criterion) {
    let mut group = c.benchmark_group("snap");
    for bw in [8u32, 64, 256] {
        let v = ranged(bw);
        let src = {
            let mut s = BitVec::new(bw);
            for i in (0..bw as usize).step_by(2) {
                s.set_bit(i, true);
            }
            s
        };
        let mut dst = BitVec::new(bw);
        group.bench_function(format!("get_at_most/{bw}"), |b| {
            b.iter(|| black_box(v.get_at_most(black_box(&src), &mut dst)))
        });
        group.bench_function(format!("get_at_least/{bw}"), |b| {
            b.iter(|| black_box(v.get_at_least(black_box(&src), &mut dst)))
        });
    }
    group.finish();
}

fn bench_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampling");
    for bw in [8u32, 64, 256] {
        let mut v = ranged(bw);
        let src = {
            let mut s = BitVec::new(bw);
            s.set_bit(bw as usize - 1, true);
            s
        };
        let mut tmp = BitVec::new(bw);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        group.bench_function(format!("set_random_at_most/{bw}"), |b| {
            b.iter(|| black_box(v.set_random_at_most(black_box(&src), &mut tmp, &mut rng)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_snaps, bench_sampling);
criterion_main!(benches);
