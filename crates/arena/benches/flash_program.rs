use cart_arena::{plan, FlashDriver, InMemoryFlash, MemoryArena};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_bank_ptr_lookup(c: &mut Criterion) {
    let image_plan = plan(32 * 1024, 4096, None).expect("plan");

    c.bench_function("bank_ptr lookup", |b| {
        b.iter(|| {
            for i in 0..image_plan.bank_count {
                black_box(image_plan.bank_ptr(i));
            }
        })
    });
}

fn bench_flash_program_4k(c: &mut Criterion) {
    c.bench_function("prepare+write 4KiB to flash", |b| {
        b.iter(|| {
            let mut arena = MemoryArena::new(InMemoryFlash::new(0x0010_0000));
            arena.prepare_flash(4096).unwrap();
            let payload = vec![0x5Au8; 4096];
            arena.write_flash(black_box(&payload)).unwrap();
        })
    });
}

criterion_group!(benches, bench_bank_ptr_lookup, bench_flash_program_4k);
criterion_main!(benches);
