//! Slot Allocator Benchmarks
//!
//! Performance benchmarks for the paging slot allocator

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use texpack_core::{
    CoreResult, OwnerId, PageDescriptor, PixelFormat, SizeKey, SlotHandler, TextureArrayBackend,
    TextureInfo,
};

/// Backend that allocates nothing
struct NullBackend;

impl TextureArrayBackend for NullBackend {
    type Source = ();
    type Array = ();

    fn describe(&self, _source: &()) -> TextureInfo {
        TextureInfo::new(256, 256, PixelFormat::Bc7)
    }

    fn create_array(&mut self, _descriptor: &PageDescriptor) -> CoreResult<()> {
        Ok(())
    }

    fn copy_into(&mut self, _source: &(), _target: &mut (), _layer: u32) -> CoreResult<()> {
        Ok(())
    }

    fn create_default(&mut self, _info: &TextureInfo, _color: [u8; 4]) -> CoreResult<()> {
        Ok(())
    }
}

fn new_handler() -> SlotHandler<()> {
    let key = SizeKey::square(256);
    SlotHandler::new(OwnerId::next(), key, PageDescriptor::new(&key, PixelFormat::Bc7, 100), None)
}

fn bench_fresh_allocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("fresh_allocation");

    for count in [100, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let mut backend = NullBackend;
                let mut slots = new_handler();
                for _ in 0..count {
                    black_box(slots.next_free_slot(&mut backend).ok());
                }
                slots
            });
        });
    }

    group.finish();
}

fn bench_recycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("recycle");

    for count in [100, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter_batched(
                || {
                    let mut backend = NullBackend;
                    let mut slots = new_handler();
                    let held: Vec<_> = (0..count)
                        .filter_map(|_| slots.next_free_slot(&mut backend).ok())
                        .collect();
                    (slots, held)
                },
                |(mut slots, held)| {
                    let mut backend = NullBackend;
                    for slot in held {
                        slots.free_slot(slot);
                    }
                    for _ in 0..count {
                        black_box(slots.next_free_slot(&mut backend).ok());
                    }
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fresh_allocation, bench_recycle);
criterion_main!(benches);
