use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ring_buffer::{CapturedFrame, FrameRingBuffer};

fn bench_push(c: &mut Criterion) {
    let mut buffer: FrameRingBuffer = FrameRingBuffer::new();
    let frame = CapturedFrame::new(0x18FEF100, 8, &[0x11; 8], true, false, 0);

    c.bench_function("push_full_buffer", |b| {
        b.iter(|| buffer.push(black_box(frame)))
    });
}

fn bench_snapshot(c: &mut Criterion) {
    let mut buffer: FrameRingBuffer = FrameRingBuffer::new();
    for i in 0..64u32 {
        buffer.push(CapturedFrame::new(i, 8, &[i as u8; 8], false, false, i as u64));
    }

    c.bench_function("snapshot_20", |b| b.iter(|| buffer.snapshot(black_box(20))));
}

criterion_group!(benches, bench_push, bench_snapshot);
criterion_main!(benches);
