use criterion::{black_box, criterion_group, criterion_main, Criterion};

use vivavoce_audio::{pcm16, resample_linear, FrameAggregator};

/// 10ms of a 440Hz tone at 48kHz, the typical capture callback size
fn capture_block() -> Vec<f32> {
    (0..480)
        .map(|i| (i as f32 * 440.0 * 2.0 * std::f32::consts::PI / 48000.0).sin() * 0.5)
        .collect()
}

fn bench_resample(c: &mut Criterion) {
    let block = capture_block();
    c.bench_function("resample 48k→24k 10ms", |b| {
        b.iter(|| resample_linear(black_box(&block), 48000, 24000))
    });
    c.bench_function("resample 44.1k→24k 10ms", |b| {
        b.iter(|| resample_linear(black_box(&block[..441]), 44100, 24000))
    });
}

fn bench_encode(c: &mut Criterion) {
    let block = resample_linear(&capture_block(), 48000, 24000);
    c.bench_function("pcm16 encode 240", |b| b.iter(|| pcm16::encode(black_box(&block))));
}

fn bench_frame_path(c: &mut Criterion) {
    let block = capture_block();
    c.bench_function("frame path 1s", |b| {
        b.iter(|| {
            let mut aggregator = FrameAggregator::new(4800, 48000).unwrap();
            let mut chunks = 0;
            for _ in 0..100 {
                let encoded = pcm16::encode(&resample_linear(&block, 48000, 24000));
                aggregator.push(encoded);
                chunks += aggregator.drain_ready().len();
            }
            black_box(chunks)
        })
    });
}

criterion_group!(benches, bench_resample, bench_encode, bench_frame_path);
criterion_main!(benches);
