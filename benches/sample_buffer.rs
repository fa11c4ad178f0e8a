use biostream_core::acquisition::SampleBuffer;
use biostream_core::Sample;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const CHANNEL_COUNTS: &[usize] = &[8, 12, 32];
const BUFFER_SIZES: &[usize] = &[1_000, 100_000];

fn benchmark_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample_buffer_push");
    group.throughput(Throughput::Elements(1000));

    for &channels in CHANNEL_COUNTS {
        for &capacity in BUFFER_SIZES {
            group.bench_with_input(
                BenchmarkId::new("push", format!("{}ch_{}cap", channels, capacity)),
                &(channels, capacity),
                |b, &(channels, capacity)| {
                    let buffer = SampleBuffer::new(capacity, channels).unwrap();
                    let sample = Sample::new(vec![1.0f32; channels], 0.0);
                    b.iter(|| {
                        for _ in 0..1000 {
                            black_box(buffer.push(black_box(&sample)));
                        }
                    });
                },
            );
        }
    }
    group.finish();
}

fn benchmark_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample_buffer_drain");

    for &channels in CHANNEL_COUNTS {
        let buffer = SampleBuffer::new(10_000, channels).unwrap();
        let sample = Sample::new(vec![1.0f32; channels], 0.0);
        for _ in 0..10_000 {
            buffer.push(&sample);
        }

        group.bench_with_input(
            BenchmarkId::new("drain_latest_250", format!("{}ch", channels)),
            &buffer,
            |b, buffer| b.iter(|| black_box(buffer.drain_latest(250))),
        );

        group.bench_with_input(
            BenchmarkId::new("drain_all_then_refill", format!("{}ch", channels)),
            &channels,
            |b, &channels| {
                let buffer = SampleBuffer::new(1_000, channels).unwrap();
                let sample = Sample::new(vec![1.0f32; channels], 0.0);
                b.iter(|| {
                    for _ in 0..1_000 {
                        buffer.push(&sample);
                    }
                    black_box(buffer.drain_all())
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, benchmark_push, benchmark_drain);
criterion_main!(benches);
