use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};
use sniffer_core::{BoundaryInferencer, ByteStream, ChecksumKind, InferenceParams};

const BYTE_NS: u64 = 1_041_667;

fn make_capture(num_frames: usize, kind: ChecksumKind) -> ByteStream {
    let mut rng = StdRng::seed_from_u64(7);
    let mut samples = Vec::new();
    let mut t = 0u64;
    for _ in 0..num_frames {
        let len = rng.gen_range(4..24);
        let payload: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
        for b in kind.frame(&payload) {
            samples.push((b, t));
            t += BYTE_NS + rng.gen_range(0..50_000);
        }
        // Some frames run into the next one without idle time
        if rng.gen_bool(0.7) {
            t += rng.gen_range(5..40) * 1_000_000;
        }
    }
    ByteStream::from_samples(samples).unwrap()
}

fn bench_inference(c: &mut Criterion) {
    let mut group = c.benchmark_group("inference");
    let kind = ChecksumKind::Xor;

    for &frames in &[100usize, 1_000] {
        let stream = make_capture(frames, kind);
        group.throughput(Throughput::Bytes(stream.len() as u64));

        let timing_only = BoundaryInferencer::new(InferenceParams::default().auto_detect(false)).unwrap();
        group.bench_with_input(BenchmarkId::new("timing_only", frames), &stream, |b, s| {
            b.iter(|| criterion::black_box(timing_only.infer(s).unwrap()));
        });

        let with_checksum = BoundaryInferencer::new(InferenceParams::default().checksum(kind)).unwrap();
        group.bench_with_input(BenchmarkId::new("with_checksum", frames), &stream, |b, s| {
            b.iter(|| criterion::black_box(with_checksum.infer(s).unwrap()));
        });

        let auto_detect = BoundaryInferencer::new(InferenceParams::default()).unwrap();
        group.bench_with_input(BenchmarkId::new("auto_detect", frames), &stream, |b, s| {
            b.iter(|| criterion::black_box(auto_detect.infer(s).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_inference);
criterion_main!(benches);
