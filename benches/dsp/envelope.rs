//! Benchmarks for ADSR envelope generator.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_synth::dsp::envelope::Envelope;
use saavy_synth::graph::node::RenderCtx;

use crate::BLOCK_SIZES;

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Attack phase (ramping up)
        let ctx = RenderCtx::new(48_000.0, 0.0);
        let mut env = Envelope::adsr(0.1, 0.1, 0.7, 0.3);
        env.note_on(0.0, 1.0);
        group.bench_with_input(BenchmarkId::new("attack", size), &size, |b, _| {
            b.iter(|| {
                env.render(black_box(&mut buffer), black_box(&ctx));
            })
        });

        // Sustain phase (holding steady)
        let ctx = RenderCtx::new(48_000.0, 1.0);
        let mut env = Envelope::adsr(0.001, 0.001, 0.7, 0.3);
        env.note_on(0.0, 1.0);
        group.bench_with_input(BenchmarkId::new("sustain", size), &size, |b, _| {
            b.iter(|| {
                env.render(black_box(&mut buffer), black_box(&ctx));
            })
        });

        // Release phase (ramping down)
        let ctx = RenderCtx::new(48_000.0, 0.5);
        let mut env = Envelope::adsr(0.001, 0.001, 0.7, 1.0);
        env.note_on(0.0, 1.0);
        env.note_off(0.45);
        group.bench_with_input(BenchmarkId::new("release", size), &size, |b, _| {
            b.iter(|| {
                env.render(black_box(&mut buffer), black_box(&ctx));
            })
        });
    }

    group.finish();
}
