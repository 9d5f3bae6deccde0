//! Benchmarks for oscillator waveform generation.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_synth::dsp::oscillator::{NoiseBuffer, Oscillator, Waveform};
use saavy_synth::graph::node::{GraphNode, RenderCtx};

use crate::BLOCK_SIZES;

pub fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");
    let ctx = RenderCtx::new(48_000.0, 0.0);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for &waveform in Waveform::ALL {
            let mut osc = Oscillator::new(waveform, 440.0);
            group.bench_with_input(BenchmarkId::new(waveform.as_str(), size), &size, |b, _| {
                b.iter(|| {
                    osc.render_block(black_box(&mut buffer), black_box(&ctx));
                })
            });
        }

        // Vibrato - per-sample pitch offset from the render context
        let vibrato: Vec<f32> = (0..size).map(|i| (i as f32 * 0.01).sin() * 50.0).collect();
        let vibrato_ctx = ctx.with_pitch_mod(&vibrato);
        let mut osc = Oscillator::new(Waveform::Sawtooth, 440.0);
        group.bench_with_input(BenchmarkId::new("sawtooth_vibrato", size), &size, |b, _| {
            b.iter(|| {
                osc.render_block(black_box(&mut buffer), black_box(&vibrato_ctx));
            })
        });

        // FM - audio-rate deviation in Hz
        let deviation: Vec<f32> = (0..size).map(|i| (i as f32 * 0.2).sin() * 200.0).collect();
        let mut osc = Oscillator::new(Waveform::Sine, 440.0);
        group.bench_with_input(BenchmarkId::new("sine_fm", size), &size, |b, _| {
            b.iter(|| {
                osc.render_fm(black_box(&mut buffer), black_box(&ctx), Some(&deviation));
            })
        });

        // Noise - shared precomputed buffer
        let noise = NoiseBuffer::new(48_000, 7);
        let mut reader = noise.reader(0);
        group.bench_with_input(BenchmarkId::new("noise", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    *sample = reader.next_sample();
                }
                black_box(&buffer);
            })
        });
    }

    group.finish();
}
