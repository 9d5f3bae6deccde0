//! Benchmarks for waveshaping distortion.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_synth::dsp::distortion;

use crate::BLOCK_SIZES;

pub fn bench_distortion(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/distortion");

    for &size in BLOCK_SIZES {
        // Generate a test signal (sine-like values)
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 * 0.1).sin())
            .collect();

        // Soft clip - formant model output stage
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("soft_clip", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                distortion::soft_clip_buffer(black_box(&mut buffer), black_box(4.0));
            })
        });

        // Tanh saturation - pwm model
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("saturate", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                for sample in buffer.iter_mut() {
                    *sample = distortion::saturate(*sample, black_box(2.0));
                }
            })
        });

        // Foldback - wavefolder model (potentially more expensive)
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("foldback", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                for sample in buffer.iter_mut() {
                    *sample = distortion::foldback(*sample, black_box(3.0), black_box(0.5));
                }
            })
        });
    }

    group.finish();
}
