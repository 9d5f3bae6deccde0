//! Benchmarks for the phase vocoder pitch shifter.
//!
//! Input lengths here are whole samples rather than audio blocks: the
//! shift runs once per note on the decode worker.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_synth::dsp::vocoder;

/// Half a second, one second and two seconds at 48kHz.
const LENGTHS: &[usize] = &[24_000, 48_000, 96_000];

pub fn bench_vocoder(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/vocoder");
    group.sample_size(10);

    for &len in LENGTHS {
        let mono = vec![(0..len)
            .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / 48_000.0).sin())
            .collect::<Vec<f32>>()];

        for &(name, ratio) in &[("octave_down", 0.5f32), ("fifth_up", 1.5), ("octave_up", 2.0)] {
            group.bench_with_input(BenchmarkId::new(name, len), &len, |b, _| {
                b.iter(|| vocoder::shift(black_box(&mono), black_box(ratio)))
            });
        }

        let stereo = vec![mono[0].clone(), mono[0].clone()];
        group.bench_with_input(BenchmarkId::new("stereo_fifth_up", len), &len, |b, _| {
            b.iter(|| vocoder::shift(black_box(&stereo), black_box(1.5)))
        });
    }

    group.finish();
}
