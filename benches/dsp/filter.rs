//! Benchmarks for state-variable filter.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_synth::dsp::filter::{FilterType, SVFilter};

use crate::BLOCK_SIZES;

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");
    let sample_rate = 48_000.0;

    for &size in BLOCK_SIZES {
        // Generate a test signal (sawtooth-like ramp)
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 / size as f32) * 2.0 - 1.0)
            .collect();

        for &filter_type in FilterType::ALL {
            let mut filter = SVFilter::new(filter_type);
            filter.set_params(1000.0, 2.0, sample_rate);
            let mut buffer = input.clone();
            group.bench_with_input(BenchmarkId::new(filter_type.as_str(), size), &size, |b, _| {
                b.iter(|| {
                    buffer.copy_from_slice(&input);
                    filter.render(black_box(&mut buffer));
                })
            });
        }

        // Modulated cutoff - coefficients recomputed every 16 samples like the master bus
        let mut filter = SVFilter::lowpass();
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("lowpass_swept", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                for (i, sample) in buffer.iter_mut().enumerate() {
                    if i % 16 == 0 {
                        let cutoff = 800.0 + (i as f32 * 0.05).sin() * 600.0;
                        filter.set_params(cutoff, 2.0, sample_rate);
                    }
                    *sample = filter.process(*sample);
                }
                black_box(&buffer);
            })
        });
    }

    group.finish();
}
