//! Benchmarks for delay line operations.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_synth::dsp::delay::DelayLine;

use crate::BLOCK_SIZES;

pub fn bench_delay(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/delay");

    // Test with different delay times (in samples)
    let delay_times: &[usize] = &[
        480,    // 10ms at 48kHz
        4800,   // 100ms at 48kHz
        48000,  // 1 second at 48kHz
    ];

    for &size in BLOCK_SIZES {
        // Generate a test signal
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 * 0.1).sin())
            .collect();

        for &delay_samples in delay_times {
            let delay_ms = delay_samples as f32 / 48.0;

            // Basic delay render (integer delay)
            let mut delay = DelayLine::new();
            let mut buffer = input.clone();
            group.bench_with_input(
                BenchmarkId::new(format!("render_{}ms", delay_ms as u32), size),
                &size,
                |b, _| {
                    b.iter(|| {
                        buffer.copy_from_slice(&input);
                        delay.render(black_box(&mut buffer), black_box(delay_samples));
                    })
                },
            );
        }

        // Feedback echo as run by the master bus (fractional read + write)
        let mut delay = DelayLine::with_capacity(96_004);
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("feedback_echo", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                for sample in buffer.iter_mut() {
                    let echo = delay.read_frac(black_box(16_800.5));
                    delay.write(*sample + echo * 0.4);
                    *sample += echo * 0.3;
                }
            })
        });
    }

    group.finish();
}
