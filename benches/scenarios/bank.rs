//! Benchmarks for the macro oscillator models.
//!
//! Each model is built at A3 with centred knobs and rendered for a block.
//! Models with many partials (additive, supersaw, chord) are the ones to
//! watch against the deadline.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_synth::bank::{self, BuildEnv, MacroModel};
use saavy_synth::dsp::oscillator::NoiseBuffer;
use saavy_synth::graph::node::{GraphNode, RenderCtx};
use saavy_synth::patch::MacroSettings;

use crate::BLOCK_SIZES;

pub fn bench_bank(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/bank");
    let sample_rate = 48_000.0;
    let noise = NoiseBuffer::new(96_000, 0x5eed);
    let env = BuildEnv::new(sample_rate, &noise);
    let ctx = RenderCtx::new(sample_rate, 0.0);
    bank::prepare_tables();

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for &model in MacroModel::ALL {
            let settings = MacroSettings {
                model,
                ..MacroSettings::default()
            };
            let mut osc = bank::build(model, 220.0, &settings, &env);
            group.bench_with_input(BenchmarkId::new(model.as_str(), size), &size, |b, _| {
                b.iter(|| {
                    osc.render_block(black_box(&mut buffer), black_box(&ctx));
                })
            });
        }
    }

    // Building happens on note-on, so it is on the audio thread too
    group.bench_function("build_all_models", |b| {
        b.iter(|| {
            for &model in MacroModel::ALL {
                let settings = MacroSettings {
                    model,
                    ..MacroSettings::default()
                };
                black_box(bank::build(model, 220.0, &settings, &env));
            }
        })
    });

    group.finish();
}
