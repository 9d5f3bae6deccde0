//! Benchmarks for whole engine blocks.
//!
//! These run the complete path: scheduler ticks, per-voice modulation,
//! voice rendering and the master effects chain.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_synth::bank::MacroModel;
use saavy_synth::patch::{ModMatrixRow, ModSource, ModTarget, OscMode};
use saavy_synth::{EngineConfig, Patch, SynthEngine};

use crate::BLOCK_SIZES;

fn bench_patch() -> Patch {
    let mut patch = Patch::default();
    patch.osc1.mode = OscMode::Macro;
    patch.osc1.macro_settings.model = MacroModel::Supersaw;
    patch.effects.delay.mix = 0.25;
    patch.effects.reverb.mix = 0.2;
    patch.lfo1.depth = 0.3;
    patch.modulation = vec![
        ModMatrixRow::new("wobble", ModSource::Lfo1, ModTarget::Mix, 0.4),
        ModMatrixRow::new("brightness", ModSource::Velocity, ModTarget::MacroHarmonics, 0.5),
    ];
    patch
}

fn engine_with_voices(voices: u8) -> SynthEngine {
    let config = EngineConfig {
        decode_in_background: false,
        ..EngineConfig::default()
    };
    let mut engine = SynthEngine::with_patch(config, bench_patch());
    for i in 0..voices {
        engine.note_on(48 + i * 3, 0.8);
    }
    engine
}

pub fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/engine");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for &voices in &[1u8, 4, 8] {
            let mut engine = engine_with_voices(voices);
            group.bench_with_input(
                BenchmarkId::new(format!("{voices}_voices"), size),
                &size,
                |b, _| {
                    b.iter(|| {
                        engine.render_block(black_box(&mut buffer));
                    })
                },
            );
        }

        // Sequencer driving the supersaw on every sixteenth
        let mut patch = bench_patch();
        patch.sequencer.enabled = true;
        patch.tempo = 140.0;
        let config = EngineConfig {
            decode_in_background: false,
            ..EngineConfig::default()
        };
        let mut engine = SynthEngine::with_patch(config, patch);
        engine.set_sequencer_playing(true);
        group.bench_with_input(BenchmarkId::new("sequencer", size), &size, |b, _| {
            b.iter(|| {
                engine.render_block(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
