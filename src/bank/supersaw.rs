use super::{BuildEnv, Built};
use crate::{
    dsp::oscillator::Oscillator,
    graph::mix::{equal_power_mid, Layers},
    patch::MacroSettings,
};

/// Relative detune and stereo position of the six saws.
const SPREAD: [f32; 6] = [-1.0, -0.62, -0.21, 0.21, 0.62, 1.0];
const MAX_DETUNE_CENTS: f32 = 50.0;

pub(super) fn build(frequency: f32, settings: &MacroSettings, env: &BuildEnv) -> Built {
    let mut layers = Layers::new();
    let mut pitched = Vec::with_capacity(SPREAD.len() + 1);

    // Detune grows faster near the top of the knob.
    let detune = settings.harmonics.powf(1.5) * MAX_DETUNE_CENTS;
    for (i, &spread) in SPREAD.iter().enumerate() {
        // Free-running start phases, deterministic per voice.
        let phase = env.noise.at(env.noise_offset + i * 97) * 0.5 + 0.5;
        let pan = spread * settings.timbre;
        let osc = Oscillator::sawtooth(frequency).with_phase(phase);
        pitched.push(layers.push(osc, spread * detune, equal_power_mid(pan)));
    }
    layers.normalize(1.0 - settings.morph * 0.5);

    // Sub-octave sine to anchor the stack.
    pitched.push(layers.push(Oscillator::sine(frequency), -1200.0, settings.morph * 0.5));

    Built {
        node: Box::new(layers),
        pitched,
    }
}
