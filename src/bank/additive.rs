use super::{BuildEnv, Built};
use crate::{dsp::oscillator::Oscillator, graph::mix::Layers, patch::MacroSettings};

const MAX_PARTIALS: usize = 16;

/// Amplitude of partial `n` (1-based) before normalisation.
///
/// `tilt` is the exponent of the 1/n rolloff; `odd_even` at 0.5 is neutral,
/// towards 0 it favours even partials and towards 1 odd ones.
fn partial_gain(n: usize, tilt: f32, odd_even: f32) -> f32 {
    let rolloff = 1.0 / (n as f32).powf(tilt);
    let bias = if n == 1 {
        1.0
    } else if n % 2 == 0 {
        (2.0 * (1.0 - odd_even)).min(1.0)
    } else {
        (2.0 * odd_even).min(1.0)
    };
    rolloff * bias
}

pub(super) fn build(frequency: f32, settings: &MacroSettings, env: &BuildEnv) -> Built {
    let count = 1 + (settings.harmonics * (MAX_PARTIALS - 1) as f32).round() as usize;
    let tilt = 2.0 - 1.5 * settings.timbre;

    let mut layers = Layers::new();
    let mut pitched = Vec::with_capacity(count);
    for n in 1..=count {
        // Partials above Nyquist would only alias.
        if frequency * n as f32 >= env.nyquist() {
            break;
        }
        let offset = 1200.0 * (n as f32).log2();
        let gain = partial_gain(n, tilt, settings.morph);
        pitched.push(layers.push(Oscillator::sine(frequency), offset, gain));
    }
    layers.normalize(1.0);

    Built {
        node: Box::new(layers),
        pitched,
    }
}
