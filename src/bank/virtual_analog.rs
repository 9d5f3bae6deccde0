use super::{BuildEnv, Built};
use crate::{
    dsp::{
        filter::SVFilter,
        oscillator::{Oscillator, Waveform},
    },
    graph::{
        mix::Layers,
        node::{GraphNode, RenderCtx},
    },
    patch::MacroSettings,
};

const SHAPES: [Waveform; 4] = [
    Waveform::Sine,
    Waveform::Triangle,
    Waveform::Sawtooth,
    Waveform::Square,
];
/// Detune pattern (scaled by timbre) so the blend beats instead of phasing.
const SPREAD: [f32; 4] = [-1.0, 1.0, -0.5, 0.5];
const MAX_SPREAD_CENTS: f32 = 12.0;

struct VirtualAnalog {
    layers: Layers,
    tone: SVFilter,
}

impl GraphNode for VirtualAnalog {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        self.layers.render_block(out, ctx);
        self.tone.render(out);
    }

    fn stop(&mut self, at: f64) {
        self.layers.stop(at);
    }

    fn is_active(&self) -> bool {
        self.layers.is_active()
    }
}

pub(super) fn build(frequency: f32, settings: &MacroSettings, env: &BuildEnv) -> Built {
    // Morph walks the four shapes; adjacent shapes crossfade linearly.
    let position = settings.morph * (SHAPES.len() - 1) as f32;

    let mut layers = Layers::new();
    let mut pitched = Vec::with_capacity(SHAPES.len());
    for (i, (&shape, &spread)) in SHAPES.iter().zip(SPREAD.iter()).enumerate() {
        let weight = (1.0 - (position - i as f32).abs()).max(0.0);
        let osc = Oscillator::new(shape, frequency).with_phase(i as f32 * 0.25);
        let offset = spread * settings.timbre * MAX_SPREAD_CENTS;
        pitched.push(layers.push(osc, offset, weight));
    }

    let brightness = settings.harmonics * settings.harmonics;
    let cutoff = (frequency * (2.0 + 60.0 * brightness)).min(env.nyquist() * 0.9);
    let mut tone = SVFilter::lowpass();
    tone.set_params(cutoff, 0.707, env.sample_rate);

    Built {
        node: Box::new(VirtualAnalog { layers, tone }),
        pitched,
    }
}
