use super::{BuildEnv, Built};
use crate::{
    dsp::{
        distortion::soft_clip,
        filter::SVFilter,
        oscillator::Oscillator,
    },
    graph::node::{DetuneHandle, GraphNode, RenderCtx},
    patch::MacroSettings,
    MAX_BLOCK_SIZE,
};

/// First three formants (Hz) of the vowels a, e, i, o, u.
const VOWELS: [[f32; 3]; 5] = [
    [800.0, 1150.0, 2900.0],
    [400.0, 1600.0, 2700.0],
    [350.0, 2300.0, 3000.0],
    [450.0, 800.0, 2830.0],
    [325.0, 700.0, 2530.0],
];
const FORMANT_GAINS: [f32; 3] = [1.0, 0.6, 0.35];
const MAKEUP_GAIN: f32 = 2.0;

/// Formant frequencies at a fractional position across the vowel table.
fn vowel_at(position: f32) -> [f32; 3] {
    let position = position.clamp(0.0, (VOWELS.len() - 1) as f32);
    let lower = position.floor() as usize;
    let upper = (lower + 1).min(VOWELS.len() - 1);
    let frac = position - lower as f32;
    let mut formants = [0.0; 3];
    for (k, formant) in formants.iter_mut().enumerate() {
        *formant = VOWELS[lower][k] + (VOWELS[upper][k] - VOWELS[lower][k]) * frac;
    }
    formants
}

/// A saw "glottal" source through three parallel band-passes.
struct Formant {
    source: Oscillator,
    filters: [SVFilter; 3],
    gains: [f32; 3],
    scratch: Vec<f32>,
}

impl GraphNode for Formant {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        let source = &mut self.scratch[..out.len()];
        self.source.render_block(source, ctx);

        for (o, &s) in out.iter_mut().zip(source.iter()) {
            let mut voiced = 0.0;
            for (filter, &gain) in self.filters.iter_mut().zip(self.gains.iter()) {
                voiced += filter.process(s) * gain;
            }
            *o = soft_clip(voiced * MAKEUP_GAIN, 1.0);
        }
    }

    fn stop(&mut self, at: f64) {
        self.source.stop(at);
    }

    fn is_active(&self) -> bool {
        self.source.is_active()
    }
}

pub(super) fn build(frequency: f32, settings: &MacroSettings, env: &BuildEnv) -> Built {
    let source = Oscillator::sawtooth(frequency);
    let pitched = vec![DetuneHandle::new(source.detune(), 0.0)];

    let shift = 2.0f32.powf((settings.harmonics - 0.5) * 1.2);
    let q = 4.0 + settings.timbre * 16.0;
    let formants = vowel_at(settings.morph * (VOWELS.len() - 1) as f32);

    let mut filters = [SVFilter::bandpass(), SVFilter::bandpass(), SVFilter::bandpass()];
    let mut gains = [0.0; 3];
    for k in 0..3 {
        let cutoff = (formants[k] * shift).min(env.nyquist() * 0.9);
        filters[k].set_params(cutoff, q, env.sample_rate);
        // The band-pass peaks at q; bring every formant back to its table gain.
        gains[k] = FORMANT_GAINS[k] / q;
    }

    Built {
        node: Box::new(Formant {
            source,
            filters,
            gains,
            scratch: vec![0.0; MAX_BLOCK_SIZE],
        }),
        pitched,
    }
}
