//! Macro oscillator bank.
//!
//! Eleven self-contained synthesis models share one calling convention: given
//! a note frequency and the four macro knobs they build a node that renders a
//! roughly unit-range signal. [`build`] wraps that node with the slot's output
//! level and collects every frequency-bearing node's detune handle.
//!
//! Knob meaning per model (harmonics / timbre / morph):
//!
//! | model     | harmonics           | timbre              | morph                 |
//! | --------- | ------------------- | ------------------- | --------------------- |
//! | va        | brightness          | detune spread       | sine→tri→saw→square   |
//! | fold      | fold drive          | fold symmetry       | sine↔triangle source  |
//! | pluck     | sustain             | brightness          | noise↔mallet exciter  |
//! | supersaw  | detune spread       | stereo width        | sub-octave sine       |
//! | pwm       | pulse width         | edge hardness       | width modulation      |
//! | fm        | operator ratio      | modulation index    | modulator feedback    |
//! | wavetable | brightness          | phase warp          | table position        |
//! | additive  | partial count       | spectral tilt       | odd↔even balance      |
//! | chord     | chord type          | sine↔saw tone       | voicing spread        |
//! | pulse     | bandwidth           | brightness          | second train (hollow) |
//! | formant   | formant shift       | resonance           | vowel a-e-i-o-u       |

use crate::{
    dsp::oscillator::NoiseBuffer,
    graph::node::{DetuneHandle, GraphNode, RenderCtx, SharedParam, StopTime},
    names::lenient_enum,
    patch::MacroSettings,
};

mod additive;
mod chord;
mod fm;
mod formant;
mod pluck;
mod pulse;
mod pwm;
mod supersaw;
mod virtual_analog;
mod wavefolder;
mod wavetable;

lenient_enum! {
    pub enum MacroModel {
        VirtualAnalog = "va",
        Wavefolder = "fold",
        Pluck = "pluck",
        Supersaw = "supersaw",
        Pwm = "pwm",
        Fm = "fm",
        Wavetable = "wavetable",
        Additive = "additive",
        Chord = "chord",
        Pulse = "pulse",
        Formant = "formant",
    }
    default = VirtualAnalog;
}

/// Shared resources a model may draw on while building.
#[derive(Clone, Copy)]
pub struct BuildEnv<'a> {
    pub sample_rate: f32,
    pub noise: &'a NoiseBuffer,
    /// Where this voice starts reading the shared noise, so voices decorrelate.
    pub noise_offset: usize,
}

impl<'a> BuildEnv<'a> {
    pub fn new(sample_rate: f32, noise: &'a NoiseBuffer) -> Self {
        Self {
            sample_rate,
            noise,
            noise_offset: 0,
        }
    }

    pub fn with_noise_offset(self, noise_offset: usize) -> Self {
        Self {
            noise_offset,
            ..self
        }
    }

    pub(crate) fn nyquist(&self) -> f32 {
        self.sample_rate * 0.5
    }
}

/// What a model hands back to [`build`].
pub(crate) struct Built {
    pub node: Box<dyn GraphNode>,
    pub pitched: Vec<DetuneHandle>,
}

/// A built model ready to sit in an oscillator slot.
pub struct MacroOscillator {
    node: Box<dyn GraphNode>,
    pitched: Vec<DetuneHandle>,
    level: SharedParam,
    // Models with filters after their sources would otherwise ring past the stop.
    stop: StopTime,
}

impl MacroOscillator {
    /// Detune handles of every frequency-bearing node in the model.
    pub fn pitched(&self) -> &[DetuneHandle] {
        &self.pitched
    }

    /// Move every pitched node by `cents`, keeping their internal intervals.
    pub fn retune(&self, cents: f32) {
        for handle in &self.pitched {
            handle.apply(cents);
        }
    }

    pub fn level(&self) -> SharedParam {
        self.level.clone()
    }
}

impl GraphNode for MacroOscillator {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        self.node.render_block(out, ctx);
        let level = self.level.get();
        for (i, sample) in out.iter_mut().enumerate() {
            *sample = if self.stop.running_at(ctx.sample_time(i)) {
                *sample * level
            } else {
                0.0
            };
        }
    }

    fn stop(&mut self, at: f64) {
        self.stop.schedule(at);
        self.node.stop(at);
    }

    fn is_active(&self) -> bool {
        !self.stop.is_stopped() && self.node.is_active()
    }
}

/// Precompute shared lookup tables so the first note of a model does not
/// pay for them on the audio thread.
pub fn prepare_tables() {
    wavetable::prepare();
}

/// Build `model` at `frequency` from the macro knobs in `settings`.
pub fn build(
    model: MacroModel,
    frequency: f32,
    settings: &MacroSettings,
    env: &BuildEnv,
) -> MacroOscillator {
    let frequency = frequency.clamp(1.0, env.nyquist() * 0.95);
    let Built { node, pitched } = match model {
        MacroModel::VirtualAnalog => virtual_analog::build(frequency, settings, env),
        MacroModel::Wavefolder => wavefolder::build(frequency, settings, env),
        MacroModel::Pluck => pluck::build(frequency, settings, env),
        MacroModel::Supersaw => supersaw::build(frequency, settings, env),
        MacroModel::Pwm => pwm::build(frequency, settings, env),
        MacroModel::Fm => fm::build(frequency, settings, env),
        MacroModel::Wavetable => wavetable::build(frequency, settings, env),
        MacroModel::Additive => additive::build(frequency, settings, env),
        MacroModel::Chord => chord::build(frequency, settings, env),
        MacroModel::Pulse => pulse::build(frequency, settings, env),
        MacroModel::Formant => formant::build(frequency, settings, env),
    };

    MacroOscillator {
        node,
        pitched,
        level: SharedParam::new(settings.level),
        stop: StopTime::default(),
    }
}
