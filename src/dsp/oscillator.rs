use std::{f32::consts::TAU, sync::Arc};

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::{
    graph::node::{GraphNode, RenderCtx, SharedParam, StopTime},
    names::lenient_enum,
};

/*
Phase-Accumulator Oscillator
============================

Every pitched source in the synth (analog slots, the macro models, the
sub-oscillator and the LFOs) is built on the same phase accumulator:

    phase += frequency / sample_rate      (wrapped into [0, 1))

The instantaneous frequency is

    frequency = base * 2^((detune + pitch_mod) / 1200) + fm

where `detune` is a shared parameter (cents) that patch updates can change
while the note sounds, `pitch_mod` is the per-sample vibrato signal carried in
the render context and `fm` is an optional audio-rate deviation in Hz.

Saw and square use PolyBLEP correction around their discontinuities, which
removes most of the aliasing of the naive shapes for very little CPU.
*/

lenient_enum! {
    /// Basic waveforms for analog oscillator slots.
    pub enum Waveform {
        Sine = "sine",
        Triangle = "triangle",
        Sawtooth = "sawtooth",
        Square = "square",
    }
    default = Sine;
}

#[inline]
pub fn cents_to_ratio(cents: f32) -> f32 {
    2.0_f32.powf(cents / 1200.0)
}

/// Polynomial band-limited step correction.
#[inline]
fn poly_blep(t: f32, dt: f32) -> f32 {
    if t < dt {
        let t = t / dt;
        t + t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + t + t + 1.0
    } else {
        0.0
    }
}

/// Evaluate a waveform at `phase` (0..1) with per-sample increment `dt`.
#[inline]
pub fn waveform_sample(waveform: Waveform, phase: f32, dt: f32) -> f32 {
    let dt = dt.abs().clamp(1e-6, 0.5);
    match waveform {
        Waveform::Sine => (TAU * phase).sin(),
        Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        Waveform::Sawtooth => 2.0 * phase - 1.0 - poly_blep(phase, dt),
        Waveform::Square => {
            let naive = if phase < 0.5 { 1.0 } else { -1.0 };
            naive + poly_blep(phase, dt) - poly_blep((phase + 0.5).fract(), dt)
        }
    }
}

pub struct Oscillator {
    waveform: Waveform,
    frequency: f32,
    detune: SharedParam,
    phase: f32,
    stop: StopTime,
}

impl Oscillator {
    pub fn new(waveform: Waveform, frequency: f32) -> Self {
        Self {
            waveform,
            frequency,
            detune: SharedParam::new(0.0),
            phase: 0.0,
            stop: StopTime::default(),
        }
    }

    pub fn sine(frequency: f32) -> Self {
        Self::new(Waveform::Sine, frequency)
    }

    pub fn sawtooth(frequency: f32) -> Self {
        Self::new(Waveform::Sawtooth, frequency)
    }

    pub fn square(frequency: f32) -> Self {
        Self::new(Waveform::Square, frequency)
    }

    pub fn triangle(frequency: f32) -> Self {
        Self::new(Waveform::Triangle, frequency)
    }

    /// Start phase in cycles (0..1).
    pub fn with_phase(mut self, phase: f32) -> Self {
        self.phase = phase.rem_euclid(1.0);
        self
    }

    /// Initial detune in cents (100 cents = 1 semitone).
    pub fn with_detune(self, cents: f32) -> Self {
        self.detune.set(cents);
        self
    }

    /// Live detune handle (cents).
    pub fn detune(&self) -> SharedParam {
        self.detune.clone()
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
    }

    /// Render with an optional audio-rate frequency deviation in Hz.
    pub fn render_fm(&mut self, out: &mut [f32], ctx: &RenderCtx, fm_hz: Option<&[f32]>) {
        let sample_rate = ctx.sample_rate;
        let detune = self.detune.get();
        let static_freq = self.frequency * cents_to_ratio(detune);

        for (i, sample) in out.iter_mut().enumerate() {
            if !self.stop.running_at(ctx.sample_time(i)) {
                *sample = 0.0;
                continue;
            }

            let pitch = ctx.pitch_cents(i);
            let mut freq = if pitch == 0.0 {
                static_freq
            } else {
                self.frequency * cents_to_ratio(detune + pitch)
            };
            if let Some(fm) = fm_hz {
                freq += fm.get(i).copied().unwrap_or(0.0);
            }

            let dt = freq / sample_rate;
            *sample = waveform_sample(self.waveform, self.phase, dt);
            self.phase = (self.phase + dt).rem_euclid(1.0);
        }
    }
}

impl GraphNode for Oscillator {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        self.render_fm(out, ctx, None);
    }

    fn stop(&mut self, at: f64) {
        self.stop.schedule(at);
    }

    fn is_active(&self) -> bool {
        !self.stop.is_stopped()
    }
}

/// Pre-rendered white noise shared by every voice.
///
/// Generated once per engine so noise excitation (plucks, breath) costs a
/// buffer read instead of a PRNG call per sample.
#[derive(Clone)]
pub struct NoiseBuffer {
    samples: Arc<[f32]>,
}

impl NoiseBuffer {
    pub fn new(len: usize, seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let samples: Vec<f32> = (0..len.max(1))
            .map(|_| rng.random_range(-1.0f32..=1.0))
            .collect();
        Self {
            samples: samples.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample at `index`, wrapping around the buffer.
    #[inline]
    pub fn at(&self, index: usize) -> f32 {
        self.samples[index % self.samples.len()]
    }

    /// A player that starts reading at `offset`.
    pub fn reader(&self, offset: usize) -> NoiseReader {
        NoiseReader {
            buffer: self.clone(),
            position: offset % self.samples.len(),
        }
    }
}

/// Looping cursor over a [`NoiseBuffer`].
pub struct NoiseReader {
    buffer: NoiseBuffer,
    position: usize,
}

impl NoiseReader {
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let value = self.buffer.at(self.position);
        self.position = (self.position + 1) % self.buffer.len();
        value
    }
}
