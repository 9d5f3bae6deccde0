//! Low Frequency Oscillators.

use super::{
    filter::OnePole,
    oscillator::{waveform_sample, NoiseReader, Waveform},
};
use crate::names::lenient_enum;

/*
Low Frequency Oscillators
=========================

An LFO is an oscillator running below the audio band (0.01 to ~40 Hz here).
The engine runs two of them continuously on the audio clock, free-running and
shared by every voice. Their raw output is a bipolar unit signal in [-1, 1];
depth and destination scaling happen in the modulation taps, not here.

Shapes
------

  sine        smooth sweep, the vibrato default
  triangle    constant rate of change
  sawtooth    ramp up, snap down (risers, rhythmic sweeps)
  square      hard switching (trills, gated tremolo)
  noise       white noise through a one-pole lowpass tuned to the rate,
              a wandering random signal rather than sample-and-hold steps

The noise shape is gain-compensated so its RMS stays near the RMS of a
uniform random signal regardless of rate, then clipped to [-1, 1].

Typical rates
-------------

    0.01 - 0.5 Hz   slow filter movement, evolving textures
    0.5 - 2 Hz      tremolo
    2 - 7 Hz        vibrato sweet spot
    > 15 Hz         approaching audio-rate FM/AM territory
*/

pub const MIN_RATE: f32 = 0.01;
pub const MAX_RATE: f32 = 40.0;

lenient_enum! {
    pub enum LfoShape {
        Sine = "sine",
        Triangle = "triangle",
        Sawtooth = "sawtooth",
        Square = "square",
        Noise = "noise",
    }
    default = Sine;
}

pub struct Lfo {
    shape: LfoShape,
    rate: f32,
    phase: f32,
    noise: NoiseReader,
    smoother: OnePole,
    noise_gain: f32,
    sample_rate: f32,
}

impl Lfo {
    pub fn new(shape: LfoShape, rate: f32, sample_rate: f32, noise: NoiseReader) -> Self {
        let mut lfo = Self {
            shape,
            rate: MIN_RATE,
            phase: 0.0,
            noise,
            smoother: OnePole::default(),
            noise_gain: 1.0,
            sample_rate,
        };
        lfo.set_rate(rate);
        lfo
    }

    pub fn shape(&self) -> LfoShape {
        self.shape
    }

    pub fn set_shape(&mut self, shape: LfoShape) {
        self.shape = shape;
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate.clamp(MIN_RATE, MAX_RATE);

        // Variance of a one-pole lowpass driven by white noise scales with
        // a / (2 - a); undo that so slow and fast noise sound equally deep.
        let coeff = 1.0 - (-std::f32::consts::TAU * self.rate / self.sample_rate).exp();
        self.smoother.set_coeff(coeff);
        self.noise_gain = ((2.0 - coeff) / coeff.max(1e-9)).sqrt();
    }

    pub fn next_sample(&mut self) -> f32 {
        let dt = self.rate / self.sample_rate;
        let value = match self.shape {
            LfoShape::Sine => waveform_sample(Waveform::Sine, self.phase, dt),
            LfoShape::Triangle => waveform_sample(Waveform::Triangle, self.phase, dt),
            LfoShape::Sawtooth => 2.0 * self.phase - 1.0,
            LfoShape::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            LfoShape::Noise => {
                let white = self.noise.next_sample();
                (self.smoother.process(white) * self.noise_gain).clamp(-1.0, 1.0)
            }
        };
        self.phase = (self.phase + dt).fract();
        value
    }

    pub fn render(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = self.next_sample();
        }
    }
}
