use std::f32::consts::{PI, TAU};

use rustfft::num_complex::Complex;

use super::fft::{hann_window, Radix2Fft};

/*
Phase Vocoder Pitch Shift
=========================

Shifts the pitch of a buffer without changing its length.

Vocabulary
----------

  frame       `window` samples starting at `frame_index * hop`, multiplied
              by a Hann window before the forward FFT.

  bin         One FFT output. Bin k sits at k * sample_rate / window Hz.

  expected    The phase a pure tone exactly at bin k advances by between
              two frames: 2π · hop · k / window.

  inst_freq   Expected advance plus the measured deviation, wrapped into
              [-π, π]. This is the true per-hop phase advance of whatever
              partial landed in bin k.


Per frame and channel
---------------------

    analysis     magnitude[k], inst_freq[k]       for k in 0..=N/2
    shift        read both arrays at k / ratio    (linear interpolation)
                 sources past Nyquist hold the top bin
    synthesis    out_phase[k] += inst_freq · ratio
                 bins N/2+1.. mirror the lower half as conjugates,
                 DC and Nyquist stay real
    overlap-add  inverse FFT, window again, accumulate into the output and
                 add window² into an energy buffer at the same positions

Once every frame is in, each output sample is divided by the accumulated
window energy at its position, then the buffer is cut back to the input
length.

A ratio within 1e-6 of unity skips all of this and returns a copy.
*/

pub const DEFAULT_WINDOW: usize = 2048;
pub const DEFAULT_HOP: usize = 512;
const MIN_WINDOW: usize = 256;
const MAX_WINDOW: usize = 8192;
const ENERGY_FLOOR: f32 = 1e-6;

#[derive(Debug, Clone, Copy)]
pub struct VocoderOptions {
    pub window_size: usize,
    pub hop_size: usize,
}

impl Default for VocoderOptions {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW,
            hop_size: DEFAULT_HOP,
        }
    }
}

impl VocoderOptions {
    /// Window size actually used: clamped, then rounded up to a power of two.
    pub fn resolved_window(&self) -> usize {
        self.window_size
            .clamp(MIN_WINDOW, MAX_WINDOW)
            .next_power_of_two()
    }

    pub fn resolved_hop(&self) -> usize {
        self.hop_size.clamp(1, self.resolved_window() / 2)
    }
}

/// Pitch-shift every channel by `ratio` using the default window and hop.
pub fn shift(channels: &[Vec<f32>], ratio: f32) -> Vec<Vec<f32>> {
    shift_with(channels, ratio, &VocoderOptions::default())
}

pub fn shift_with(channels: &[Vec<f32>], ratio: f32, options: &VocoderOptions) -> Vec<Vec<f32>> {
    let ratio = if ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        1.0
    };

    if (ratio - 1.0).abs() < 1e-6 {
        return channels.to_vec();
    }

    let plan = Plan::new(options);
    channels
        .iter()
        .map(|channel| plan.shift_channel(channel, ratio))
        .collect()
}

/// Tables shared by every channel of one call.
struct Plan {
    fft: Radix2Fft,
    window: Vec<f32>,
    hop: usize,
    expected: Vec<f32>,
}

impl Plan {
    fn new(options: &VocoderOptions) -> Self {
        let size = options.resolved_window();
        let hop = options.resolved_hop();
        let expected = (0..=size / 2)
            .map(|k| TAU * hop as f32 * k as f32 / size as f32)
            .collect();

        Self {
            fft: Radix2Fft::new(size),
            window: hann_window(size),
            hop,
            expected,
        }
    }

    fn shift_channel(&self, input: &[f32], ratio: f32) -> Vec<f32> {
        let len = input.len();
        if len == 0 {
            return Vec::new();
        }

        let size = self.fft.size();
        let bins = size / 2 + 1;

        let mut output = vec![0.0f32; len + size];
        let mut energy = vec![0.0f32; len + size];

        let mut spectrum = vec![Complex::new(0.0f32, 0.0); size];
        let mut magnitude = vec![0.0f32; bins];
        let mut inst_freq = vec![0.0f32; bins];
        let mut last_phase = vec![0.0f32; bins];
        let mut out_phase = vec![0.0f32; bins];

        let mut start = 0;
        while start < len {
            // Analysis
            for (i, slot) in spectrum.iter_mut().enumerate() {
                let sample = input.get(start + i).copied().unwrap_or(0.0);
                *slot = Complex::new(sample * self.window[i], 0.0);
            }
            self.fft.forward(&mut spectrum);

            for k in 0..bins {
                let (mag, phase) = spectrum[k].to_polar();
                let deviation = wrap_phase(phase - last_phase[k] - self.expected[k]);
                last_phase[k] = phase;
                magnitude[k] = mag;
                inst_freq[k] = self.expected[k] + deviation;
            }

            // Shift and resynthesis
            for k in 0..bins {
                let mag = shifted_bin(&magnitude, k, ratio);
                let freq = shifted_bin(&inst_freq, k, ratio);
                out_phase[k] = wrap_phase(out_phase[k] + freq * ratio);
                spectrum[k] = Complex::from_polar(mag, out_phase[k]);
            }
            spectrum[0].im = 0.0;
            spectrum[bins - 1].im = 0.0;
            for k in 1..bins - 1 {
                spectrum[size - k] = spectrum[k].conj();
            }

            self.fft.inverse(&mut spectrum);

            for (i, value) in spectrum.iter().enumerate() {
                let w = self.window[i];
                output[start + i] += value.re * w;
                energy[start + i] += w * w;
            }

            start += self.hop;
        }

        output.truncate(len);
        for (sample, &weight) in output.iter_mut().zip(&energy) {
            if weight > ENERGY_FLOOR {
                *sample /= weight;
            }
        }
        output
    }
}

#[inline]
fn wrap_phase(phase: f32) -> f32 {
    (phase + PI).rem_euclid(TAU) - PI
}

/// Linear interpolation into `values` at a fractional index, clamped at the edges.
#[inline]
/// Value of bin `k` after shifting by `ratio`, read from `k / ratio`.
///
/// Sources beyond either end of the spectrum hold the edge bin.
fn shifted_bin(values: &[f32], k: usize, ratio: f32) -> f32 {
    lerp_at(values, k as f32 / ratio)
}

fn lerp_at(values: &[f32], index: f32) -> f32 {
    let last = values.len() - 1;
    let index = index.clamp(0.0, last as f32);
    let lower = index.floor() as usize;
    let upper = (lower + 1).min(last);
    let frac = index - lower as f32;
    values[lower] + (values[upper] - values[lower]) * frac
}
