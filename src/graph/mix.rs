use std::f32::consts::FRAC_PI_4;

use crate::{
    dsp::oscillator::Oscillator,
    graph::node::{DetuneHandle, GraphNode, RenderCtx},
    MAX_BLOCK_SIZE,
};

/*
Parallel Signal Mixing
======================

Two mixing shapes show up across the synth:

Linear crossfade (slot mix, ring amount, wet/dry):
  - t = 0.0 → 100% A
  - t = 0.5 → 50% A, 50% B
  - t = 1.0 → 100% B

Weighted layers (supersaw, additive partials, chord tones):
  every layer renders into a scratch buffer and is summed with its own gain.
  Layers are plain oscillators, so stopping the stack stops every one of them
  and each layer exposes its own detune handle.

The engine is mono. Where a layer carries a stereo position, it is folded to
the mid channel with an equal-power pan law so spreading a stack never makes
it louder in the centre:

  mid(pan) = (cos θ + sin θ) / 2,   θ = (pan + 1) · π/4
*/

#[inline]
pub fn crossfade(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Mono weight of a source panned to `pan` in [-1, 1].
#[inline]
pub fn equal_power_mid(pan: f32) -> f32 {
    let theta = (pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
    (theta.cos() + theta.sin()) * 0.5
}

pub struct Layer {
    pub osc: Oscillator,
    pub gain: f32,
}

/// Sum of weighted oscillators.
pub struct Layers {
    layers: Vec<Layer>,
    scratch: Vec<f32>,
}

impl Layers {
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            scratch: vec![0.0; MAX_BLOCK_SIZE],
        }
    }

    /// Add an oscillator detuned by `offset_cents` from the stack's pitch.
    pub fn push(&mut self, osc: Oscillator, offset_cents: f32, gain: f32) -> DetuneHandle {
        let handle = DetuneHandle::new(osc.detune(), offset_cents);
        handle.apply(0.0);
        self.layers.push(Layer { osc, gain });
        handle
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Scale every gain so they sum to `total`.
    pub fn normalize(&mut self, total: f32) {
        let sum: f32 = self.layers.iter().map(|layer| layer.gain.abs()).sum();
        if sum > 0.0 {
            let scale = total / sum;
            for layer in &mut self.layers {
                layer.gain *= scale;
            }
        }
    }
}

impl Default for Layers {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphNode for Layers {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        out.fill(0.0);
        for layer in &mut self.layers {
            if layer.gain == 0.0 {
                continue;
            }
            let frames = &mut self.scratch[..out.len()];
            layer.osc.render_block(frames, ctx);
            for (o, s) in out.iter_mut().zip(frames.iter()) {
                *o += *s * layer.gain;
            }
        }
    }

    fn stop(&mut self, at: f64) {
        for layer in &mut self.layers {
            layer.osc.stop(at);
        }
    }

    fn is_active(&self) -> bool {
        self.layers.iter().any(|layer| layer.osc.is_active())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_power_centre_is_root_half() {
        assert!((equal_power_mid(0.0) - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert!((equal_power_mid(-1.0) - 0.5).abs() < 1e-6);
        assert!((equal_power_mid(1.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn layers_sum_with_gains() {
        let ctx = RenderCtx::new(48_000.0, 0.0);
        let mut single = Oscillator::sine(300.0);
        let mut reference = vec![0.0; 64];
        single.render_block(&mut reference, &ctx);

        let mut layers = Layers::new();
        layers.push(Oscillator::sine(300.0), 0.0, 0.25);
        layers.push(Oscillator::sine(300.0), 0.0, 0.5);
        let mut out = vec![0.0; 64];
        layers.render_block(&mut out, &ctx);

        for (a, b) in out.iter().zip(&reference) {
            assert!((a - b * 0.75).abs() < 1e-5);
        }
    }

    #[test]
    fn stop_reaches_every_layer() {
        let mut layers = Layers::new();
        layers.push(Oscillator::sawtooth(100.0), 0.0, 1.0);
        layers.push(Oscillator::square(150.0), 700.0, 1.0);
        layers.stop(0.0);

        let mut out = vec![1.0; 32];
        layers.render_block(&mut out, &RenderCtx::new(48_000.0, 0.0));
        assert!(out.iter().all(|&s| s == 0.0));
        assert!(!layers.is_active());
    }

    #[test]
    fn offsets_survive_retuning() {
        let mut layers = Layers::new();
        let handle = layers.push(Oscillator::sine(100.0), 700.0, 1.0);
        handle.apply(-50.0);
        assert_eq!(handle.param().get(), 650.0);
    }
}
