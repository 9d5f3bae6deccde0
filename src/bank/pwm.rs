use std::f32::consts::TAU;

use super::{BuildEnv, Built};
use crate::{
    dsp::{distortion::saturate, filter::OnePole, oscillator::Oscillator},
    graph::node::{DetuneHandle, GraphNode, RenderCtx},
    patch::MacroSettings,
};

/*
Pulse width from a saw
======================

Comparing a saw against a threshold gives a pulse whose width is the
fraction of the cycle the saw spends above it:

    saw ∈ [-1, 1],   c = 1 - 2·width   →   pulse = sign(saw - c)

Instead of a hard sign() the difference goes through tanh saturation, so
`timbre` sets how square the edges get. Offsetting the saw shifts its mean,
so the result runs through a DC blocker.

`morph` sweeps the width with a slow internal LFO.
*/

const WIDTH_LFO_HZ: f32 = 0.7;

struct Pwm {
    saw: Oscillator,
    width: f32,
    sweep_depth: f32,
    sweep_phase: f32,
    drive: f32,
    dc: OnePole,
}

impl GraphNode for Pwm {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        self.saw.render_block(out, ctx);
        let sweep_step = WIDTH_LFO_HZ / ctx.sample_rate;

        for sample in out.iter_mut() {
            let sweep = (TAU * self.sweep_phase).sin() * self.sweep_depth;
            self.sweep_phase = (self.sweep_phase + sweep_step).fract();

            let width = (self.width + sweep).clamp(0.05, 0.95);
            let threshold = 1.0 - 2.0 * width;
            let pulse = saturate((*sample - threshold) * 0.5, self.drive);
            *sample = pulse - self.dc.process(pulse);
        }
    }

    fn stop(&mut self, at: f64) {
        self.saw.stop(at);
    }

    fn is_active(&self) -> bool {
        self.saw.is_active()
    }
}

pub(super) fn build(frequency: f32, settings: &MacroSettings, env: &BuildEnv) -> Built {
    let saw = Oscillator::sawtooth(frequency);
    let pitched = vec![DetuneHandle::new(saw.detune(), 0.0)];

    Built {
        node: Box::new(Pwm {
            saw,
            width: 0.5 + (settings.harmonics - 0.5) * 0.9,
            sweep_depth: settings.morph * 0.4,
            sweep_phase: 0.0,
            drive: 2.0 + settings.timbre * 30.0,
            dc: OnePole::new(5.0, env.sample_rate),
        }),
        pitched,
    }
}
