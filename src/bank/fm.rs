use std::f32::consts::TAU;

use super::{BuildEnv, Built};
use crate::{
    dsp::oscillator::cents_to_ratio,
    graph::node::{DetuneHandle, GraphNode, RenderCtx, SharedParam, StopTime},
    patch::MacroSettings,
};

/// Modulator:carrier ratios selectable with the harmonics knob.
const RATIOS: [f32; 8] = [0.5, 1.0, 1.5, 2.0, 3.0, 4.0, 5.0, 7.0];
const MAX_INDEX: f32 = 8.0;
const MAX_FEEDBACK: f32 = 1.2;

/// Two sine operators, phase-modulation style: the modulator's output is
/// added to the carrier's phase, and the modulator can feed back into itself.
struct TwoOpFm {
    frequency: f32,
    ratio: f32,
    index: f32,
    feedback: f32,
    carrier_phase: f32,
    modulator_phase: f32,
    carrier_detune: SharedParam,
    modulator_detune: SharedParam,
    last_modulator: f32,
    stop: StopTime,
}

impl GraphNode for TwoOpFm {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        let carrier_detune = self.carrier_detune.get();
        let modulator_detune = self.modulator_detune.get();

        for (i, sample) in out.iter_mut().enumerate() {
            if !self.stop.running_at(ctx.sample_time(i)) {
                *sample = 0.0;
                continue;
            }

            let pitch = ctx.pitch_cents(i);
            let carrier_hz = self.frequency * cents_to_ratio(carrier_detune + pitch);
            let modulator_hz =
                self.frequency * self.ratio * cents_to_ratio(modulator_detune + pitch);

            let modulator =
                (TAU * self.modulator_phase + self.feedback * self.last_modulator).sin();
            self.last_modulator = modulator;
            *sample = (TAU * self.carrier_phase + self.index * modulator).sin();

            self.carrier_phase =
                (self.carrier_phase + carrier_hz / ctx.sample_rate).rem_euclid(1.0);
            self.modulator_phase =
                (self.modulator_phase + modulator_hz / ctx.sample_rate).rem_euclid(1.0);
        }
    }

    fn stop(&mut self, at: f64) {
        self.stop.schedule(at);
    }

    fn is_active(&self) -> bool {
        !self.stop.is_stopped()
    }
}

pub(super) fn build(frequency: f32, settings: &MacroSettings, _env: &BuildEnv) -> Built {
    let slot = (settings.harmonics * (RATIOS.len() - 1) as f32).round() as usize;
    let carrier_detune = SharedParam::new(0.0);
    let modulator_detune = SharedParam::new(0.0);

    let fm = TwoOpFm {
        frequency,
        ratio: RATIOS[slot.min(RATIOS.len() - 1)],
        index: settings.timbre * MAX_INDEX,
        feedback: settings.morph * MAX_FEEDBACK,
        carrier_phase: 0.0,
        modulator_phase: 0.0,
        carrier_detune: carrier_detune.clone(),
        modulator_detune: modulator_detune.clone(),
        last_modulator: 0.0,
        stop: StopTime::default(),
    };

    Built {
        node: Box::new(fm),
        pitched: vec![
            DetuneHandle::new(carrier_detune, 0.0),
            DetuneHandle::new(modulator_detune, 0.0),
        ],
    }
}
