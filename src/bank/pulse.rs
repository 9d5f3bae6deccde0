use std::f32::consts::PI;

use super::{BuildEnv, Built};
use crate::{
    dsp::{filter::OnePole, oscillator::cents_to_ratio},
    graph::node::{DetuneHandle, GraphNode, RenderCtx, SharedParam, StopTime},
    patch::MacroSettings,
};

/*
Band-limited pulse train (Dirichlet kernel)
===========================================

A pulse train holding exactly N cosine harmonics has a closed form:

                  sin((2N + 1)·π·x)
    D_N(x)  =  ───────────────────────        x = phase in [0, 1)
                 (2N + 1) · sin(π·x)

It peaks at 1 once per cycle and contains nothing above harmonic N, so
choosing N ≤ nyquist / f gives an alias-free pulse with no tables and
no oversampling. Where sin(π·x) vanishes the limit is 1.

    harmonics   fraction of the available bandwidth used for N
    morph       subtracts a second train half a cycle later, which cancels
                the even harmonics (a hollow, square-like spectrum)
    timbre      one-pole lowpass brightness

N is recomputed per sample so vibrato can never push a harmonic past
Nyquist. The DC of the train is removed afterwards.
*/

struct DirichletPulse {
    frequency: f32,
    detune: SharedParam,
    phase: f32,
    bandwidth: f32,
    hollow: f32,
    tone: OnePole,
    dc: OnePole,
    stop: StopTime,
}

#[inline]
fn dirichlet(phase: f32, harmonics: f32) -> f32 {
    let order = 2.0 * harmonics + 1.0;
    let denominator = (PI * phase).sin();
    if denominator.abs() < 1e-6 {
        return 1.0;
    }
    (order * PI * phase).sin() / (order * denominator)
}

impl GraphNode for DirichletPulse {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        let detune = self.detune.get();
        let nyquist = ctx.sample_rate * 0.5;

        for (i, sample) in out.iter_mut().enumerate() {
            if !self.stop.running_at(ctx.sample_time(i)) {
                *sample = 0.0;
                continue;
            }

            let freq = self.frequency * cents_to_ratio(detune + ctx.pitch_cents(i));
            let available = (nyquist / freq).floor().max(1.0);
            let harmonics = (available * self.bandwidth).floor().max(1.0);

            let primary = dirichlet(self.phase, harmonics);
            let secondary = dirichlet((self.phase + 0.5).fract(), harmonics);
            let train = primary - self.hollow * secondary;

            let toned = self.tone.process(train);
            *sample = toned - self.dc.process(toned);

            self.phase = (self.phase + freq / ctx.sample_rate).rem_euclid(1.0);
        }
    }

    fn stop(&mut self, at: f64) {
        self.stop.schedule(at);
    }

    fn is_active(&self) -> bool {
        !self.stop.is_stopped()
    }
}

pub(super) fn build(frequency: f32, settings: &MacroSettings, env: &BuildEnv) -> Built {
    let detune = SharedParam::new(0.0);
    let tone_cutoff = frequency * (2.0 + 80.0 * settings.timbre * settings.timbre);

    let pulse = DirichletPulse {
        frequency,
        detune: detune.clone(),
        phase: 0.0,
        bandwidth: 0.05 + 0.95 * settings.harmonics,
        hollow: settings.morph,
        tone: OnePole::new(tone_cutoff, env.sample_rate),
        dc: OnePole::new(5.0, env.sample_rate),
        stop: StopTime::default(),
    };

    Built {
        node: Box::new(pulse),
        pitched: vec![DetuneHandle::new(detune, 0.0)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_peaks_at_zero_phase() {
        assert_eq!(dirichlet(0.0, 10.0), 1.0);
        assert!(dirichlet(0.25, 10.0).abs() < 0.2);
    }

    #[test]
    fn single_harmonic_is_raised_cosine() {
        // D_1(x) = (1 + 2cos(2πx)) / 3
        for phase in [0.1f32, 0.3, 0.7] {
            let expected = (1.0 + 2.0 * (2.0 * PI * phase).cos()) / 3.0;
            assert!((dirichlet(phase, 1.0) - expected).abs() < 1e-5);
        }
    }
}
