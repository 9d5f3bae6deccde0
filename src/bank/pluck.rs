use super::{BuildEnv, Built};
use crate::{
    dsp::{
        delay::DelayLine,
        filter::OnePole,
        oscillator::{cents_to_ratio, NoiseReader},
    },
    graph::node::{DetuneHandle, GraphNode, RenderCtx, SharedParam, StopTime},
    patch::MacroSettings,
};

/*
Karplus-Strong Pluck
====================

A delay line one period long, fed a short burst and looped through a
lowpass:

    burst ──→ (+) ──→ [delay: sr / f] ──┬──→ out
               ↑                        │
               └── feedback · [lowpass] ┘

Every pass around the loop the lowpass takes a little more high end away,
so the tone starts bright and mellows while it decays, like a string.

The burst is one period of noise, crossfaded (morph) towards a single
triangle cycle for a softer, mallet-like attack. Its own lowpass (timbre)
sets how bright the pluck starts; timbre also opens the loop filter.
Harmonics sets the loop feedback, which is the sustain.

The delay length follows detune and vibrato per sample, read with linear
interpolation, so the string can be bent while it rings.
*/

const LOWEST_FREQUENCY: f32 = 20.0;

struct Pluck {
    line: DelayLine,
    frequency: f32,
    detune: SharedParam,
    feedback: f32,
    loop_filter: OnePole,
    exciter: NoiseReader,
    exciter_filter: OnePole,
    mallet: f32,
    burst_len: usize,
    burst_pos: usize,
    stop: StopTime,
}

impl GraphNode for Pluck {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        let detune = self.detune.get();
        let max_delay = (self.line.capacity() - 2) as f32;

        for (i, sample) in out.iter_mut().enumerate() {
            if !self.stop.running_at(ctx.sample_time(i)) {
                *sample = 0.0;
                continue;
            }

            let freq = self.frequency * cents_to_ratio(detune + ctx.pitch_cents(i));
            let delay = (ctx.sample_rate / freq.max(LOWEST_FREQUENCY)).clamp(2.0, max_delay);

            let burst = if self.burst_pos < self.burst_len {
                let phase = self.burst_pos as f32 / self.burst_len as f32;
                let triangle = 1.0 - 4.0 * (phase - 0.5).abs();
                let noise = self.exciter_filter.process(self.exciter.next_sample());
                self.burst_pos += 1;
                noise + (triangle - noise) * self.mallet
            } else {
                0.0
            };

            let delayed = self.line.read_frac(delay);
            let damped = self.loop_filter.process(delayed);
            self.line.write(burst + damped * self.feedback);
            *sample = delayed;
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
    let sample_rate = env.sample_rate;
    let detune = SharedParam::new(0.0);
    let capacity = (sample_rate / LOWEST_FREQUENCY) as usize + 4;

    let exciter_cutoff = frequency * (1.0 + 30.0 * settings.timbre);
    let loop_cutoff = frequency * (2.0 + 40.0 * settings.timbre * settings.timbre);

    let pluck = Pluck {
        line: DelayLine::with_capacity(capacity),
        frequency,
        detune: detune.clone(),
        feedback: 0.96 + 0.039 * settings.harmonics,
        loop_filter: OnePole::new(loop_cutoff, sample_rate),
        exciter: env.noise.reader(env.noise_offset),
        exciter_filter: OnePole::new(exciter_cutoff, sample_rate),
        mallet: settings.morph,
        burst_len: (sample_rate / frequency).round().max(1.0) as usize,
        burst_pos: 0,
        stop: StopTime::default(),
    };

    Built {
        node: Box::new(pluck),
        pitched: vec![DetuneHandle::new(detune, 0.0)],
    }
}
