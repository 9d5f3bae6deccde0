use std::{f32::consts::TAU, sync::OnceLock};

use super::{BuildEnv, Built};
use crate::{
    dsp::{filter::SVFilter, oscillator::cents_to_ratio},
    graph::node::{DetuneHandle, GraphNode, RenderCtx, SharedParam, StopTime},
    patch::MacroSettings,
};

/*
Four-shape wavetable
====================

Four single-cycle tables (sine, triangle, saw, square) are summed from
their Fourier series once per process. Each shape is stored at several
harmonic limits, halving from 128 down to 1, so a note picks the richest
level whose top harmonic still sits below Nyquist.

    morph    position across the four tables, adjacent tables crossfade
    timbre   phase warp: the first half of the cycle is squeezed or
             stretched around a movable midpoint before lookup
    harmonics post lowpass brightness
*/

const TABLE_LEN: usize = 2048;
const MIP_LEVELS: usize = 8; // 128, 64, ... 1 harmonics
const TABLE_COUNT: usize = 4;

type Tables = Vec<[Vec<f32>; TABLE_COUNT]>;

fn harmonics_at(level: usize) -> usize {
    128 >> level
}

fn build_table(harmonics: usize, amplitude: impl Fn(usize) -> f32) -> Vec<f32> {
    let mut table = vec![0.0f32; TABLE_LEN];
    for n in 1..=harmonics {
        let a = amplitude(n);
        if a == 0.0 {
            continue;
        }
        for (i, value) in table.iter_mut().enumerate() {
            *value += a * (TAU * n as f32 * i as f32 / TABLE_LEN as f32).sin();
        }
    }
    let peak = table.iter().fold(0.0f32, |acc, v| acc.max(v.abs()));
    if peak > 0.0 {
        for value in table.iter_mut() {
            *value /= peak;
        }
    }
    table
}

fn tables() -> &'static Tables {
    static TABLES: OnceLock<Tables> = OnceLock::new();
    TABLES.get_or_init(|| {
        (0..MIP_LEVELS)
            .map(|level| {
                let limit = harmonics_at(level);
                [
                    build_table(1, |_| 1.0),
                    build_table(limit, |n| {
                        if n % 2 == 1 {
                            let sign = if (n / 2) % 2 == 0 { 1.0 } else { -1.0 };
                            sign / (n * n) as f32
                        } else {
                            0.0
                        }
                    }),
                    build_table(limit, |n| 1.0 / n as f32),
                    build_table(limit, |n| if n % 2 == 1 { 1.0 / n as f32 } else { 0.0 }),
                ]
            })
            .collect()
    })
}

/// Build the shared tables ahead of the first note.
pub(super) fn prepare() {
    tables();
}

/// Richest mip level whose top harmonic stays under `nyquist`.
fn level_for(frequency: f32, nyquist: f32) -> usize {
    (0..MIP_LEVELS)
        .find(|&level| harmonics_at(level) as f32 * frequency < nyquist)
        .unwrap_or(MIP_LEVELS - 1)
}

#[inline]
fn lookup(table: &[f32], phase: f32) -> f32 {
    let position = phase * TABLE_LEN as f32;
    let index = position as usize % TABLE_LEN;
    let next = (index + 1) % TABLE_LEN;
    let frac = position.fract();
    table[index] + (table[next] - table[index]) * frac
}

/// Piecewise-linear phase warp around `midpoint`.
#[inline]
fn warp(phase: f32, midpoint: f32) -> f32 {
    if phase < midpoint {
        0.5 * phase / midpoint
    } else {
        0.5 + 0.5 * (phase - midpoint) / (1.0 - midpoint)
    }
}

struct Wavetable {
    frequency: f32,
    detune: SharedParam,
    phase: f32,
    position: f32,
    midpoint: f32,
    tone: SVFilter,
    stop: StopTime,
}

impl GraphNode for Wavetable {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        let detune = self.detune.get();
        let base = self.frequency * cents_to_ratio(detune);
        let level = &tables()[level_for(base, ctx.sample_rate * 0.5)];

        let lower = (self.position.floor() as usize).min(TABLE_COUNT - 1);
        let upper = (lower + 1).min(TABLE_COUNT - 1);
        let blend = self.position - lower as f32;

        for (i, sample) in out.iter_mut().enumerate() {
            if !self.stop.running_at(ctx.sample_time(i)) {
                *sample = 0.0;
                continue;
            }

            let freq = self.frequency * cents_to_ratio(detune + ctx.pitch_cents(i));
            let phase = warp(self.phase, self.midpoint);
            let a = lookup(&level[lower], phase);
            let b = lookup(&level[upper], phase);
            *sample = a + (b - a) * blend;
            self.phase = (self.phase + freq / ctx.sample_rate).rem_euclid(1.0);
        }

        self.tone.render(out);
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
    let brightness = 0.25 + 0.75 * settings.harmonics;
    let mut tone = SVFilter::lowpass();
    tone.set_params(
        (frequency * 64.0 * brightness * brightness).min(env.nyquist() * 0.9),
        0.707,
        env.sample_rate,
    );

    let wavetable = Wavetable {
        frequency,
        detune: detune.clone(),
        phase: 0.0,
        position: settings.morph * (TABLE_COUNT - 1) as f32,
        midpoint: 0.5 - (settings.timbre - 0.5) * 0.8,
        tone,
        stop: StopTime::default(),
    };

    Built {
        node: Box::new(wavetable),
        pitched: vec![DetuneHandle::new(detune, 0.0)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_level_keeps_harmonics_below_nyquist() {
        assert_eq!(level_for(100.0, 24_000.0), 0);
        assert_eq!(level_for(1_000.0, 24_000.0), 3); // 16 harmonics
        assert_eq!(level_for(20_000.0, 24_000.0), MIP_LEVELS - 1);
    }

    #[test]
    fn tables_are_unit_peak() {
        for level in tables() {
            for table in level {
                let peak = table.iter().fold(0.0f32, |acc, v| acc.max(v.abs()));
                assert!((peak - 1.0).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn centred_warp_is_identity() {
        for phase in [0.0, 0.1, 0.5, 0.9] {
            assert!((warp(phase, 0.5) - phase).abs() < 1e-6);
        }
    }
}
