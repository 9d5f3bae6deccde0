//! Seeded per-step perturbation of a sequencer pattern.
//!
//! Every step draws from its own generator, seeded from the user's seed
//! string and the step index, so the same seed always spices a step the same
//! way regardless of how many steps were played before it.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::patch::SequencerStep;

const GOLDEN: u64 = 0x9E37_79B9_7F4A_7C15;
const MAX_OFFSET_SHIFT: f32 = 12.0;

/// FNV-1a over the seed bytes.
fn fnv1a(seed: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in seed.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// A step after spicing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpicedStep {
    pub on: bool,
    pub offset: i32,
    pub velocity: f32,
    pub gate: f32,
}

impl SpicedStep {
    pub fn plain(step: &SequencerStep, gate: f32) -> Self {
        Self {
            on: step.on,
            offset: step.offset,
            velocity: step.velocity,
            gate,
        }
    }
}

pub fn spice(step: &SequencerStep, gate: f32, index: usize, seed: &str, amount: f32) -> SpicedStep {
    if amount <= 0.0 {
        return SpicedStep::plain(step, gate);
    }
    let amount = amount.min(1.0);

    let seed = fnv1a(seed) ^ (index as u64 + 1).wrapping_mul(GOLDEN);
    let mut rng = Pcg32::seed_from_u64(seed);
    // Always draw all four so each field sees the same stream position.
    let offset_draw: f32 = rng.random_range(-1.0..=1.0);
    let velocity_draw: f32 = rng.random_range(-1.0..=1.0);
    let gate_draw: f32 = rng.random_range(-1.0..=1.0);
    let flip_draw: f32 = rng.random();

    let on = if flip_draw < amount * 0.25 { !step.on } else { step.on };
    let shift = (offset_draw * MAX_OFFSET_SHIFT * amount).round() as i32;

    SpicedStep {
        on,
        offset: (step.offset + shift).clamp(-36, 36),
        velocity: (step.velocity + velocity_draw * 0.5 * amount).clamp(0.05, 1.0),
        gate: (gate * (1.0 + gate_draw * 0.5 * amount)).clamp(0.05, 1.0),
    }
}
