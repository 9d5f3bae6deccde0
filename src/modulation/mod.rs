//! Audio-rate and control-rate modulation.
//!
//! # Audio rate
//!
//! Two free-running LFOs are rendered once per block. Taps in the
//! [`TapRegistry`] scale the raw LFO signal into a destination:
//!
//! | LFO dest  | tap                         | gain                 |
//! |-----------|-----------------------------|----------------------|
//! | `pitch`   | one per voice, in cents     | `100 · depth`        |
//! | `filter`  | master cutoff, in cents     | `2400 · depth`       |
//! | `amp`     | master gain, fraction       | `0.5 · depth`        |
//!
//! Matrix rows with an LFO source and the `mix` target add one more tap per
//! voice whose gain is the row amount itself: the LFO's unit signal times
//! `amount`, independent of the LFO's own depth and destination.
//!
//! # Control rate
//!
//! Every other source is a scalar in [-1, 1]. Rows are summed per target and
//! the sum is spread over the target's range on top of a baseline captured
//! when the target first became active:
//!
//! ```text
//! value = clamp(baseline + Σ amount·source · (max - min))
//! ```
//!
//! When the last row of a target goes away the target is written back to its
//! baseline. Evaluation is pushed by the engine whenever a source, the matrix
//! or the patch changes.

use std::collections::HashMap;

use crate::{
    dsp::{
        lfo::Lfo,
        oscillator::NoiseBuffer,
    },
    patch::{LfoConfig, LfoDest, ModSource, ModTarget, Patch},
    synth::voice::VoiceId,
    MAX_BLOCK_SIZE,
};

pub mod source;
pub mod target;
pub mod taps;

pub use source::ControlSources;
pub use taps::{LfoId, Tap, TapDestination, TapRegistry};
use target::TargetValue;

pub const PITCH_CENTS_PER_DEPTH: f32 = 100.0;
pub const FILTER_CENTS_PER_DEPTH: f32 = 2400.0;
pub const AMP_PER_DEPTH: f32 = 0.5;

/// Per-block modulation signals for one voice.
#[derive(Clone, Copy, Default)]
pub struct VoiceMod<'a> {
    /// Pitch offset in cents.
    pub pitch: Option<&'a [f32]>,
    /// Offset added to the crossfade position.
    pub mix: Option<&'a [f32]>,
}

/// Per-block modulation signals for the master bus.
#[derive(Clone, Copy, Default)]
pub struct MasterMod<'a> {
    /// Cutoff offset in cents.
    pub cutoff: Option<&'a [f32]>,
    /// Gain offset as a fraction of the master gain.
    pub amp: Option<&'a [f32]>,
}

fn lfo_config(patch: &Patch, lfo: LfoId) -> &LfoConfig {
    match lfo {
        LfoId::Lfo1 => &patch.lfo1,
        LfoId::Lfo2 => &patch.lfo2,
    }
}

fn dest_gain(config: &LfoConfig, dest: LfoDest) -> f32 {
    if config.dest != dest {
        return 0.0;
    }
    match dest {
        LfoDest::Pitch => PITCH_CENTS_PER_DEPTH * config.depth,
        LfoDest::Filter => FILTER_CENTS_PER_DEPTH * config.depth,
        LfoDest::Amp => AMP_PER_DEPTH * config.depth,
        LfoDest::None => 0.0,
    }
}

/// Summed amount of the enabled `lfo -> mix` matrix rows.
fn mix_amount(patch: &Patch, lfo: LfoId) -> f32 {
    patch
        .modulation
        .iter()
        .filter(|row| row.is_live() && row.target == ModTarget::Mix)
        .filter(|row| LfoId::from_source(row.source) == Some(lfo))
        .map(|row| row.amount)
        .sum()
}

/// `out[i] = Σ gain · lfo[i]`; false when every gain is zero.
fn weighted_sum(out: &mut [f32], lfos: &[Vec<f32>; 2], gains: [f32; 2]) -> bool {
    if gains.iter().all(|g| *g == 0.0) {
        return false;
    }
    for (i, sample) in out.iter_mut().enumerate() {
        *sample = gains[0] * lfos[0][i] + gains[1] * lfos[1][i];
    }
    true
}

pub struct ModulationRouter {
    sources: ControlSources,
    baselines: HashMap<ModTarget, TargetValue>,
    taps: TapRegistry,
    lfos: [Lfo; 2],
    signals: [Vec<f32>; 2],
    block_len: usize,
    pitch: Vec<f32>,
    mix: Vec<f32>,
    cutoff: Vec<f32>,
    amp: Vec<f32>,
}

impl ModulationRouter {
    pub fn new(sample_rate: f32, noise: &NoiseBuffer, patch: &Patch) -> Self {
        let lfo = |config: &LfoConfig, offset: usize| {
            Lfo::new(config.shape, config.rate, sample_rate, noise.reader(offset))
        };
        let mut router = Self {
            sources: ControlSources::default(),
            baselines: HashMap::new(),
            taps: TapRegistry::new(),
            lfos: [lfo(&patch.lfo1, 0), lfo(&patch.lfo2, noise.len() / 2)],
            signals: [vec![0.0; MAX_BLOCK_SIZE], vec![0.0; MAX_BLOCK_SIZE]],
            block_len: 0,
            pitch: vec![0.0; MAX_BLOCK_SIZE],
            mix: vec![0.0; MAX_BLOCK_SIZE],
            cutoff: vec![0.0; MAX_BLOCK_SIZE],
            amp: vec![0.0; MAX_BLOCK_SIZE],
        };
        router.configure(patch, &[]);
        router
    }

    pub fn sources(&self) -> &ControlSources {
        &self.sources
    }

    pub fn sources_mut(&mut self) -> &mut ControlSources {
        &mut self.sources
    }

    pub fn taps(&self) -> &TapRegistry {
        &self.taps
    }

    /// Targets currently held away from their baselines.
    pub fn baseline(&self, target: ModTarget) -> Option<TargetValue> {
        self.baselines.get(&target).copied()
    }

    // ---- audio rate -------------------------------------------------------

    /// Follow the LFO settings and matrix of `patch`, rewiring the taps of
    /// the global destinations and of every voice in `voices`.
    pub fn configure(&mut self, patch: &Patch, voices: &[VoiceId]) {
        for lfo in LfoId::ALL {
            let config = lfo_config(patch, lfo);
            let osc = &mut self.lfos[lfo.index()];
            osc.set_shape(config.shape);
            osc.set_rate(config.rate);

            self.taps.set(lfo, TapDestination::FilterCutoff, dest_gain(config, LfoDest::Filter));
            self.taps.set(lfo, TapDestination::Amp, dest_gain(config, LfoDest::Amp));
        }
        for &voice in voices {
            self.attach_voice(voice, patch);
        }
    }

    /// Connect the per-voice taps of a new (or rewired) voice.
    pub fn attach_voice(&mut self, voice: VoiceId, patch: &Patch) {
        for lfo in LfoId::ALL {
            let config = lfo_config(patch, lfo);
            self.taps.set(lfo, TapDestination::Pitch(voice), dest_gain(config, LfoDest::Pitch));
            self.taps.set(lfo, TapDestination::Mix(voice), mix_amount(patch, lfo));
        }
    }

    /// Drop every tap of a voice that is being torn down.
    pub fn detach_voice(&mut self, voice: VoiceId) -> usize {
        self.taps.detach_voice(voice)
    }

    /// Advance both LFOs by `len` samples.
    pub fn render_lfos(&mut self, len: usize) {
        let len = len.min(MAX_BLOCK_SIZE);
        for (lfo, signal) in self.lfos.iter_mut().zip(self.signals.iter_mut()) {
            lfo.render(&mut signal[..len]);
        }
        self.block_len = len;
    }

    /// Raw unit signal of `lfo` for the current block.
    pub fn signal(&self, lfo: LfoId) -> &[f32] {
        &self.signals[lfo.index()][..self.block_len]
    }

    pub fn voice_mod(&mut self, voice: VoiceId) -> VoiceMod<'_> {
        let len = self.block_len;
        let pitch_gains = self.taps.gains(TapDestination::Pitch(voice));
        let has_pitch = weighted_sum(&mut self.pitch[..len], &self.signals, pitch_gains);
        let mix_gains = self.taps.gains(TapDestination::Mix(voice));
        let has_mix = weighted_sum(&mut self.mix[..len], &self.signals, mix_gains);
        VoiceMod {
            pitch: has_pitch.then_some(&self.pitch[..len]),
            mix: has_mix.then_some(&self.mix[..len]),
        }
    }

    pub fn master_mod(&mut self) -> MasterMod<'_> {
        let len = self.block_len;
        let cutoff_gains = self.taps.gains(TapDestination::FilterCutoff);
        let has_cutoff = weighted_sum(&mut self.cutoff[..len], &self.signals, cutoff_gains);
        let amp_gains = self.taps.gains(TapDestination::Amp);
        let has_amp = weighted_sum(&mut self.amp[..len], &self.signals, amp_gains);
        MasterMod {
            cutoff: has_cutoff.then_some(&self.cutoff[..len]),
            amp: has_amp.then_some(&self.amp[..len]),
        }
    }

    // ---- control rate -----------------------------------------------------

    /// Adopt user edits as new baselines.
    ///
    /// `before` is the live patch prior to an update and `after` the merged
    /// result. A modulated field the update changed was set by the user, and
    /// modulation continues from the new value.
    pub fn rebase(&mut self, before: &Patch, after: &Patch) {
        for (&target, baseline) in self.baselines.iter_mut() {
            let (Some(old), Some(new)) =
                (target::read(target, before), target::read(target, after))
            else {
                continue;
            };
            for slot in 0..2 {
                if old[slot] != new[slot] {
                    baseline[slot] = new[slot];
                }
            }
        }
    }

    fn offsets(&self, patch: &Patch) -> HashMap<ModTarget, f32> {
        let mut offsets: HashMap<ModTarget, f32> = HashMap::new();
        let rows = patch
            .modulation
            .iter()
            .filter(|row| row.is_live() && !row.source.is_audio_rate())
            .map(|row| (row.source, row.target, row.amount));

        let expression = &patch.expression;
        let pad = [
            (ModSource::ExprX, expression.x, expression.amount),
            (ModSource::ExprY, expression.y, expression.amount),
        ]
        .into_iter()
        .filter(|(_, target, amount)| {
            self.sources.expression_active && *target != ModTarget::None && *amount != 0.0
        });

        for (source, target, amount) in rows.chain(pad) {
            *offsets.entry(target).or_insert(0.0) += amount * self.sources.value(source);
        }
        offsets
    }

    /// Re-apply every control-rate route onto `patch`.
    ///
    /// Returns true when any field was written.
    pub fn evaluate(&mut self, patch: &mut Patch) -> bool {
        let offsets = self.offsets(patch);
        let mut written = false;

        for (&target, &offset) in &offsets {
            let Some(current) = target::read(target, patch) else {
                continue;
            };
            let baseline = *self.baselines.entry(target).or_insert(current);
            let value = target::map(target, baseline, offset);
            if value != current {
                target::write(target, patch, value);
                written = true;
            }
        }

        let released: Vec<ModTarget> = self
            .baselines
            .keys()
            .filter(|target| !offsets.contains_key(target))
            .copied()
            .collect();
        for target in released {
            if let Some(baseline) = self.baselines.remove(&target) {
                target::write(target, patch, baseline);
                written = true;
            }
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::ModMatrixRow;

    fn router(patch: &Patch) -> ModulationRouter {
        let noise = NoiseBuffer::new(4096, 3);
        ModulationRouter::new(48_000.0, &noise, patch)
    }

    #[test]
    fn enabling_then_disabling_restores_baseline() {
        let mut patch = Patch::default();
        patch.filter.cutoff = 1000.0;
        patch.expression.x = ModTarget::None;
        patch.expression.y = ModTarget::None;
        let mut router = router(&patch);
        router.sources_mut().set_expression(0.5, 0.0);

        patch.modulation = vec![ModMatrixRow::new(
            "a",
            ModSource::ExprX,
            ModTarget::FilterCutoff,
            0.2,
        )];
        router.evaluate(&mut patch);
        assert!((patch.filter.cutoff - (1000.0 + 0.1 * 19_980.0)).abs() < 1e-2);

        patch.modulation[0].enabled = false;
        router.evaluate(&mut patch);
        assert_eq!(patch.filter.cutoff, 1000.0);
        assert!(router.baseline(ModTarget::FilterCutoff).is_none());
    }

    #[test]
    fn routes_to_one_target_sum_before_clamping() {
        let mut patch = Patch::default();
        patch.mix = 0.5;
        let mut router = router(&patch);
        router.sources_mut().set_expression(1.0, 1.0);

        patch.modulation = vec![
            ModMatrixRow::new("x", ModSource::ExprX, ModTarget::Mix, 0.1),
            ModMatrixRow::new("y", ModSource::ExprY, ModTarget::Mix, 0.2),
        ];
        router.evaluate(&mut patch);
        assert!((patch.mix - 0.8).abs() < 1e-6);

        patch.modulation[1].amount = 0.9;
        router.evaluate(&mut patch);
        assert_eq!(patch.mix, 1.0);
    }

    #[test]
    fn velocity_pulls_macro_below_baseline() {
        let mut patch = Patch::default();
        let mut router = router(&patch);
        patch.modulation = vec![ModMatrixRow::new(
            "v",
            ModSource::Velocity,
            ModTarget::MacroHarmonics,
            0.5,
        )];
        router.evaluate(&mut patch);

        router.sources_mut().set_held(Some(0.25));
        router.evaluate(&mut patch);
        assert!(patch.osc1.macro_settings.harmonics < 0.5);
        assert!(patch.osc2.macro_settings.harmonics < 0.5);
        assert_eq!(router.baseline(ModTarget::MacroHarmonics), Some([0.5, 0.5]));
    }

    #[test]
    fn user_edits_become_the_new_baseline() {
        let mut patch = Patch::default();
        let mut router = router(&patch);
        router.sources_mut().set_expression(0.0, 0.0);
        patch.modulation = vec![ModMatrixRow::new(
            "x",
            ModSource::ExprX,
            ModTarget::RingAmount,
            1.0,
        )];
        router.evaluate(&mut patch);

        let before = patch.clone();
        patch.ring.amount = 0.4;
        router.rebase(&before, &patch);
        patch.modulation.clear();
        router.evaluate(&mut patch);
        assert_eq!(patch.ring.amount, 0.4);
    }

    #[test]
    fn expression_routes_only_while_the_pad_is_active() {
        let mut patch = Patch::default();
        patch.expression.x = ModTarget::SubLevel;
        patch.expression.amount = 0.5;
        patch.sub.level = 0.2;
        let mut router = router(&patch);

        router.sources_mut().set_expression(1.0, 0.0);
        router.evaluate(&mut patch);
        assert!((patch.sub.level - 0.7).abs() < 1e-6);

        router.sources_mut().clear_expression();
        router.evaluate(&mut patch);
        assert_eq!(patch.sub.level, 0.2);
    }

    #[test]
    fn lfo_taps_follow_destination_and_matrix() {
        let mut patch = Patch::default();
        patch.lfo1.depth = 0.5;
        patch.lfo2.depth = 1.0;
        patch.modulation = vec![ModMatrixRow::new("m", ModSource::Lfo2, ModTarget::Mix, -0.3)];
        let mut router = router(&patch);
        router.attach_voice(7, &patch);

        let taps = router.taps();
        assert_eq!(taps.gain(LfoId::Lfo1, TapDestination::Pitch(7)), 50.0);
        assert_eq!(taps.gain(LfoId::Lfo2, TapDestination::FilterCutoff), 2400.0);
        assert_eq!(taps.gain(LfoId::Lfo2, TapDestination::Mix(7)), -0.3);

        router.render_lfos(64);
        let lfo2: Vec<f32> = router.signal(LfoId::Lfo2).to_vec();
        let voice = router.voice_mod(7);
        let mix = voice.mix.unwrap();
        for (m, l) in mix.iter().zip(&lfo2) {
            assert!((m - (-0.3 * l)).abs() < 1e-6);
        }

        assert_eq!(router.detach_voice(7), 2);
        assert!(router.voice_mod(7).pitch.is_none());
    }
}
