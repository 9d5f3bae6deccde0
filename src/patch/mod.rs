//! Declarative description of the whole instrument.
//!
//! A [`Patch`] is plain data. The engine never edits one in place: updates go
//! through [`Patch::merged`], which deep-merges a partial JSON document over
//! the current value and returns a new, sanitized patch.

use serde::{Deserialize, Serialize};

use crate::{
    bank::MacroModel,
    dsp::{filter::FilterType, lfo::LfoShape, oscillator::Waveform},
    names::lenient_enum,
    sequencing::{
        arpeggiator::{ArpMode, ChordType, IntervalSource},
        progression::Progression,
        timing::Division,
    },
};

pub mod matrix;
pub mod merge;

pub use matrix::{ModMatrixRow, ModSource, ModTarget};

/// Fixed allocation of sequencer step slots.
pub const SEQUENCER_SLOTS: usize = 64;

lenient_enum! {
    pub enum OscMode {
        Analog = "analog",
        Macro = "macro",
        Sampler = "sampler",
    }
    default = Analog;
}

lenient_enum! {
    /// Built-in audio-rate destination of an LFO.
    pub enum LfoDest {
        None = "none",
        Pitch = "pitch",
        Filter = "filter",
        Amp = "amp",
    }
    default = None;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Patch {
    pub name: String,
    /// Beats per minute for tempo-synced scheduling.
    pub tempo: f32,
    pub osc1: OscillatorConfig,
    pub osc2: OscillatorConfig,
    /// Crossfade between the slots: 0 = osc1 only, 1 = osc2 only.
    pub mix: f32,
    pub fm: FmConfig,
    pub ring: RingConfig,
    pub sub: SubConfig,
    pub filter: FilterConfig,
    pub envelope: EnvelopeConfig,
    pub master: MasterConfig,
    pub effects: EffectsConfig,
    pub lfo1: LfoConfig,
    pub lfo2: LfoConfig,
    pub arp: ArpConfig,
    pub sequencer: SequencerConfig,
    pub expression: ExpressionConfig,
    pub modulation: Vec<ModMatrixRow>,
}

impl Default for Patch {
    fn default() -> Self {
        Self {
            name: "init".to_string(),
            tempo: 120.0,
            osc1: OscillatorConfig::default(),
            osc2: OscillatorConfig {
                wave: Waveform::Square,
                detune: 7.0,
                ..OscillatorConfig::default()
            },
            mix: 0.5,
            fm: FmConfig::default(),
            ring: RingConfig::default(),
            sub: SubConfig::default(),
            filter: FilterConfig::default(),
            envelope: EnvelopeConfig::default(),
            master: MasterConfig::default(),
            effects: EffectsConfig::default(),
            lfo1: LfoConfig::default(),
            lfo2: LfoConfig {
                shape: LfoShape::Triangle,
                rate: 0.5,
                dest: LfoDest::Filter,
                ..LfoConfig::default()
            },
            arp: ArpConfig::default(),
            sequencer: SequencerConfig::default(),
            expression: ExpressionConfig::default(),
            modulation: Vec::new(),
        }
    }
}

/// One oscillator slot. All three mode settings are kept so switching mode
/// never loses the inactive ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OscillatorConfig {
    pub wave: Waveform,
    pub mode: OscMode,
    #[serde(rename = "macro")]
    pub macro_settings: MacroSettings,
    pub sampler: SamplerSettings,
    /// Coarse detune in cents.
    pub detune: f32,
    /// Fine detune in cents.
    pub fine: f32,
    pub octave: i32,
}

impl Default for OscillatorConfig {
    fn default() -> Self {
        Self {
            wave: Waveform::Sawtooth,
            mode: OscMode::Analog,
            macro_settings: MacroSettings::default(),
            sampler: SamplerSettings::default(),
            detune: 0.0,
            fine: 0.0,
            octave: 0,
        }
    }
}

impl OscillatorConfig {
    /// Combined pitch offset in cents.
    pub fn total_cents(&self) -> f32 {
        self.octave as f32 * 1200.0 + self.detune + self.fine
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MacroSettings {
    pub model: MacroModel,
    pub harmonics: f32,
    pub timbre: f32,
    pub morph: f32,
    pub level: f32,
}

impl Default for MacroSettings {
    fn default() -> Self {
        Self {
            model: MacroModel::VirtualAnalog,
            harmonics: 0.5,
            timbre: 0.5,
            morph: 0.5,
            level: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SamplerSettings {
    /// Identity of the loaded sample; a new id triggers a re-decode.
    pub id: String,
    /// `data:` URL or file path of a WAV file.
    pub data_url: Option<String>,
    pub root_midi: u8,
    #[serde(rename = "loop")]
    pub looped: bool,
    /// Seconds into the buffer where playback starts.
    pub trim_start: f32,
    /// Seconds where playback ends; `None` plays to the end.
    pub trim_end: Option<f32>,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            id: String::new(),
            data_url: None,
            root_midi: 60,
            looped: false,
            trim_start: 0.0,
            trim_end: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FmConfig {
    pub enabled: bool,
    /// Modulator frequency as a multiple of the carrier.
    pub ratio: f32,
    /// Modulation index: peak deviation in multiples of the modulator frequency.
    pub amount: f32,
}

impl Default for FmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ratio: 2.0,
            amount: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RingConfig {
    pub enabled: bool,
    pub amount: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubConfig {
    pub enabled: bool,
    /// Octaves below the note: 1 or 2.
    pub octave: u8,
    pub level: f32,
    pub wave: Waveform,
}

impl Default for SubConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            octave: 1,
            level: 0.5,
            wave: Waveform::Sine,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterConfig {
    #[serde(rename = "type")]
    pub filter_type: FilterType,
    pub cutoff: f32,
    pub q: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            filter_type: FilterType::LowPass,
            cutoff: 18_000.0,
            q: 0.707,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnvelopeConfig {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            attack: 0.01,
            decay: 0.2,
            sustain: 0.7,
            release: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MasterConfig {
    pub gain: f32,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self { gain: 0.8 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EffectsConfig {
    pub delay: DelayConfig,
    pub reverb: ReverbConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DelayConfig {
    /// Seconds.
    pub time: f32,
    pub feedback: f32,
    pub mix: f32,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            time: 0.3,
            feedback: 0.35,
            mix: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReverbConfig {
    pub size: f32,
    pub damping: f32,
    pub mix: f32,
}

impl Default for ReverbConfig {
    fn default() -> Self {
        Self {
            size: 0.5,
            damping: 0.5,
            mix: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LfoConfig {
    pub shape: LfoShape,
    /// Hz.
    pub rate: f32,
    pub depth: f32,
    pub dest: LfoDest,
}

impl Default for LfoConfig {
    fn default() -> Self {
        Self {
            shape: LfoShape::Sine,
            rate: 5.0,
            depth: 0.0,
            dest: LfoDest::Pitch,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArpConfig {
    pub enabled: bool,
    pub mode: ArpMode,
    pub octaves: u8,
    pub chord: ChordType,
    pub interval_source: IntervalSource,
    /// Tempo-synced division when true, free `rate` in Hz otherwise.
    pub sync: bool,
    pub rate: f32,
    pub division: Division,
    pub gate: f32,
    pub swing: f32,
    /// Truncate the pool to this many entries; 0 keeps the whole pool.
    pub pattern_length: usize,
    /// Times each pool entry plays before advancing.
    pub repeat: u8,
}

impl Default for ArpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: ArpMode::Up,
            octaves: 1,
            chord: ChordType::None,
            interval_source: IntervalSource::Chord,
            sync: true,
            rate: 8.0,
            division: Division::Sixteenth,
            gate: 0.8,
            swing: 0.0,
            pattern_length: 0,
            repeat: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SequencerStep {
    pub on: bool,
    /// Semitones from the root.
    pub offset: i32,
    pub velocity: f32,
}

impl SequencerStep {
    pub fn on(offset: i32, velocity: f32) -> Self {
        Self {
            on: true,
            offset,
            velocity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SequencerConfig {
    pub enabled: bool,
    pub root_midi: u8,
    /// Active pattern length, independent of the 64 allocated slots.
    pub length: usize,
    pub steps: Vec<SequencerStep>,
    pub division: Division,
    pub gate: f32,
    pub swing: f32,
    pub progression: Progression,
    pub spice_amount: f32,
    pub spice_seed: String,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        let mut steps = vec![SequencerStep::default(); SEQUENCER_SLOTS];
        for step in steps.iter_mut().step_by(4).take(4) {
            *step = SequencerStep::on(0, 0.8);
        }
        Self {
            enabled: false,
            root_midi: 48,
            length: 16,
            steps,
            division: Division::Sixteenth,
            gate: 0.5,
            swing: 0.0,
            progression: Progression::None,
            spice_amount: 0.0,
            spice_seed: String::new(),
        }
    }
}

/// Mapping of the 2D expression pad onto control-rate targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExpressionConfig {
    pub x: ModTarget,
    pub y: ModTarget,
    pub amount: f32,
}

impl Default for ExpressionConfig {
    fn default() -> Self {
        Self {
            x: ModTarget::FilterCutoff,
            y: ModTarget::MacroTimbre,
            amount: 0.5,
        }
    }
}

#[inline]
fn clamp_finite(value: &mut f32, min: f32, max: f32, fallback: f32) {
    *value = if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    };
}

impl OscillatorConfig {
    fn sanitize(&mut self) {
        clamp_finite(&mut self.detune, -1200.0, 1200.0, 0.0);
        clamp_finite(&mut self.fine, -100.0, 100.0, 0.0);
        self.octave = self.octave.clamp(-3, 3);

        let m = &mut self.macro_settings;
        clamp_finite(&mut m.harmonics, 0.0, 1.0, 0.5);
        clamp_finite(&mut m.timbre, 0.0, 1.0, 0.5);
        clamp_finite(&mut m.morph, 0.0, 1.0, 0.5);
        clamp_finite(&mut m.level, 0.0, 1.0, 0.8);

        let s = &mut self.sampler;
        s.root_midi = s.root_midi.min(127);
        clamp_finite(&mut s.trim_start, 0.0, f32::MAX, 0.0);
        if let Some(end) = s.trim_end.as_mut() {
            clamp_finite(end, 0.0, f32::MAX, 0.0);
        }
    }
}

impl Patch {
    /// Clamp every numeric field into its valid domain.
    ///
    /// Out-of-range values are never rejected; non-finite values fall back to
    /// a neutral default.
    pub fn sanitize(&mut self) {
        clamp_finite(&mut self.tempo, 20.0, 300.0, 120.0);
        self.osc1.sanitize();
        self.osc2.sanitize();
        clamp_finite(&mut self.mix, 0.0, 1.0, 0.5);

        clamp_finite(&mut self.fm.ratio, 0.125, 16.0, 2.0);
        clamp_finite(&mut self.fm.amount, 0.0, 10.0, 0.0);
        clamp_finite(&mut self.ring.amount, 0.0, 1.0, 0.0);
        self.sub.octave = self.sub.octave.clamp(1, 2);
        clamp_finite(&mut self.sub.level, 0.0, 1.0, 0.0);

        clamp_finite(&mut self.filter.cutoff, 20.0, 20_000.0, 18_000.0);
        clamp_finite(&mut self.filter.q, 0.1, 20.0, 0.707);

        let env = &mut self.envelope;
        clamp_finite(&mut env.attack, 0.0, 10.0, 0.01);
        clamp_finite(&mut env.decay, 0.0, 10.0, 0.2);
        clamp_finite(&mut env.sustain, 0.0, 1.0, 0.7);
        clamp_finite(&mut env.release, 0.0, 10.0, 0.3);

        clamp_finite(&mut self.master.gain, 0.0, 1.0, 0.8);

        let delay = &mut self.effects.delay;
        clamp_finite(&mut delay.time, 0.01, 2.0, 0.3);
        clamp_finite(&mut delay.feedback, 0.0, 0.95, 0.0);
        clamp_finite(&mut delay.mix, 0.0, 1.0, 0.0);
        let reverb = &mut self.effects.reverb;
        clamp_finite(&mut reverb.size, 0.0, 1.0, 0.5);
        clamp_finite(&mut reverb.damping, 0.0, 1.0, 0.5);
        clamp_finite(&mut reverb.mix, 0.0, 1.0, 0.0);

        for lfo in [&mut self.lfo1, &mut self.lfo2] {
            clamp_finite(&mut lfo.rate, 0.01, 40.0, 1.0);
            clamp_finite(&mut lfo.depth, 0.0, 1.0, 0.0);
        }

        let arp = &mut self.arp;
        arp.octaves = arp.octaves.clamp(1, 4);
        clamp_finite(&mut arp.rate, 0.1, 50.0, 8.0);
        clamp_finite(&mut arp.gate, 0.05, 1.0, 0.8);
        clamp_finite(&mut arp.swing, 0.0, 1.0, 0.0);
        arp.pattern_length = arp.pattern_length.min(SEQUENCER_SLOTS);
        arp.repeat = arp.repeat.clamp(1, 8);

        let seq = &mut self.sequencer;
        seq.root_midi = seq.root_midi.min(127);
        seq.length = seq.length.clamp(1, SEQUENCER_SLOTS);
        seq.steps.resize(SEQUENCER_SLOTS, SequencerStep::default());
        for step in seq.steps.iter_mut() {
            step.offset = step.offset.clamp(-24, 24);
            clamp_finite(&mut step.velocity, 0.0, 1.0, 0.0);
        }
        clamp_finite(&mut seq.gate, 0.05, 1.0, 0.5);
        clamp_finite(&mut seq.swing, 0.0, 1.0, 0.0);
        clamp_finite(&mut seq.spice_amount, 0.0, 1.0, 0.0);

        clamp_finite(&mut self.expression.amount, -1.0, 1.0, 0.0);
        matrix::sanitize_rows(&mut self.modulation);
    }

    /// Sanitized copy of `self`.
    pub fn sanitized(mut self) -> Self {
        self.sanitize();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_patch_is_already_sane() {
        let patch = Patch::default();
        assert_eq!(patch.clone().sanitized(), patch);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let mut patch = Patch::default();
        patch.osc1.detune = 5000.0;
        patch.mix = -3.0;
        patch.arp.gate = 4.0;
        patch.arp.swing = f32::NAN;
        patch.sequencer.length = 999;
        patch.sequencer.steps.truncate(3);
        patch.sequencer.steps[0].offset = -99;
        patch.sanitize();

        assert_eq!(patch.osc1.detune, 1200.0);
        assert_eq!(patch.mix, 0.0);
        assert_eq!(patch.arp.gate, 1.0);
        assert_eq!(patch.arp.swing, 0.0);
        assert_eq!(patch.sequencer.length, 64);
        assert_eq!(patch.sequencer.steps.len(), SEQUENCER_SLOTS);
        assert_eq!(patch.sequencer.steps[0].offset, -24);
    }

    #[test]
    fn parses_camel_case_json_with_unknown_enums() {
        let patch: Patch = serde_json::from_str(
            r#"{
                "osc1": {"mode": "macro", "macro": {"model": "granular", "harmonics": 0.2}},
                "osc2": {"mode": "theremin", "sampler": {"rootMidi": 57, "loop": true}},
                "sequencer": {"spiceSeed": "abc", "rootMidi": 50}
            }"#,
        )
        .unwrap();

        assert_eq!(patch.osc1.mode, OscMode::Macro);
        assert_eq!(patch.osc1.macro_settings.model, MacroModel::VirtualAnalog);
        assert_eq!(patch.osc1.macro_settings.harmonics, 0.2);
        assert_eq!(patch.osc2.mode, OscMode::Analog);
        assert_eq!(patch.osc2.sampler.root_midi, 57);
        assert!(patch.osc2.sampler.looped);
        assert_eq!(patch.sequencer.spice_seed, "abc");
        assert_eq!(patch.sequencer.root_midi, 50);
    }

    #[test]
    fn total_cents_combines_octave_detune_and_fine() {
        let osc = OscillatorConfig {
            octave: -1,
            detune: 7.0,
            fine: -2.0,
            ..OscillatorConfig::default()
        };
        assert_eq!(osc.total_cents(), -1195.0);
    }
}
