//! Turning a patch and a note into a [`Voice`].

use super::{
    message::NoteSource,
    slot::Slot,
    voice::{FmLink, Voice, VoiceControls, VoiceId, VoiceParts},
};
use crate::{
    bank::{self, BuildEnv, MacroModel},
    dsp::{
        envelope::Envelope,
        oscillator::{NoiseBuffer, Oscillator, Waveform},
    },
    graph::node::{DetuneHandle, SharedParam},
    io::midi::midi_note_to_freq,
    patch::{OscMode, OscillatorConfig, Patch},
    sampler::SampleBank,
};

/// Peak of a full-velocity voice when nothing else is sounding.
pub const VOICE_BASE_GAIN: f32 = 0.5;

/// Envelope peak for a new voice when `active` voices are already sounding.
pub fn voice_peak(velocity: f32, active: usize) -> f32 {
    VOICE_BASE_GAIN * velocity.clamp(0.0, 1.0) / ((active + 1) as f32).sqrt()
}

/// The parts of a patch that are baked into a voice's graph.
///
/// When any of these change, sounding voices are released and the next note
/// is built with the new graph. Everything else reaches live voices through
/// their [`VoiceControls`].
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    slots: [SlotTopology; 2],
    fm: Option<u32>,
    ring: bool,
    sub: Option<(u8, Waveform)>,
}

#[derive(Debug, Clone, PartialEq)]
enum SlotTopology {
    Analog(Waveform),
    Macro(MacroModel),
    Sampler(String),
}

impl SlotTopology {
    fn of(osc: &OscillatorConfig) -> Self {
        match osc.mode {
            OscMode::Analog => SlotTopology::Analog(osc.wave),
            OscMode::Macro => SlotTopology::Macro(osc.macro_settings.model),
            OscMode::Sampler => SlotTopology::Sampler(osc.sampler.id.clone()),
        }
    }
}

impl Topology {
    pub fn of(patch: &Patch) -> Self {
        Self {
            slots: [SlotTopology::of(&patch.osc1), SlotTopology::of(&patch.osc2)],
            fm: fm_active(patch).then(|| patch.fm.ratio.to_bits()),
            ring: patch.ring.enabled,
            sub: patch.sub.enabled.then_some((patch.sub.octave, patch.sub.wave)),
        }
    }
}

/// FM needs a pitched carrier in slot 1; sampler playback is not one.
fn fm_active(patch: &Patch) -> bool {
    patch.fm.enabled && patch.osc1.mode != OscMode::Sampler
}

/// Shared resources for building voices.
pub struct BuildContext<'a> {
    pub sample_rate: f32,
    pub noise: &'a NoiseBuffer,
    pub samples: &'a mut SampleBank,
}

/// Identity and timing of the note to build.
#[derive(Debug, Clone, Copy)]
pub struct NoteRequest {
    pub id: VoiceId,
    pub note: u8,
    pub velocity: f32,
    pub source: NoteSource,
    pub at: f64,
    /// Voices sounding before this one.
    pub active: usize,
}

struct BuiltSlot {
    slot: Slot,
    detune: Vec<DetuneHandle>,
    level: Option<SharedParam>,
}

fn build_slot(
    index: usize,
    osc: &OscillatorConfig,
    frequency: f32,
    noise_offset: usize,
    ctx: &mut BuildContext,
) -> BuiltSlot {
    let cents = osc.total_cents();
    match osc.mode {
        OscMode::Analog => {
            let osc = Oscillator::new(osc.wave, frequency);
            let handle = DetuneHandle::new(osc.detune(), 0.0);
            handle.apply(cents);
            BuiltSlot {
                slot: Slot::Analog(osc),
                detune: vec![handle],
                level: None,
            }
        }
        OscMode::Macro => {
            let env = BuildEnv::new(ctx.sample_rate, ctx.noise).with_noise_offset(noise_offset);
            let built = bank::build(osc.macro_settings.model, frequency, &osc.macro_settings, &env);
            built.retune(cents);
            BuiltSlot {
                detune: built.pitched().to_vec(),
                level: Some(built.level()),
                slot: Slot::Macro(built),
            }
        }
        OscMode::Sampler => {
            let slot = ctx
                .samples
                .player(index, &osc.sampler, frequency, cents, ctx.sample_rate)
                .map_or(Slot::Silent, Slot::Sampler);
            BuiltSlot {
                slot,
                detune: Vec::new(),
                level: None,
            }
        }
    }
}

pub fn build_voice(request: NoteRequest, patch: &Patch, ctx: &mut BuildContext) -> Voice {
    let frequency = midi_note_to_freq(request.note);
    let noise_offset = (request.id as usize).wrapping_mul(7919) % ctx.noise.len().max(1);

    let fm = fm_active(patch).then(|| FmLink {
        carrier_hz: frequency,
        modulator_hz: frequency * patch.fm.ratio,
    });
    let osc2_frequency = fm.as_ref().map_or(frequency, |link| link.modulator_hz);

    let first = build_slot(0, &patch.osc1, frequency, noise_offset, ctx);
    let second = build_slot(1, &patch.osc2, osc2_frequency, noise_offset / 2, ctx);

    let sub = patch.sub.enabled.then(|| {
        let divisor = (1u32 << patch.sub.octave.clamp(1, 2)) as f32;
        Oscillator::new(patch.sub.wave, frequency / divisor)
    });

    let mut controls = VoiceControls::new(patch);
    controls.detune = [first.detune, second.detune];
    controls.macro_level = [first.level, second.level];

    let env = &patch.envelope;
    let parts = VoiceParts {
        id: request.id,
        note: request.note,
        source: request.source,
        slots: [first.slot, second.slot],
        sub,
        fm,
        ring: patch.ring.enabled,
        controls,
        envelope: Envelope::adsr(env.attack, env.decay, env.sustain, env.release),
    };
    Voice::new(parts, request.at, voice_peak(request.velocity, request.active))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        graph::node::RenderCtx,
        modulation::VoiceMod,
        sampler::SampleLoader,
    };

    fn request(note: u8, active: usize) -> NoteRequest {
        NoteRequest {
            id: 1,
            note,
            velocity: 1.0,
            source: NoteSource::External,
            at: 0.0,
            active,
        }
    }

    fn render(voice: &mut Voice, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        voice.render_add(&mut out, &RenderCtx::new(48_000.0, 0.0), VoiceMod::default());
        out
    }

    #[test]
    fn peak_follows_inverse_square_root() {
        for active in 0..8 {
            let expected = VOICE_BASE_GAIN / ((active + 1) as f32).sqrt();
            assert!((voice_peak(1.0, active) - expected).abs() < 1e-6);
        }
        assert_eq!(voice_peak(0.5, 0), VOICE_BASE_GAIN * 0.5);
    }

    #[test]
    fn every_mode_builds_a_sounding_or_silent_voice() {
        let noise = NoiseBuffer::new(4096, 1);
        let mut samples = SampleBank::new(SampleLoader::inline(), None);
        let mut ctx = BuildContext {
            sample_rate: 48_000.0,
            noise: &noise,
            samples: &mut samples,
        };

        let mut patch = Patch::default();
        patch.osc1.mode = OscMode::Macro;
        patch.osc1.macro_settings.model = MacroModel::Supersaw;
        patch.osc2.mode = OscMode::Sampler;
        patch.sub.enabled = true;
        patch.ring.enabled = true;
        patch.ring.amount = 0.5;

        let mut voice = build_voice(request(57, 0), &patch, &mut ctx);
        let out = render(&mut voice, 1024);
        assert!(out.iter().all(|s| s.is_finite()));
        assert!(out.iter().any(|s| s.abs() > 1e-4));
        assert_eq!(voice.controls().detune[0].len(), 7);
        assert!(voice.controls().detune[1].is_empty());
    }

    #[test]
    fn fm_needs_a_pitched_carrier_in_slot_one() {
        let mut patch = Patch::default();
        patch.fm.enabled = true;
        patch.fm.ratio = 3.0;
        assert!(fm_active(&patch));
        patch.osc1.mode = OscMode::Macro;
        assert!(fm_active(&patch));
        patch.osc1.mode = OscMode::Sampler;
        assert!(!fm_active(&patch));
    }

    #[test]
    fn fm_reaches_a_macro_carrier() {
        let noise = NoiseBuffer::new(4096, 1);
        let mut samples = SampleBank::new(SampleLoader::inline(), None);
        let mut ctx = BuildContext {
            sample_rate: 48_000.0,
            noise: &noise,
            samples: &mut samples,
        };
        let mut patch = Patch::default();
        patch.osc1.mode = OscMode::Macro;
        patch.osc1.macro_settings.model = MacroModel::VirtualAnalog;
        patch.osc2.wave = Waveform::Sine;
        patch.mix = 0.0;
        patch.envelope.attack = 0.0;
        patch.envelope.sustain = 1.0;

        let mut plain = build_voice(request(57, 0), &patch, &mut ctx);
        let dry = render(&mut plain, 2048);

        patch.fm.enabled = true;
        patch.fm.ratio = 1.0;
        patch.fm.amount = 4.0;
        let mut modulated = build_voice(request(57, 0), &patch, &mut ctx);
        let wet = render(&mut modulated, 2048);

        assert!(wet.iter().all(|s| s.is_finite()));
        let difference = dry
            .iter()
            .zip(&wet)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max);
        assert!(difference > 0.05, "max difference {difference}");
    }

    #[test]
    fn release_reaches_silence_and_finishes() {
        let noise = NoiseBuffer::new(4096, 1);
        let mut samples = SampleBank::new(SampleLoader::inline(), None);
        let mut ctx = BuildContext {
            sample_rate: 48_000.0,
            noise: &noise,
            samples: &mut samples,
        };
        let mut patch = Patch::default();
        patch.envelope.release = 0.01;
        let mut voice = build_voice(request(60, 0), &patch, &mut ctx);

        let end = voice.release(0.0);
        assert!((end - 0.01).abs() < 1e-9);
        let out = render(&mut voice, 4800);
        assert!(out[1000..].iter().all(|s| *s == 0.0));
        assert!(voice.is_finished());
    }

    #[test]
    fn topology_ignores_continuous_settings() {
        let patch = Patch::default();
        let mut tweaked = patch.clone();
        tweaked.mix = 0.1;
        tweaked.osc1.detune = 30.0;
        tweaked.osc1.macro_settings.harmonics = 0.9;
        assert_eq!(Topology::of(&patch), Topology::of(&tweaked));

        tweaked.osc2.wave = Waveform::Triangle;
        assert_ne!(Topology::of(&patch), Topology::of(&tweaked));
    }
}
