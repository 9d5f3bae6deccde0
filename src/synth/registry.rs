use std::collections::BTreeMap;

use tracing::trace;

use super::{
    message::NoteSource,
    voice::{Voice, VoiceId},
};

/// The sounding voices, at most one per MIDI note.
///
/// Releasing voices stay registered under their note until the release tail
/// has rendered out, so a retrigger of that note replaces them.
#[derive(Default)]
pub struct VoiceRegistry {
    voices: BTreeMap<u8, Voice>,
    next_id: VoiceId,
}

impl VoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out a fresh id. Ids are never reused.
    pub fn next_id(&mut self) -> VoiceId {
        self.next_id += 1;
        self.next_id
    }

    /// Register `voice`, returning the voice it displaced on the same note.
    pub fn insert(&mut self, voice: Voice) -> Option<Voice> {
        self.voices.insert(voice.note(), voice)
    }

    /// Remove whatever voice is on `note`, releasing or not.
    pub fn take_note(&mut self, note: u8) -> Option<Voice> {
        self.voices.remove(&note)
    }

    pub fn get(&self, note: u8) -> Option<&Voice> {
        self.voices.get(&note)
    }

    /// Release the voice on `note` if `source` started it. Returns its id.
    pub fn release(&mut self, note: u8, source: NoteSource, at: f64) -> Option<VoiceId> {
        let voice = self.voices.get_mut(&note)?;
        if voice.source() != source || voice.is_releasing() {
            return None;
        }
        voice.release(at);
        Some(voice.id())
    }

    /// Release the voice on `note` only if it is still the voice `id`.
    pub fn release_id(&mut self, note: u8, id: VoiceId, at: f64) -> bool {
        match self.voices.get_mut(&note) {
            Some(voice) if voice.id() == id => {
                voice.release(at);
                true
            }
            _ => false,
        }
    }

    /// Release every voice at `at`.
    pub fn release_all(&mut self, at: f64) {
        for voice in self.voices.values_mut() {
            voice.release(at);
        }
    }

    /// Drop voices whose release has finished and return their ids.
    pub fn reap(&mut self) -> Vec<VoiceId> {
        let mut reaped = Vec::new();
        self.voices.retain(|_, voice| {
            let done = voice.is_finished();
            if done {
                reaped.push(voice.id());
            }
            !done
        });
        if !reaped.is_empty() {
            trace!(count = reaped.len(), "voices reaped");
        }
        reaped
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn ids(&self) -> Vec<VoiceId> {
        self.voices.values().map(Voice::id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Voice> {
        self.voices.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Voice> {
        self.voices.values_mut()
    }

    /// Remove every voice at once.
    pub fn drain(&mut self) -> Vec<Voice> {
        std::mem::take(&mut self.voices).into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dsp::oscillator::NoiseBuffer,
        graph::node::RenderCtx,
        modulation::VoiceMod,
        patch::Patch,
        sampler::{SampleBank, SampleLoader},
        synth::builder::{build_voice, BuildContext, NoteRequest},
    };

    fn voice(registry: &mut VoiceRegistry, note: u8, source: NoteSource, patch: &Patch) -> Voice {
        let noise = NoiseBuffer::new(1024, 9);
        let mut samples = SampleBank::new(SampleLoader::inline(), None);
        let mut ctx = BuildContext {
            sample_rate: 48_000.0,
            noise: &noise,
            samples: &mut samples,
        };
        let request = NoteRequest {
            id: registry.next_id(),
            note,
            velocity: 1.0,
            source,
            at: 0.0,
            active: registry.len(),
        };
        build_voice(request, patch, &mut ctx)
    }

    #[test]
    fn one_voice_per_note() {
        let patch = Patch::default();
        let mut registry = VoiceRegistry::new();
        let first = voice(&mut registry, 60, NoteSource::External, &patch);
        let first_id = first.id();
        assert!(registry.insert(first).is_none());

        let second = voice(&mut registry, 60, NoteSource::External, &patch);
        let displaced = registry.insert(second).map(|v| v.id());
        assert_eq!(displaced, Some(first_id));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn release_respects_provenance_and_generation() {
        let patch = Patch::default();
        let mut registry = VoiceRegistry::new();
        let v = voice(&mut registry, 64, NoteSource::Sequencer, &patch);
        let id = v.id();
        registry.insert(v);

        assert_eq!(registry.release(64, NoteSource::External, 0.1), None);
        assert!(!registry.release_id(64, id + 1, 0.1));
        assert!(registry.release_id(64, id, 0.1));
        assert!(registry.get(64).is_some_and(Voice::is_releasing));
    }

    #[test]
    fn finished_voices_are_reaped() {
        let mut patch = Patch::default();
        patch.envelope.release = 0.0;
        let mut registry = VoiceRegistry::new();
        let v = voice(&mut registry, 48, NoteSource::External, &patch);
        let id = v.id();
        registry.insert(v);
        registry.release_all(0.0);

        let mut out = vec![0.0; 512];
        for voice in registry.iter_mut() {
            voice.render_add(&mut out, &RenderCtx::new(48_000.0, 0.0), VoiceMod::default());
        }
        assert_eq!(registry.reap(), vec![id]);
        assert!(registry.is_empty());
    }
}
