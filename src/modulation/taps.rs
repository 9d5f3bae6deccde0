use crate::{patch::ModSource, synth::voice::VoiceId};

/// One of the two shared LFOs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LfoId {
    Lfo1,
    Lfo2,
}

impl LfoId {
    pub const ALL: [LfoId; 2] = [LfoId::Lfo1, LfoId::Lfo2];

    pub fn index(self) -> usize {
        match self {
            LfoId::Lfo1 => 0,
            LfoId::Lfo2 => 1,
        }
    }

    pub fn from_source(source: ModSource) -> Option<Self> {
        match source {
            ModSource::Lfo1 => Some(LfoId::Lfo1),
            ModSource::Lfo2 => Some(LfoId::Lfo2),
            _ => None,
        }
    }
}

/// Where a tap feeds its LFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapDestination {
    /// Detune of every pitched node of one voice, in cents.
    Pitch(VoiceId),
    /// Crossfade position of one voice.
    Mix(VoiceId),
    /// Master filter cutoff, in cents.
    FilterCutoff,
    /// Master gain, as a fraction of the gain.
    Amp,
}

impl TapDestination {
    pub fn voice(&self) -> Option<VoiceId> {
        match *self {
            TapDestination::Pitch(voice) | TapDestination::Mix(voice) => Some(voice),
            TapDestination::FilterCutoff | TapDestination::Amp => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tap {
    pub destination: TapDestination,
    pub gain: f32,
}

/// Active taps per LFO.
///
/// Voices come and go far more often than the LFOs are reconfigured, so each
/// voice's entries are removed on their own without touching the others.
#[derive(Debug, Default)]
pub struct TapRegistry {
    taps: [Vec<Tap>; 2],
}

impl TapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect `lfo` to `destination`, replacing the gain of an existing tap.
    pub fn connect(&mut self, lfo: LfoId, destination: TapDestination, gain: f32) {
        let taps = &mut self.taps[lfo.index()];
        match taps.iter_mut().find(|tap| tap.destination == destination) {
            Some(tap) => tap.gain = gain,
            None => taps.push(Tap { destination, gain }),
        }
    }

    pub fn disconnect(&mut self, lfo: LfoId, destination: TapDestination) -> bool {
        let taps = &mut self.taps[lfo.index()];
        let before = taps.len();
        taps.retain(|tap| tap.destination != destination);
        taps.len() != before
    }

    /// Connect when `gain` is non-zero, disconnect otherwise.
    pub fn set(&mut self, lfo: LfoId, destination: TapDestination, gain: f32) {
        if gain != 0.0 && gain.is_finite() {
            self.connect(lfo, destination, gain);
        } else {
            self.disconnect(lfo, destination);
        }
    }

    /// Remove every tap owned by `voice`. Returns how many were removed.
    pub fn detach_voice(&mut self, voice: VoiceId) -> usize {
        let mut removed = 0;
        for taps in self.taps.iter_mut() {
            let before = taps.len();
            taps.retain(|tap| tap.destination.voice() != Some(voice));
            removed += before - taps.len();
        }
        removed
    }

    pub fn taps(&self, lfo: LfoId) -> &[Tap] {
        &self.taps[lfo.index()]
    }

    /// Gain of `lfo` into `destination`, 0 when not connected.
    pub fn gain(&self, lfo: LfoId, destination: TapDestination) -> f32 {
        self.taps(lfo)
            .iter()
            .find(|tap| tap.destination == destination)
            .map_or(0.0, |tap| tap.gain)
    }

    /// Gains of both LFOs into `destination`.
    pub fn gains(&self, destination: TapDestination) -> [f32; 2] {
        LfoId::ALL.map(|lfo| self.gain(lfo, destination))
    }

    pub fn voice_taps(&self, voice: VoiceId) -> usize {
        self.taps
            .iter()
            .flatten()
            .filter(|tap| tap.destination.voice() == Some(voice))
            .count()
    }

    pub fn len(&self) -> usize {
        self.taps.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detaching_a_voice_leaves_others() {
        let mut registry = TapRegistry::new();
        registry.connect(LfoId::Lfo1, TapDestination::Pitch(1), 50.0);
        registry.connect(LfoId::Lfo1, TapDestination::Pitch(2), 50.0);
        registry.connect(LfoId::Lfo2, TapDestination::Mix(1), 0.3);
        registry.connect(LfoId::Lfo2, TapDestination::FilterCutoff, 1200.0);

        assert_eq!(registry.detach_voice(1), 2);
        assert_eq!(registry.voice_taps(1), 0);
        assert_eq!(registry.voice_taps(2), 1);
        assert_eq!(registry.gain(LfoId::Lfo2, TapDestination::FilterCutoff), 1200.0);
    }

    #[test]
    fn connect_replaces_and_zero_disconnects() {
        let mut registry = TapRegistry::new();
        registry.set(LfoId::Lfo1, TapDestination::Amp, 0.25);
        registry.set(LfoId::Lfo1, TapDestination::Amp, 0.5);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.gains(TapDestination::Amp), [0.5, 0.0]);

        registry.set(LfoId::Lfo1, TapDestination::Amp, 0.0);
        assert!(registry.is_empty());
    }
}
