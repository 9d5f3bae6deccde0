use serde::{Deserialize, Serialize};

/// Construction-time settings for a [`SynthEngine`](super::SynthEngine).
///
/// Every field has a default, so a partial JSON document (or `{}`) is a
/// valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub sample_rate: f32,
    /// Length of the raw waveform tap, in samples.
    pub scope_len: usize,
    /// Cap on pitch-shifted renderings kept per sample identity. `None`
    /// keeps every ratio ever played.
    pub pitch_cache_per_sample: Option<usize>,
    /// Length of the shared noise buffer.
    pub noise_seconds: f32,
    /// Seeds the noise buffer and the random arpeggiator order.
    pub seed: u64,
    /// Decode and pitch-shift samples on a worker thread. When false both
    /// run inline on the calling thread.
    pub decode_in_background: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            scope_len: 2048,
            pitch_cache_per_sample: None,
            noise_seconds: 2.0,
            seed: 0x5eed,
            decode_in_background: true,
        }
    }
}

impl EngineConfig {
    pub fn with_sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub(crate) fn noise_len(&self) -> usize {
        ((self.noise_seconds.max(0.1) * self.sample_rate.max(1.0)) as usize).max(1)
    }
}
