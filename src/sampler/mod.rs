//! Sample slots: decoding, trimming, pitch shifting and playback.
//!
//! Each oscillator slot in sampler mode refers to a sample by id. The bank
//! decodes a slot's source only when that id changes, on the loader thread,
//! and tags every request with a per-slot load token: a result whose token is
//! older than the slot's current one is dropped, so a fast sequence of sample
//! swaps always ends on the last selection.
//!
//! Playing a note resolves a ratio against the slot's root note and asks the
//! [`PitchCache`] for a rendering. Misses are shifted by the phase vocoder on
//! the loader and delivered to the waiting players when they come back.

use std::{collections::HashSet, sync::Arc};

use tracing::{debug, trace, warn};

pub mod buffer;
pub mod cache;
pub mod loader;
pub mod player;

pub use buffer::{SampleBuffer, TrimWindow};
pub use cache::{PitchCache, PitchKey, Rendered};
pub use loader::SampleLoader;
pub use player::SamplePlayer;

use crate::{dsp::oscillator::cents_to_ratio, io::midi::midi_note_to_freq, patch::SamplerSettings};
use loader::{Job, JobResult};

/// Number of sampler-capable oscillator slots.
pub const SLOTS: usize = 2;

#[derive(Debug, Clone, Default)]
pub enum SampleState {
    /// No sample selected.
    #[default]
    Empty,
    Loading,
    Ready(Arc<SampleBuffer>),
    /// The source could not be decoded; the slot stays silent.
    Failed,
}

#[derive(Debug, Default)]
struct Slot {
    id: Option<String>,
    token: u64,
    state: SampleState,
}

/// Renderings that finished since the last poll.
pub type Delivered = Vec<(PitchKey, Rendered)>;

pub struct SampleBank {
    slots: [Slot; SLOTS],
    loader: SampleLoader,
    cache: PitchCache,
    in_flight: HashSet<PitchKey>,
}

impl SampleBank {
    pub fn new(loader: SampleLoader, cache_cap: Option<usize>) -> Self {
        Self {
            slots: Default::default(),
            loader,
            cache: PitchCache::new(cache_cap),
            in_flight: HashSet::new(),
        }
    }

    pub fn state(&self, slot: usize) -> &SampleState {
        &self.slots[slot.min(SLOTS - 1)].state
    }

    pub fn cache(&self) -> &PitchCache {
        &self.cache
    }

    /// Follow the slot's settings, decoding only when the sample id changed.
    pub fn sync(&mut self, slot: usize, settings: &SamplerSettings) {
        let Some(entry) = self.slots.get_mut(slot) else {
            return;
        };
        let id = (!settings.id.is_empty()).then(|| settings.id.clone());
        if entry.id == id {
            return;
        }
        entry.id = id;
        entry.token += 1;

        let Some(id) = entry.id.as_deref() else {
            entry.state = SampleState::Empty;
            return;
        };
        let source = settings.data_url.clone().unwrap_or_default();
        if source.is_empty() {
            warn!(slot, id, "sample has no data source");
            entry.state = SampleState::Failed;
            return;
        }

        debug!(slot, id, token = entry.token, "decoding sample");
        entry.state = SampleState::Loading;
        let token = entry.token;
        if !self.loader.submit(Job::Decode {
            slot,
            token,
            source,
        }) {
            entry.state = SampleState::Failed;
        }
    }

    /// Collect finished decodes and renderings.
    pub fn poll(&mut self) -> Delivered {
        let mut delivered = Vec::new();
        while let Some(result) = self.loader.poll() {
            match result {
                JobResult::Decoded {
                    slot,
                    token,
                    result,
                } => {
                    let Some(entry) = self.slots.get_mut(slot) else {
                        continue;
                    };
                    if token != entry.token {
                        trace!(slot, token, current = entry.token, "discarding stale decode");
                        continue;
                    }
                    entry.state = match result {
                        Ok(buffer) => {
                            debug!(slot, frames = buffer.frames(), "sample ready");
                            SampleState::Ready(Arc::new(buffer))
                        }
                        Err(err) => {
                            warn!(slot, %err, "sample decode failed");
                            SampleState::Failed
                        }
                    };
                }
                JobResult::Shifted { key, output } => {
                    self.in_flight.remove(&key);
                    let rendered = Arc::new(output);
                    self.cache.insert(key.clone(), rendered.clone());
                    delivered.push((key, rendered));
                }
            }
        }
        delivered
    }

    /// Player for `slot` at `frequency`, detuned by `cents`.
    ///
    /// Returns `None` while the slot has no decoded sample. On a cache miss
    /// the player is returned silent and the rendering is queued.
    pub fn player(
        &mut self,
        slot: usize,
        settings: &SamplerSettings,
        frequency: f32,
        cents: f32,
        sample_rate: f32,
    ) -> Option<SamplePlayer> {
        let entry = self.slots.get(slot)?;
        let (SampleState::Ready(buffer), Some(id)) = (&entry.state, entry.id.as_deref()) else {
            return None;
        };

        // A buffer recorded at another rate already plays at a different pitch.
        let rate_ratio = buffer.sample_rate() as f64 / sample_rate as f64;
        let note_ratio = frequency as f64 / midi_note_to_freq(settings.root_midi) as f64;
        let ratio = note_ratio * cents_to_ratio(cents) as f64;

        let window = TrimWindow::resolve(settings.trim_start, settings.trim_end, buffer.duration());
        let key = PitchKey::new(
            id,
            window,
            ratio * rate_ratio,
            buffer.sample_rate(),
            buffer.channel_count(),
        );

        if let Some(rendered) = self.cache.get(&key) {
            return Some(SamplePlayer::new(key, Some(rendered), settings.looped));
        }

        let input = Arc::new(buffer.trimmed(window));
        if key.ratio_micros == 1_000_000 {
            self.cache.insert(key.clone(), input.clone());
            return Some(SamplePlayer::new(key, Some(input), settings.looped));
        }

        if self.in_flight.insert(key.clone())
            && !self.loader.submit(Job::Shift {
                key: key.clone(),
                input,
            })
        {
            self.in_flight.remove(&key);
        }
        Some(SamplePlayer::new(key, None, settings.looped))
    }
}
