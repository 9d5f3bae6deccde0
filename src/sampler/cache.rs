use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use super::buffer::TrimWindow;

/// Pitch-shifted, trimmed channels ready for playback.
pub type Rendered = Arc<Vec<Vec<f32>>>;

/// Identity of one pitch-shifted rendering.
///
/// Times are kept in microseconds and the ratio in millionths so that the
/// key hashes exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PitchKey {
    pub id: String,
    pub trim_start_us: u64,
    pub trim_end_us: u64,
    pub ratio_micros: u64,
    pub sample_rate: u32,
    pub channels: usize,
}

impl PitchKey {
    pub fn new(
        id: &str,
        window: TrimWindow,
        ratio: f64,
        sample_rate: u32,
        channels: usize,
    ) -> Self {
        let micros = |t: f64| (t * 1e6).round().max(0.0) as u64;
        Self {
            id: id.to_string(),
            trim_start_us: micros(window.start),
            trim_end_us: micros(window.end),
            ratio_micros: micros(ratio),
            sample_rate,
            channels,
        }
    }

    /// Ratio as stored in the key.
    pub fn ratio(&self) -> f32 {
        (self.ratio_micros as f64 / 1e6) as f32
    }
}

/// Memo of vocoder output.
///
/// Unbounded unless a per-sample cap is set, in which case the oldest
/// rendering of that sample is evicted first.
#[derive(Debug, Default)]
pub struct PitchCache {
    entries: HashMap<PitchKey, Rendered>,
    order: HashMap<String, VecDeque<PitchKey>>,
    per_sample: Option<usize>,
}

impl PitchCache {
    pub fn new(per_sample: Option<usize>) -> Self {
        Self {
            per_sample: per_sample.map(|cap| cap.max(1)),
            ..Self::default()
        }
    }

    pub fn get(&self, key: &PitchKey) -> Option<Rendered> {
        self.entries.get(key).cloned()
    }

    pub fn contains(&self, key: &PitchKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: PitchKey, rendered: Rendered) {
        if self.entries.insert(key.clone(), rendered).is_some() {
            return;
        }
        let order = self.order.entry(key.id.clone()).or_default();
        order.push_back(key);
        if let Some(cap) = self.per_sample {
            while order.len() > cap {
                if let Some(oldest) = order.pop_front() {
                    self.entries.remove(&oldest);
                }
            }
        }
    }

    /// Entries cached for sample `id`.
    pub fn count_for(&self, id: &str) -> usize {
        self.order.get(id).map_or(0, VecDeque::len)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: &str, ratio: f64) -> PitchKey {
        PitchKey::new(id, TrimWindow { start: 0.0, end: 1.0 }, ratio, 48_000, 1)
    }

    #[test]
    fn ratios_round_to_six_decimals() {
        assert_eq!(key("a", 1.259_921_0), key("a", 1.259_921_04));
        assert_ne!(key("a", 1.259_921), key("a", 1.259_922));
        assert!((key("a", 0.5).ratio() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn unbounded_by_default() {
        let mut cache = PitchCache::new(None);
        for i in 0..50 {
            cache.insert(key("a", 1.0 + i as f64 * 0.01), Arc::new(vec![vec![0.0]]));
        }
        assert_eq!(cache.len(), 50);
    }

    #[test]
    fn cap_evicts_oldest_of_the_same_sample() {
        let mut cache = PitchCache::new(Some(2));
        cache.insert(key("a", 1.1), Arc::new(vec![]));
        cache.insert(key("b", 1.1), Arc::new(vec![]));
        cache.insert(key("a", 1.2), Arc::new(vec![]));
        cache.insert(key("a", 1.3), Arc::new(vec![]));

        assert!(!cache.contains(&key("a", 1.1)));
        assert!(cache.contains(&key("a", 1.3)));
        assert!(cache.contains(&key("b", 1.1)));
        assert_eq!(cache.count_for("a"), 2);
    }
}
