use crate::synth::VoiceId;

/// A note-off queued for a specific voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedOff {
    pub at: f64,
    pub note: u8,
    pub voice: VoiceId,
}

/// Scheduled note-offs, ordered by time.
///
/// Entries carry the id of the voice they were queued for; a newer voice on
/// the same note is never released by an older voice's off.
#[derive(Debug, Default)]
pub struct EventQueue {
    // Sorted by `at`; equal times keep insertion order.
    pending: Vec<TimedOff>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, off: TimedOff) {
        let index = self.pending.partition_point(|queued| queued.at <= off.at);
        self.pending.insert(index, off);
    }

    pub fn next_due(&self) -> Option<f64> {
        self.pending.first().map(|off| off.at)
    }

    /// Remove and return every entry due at or before `now`.
    pub fn pop_due(&mut self, now: f64) -> Vec<TimedOff> {
        let count = self.pending.partition_point(|queued| queued.at <= now);
        self.pending.drain(..count).collect()
    }

    /// Forget entries for a voice that is gone.
    pub fn remove_voice(&mut self, voice: VoiceId) {
        self.pending.retain(|off| off.voice != voice);
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn off(at: f64, voice: VoiceId) -> TimedOff {
        TimedOff { at, note: 60, voice }
    }

    #[test]
    fn pops_in_time_order() {
        let mut queue = EventQueue::new();
        queue.push(off(0.3, 3));
        queue.push(off(0.1, 1));
        queue.push(off(0.2, 2));
        queue.push(off(0.1, 4));

        assert_eq!(queue.next_due(), Some(0.1));
        let due: Vec<VoiceId> = queue.pop_due(0.2).iter().map(|o| o.voice).collect();
        assert_eq!(due, vec![1, 4, 2]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn removing_a_voice_drops_its_offs() {
        let mut queue = EventQueue::new();
        queue.push(off(0.1, 1));
        queue.push(off(0.2, 2));
        queue.remove_voice(1);
        assert_eq!(queue.next_due(), Some(0.2));
        queue.clear();
        assert!(queue.is_empty());
    }
}
