/// Externally held keys in the order they were pressed.
#[derive(Debug, Clone, Default)]
pub struct HeldNotes {
    notes: Vec<(u8, f32)>,
}

impl HeldNotes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the note was not already held.
    pub fn press(&mut self, note: u8, velocity: f32) -> bool {
        let fresh = self.release(note).is_none();
        self.notes.push((note, velocity));
        fresh
    }

    pub fn release(&mut self, note: u8) -> Option<f32> {
        let index = self.notes.iter().position(|&(n, _)| n == note)?;
        Some(self.notes.remove(index).1)
    }

    pub fn clear(&mut self) {
        self.notes.clear();
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn contains(&self, note: u8) -> bool {
        self.notes.iter().any(|&(n, _)| n == note)
    }

    /// `(note, velocity)` pairs in press order.
    pub fn as_played(&self) -> &[(u8, f32)] {
        &self.notes
    }

    /// `(note, velocity)` pairs sorted by pitch.
    pub fn ascending(&self) -> Vec<(u8, f32)> {
        let mut sorted = self.notes.clone();
        sorted.sort_by_key(|&(n, _)| n);
        sorted
    }

    pub fn average_velocity(&self) -> Option<f32> {
        if self.notes.is_empty() {
            return None;
        }
        let sum: f32 = self.notes.iter().map(|&(_, v)| v).sum();
        Some(sum / self.notes.len() as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repressing_moves_note_to_the_end() {
        let mut held = HeldNotes::new();
        assert!(held.press(64, 0.5));
        assert!(held.press(60, 0.5));
        assert!(!held.press(64, 1.0));

        let order: Vec<u8> = held.as_played().iter().map(|&(n, _)| n).collect();
        assert_eq!(order, vec![60, 64]);
        assert_eq!(held.average_velocity(), Some(0.75));
    }

    #[test]
    fn release_reports_velocity() {
        let mut held = HeldNotes::new();
        held.press(60, 0.3);
        assert_eq!(held.release(60), Some(0.3));
        assert_eq!(held.release(60), None);
        assert_eq!(held.average_velocity(), None);
    }
}
