use crate::names::lenient_enum;

lenient_enum! {
    /// Root transpositions applied once per sequencer loop.
    pub enum Progression {
        None = "none",
        /// I V vi IV
        Pop = "pop",
        /// I vi IV V
        Fifties = "fifties",
        /// I IV I V
        Blues = "blues",
        /// ii V I
        Jazz = "jazz",
        /// i VI III VII
        Minor = "minor",
        Circle = "circle",
    }
    default = None;
}

impl Progression {
    /// Semitone offsets from the sequencer root, one per loop.
    pub fn offsets(self) -> &'static [i32] {
        match self {
            Progression::None => &[0],
            Progression::Pop => &[0, 7, 9, 5],
            Progression::Fifties => &[0, 9, 5, 7],
            Progression::Blues => &[0, 5, 0, 7],
            Progression::Jazz => &[2, 7, 0],
            Progression::Minor => &[0, 8, 3, 10],
            // Up a fourth each loop, folded into one octave.
            Progression::Circle => &[0, 5, 10, 3, 8, 1, 6, 11, 4, 9, 2, 7],
        }
    }

    pub fn offset_at(self, position: usize) -> i32 {
        let offsets = self.offsets();
        offsets[position % offsets.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_wrap() {
        assert_eq!(Progression::Jazz.offset_at(0), 2);
        assert_eq!(Progression::Jazz.offset_at(4), 7);
        assert_eq!(Progression::None.offset_at(17), 0);
    }

    #[test]
    fn circle_visits_every_pitch_class() {
        let mut seen: Vec<i32> = Progression::Circle.offsets().to_vec();
        seen.sort_unstable();
        assert_eq!(seen, (0..12).collect::<Vec<_>>());
    }
}
