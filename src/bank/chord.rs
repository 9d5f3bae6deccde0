use super::{BuildEnv, Built};
use crate::{dsp::oscillator::Oscillator, graph::mix::Layers, patch::MacroSettings};

/// Chord shapes in semitones, selected by the harmonics knob.
const CHORDS: [&[i32]; 8] = [
    &[0, 12],
    &[0, 7],
    &[0, 4, 7],
    &[0, 3, 7],
    &[0, 5, 7],
    &[0, 4, 7, 11],
    &[0, 3, 7, 10],
    &[0, 4, 7, 10],
];

/// Cents between the saw and sine of one tone.
const PAIR_DETUNE: f32 = 3.0;

/// Semitone intervals after applying the voicing spread.
///
/// Below a third of the knob the chord is closed, then every odd tone moves
/// up an octave, and in the top third the root also drops an octave.
fn voicing(chord: &[i32], spread: f32) -> Vec<i32> {
    chord
        .iter()
        .enumerate()
        .map(|(i, &interval)| {
            let mut interval = interval;
            if spread >= 1.0 / 3.0 && i % 2 == 1 {
                interval += 12;
            }
            if spread >= 2.0 / 3.0 && i == 0 {
                interval -= 12;
            }
            interval
        })
        .collect()
}

pub(super) fn build(frequency: f32, settings: &MacroSettings, _env: &BuildEnv) -> Built {
    let slot = (settings.harmonics * (CHORDS.len() - 1) as f32).round() as usize;
    let chord = CHORDS[slot.min(CHORDS.len() - 1)];

    let mut layers = Layers::new();
    let mut pitched = Vec::with_capacity(chord.len() * 2);
    for interval in voicing(chord, settings.morph) {
        let cents = interval as f32 * 100.0;
        pitched.push(layers.push(
            Oscillator::sawtooth(frequency),
            cents - PAIR_DETUNE,
            settings.timbre,
        ));
        pitched.push(layers.push(
            Oscillator::sine(frequency),
            cents + PAIR_DETUNE,
            1.0 - settings.timbre,
        ));
    }
    layers.normalize(1.0);

    Built {
        node: Box::new(layers),
        pitched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voicing_spreads_in_three_steps() {
        let triad = [0, 4, 7];
        assert_eq!(voicing(&triad, 0.0), vec![0, 4, 7]);
        assert_eq!(voicing(&triad, 0.5), vec![0, 16, 7]);
        assert_eq!(voicing(&triad, 1.0), vec![-12, 16, 7]);
    }
}
