//! Rhythmic note schedulers driven by the audio clock.
//!
//! The [`Arpeggiator`] and the [`Sequencer`] never touch voices directly.
//! Each reports when its next step is due; the engine splits the render
//! block at that time, calls `tick`, and turns the returned
//! [`NoteCommand`](crate::synth::message::NoteCommand)s into voices.

use serde::Serialize;

pub mod arpeggiator;
pub mod progression;
pub mod sequencer;
pub mod spice;
pub mod timing;

pub use arpeggiator::{ArpMode, ArpState, Arpeggiator, ChordType, IntervalSource};
pub use progression::Progression;
pub use sequencer::Sequencer;
pub use timing::{Division, StepClock, StepTiming};

/// Poll-style snapshot of a scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub running: bool,
    pub step_index: usize,
    pub length: usize,
    /// Last note played by the arpeggiator, or the resolved root of the sequencer.
    pub current_root: Option<u8>,
}

/// `note + semitones`, or `None` outside the MIDI range.
pub(crate) fn transpose(note: u8, semitones: i32) -> Option<u8> {
    let shifted = note as i32 + semitones;
    (0..=127).contains(&shifted).then_some(shifted as u8)
}
