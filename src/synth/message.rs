/// Who asked for a note.
///
/// Only [`NoteSource::External`] events count as held-note input for the
/// arpeggiator; notes the schedulers synthesize carry their own source so
/// they are never fed back into it, and their note-offs only release voices
/// started by the same scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteSource {
    External,
    Arpeggiator,
    Sequencer,
}

/// Note events produced by a scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoteCommand {
    /// Start a note. With `duration` set the engine queues the matching off
    /// itself; without it the note rings until the scheduler cuts it.
    On {
        note: u8,
        velocity: f32,
        duration: Option<f64>,
    },
    Off {
        note: u8,
    },
}

impl NoteCommand {
    pub fn note(&self) -> u8 {
        match *self {
            NoteCommand::On { note, .. } | NoteCommand::Off { note } => note,
        }
    }
}
