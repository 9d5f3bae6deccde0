// Purpose - external interfaces: MIDI input and the engine command stream

pub mod converter;
pub mod midi;

/// Everything a UI or transport thread can ask of a running engine.
///
/// Hosts that render on a realtime thread send these through a ring buffer
/// and apply them with [`SynthEngine::apply_command`](crate::SynthEngine::apply_command)
/// at the start of each callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineCommand {
    NoteOn { note: u8, velocity: f32 },
    NoteOff { note: u8 },
    AllNotesOff,
    Expression { x: f32, y: f32 },
    ClearExpression,
    SequencerPlaying(bool),
}
