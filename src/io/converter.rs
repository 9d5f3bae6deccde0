use crate::io::{
    midi::{velocity_to_unit, MidiEvent, ALL_NOTES_OFF},
    EngineCommand,
};

/// Translate a MIDI message on `channel_filter` into an engine command.
pub fn midi_to_command(midi: MidiEvent, channel_filter: u8) -> Option<EngineCommand> {
    if midi.channel() != channel_filter {
        return None;
    }
    match midi {
        MidiEvent::NoteOn { key, velocity, .. } => Some(EngineCommand::NoteOn {
            note: key,
            velocity: velocity_to_unit(velocity),
        }),
        MidiEvent::NoteOff { key, .. } => Some(EngineCommand::NoteOff { note: key }),
        MidiEvent::ControlChange { controller, .. } if controller == ALL_NOTES_OFF => {
            Some(EngineCommand::AllNotesOff)
        }
        MidiEvent::ControlChange { .. } => None,
    }
}

/// Parse raw bytes and translate them in one go.
pub fn bytes_to_command(bytes: &[u8], channel_filter: u8) -> Option<EngineCommand> {
    MidiEvent::parse(bytes).and_then(|event| midi_to_command(event, channel_filter))
}
