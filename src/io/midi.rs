/// Channel voice messages the engine understands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MidiEvent {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
}

/// CC 123, all notes off.
pub const ALL_NOTES_OFF: u8 = 123;

impl MidiEvent {
    /// Parse one short message. Running status is not supported.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;
        let channel = status & 0x0F;
        let data1 = *data.first()? & 0x7F;
        let data2 = data.get(1).map(|b| b & 0x7F);

        match status & 0xF0 {
            // A note-on with zero velocity is a note-off.
            0x90 if data2? > 0 => Some(MidiEvent::NoteOn {
                channel,
                key: data1,
                velocity: data2?,
            }),
            0x90 | 0x80 => Some(MidiEvent::NoteOff {
                channel,
                key: data1,
                velocity: data2.unwrap_or(0),
            }),
            0xB0 => Some(MidiEvent::ControlChange {
                channel,
                controller: data1,
                value: data2?,
            }),
            _ => None,
        }
    }

    pub fn channel(&self) -> u8 {
        match *self {
            MidiEvent::NoteOn { channel, .. }
            | MidiEvent::NoteOff { channel, .. }
            | MidiEvent::ControlChange { channel, .. } => channel,
        }
    }
}

/// Equal-tempered frequency of a MIDI note, A4 (69) = 440 Hz.
pub fn midi_note_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

/// 7-bit MIDI velocity to the engine's 0..1 range.
pub fn velocity_to_unit(velocity: u8) -> f32 {
    (velocity.min(127) as f32) / 127.0
}
