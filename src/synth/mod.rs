// Purpose: Voices, voice building, note provenance
// This layer sits above graph nodes and the macro bank; the engine drives it

pub mod builder;
pub mod held;
pub mod message;
pub mod registry;
pub mod slot;
pub mod voice;

pub use builder::{build_voice, voice_peak, BuildContext, NoteRequest, Topology, VOICE_BASE_GAIN};
pub use held::HeldNotes;
pub use message::{NoteCommand, NoteSource};
pub use registry::VoiceRegistry;
pub use voice::{Voice, VoiceControls, VoiceId};
