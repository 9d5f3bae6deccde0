mod names;

pub mod bank; // Macro oscillator models
pub mod dsp;
pub mod engine;
pub mod error;
pub mod graph; // Render nodes shared by voices and the master bus
pub mod io;
pub mod modulation;
pub mod patch;
pub mod sampler;
pub mod sequencing; // Arpeggiator and step sequencer
pub mod synth; // Voices, voice building and note provenance

pub use engine::{config::EngineConfig, SynthEngine};
pub use error::{PatchError, SampleError};
pub use patch::Patch;

pub const MAX_BLOCK_SIZE: usize = 2048;
/// Two seconds at 96 kHz.
pub(crate) const MAX_DELAY_SAMPLES: usize = 192_000;
