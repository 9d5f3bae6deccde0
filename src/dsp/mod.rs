//! Low-level DSP primitives used by the voices, the macro bank and the master bus.
//!
//! Everything here except the vocoder is allocation-free once constructed and
//! safe to run on the audio thread. The vocoder allocates per call and runs on
//! the sample decode worker.

/// Set/ramp parameter timelines on the audio clock.
pub mod automation;
/// Time-domain delay line with fractional reads.
pub mod delay;
/// Waveshaping transfer functions.
pub mod distortion;
/// ADSR gain envelope scheduled on an automation timeline.
pub mod envelope;
/// Iterative radix-2 FFT with precomputed tables.
pub mod fft;
/// State-variable and one-pole filters.
pub mod filter;
/// Low frequency oscillators, including filtered noise.
pub mod lfo;
/// Oscillator waveforms and the shared noise buffer.
pub mod oscillator;
/// Schroeder reverb.
pub mod reverb;
/// STFT phase vocoder pitch shifter.
pub mod vocoder;

pub use envelope::EnvelopeState;
