//! Benchmarks for low-level DSP primitives.

mod delay;
mod distortion;
mod envelope;
mod filter;
mod oscillator;
mod reverb;
mod vocoder;

pub use delay::bench_delay;
pub use distortion::bench_distortion;
pub use envelope::bench_envelope;
pub use filter::bench_filter;
pub use oscillator::bench_oscillator;
pub use reverb::bench_reverb;
pub use vocoder::bench_vocoder;
