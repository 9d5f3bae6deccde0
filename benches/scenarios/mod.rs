//! Real-world scenario benchmarks.
//!
//! One macro oscillator per model, and whole engine blocks with several
//! voices and the sequencer running.

mod bank;
mod engine;

pub use bank::bench_bank;
pub use engine::bench_engine;
