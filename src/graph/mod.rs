//! Render nodes shared by the voices and the master bus.
//!
//! Nodes pull audio in blocks. Every node can be told to stop at a future
//! audio-clock time; parameters that change while a node sounds are shared
//! through atomic handles instead of messages.

/// Crossfades, equal-power folding and weighted oscillator stacks.
pub mod mix;
/// Core traits shared by all graph nodes.
pub mod node;

pub use node::{DetuneHandle, GraphNode, RenderCtx, SharedParam};
