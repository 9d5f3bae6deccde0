use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

/// Context passed to graph nodes during rendering
///
/// Contains information about what to render:
/// - sample_rate: Audio sample rate (e.g., 48000.0)
/// - time: audio-clock time (seconds) of the first sample in the block
/// - pitch_mod: optional per-sample pitch offset in cents (vibrato taps)
#[derive(Clone, Copy)]
pub struct RenderCtx<'a> {
    pub sample_rate: f32,
    pub time: f64,
    pub pitch_mod: Option<&'a [f32]>,
}

impl<'a> RenderCtx<'a> {
    pub fn new(sample_rate: f32, time: f64) -> Self {
        Self {
            sample_rate,
            time,
            pitch_mod: None,
        }
    }

    /// Attach a per-sample pitch offset (cents) read by every pitched node.
    pub fn with_pitch_mod(self, cents: &'a [f32]) -> Self {
        Self {
            pitch_mod: Some(cents),
            ..self
        }
    }

    /// Audio-clock time of sample `index` within the block.
    #[inline]
    pub fn sample_time(&self, index: usize) -> f64 {
        self.time + index as f64 / self.sample_rate as f64
    }

    #[inline]
    pub fn pitch_cents(&self, index: usize) -> f32 {
        match self.pitch_mod {
            Some(cents) => cents.get(index).copied().unwrap_or(0.0),
            None => 0.0,
        }
    }
}

/// Core trait for audio processing graph nodes
///
/// Nodes render blocks of audio and can be told to stop at a future
/// audio-clock time. Stopping an already stopped node is not an error.
pub trait GraphNode: Send {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx);

    /// Schedule the node (and every source it owns) to fall silent at `at`.
    fn stop(&mut self, _at: f64) {}

    /// Check if this node is still producing sound
    ///
    /// Used by voice management to know when a voice can be freed.
    fn is_active(&self) -> bool {
        true
    }
}

/// Allow boxed graph nodes to be used as graph nodes (for dynamic dispatch)
impl GraphNode for Box<dyn GraphNode> {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        (**self).render_block(out, ctx)
    }

    fn stop(&mut self, at: f64) {
        (**self).stop(at)
    }

    fn is_active(&self) -> bool {
        (**self).is_active()
    }
}

/// A scalar parameter shared between a node and whoever controls it.
///
/// Handles are cheap clones of one atomic cell, so a patch update can retune
/// a sounding oscillator without rebuilding it.
#[derive(Debug, Clone, Default)]
pub struct SharedParam(Arc<AtomicU32>);

impl SharedParam {
    pub fn new(value: f32) -> Self {
        Self(Arc::new(AtomicU32::new(value.to_bits())))
    }

    #[inline]
    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    /// True when both handles point at the same cell.
    pub fn same_as(&self, other: &SharedParam) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Detune control of one frequency-bearing node.
///
/// `offset` is the node's fixed interval inside its model (a chord tone, a
/// supersaw spread), so retuning the slot moves every node together.
#[derive(Debug, Clone)]
pub struct DetuneHandle {
    param: SharedParam,
    offset: f32,
}

impl DetuneHandle {
    pub fn new(param: SharedParam, offset: f32) -> Self {
        Self { param, offset }
    }

    /// Set the node to `offset + cents`.
    pub fn apply(&self, cents: f32) {
        self.param.set(self.offset + cents);
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn param(&self) -> &SharedParam {
        &self.param
    }
}

/// Stop bookkeeping shared by every source node.
#[derive(Debug, Clone, Copy, Default)]
pub struct StopTime {
    at: Option<f64>,
    reached: bool,
}

impl StopTime {
    /// Earliest stop wins; a later request never revives a node.
    pub fn schedule(&mut self, at: f64) {
        self.at = Some(match self.at {
            Some(existing) => existing.min(at),
            None => at,
        });
    }

    /// Returns true while `time` is before the scheduled stop.
    #[inline]
    pub fn running_at(&mut self, time: f64) -> bool {
        match self.at {
            Some(at) if time >= at => {
                self.reached = true;
                false
            }
            _ => !self.reached,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.reached
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_param_clones_observe_updates() {
        let param = SharedParam::new(3.0);
        let handle = param.clone();
        handle.set(-7.5);
        assert_eq!(param.get(), -7.5);
        assert!(param.same_as(&handle));
    }

    #[test]
    fn stop_time_keeps_earliest_request() {
        let mut stop = StopTime::default();
        stop.schedule(2.0);
        stop.schedule(1.0);
        stop.schedule(3.0);
        assert!(stop.running_at(0.5));
        assert!(!stop.running_at(1.0));
        assert!(stop.is_stopped());
        // Never restarts once reached.
        assert!(!stop.running_at(0.2));
    }

    #[test]
    fn sample_time_advances_by_sample_period() {
        let ctx = RenderCtx::new(1000.0, 2.0);
        assert!((ctx.sample_time(500) - 2.5).abs() < 1e-9);
        assert_eq!(ctx.pitch_cents(3), 0.0);
    }
}
