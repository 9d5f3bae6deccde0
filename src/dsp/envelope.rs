use super::automation::Automation;
use crate::graph::node::RenderCtx;

/*
ADSR Gain Envelope
==================

Each voice owns one envelope that scales its mixed signal. The envelope is
not a per-sample state machine: note on and note off schedule ramps on an
`Automation` timeline keyed by the audio clock, and rendering simply reads
the timeline at each sample's time.

The Shape
---------

  Level
   peak ┐     ╱╲
        │    ╱  ╲___________
    S·p │   ╱               ╲
        │  ╱                 ╲
    0.0 └─╱───────────────────╲──→ Time
        Attack Decay  Sustain  Release

  note_on(t, peak)
    set 0 at t
    ramp to peak             over max(1 ms, attack)
    ramp to sustain · peak   over max(1 ms, decay)

  note_off(t)
    cancel everything scheduled after t and hold the current level
    ramp to 0                over max(1 ms, release)

Because release starts with cancel-and-hold, a note released during its
attack ramps down from wherever it got to. There is no jump up to the peak
or down to the sustain level first.

The 1 ms floor keeps a zero-length stage from becoming a hard step (a click).
*/

/// Shortest ramp any stage is allowed.
pub const MIN_RAMP: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    Idle,
    Held,
    Releasing,
    Finished,
}

pub struct Envelope {
    attack_time: f32,
    decay_time: f32,
    sustain_level: f32,
    release_time: f32,

    gain: Automation,
    state: EnvelopeState,
    release_end: f64,
}

impl Envelope {
    pub fn adsr(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack_time: attack.max(MIN_RAMP),
            decay_time: decay.max(MIN_RAMP),
            sustain_level: sustain.clamp(0.0, 1.0),
            release_time: release.max(MIN_RAMP),
            gain: Automation::new(0.0),
            state: EnvelopeState::Idle,
            release_end: f64::INFINITY,
        }
    }

    /// Schedule attack and decay starting at `at`, peaking at `peak`.
    pub fn note_on(&mut self, at: f64, peak: f32) {
        let attack_end = at + self.attack_time as f64;
        let decay_end = attack_end + self.decay_time as f64;

        self.gain = Automation::new(0.0);
        self.gain.set_value_at(0.0, at);
        self.gain.linear_ramp_to(peak, attack_end);
        self.gain.linear_ramp_to(self.sustain_level * peak, decay_end);

        self.state = EnvelopeState::Held;
        self.release_end = f64::INFINITY;
    }

    /// Start the release at `at`. Returns the time the level reaches zero.
    ///
    /// A second call while already releasing keeps the earlier schedule.
    pub fn note_off(&mut self, at: f64) -> f64 {
        match self.state {
            EnvelopeState::Held => {}
            EnvelopeState::Idle => return at,
            EnvelopeState::Releasing | EnvelopeState::Finished => return self.release_end,
        }

        let end = at + self.release_time as f64;
        self.gain.cancel_and_hold(at);
        self.gain.linear_ramp_to(0.0, end);

        self.state = EnvelopeState::Releasing;
        self.release_end = end;
        end
    }

    pub fn render(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        for (i, sample) in out.iter_mut().enumerate() {
            *sample = self.gain.value_at(ctx.sample_time(i));
        }

        let block_end = ctx.sample_time(out.len());
        if self.state == EnvelopeState::Releasing && block_end >= self.release_end {
            self.state = EnvelopeState::Finished;
        }
        self.gain.prune(ctx.time);
    }

    pub fn level_at(&self, time: f64) -> f32 {
        self.gain.value_at(time)
    }

    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    pub fn release_time(&self) -> f32 {
        self.release_time
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, EnvelopeState::Idle | EnvelopeState::Finished)
    }
}
