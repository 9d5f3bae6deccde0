use crate::names::lenient_enum;

/*
Step timing on the audio clock
==============================

Both schedulers advance in steps. A step's length comes from either a
tempo-synced division or a free rate:

    tempo:  beats(division) · 60 / bpm
    free:   1 / rate_hz

Swing
-----

Swing stretches even steps and shortens odd ones by the same amount, so
every pair of steps still spans two plain steps:

    even step:  base · (1 + s)
    odd step:   base · (1 - s)
    s = swing · 0.5 · factor(division)

The division factor is 1 for eighths (and free rate), 0.5 for sixteenths,
and 0 for quarters and triplets, where swinging makes no musical sense.

Ticks and jitter
----------------

The clock never asks "how long since the last tick". It keeps the ideal
time of the next boundary and adds the next step's length to that ideal
time, so a late tick shortens the wait for the following one instead of
pushing every later step back.
*/

/// Late restarts within this window re-trigger the step they just missed.
pub const RETRIGGER_WINDOW: f64 = 0.005;

lenient_enum! {
    pub enum Division {
        Quarter = "1/4",
        Eighth = "1/8",
        EighthTriplet = "1/8t",
        Sixteenth = "1/16",
        SixteenthTriplet = "1/16t",
    }
    default = Sixteenth;
}

impl Division {
    /// Length in quarter-note beats.
    pub fn beats(self) -> f64 {
        match self {
            Division::Quarter => 1.0,
            Division::Eighth => 0.5,
            Division::EighthTriplet => 1.0 / 3.0,
            Division::Sixteenth => 0.25,
            Division::SixteenthTriplet => 1.0 / 6.0,
        }
    }

    pub fn swing_factor(self) -> f64 {
        match self {
            Division::Eighth => 1.0,
            Division::Sixteenth => 0.5,
            Division::Quarter | Division::EighthTriplet | Division::SixteenthTriplet => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepTiming {
    base: f64,
    swing: f64,
}

impl StepTiming {
    pub fn tempo(bpm: f32, division: Division, swing: f32) -> Self {
        let bpm = (bpm as f64).max(1.0);
        Self {
            base: division.beats() * 60.0 / bpm,
            swing: swing.clamp(0.0, 1.0) as f64 * 0.5 * division.swing_factor(),
        }
    }

    pub fn free(rate_hz: f32, swing: f32) -> Self {
        Self {
            base: 1.0 / (rate_hz as f64).max(1e-3),
            swing: swing.clamp(0.0, 1.0) as f64 * 0.5,
        }
    }

    /// Unswung step length in seconds.
    pub fn base(&self) -> f64 {
        self.base
    }

    pub fn swing_fraction(&self) -> f64 {
        self.swing
    }

    /// Length of step number `step` (counted from the start of the run).
    pub fn step_duration(&self, step: u64) -> f64 {
        if step % 2 == 0 {
            self.base * (1.0 + self.swing)
        } else {
            self.base * (1.0 - self.swing)
        }
    }
}

/// A tick taken from [`StepClock::advance`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// Step number since the clock started.
    pub step: u64,
    /// Ideal start time of the step.
    pub time: f64,
    pub duration: f64,
}

/// Keeps the ideal boundary of the next step.
#[derive(Debug, Clone, Default)]
pub struct StepClock {
    next: Option<f64>,
    step: u64,
    last_tick: Option<f64>,
}

impl StepClock {
    /// Start a run whose first step is due at `now`.
    pub fn start(&mut self, now: f64) {
        self.next = Some(now);
        self.step = 0;
        self.last_tick = None;
    }

    pub fn stop(&mut self) {
        self.next = None;
        self.last_tick = None;
    }

    pub fn is_running(&self) -> bool {
        self.next.is_some()
    }

    /// Time of the next boundary, if running.
    pub fn next_due(&self) -> Option<f64> {
        self.next
    }

    pub fn is_due(&self, now: f64) -> bool {
        self.next.is_some_and(|next| now >= next)
    }

    /// Re-align after the pattern restarted while running.
    ///
    /// A restart landing just after a boundary replays that boundary now;
    /// otherwise the next tick stays on the existing grid.
    pub fn restart(&mut self, now: f64) {
        let Some(_) = self.next else {
            self.start(now);
            return;
        };
        if let Some(last) = self.last_tick {
            if now - last < RETRIGGER_WINDOW {
                self.next = Some(now);
                self.step = self.step.saturating_sub(1);
            }
        }
    }

    /// Consume the due step and schedule the following boundary.
    pub fn advance(&mut self, timing: &StepTiming) -> Option<Tick> {
        let time = self.next?;
        let duration = timing.step_duration(self.step);
        let tick = Tick {
            step: self.step,
            time,
            duration,
        };
        self.next = Some(time + duration);
        self.step += 1;
        self.last_tick = Some(time);
        Some(tick)
    }
}
