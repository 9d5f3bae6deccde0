//! Timeline of scheduled parameter changes on the audio clock.

#[derive(Debug, Clone, Copy, PartialEq)]
enum Kind {
    /// Jump to the value at `time`.
    Set,
    /// Ramp linearly from the previous event, arriving at `time`.
    Ramp,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Event {
    time: f64,
    value: f32,
    kind: Kind,
}

/// A scalar driven by set and linear-ramp events.
///
/// Events are kept sorted by time. Reading between two events follows the
/// later one's kind: a ramp interpolates, a set holds the earlier value.
#[derive(Debug, Clone)]
pub struct Automation {
    initial: f32,
    events: Vec<Event>,
}

impl Automation {
    pub fn new(initial: f32) -> Self {
        Self {
            initial,
            events: Vec::with_capacity(4),
        }
    }

    pub fn set_value_at(&mut self, value: f32, time: f64) {
        self.insert(Event {
            time,
            value,
            kind: Kind::Set,
        });
    }

    pub fn linear_ramp_to(&mut self, value: f32, end_time: f64) {
        self.insert(Event {
            time: end_time,
            value,
            kind: Kind::Ramp,
        });
    }

    /// Drop every event after `time` and pin the value it had at `time`.
    pub fn cancel_and_hold(&mut self, time: f64) {
        let held = self.value_at(time);
        self.events.retain(|event| event.time <= time);
        self.set_value_at(held, time);
    }

    pub fn value_at(&self, time: f64) -> f32 {
        let mut prev_time = f64::NEG_INFINITY;
        let mut prev_value = self.initial;

        for event in &self.events {
            if event.time <= time {
                prev_time = event.time;
                prev_value = event.value;
                continue;
            }
            return match event.kind {
                Kind::Set => prev_value,
                Kind::Ramp if prev_time.is_finite() => {
                    let span = event.time - prev_time;
                    let progress = ((time - prev_time) / span) as f32;
                    prev_value + (event.value - prev_value) * progress
                }
                // A ramp with nothing before it starts at the initial value
                // and has no defined start; hold until it lands.
                Kind::Ramp => prev_value,
            };
        }
        prev_value
    }

    /// Forget events that can no longer influence values at or after `time`.
    pub fn prune(&mut self, time: f64) {
        let Some(anchor) = self.events.iter().rposition(|event| event.time <= time) else {
            return;
        };
        let anchor_event = self.events[anchor];
        self.events.drain(..anchor);
        self.events[0] = Event {
            kind: Kind::Set,
            ..anchor_event
        };
    }

    /// Time of the last scheduled event, if any.
    pub fn last_event_time(&self) -> Option<f64> {
        self.events.last().map(|event| event.time)
    }

    fn insert(&mut self, event: Event) {
        let index = self.events.partition_point(|existing| existing.time <= event.time);
        self.events.insert(index, event);
    }
}
