use tracing::debug;

use super::{
    spice::spice,
    timing::{StepClock, StepTiming},
    transpose, SchedulerStatus,
};
use crate::{patch::Patch, synth::message::NoteCommand};

/// Result of one sequencer step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutput {
    pub commands: Vec<NoteCommand>,
    /// Velocity of the step just played, `None` for rests.
    pub velocity: Option<f32>,
}

/// Step sequencer. Runs while the pattern is enabled and the transport is
/// playing.
#[derive(Debug, Default)]
pub struct Sequencer {
    playing: bool,
    running: bool,
    clock: StepClock,
    /// Pattern index of the next step.
    next_step: usize,
    /// Completed loops, which is the progression position.
    loops: usize,
    last_step: usize,
    length: usize,
    root: Option<u8>,
    /// Note from the last step that rings until the next one.
    ringing: Option<u8>,
    sounding: Option<u8>,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn set_playing(&mut self, playing: bool, now: f64, patch: &Patch) -> Vec<NoteCommand> {
        self.playing = playing;
        self.update(now, patch)
    }

    /// Start or stop after the transport or the patch changed.
    pub fn update(&mut self, now: f64, patch: &Patch) -> Vec<NoteCommand> {
        self.length = patch.sequencer.length.clamp(1, patch.sequencer.steps.len().max(1));
        let wanted = patch.sequencer.enabled && self.playing;
        match (self.running, wanted) {
            (false, true) => {
                debug!(length = self.length, "sequencer running");
                self.running = true;
                self.next_step = 0;
                self.last_step = 0;
                self.loops = 0;
                self.clock.start(now);
                Vec::new()
            }
            (true, false) => {
                debug!("sequencer stopped");
                self.running = false;
                self.clock.stop();
                self.root = None;
                self.ringing = None;
                self.sounding
                    .take()
                    .map(|note| vec![NoteCommand::Off { note }])
                    .unwrap_or_default()
            }
            _ => Vec::new(),
        }
    }

    pub fn next_due(&self) -> Option<f64> {
        if self.running {
            self.clock.next_due()
        } else {
            None
        }
    }

    /// Play the due step.
    pub fn tick(&mut self, patch: &Patch) -> StepOutput {
        if !self.running {
            return StepOutput::default();
        }
        let seq = &patch.sequencer;
        let timing = StepTiming::tempo(patch.tempo, seq.division, seq.swing);
        let Some(tick) = self.clock.advance(&timing) else {
            return StepOutput::default();
        };

        self.length = seq.length.clamp(1, seq.steps.len().max(1));
        let mut index = self.next_step;
        if index >= self.length {
            index = 0;
            self.loops += 1;
        }
        self.next_step = index + 1;
        self.last_step = index;

        let root = transpose(seq.root_midi, seq.progression.offset_at(self.loops))
            .unwrap_or(seq.root_midi);
        self.root = Some(root);

        let mut output = StepOutput::default();
        if let Some(note) = self.ringing.take() {
            output.commands.push(NoteCommand::Off { note });
        }

        let Some(step) = seq.steps.get(index) else {
            return output;
        };
        let step = spice(step, seq.gate, index, &seq.spice_seed, seq.spice_amount);
        if !step.on {
            return output;
        }

        if let Some(note) = transpose(root, step.offset) {
            let rings = step.gate >= 1.0;
            output.commands.push(NoteCommand::On {
                note,
                velocity: step.velocity,
                duration: (!rings).then_some(tick.duration * step.gate as f64),
            });
            output.velocity = Some(step.velocity);
            self.sounding = Some(note);
            if rings {
                self.ringing = Some(note);
            }
        }
        output
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            running: self.running,
            step_index: self.last_step,
            length: self.length,
            current_root: self.root,
        }
    }
}
