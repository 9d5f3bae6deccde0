use rand::{seq::SliceRandom, SeedableRng};
use rand_pcg::Pcg32;
use tracing::debug;

use super::{
    timing::{StepClock, StepTiming},
    transpose, SchedulerStatus,
};
use crate::{
    names::lenient_enum,
    patch::{ArpConfig, Patch, SequencerConfig},
    synth::{held::HeldNotes, message::NoteCommand},
};

lenient_enum! {
    pub enum ArpMode {
        Up = "up",
        Down = "down",
        UpDown = "up-down",
        Random = "random",
        AsPlayed = "as-played",
        /// Plays the sequencer pattern (rests included) on every held note.
        Sequence = "sequence",
    }
    default = Up;
}

lenient_enum! {
    pub enum ChordType {
        None = "none",
        Major = "major",
        Minor = "minor",
        Sus2 = "sus2",
        Sus4 = "sus4",
        Dom7 = "dom7",
        Maj7 = "maj7",
        Min7 = "min7",
        Dim = "dim",
        Aug = "aug",
        Power = "power",
        Octave = "octave",
    }
    default = None;
}

impl ChordType {
    pub fn intervals(self) -> &'static [i32] {
        match self {
            ChordType::None => &[0],
            ChordType::Major => &[0, 4, 7],
            ChordType::Minor => &[0, 3, 7],
            ChordType::Sus2 => &[0, 2, 7],
            ChordType::Sus4 => &[0, 5, 7],
            ChordType::Dom7 => &[0, 4, 7, 10],
            ChordType::Maj7 => &[0, 4, 7, 11],
            ChordType::Min7 => &[0, 3, 7, 10],
            ChordType::Dim => &[0, 3, 6],
            ChordType::Aug => &[0, 4, 8],
            ChordType::Power => &[0, 7],
            ChordType::Octave => &[0, 12],
        }
    }
}

lenient_enum! {
    /// Where the interval set stacked on each held note comes from.
    pub enum IntervalSource {
        Chord = "chord",
        /// Offsets of the sequencer's ON steps.
        Sequencer = "sequencer",
    }
    default = Chord;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArpSlot {
    Note { note: u8, velocity: f32 },
    Rest,
}

impl ArpSlot {
    fn note(&self) -> Option<u8> {
        match *self {
            ArpSlot::Note { note, .. } => Some(note),
            ArpSlot::Rest => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpState {
    Idle,
    Running,
}

fn interval_set(arp: &ArpConfig, seq: &SequencerConfig) -> Vec<i32> {
    match arp.interval_source {
        IntervalSource::Chord => arp.chord.intervals().to_vec(),
        IntervalSource::Sequencer => {
            let mut offsets = Vec::new();
            for step in seq.steps.iter().take(seq.length).filter(|s| s.on) {
                if !offsets.contains(&step.offset) {
                    offsets.push(step.offset);
                }
            }
            if offsets.is_empty() {
                offsets.push(0);
            }
            offsets
        }
    }
}

/// Build the ordered note pool for the current held notes.
pub fn build_pool(
    held: &HeldNotes,
    arp: &ArpConfig,
    seq: &SequencerConfig,
    rng: &mut Pcg32,
) -> Vec<ArpSlot> {
    let octaves = arp.octaves.max(1) as i32;
    let base = match arp.mode {
        ArpMode::AsPlayed => held.as_played().to_vec(),
        _ => held.ascending(),
    };

    let mut pool = Vec::new();
    if arp.mode == ArpMode::Sequence {
        let length = seq.length.min(seq.steps.len());
        for octave in 0..octaves {
            for &(note, _) in &base {
                for step in &seq.steps[..length] {
                    let slot = match transpose(note, step.offset + octave * 12) {
                        Some(note) if step.on => ArpSlot::Note {
                            note,
                            velocity: step.velocity,
                        },
                        _ => ArpSlot::Rest,
                    };
                    pool.push(slot);
                }
            }
        }
    } else {
        let intervals = interval_set(arp, seq);
        for octave in 0..octaves {
            for &(note, velocity) in &base {
                for &interval in &intervals {
                    if let Some(note) = transpose(note, interval + octave * 12) {
                        pool.push(ArpSlot::Note { note, velocity });
                    }
                }
            }
        }

        if arp.mode != ArpMode::AsPlayed {
            pool.sort_by_key(|slot| slot.note());
            pool.dedup_by_key(|slot| slot.note());
        }

        match arp.mode {
            ArpMode::Down => pool.reverse(),
            ArpMode::UpDown if pool.len() > 2 => {
                let inner: Vec<ArpSlot> = pool[1..pool.len() - 1].iter().rev().copied().collect();
                pool.extend(inner);
            }
            ArpMode::Random => pool.shuffle(rng),
            _ => {}
        }
    }

    if arp.pattern_length > 0 {
        pool.truncate(arp.pattern_length);
    }
    pool
}

fn step_timing(patch: &Patch) -> StepTiming {
    let arp = &patch.arp;
    if arp.sync {
        StepTiming::tempo(patch.tempo, arp.division, arp.swing)
    } else {
        StepTiming::free(arp.rate, arp.swing)
    }
}

pub struct Arpeggiator {
    state: ArpState,
    pool: Vec<ArpSlot>,
    index: usize,
    repeats: u8,
    clock: StepClock,
    /// Note started by the last tick, and whether it rings until cut.
    sounding: Option<(u8, bool)>,
    last_note: Option<u8>,
    rng: Pcg32,
}

impl Arpeggiator {
    pub fn new(seed: u64) -> Self {
        Self {
            state: ArpState::Idle,
            pool: Vec::new(),
            index: 0,
            repeats: 0,
            clock: StepClock::default(),
            sounding: None,
            last_note: None,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    pub fn state(&self) -> ArpState {
        self.state
    }

    pub fn pool(&self) -> &[ArpSlot] {
        &self.pool
    }

    pub fn next_due(&self) -> Option<f64> {
        match self.state {
            ArpState::Running => self.clock.next_due(),
            ArpState::Idle => None,
        }
    }

    /// Re-evaluate after held notes or the patch changed.
    ///
    /// `restart` rewinds the pattern (a new key went down). Returns the
    /// note-offs needed when the arpeggiator goes idle.
    pub fn update(
        &mut self,
        now: f64,
        held: &HeldNotes,
        patch: &Patch,
        restart: bool,
    ) -> Vec<NoteCommand> {
        let active = patch.arp.enabled && !held.is_empty();
        match (self.state, active) {
            (ArpState::Running, false) => {
                debug!("arpeggiator idle");
                self.state = ArpState::Idle;
                self.clock.stop();
                self.pool.clear();
                self.index = 0;
                self.repeats = 0;
                self.sounding
                    .take()
                    .map(|(note, _)| vec![NoteCommand::Off { note }])
                    .unwrap_or_default()
            }
            (ArpState::Idle, true) => {
                self.pool = build_pool(held, &patch.arp, &patch.sequencer, &mut self.rng);
                debug!(pool = self.pool.len(), "arpeggiator running");
                self.state = ArpState::Running;
                self.index = 0;
                self.repeats = 0;
                self.clock.start(now);
                Vec::new()
            }
            (ArpState::Running, true) => {
                self.pool = build_pool(held, &patch.arp, &patch.sequencer, &mut self.rng);
                if restart {
                    self.index = 0;
                    self.repeats = 0;
                    self.clock.restart(now);
                } else if !self.pool.is_empty() {
                    self.index %= self.pool.len();
                }
                Vec::new()
            }
            (ArpState::Idle, false) => Vec::new(),
        }
    }

    /// Play the due step.
    pub fn tick(&mut self, patch: &Patch) -> Vec<NoteCommand> {
        if self.state != ArpState::Running {
            return Vec::new();
        }
        let Some(tick) = self.clock.advance(&step_timing(patch)) else {
            return Vec::new();
        };

        let gate = patch.arp.gate;
        let mut commands = Vec::with_capacity(2);
        if let Some((note, true)) = self.sounding.take() {
            commands.push(NoteCommand::Off { note });
        }
        if self.pool.is_empty() {
            return commands;
        }

        let index = self.index % self.pool.len();
        if let ArpSlot::Note { note, velocity } = self.pool[index] {
            commands.push(NoteCommand::On {
                note,
                velocity,
                duration: (gate < 1.0).then_some(tick.duration * gate as f64),
            });
            self.sounding = Some((note, gate >= 1.0));
            self.last_note = Some(note);
        }

        self.repeats += 1;
        if self.repeats >= patch.arp.repeat.max(1) {
            self.repeats = 0;
            self.index = (index + 1) % self.pool.len();
        }
        commands
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            running: self.state == ArpState::Running,
            step_index: self.index,
            length: self.pool.len(),
            current_root: self.last_note,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(notes: &[u8]) -> HeldNotes {
        let mut held = HeldNotes::new();
        for &note in notes {
            held.press(note, 0.8);
        }
        held
    }

    fn notes(pool: &[ArpSlot]) -> Vec<Option<u8>> {
        pool.iter().map(ArpSlot::note).collect()
    }

    fn pool_for(held_notes: &[u8], arp: ArpConfig) -> Vec<Option<u8>> {
        let mut rng = Pcg32::seed_from_u64(1);
        notes(&build_pool(&held(held_notes), &arp, &SequencerConfig::default(), &mut rng))
    }

    #[test]
    fn up_and_down_order_two_notes() {
        let up = ArpConfig {
            mode: ArpMode::Up,
            ..ArpConfig::default()
        };
        assert_eq!(pool_for(&[64, 60], up), vec![Some(60), Some(64)]);

        let down = ArpConfig {
            mode: ArpMode::Down,
            ..ArpConfig::default()
        };
        assert_eq!(pool_for(&[60, 64], down), vec![Some(64), Some(60)]);
    }

    #[test]
    fn up_down_skips_repeated_endpoints() {
        let arp = ArpConfig {
            mode: ArpMode::UpDown,
            chord: ChordType::Major,
            ..ArpConfig::default()
        };
        assert_eq!(pool_for(&[60], arp), vec![Some(60), Some(64), Some(67), Some(64)]);
    }

    #[test]
    fn as_played_keeps_press_order_across_octaves() {
        let arp = ArpConfig {
            mode: ArpMode::AsPlayed,
            octaves: 2,
            ..ArpConfig::default()
        };
        assert_eq!(pool_for(&[67, 60], arp), vec![Some(67), Some(60), Some(79), Some(72)]);
    }

    #[test]
    fn random_is_a_permutation() {
        let arp = ArpConfig {
            mode: ArpMode::Random,
            chord: ChordType::Dom7,
            octaves: 2,
            ..ArpConfig::default()
        };
        let mut pool = pool_for(&[60], arp);
        pool.sort();
        let expected = [60, 64, 67, 70, 72, 76, 79, 82].map(Some);
        assert_eq!(pool, expected.to_vec());
    }

    #[test]
    fn sequence_mode_explodes_rests() {
        let mut seq = SequencerConfig::default();
        seq.length = 4;
        seq.steps[0] = crate::patch::SequencerStep::on(0, 1.0);
        seq.steps[2] = crate::patch::SequencerStep::on(7, 0.5);
        let arp = ArpConfig {
            mode: ArpMode::Sequence,
            ..ArpConfig::default()
        };
        let mut rng = Pcg32::seed_from_u64(0);
        let pool = build_pool(&held(&[60]), &arp, &seq, &mut rng);
        assert_eq!(notes(&pool), vec![Some(60), None, Some(67), None]);
        assert_eq!(pool[2], ArpSlot::Note { note: 67, velocity: 0.5 });
    }

    #[test]
    fn sequencer_intervals_and_pattern_cap() {
        let mut seq = SequencerConfig::default();
        seq.length = 8;
        for step in seq.steps.iter_mut() {
            *step = Default::default();
        }
        seq.steps[1] = crate::patch::SequencerStep::on(3, 1.0);
        seq.steps[5] = crate::patch::SequencerStep::on(10, 1.0);
        let arp = ArpConfig {
            interval_source: IntervalSource::Sequencer,
            pattern_length: 1,
            ..ArpConfig::default()
        };
        let mut rng = Pcg32::seed_from_u64(0);
        let pool = build_pool(&held(&[60]), &arp, &seq, &mut rng);
        assert_eq!(notes(&pool), vec![Some(63)]);
    }

    fn arp_patch(gate: f32) -> Patch {
        let mut patch = Patch::default();
        patch.arp.enabled = true;
        patch.arp.gate = gate;
        patch.arp.sync = false;
        patch.arp.rate = 10.0;
        patch
    }

    #[test]
    fn release_goes_idle_and_silences_last_note() {
        let patch = arp_patch(1.0);
        let mut arp = Arpeggiator::new(0);
        let mut keys = held(&[60, 64]);

        arp.update(0.0, &keys, &patch, true);
        assert_eq!(arp.state(), ArpState::Running);
        assert_eq!(arp.next_due(), Some(0.0));
        let first = arp.tick(&patch);
        assert_eq!(
            first,
            vec![NoteCommand::On {
                note: 60,
                velocity: 0.8,
                duration: None
            }]
        );

        keys.clear();
        let offs = arp.update(0.05, &keys, &patch, false);
        assert_eq!(arp.state(), ArpState::Idle);
        assert_eq!(offs, vec![NoteCommand::Off { note: 60 }]);
        assert_eq!(arp.next_due(), None);
    }

    #[test]
    fn full_gate_cuts_at_next_step_short_gate_schedules_off() {
        let patch = arp_patch(1.0);
        let mut arp = Arpeggiator::new(0);
        arp.update(0.0, &held(&[60, 64]), &patch, true);
        arp.tick(&patch);
        let second = arp.tick(&patch);
        assert_eq!(second[0], NoteCommand::Off { note: 60 });
        assert_eq!(second[1].note(), 64);

        let short = arp_patch(0.5);
        let mut arp = Arpeggiator::new(0);
        arp.update(0.0, &held(&[60]), &short, true);
        let commands = arp.tick(&short);
        match commands.as_slice() {
            [NoteCommand::On { duration: Some(d), .. }] => assert!((d - 0.05).abs() < 1e-9),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn repeat_replays_each_entry() {
        let mut patch = arp_patch(0.5);
        patch.arp.repeat = 2;
        let mut arp = Arpeggiator::new(0);
        arp.update(0.0, &held(&[60, 64]), &patch, true);
        let played: Vec<u8> = (0..4).map(|_| arp.tick(&patch)[0].note()).collect();
        assert_eq!(played, vec![60, 60, 64, 64]);
    }

    #[test]
    fn status_reports_pool_and_position() {
        let patch = arp_patch(0.5);
        let mut arp = Arpeggiator::new(0);
        arp.update(0.0, &held(&[60, 64, 67]), &patch, true);
        arp.tick(&patch);
        let status = arp.status();
        assert!(status.running);
        assert_eq!(status.length, 3);
        assert_eq!(status.step_index, 1);
        assert_eq!(status.current_root, Some(60));
    }
}
