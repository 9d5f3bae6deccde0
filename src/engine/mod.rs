//! The engine: one owner for every piece of mutable synth state.
//!
//! Note events, patch updates, matrix edits and rendering all go through
//! `&mut SynthEngine`, so they are serialized by construction. A host that
//! renders on a realtime thread moves the engine onto that thread and feeds
//! it commands through a ring buffer (see the demo binary).
//!
//! Time is the audio clock: the number of frames rendered so far divided by
//! the sample rate. Scheduler ticks and queued note-offs are dispatched at
//! the exact frame they fall on, by splitting [`SynthEngine::render_block`]
//! at every due event.

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::{
    bank,
    dsp::oscillator::NoiseBuffer,
    error::PatchError,
    graph::node::RenderCtx,
    io::EngineCommand,
    modulation::ModulationRouter,
    patch::{matrix::sanitize_rows, ModMatrixRow, OscMode, Patch},
    sampler::{SampleBank, SampleLoader, SampleState, SLOTS},
    sequencing::{Arpeggiator, SchedulerStatus, Sequencer},
    synth::{
        build_voice, BuildContext, HeldNotes, NoteCommand, NoteRequest, NoteSource, Topology, Voice,
        VoiceId, VoiceRegistry,
    },
    MAX_BLOCK_SIZE,
};

pub mod config;
pub mod events;
pub mod master;

use config::EngineConfig;
use events::{EventQueue, TimedOff};
use master::MasterBus;

/// Upper bound on scheduler ticks handled at one instant.
const MAX_TICKS_PER_INSTANT: usize = 64;

/// Snapshot of one sounding voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceInfo {
    pub id: VoiceId,
    pub note: u8,
    pub source: NoteSource,
    pub peak: f32,
    pub releasing: bool,
}

impl From<&Voice> for VoiceInfo {
    fn from(voice: &Voice) -> Self {
        Self {
            id: voice.id(),
            note: voice.note(),
            source: voice.source(),
            peak: voice.peak(),
            releasing: voice.is_releasing(),
        }
    }
}

pub struct SynthEngine {
    sample_rate: f32,
    /// The patch as currently heard: user values with control-rate
    /// modulation applied on top.
    patch: Patch,
    topology: Topology,
    noise: NoiseBuffer,
    voices: VoiceRegistry,
    held: HeldNotes,
    router: ModulationRouter,
    samples: SampleBank,
    arp: Arpeggiator,
    sequencer: Sequencer,
    events: EventQueue,
    master: MasterBus,
    frames: u64,
    mix: Vec<f32>,
}

impl SynthEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_patch(config, Patch::default())
    }

    pub fn with_patch(config: EngineConfig, patch: Patch) -> Self {
        bank::prepare_tables();
        let sample_rate = config.sample_rate.max(1.0);
        let patch = patch.sanitized();
        let noise = NoiseBuffer::new(config.noise_len(), config.seed);
        let loader = if config.decode_in_background {
            SampleLoader::spawn()
        } else {
            SampleLoader::inline()
        };

        let mut engine = Self {
            sample_rate,
            topology: Topology::of(&patch),
            router: ModulationRouter::new(sample_rate, &noise, &patch),
            master: MasterBus::new(sample_rate, config.scope_len, &patch),
            noise,
            voices: VoiceRegistry::new(),
            held: HeldNotes::new(),
            samples: SampleBank::new(loader, config.pitch_cache_per_sample),
            arp: Arpeggiator::new(config.seed),
            sequencer: Sequencer::new(),
            events: EventQueue::new(),
            frames: 0,
            mix: vec![0.0; MAX_BLOCK_SIZE],
            patch,
        };
        engine.sync_samples();
        debug!(sample_rate, "synth engine ready");
        engine
    }

    /// Current audio-clock time in seconds.
    pub fn now(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// The patch as currently heard, including control-rate modulation.
    pub fn patch(&self) -> &Patch {
        &self.patch
    }

    pub fn router(&self) -> &ModulationRouter {
        &self.router
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn voices(&self) -> Vec<VoiceInfo> {
        self.voices.iter().map(VoiceInfo::from).collect()
    }

    pub fn sample_state(&self, slot: usize) -> &SampleState {
        self.samples.state(slot)
    }

    // ---- note input -------------------------------------------------------

    /// A key went down. `velocity` is in [0, 1].
    pub fn note_on(&mut self, note: u8, velocity: f32) {
        let now = self.now();
        let velocity = if velocity.is_finite() { velocity.clamp(0.0, 1.0) } else { 0.0 };
        let fresh = self.held.press(note.min(127), velocity);
        self.refresh_held();

        if self.patch.arp.enabled {
            let commands = self.arp.update(now, &self.held, &self.patch, fresh);
            self.dispatch(commands, NoteSource::Arpeggiator, now);
        } else {
            self.start_voice(note.min(127), velocity, NoteSource::External, now);
        }
    }

    /// A key went up.
    pub fn note_off(&mut self, note: u8) {
        let now = self.now();
        self.held.release(note);
        self.refresh_held();

        let commands = self.arp.update(now, &self.held, &self.patch, false);
        self.dispatch(commands, NoteSource::Arpeggiator, now);
        self.voices.release(note, NoteSource::External, now);
    }

    /// Silence everything at once: voices are torn down without a release
    /// tail, held notes and queued note-offs are forgotten.
    pub fn all_notes_off(&mut self) {
        let now = self.now();
        for voice in self.voices.drain() {
            self.router.detach_voice(voice.id());
        }
        self.events.clear();
        self.held.clear();
        self.refresh_held();
        // Nothing is left to release; the idle transition only resets state.
        let _ = self.arp.update(now, &self.held, &self.patch, false);
        debug!("all notes off");
    }

    pub fn set_expression(&mut self, x: f32, y: f32) {
        self.router.sources_mut().set_expression(x, y);
        self.refresh_modulation();
    }

    pub fn clear_expression(&mut self) {
        self.router.sources_mut().clear_expression();
        self.refresh_modulation();
    }

    pub fn apply_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::NoteOn { note, velocity } => self.note_on(note, velocity),
            EngineCommand::NoteOff { note } => self.note_off(note),
            EngineCommand::AllNotesOff => self.all_notes_off(),
            EngineCommand::Expression { x, y } => self.set_expression(x, y),
            EngineCommand::ClearExpression => self.clear_expression(),
            EngineCommand::SequencerPlaying(playing) => self.set_sequencer_playing(playing),
        }
    }

    // ---- patch ------------------------------------------------------------

    /// Deep-merge `partial` over the current patch.
    ///
    /// On error the current patch stays in effect.
    pub fn apply_patch(&mut self, partial: &Value) -> Result<(), PatchError> {
        let next = self.patch.merged(partial).inspect_err(|err| {
            warn!(%err, "patch update rejected");
        })?;
        self.install(next);
        Ok(())
    }

    /// Replace the modulation matrix.
    pub fn apply_mod_matrix(&mut self, rows: Vec<ModMatrixRow>) {
        let mut rows = rows;
        sanitize_rows(&mut rows);
        let next = Patch {
            modulation: rows,
            ..self.patch.clone()
        };
        self.install(next);
    }

    fn install(&mut self, mut next: Patch) {
        let now = self.now();
        self.router.rebase(&self.patch, &next);
        self.router.evaluate(&mut next);
        self.patch = next;

        let topology = Topology::of(&self.patch);
        if topology != self.topology {
            debug!(voices = self.voices.len(), "voice graph changed, releasing voices");
            self.voices.release_all(now);
            self.topology = topology;
        }
        self.sync_samples();
        self.sync_live();

        let commands = self.arp.update(now, &self.held, &self.patch, false);
        self.dispatch(commands, NoteSource::Arpeggiator, now);
        let commands = self.sequencer.update(now, &self.patch);
        self.dispatch(commands, NoteSource::Sequencer, now);
    }

    fn sync_samples(&mut self) {
        let oscillators = [&self.patch.osc1, &self.patch.osc2];
        for (slot, osc) in oscillators.into_iter().enumerate().take(SLOTS) {
            if osc.mode == OscMode::Sampler {
                self.samples.sync(slot, &osc.sampler);
            }
        }
        self.poll_samples();
    }

    /// Push the continuous settings of the live patch into everything that
    /// is already running.
    fn sync_live(&mut self) {
        for voice in self.voices.iter() {
            voice.controls().apply(&self.patch);
        }
        self.master.configure(&self.patch);
        self.router.configure(&self.patch, &self.voices.ids());
    }

    fn refresh_held(&mut self) {
        self.router.sources_mut().set_held(self.held.average_velocity());
        self.refresh_modulation();
    }

    fn refresh_modulation(&mut self) {
        if self.router.evaluate(&mut self.patch) {
            self.sync_live();
        }
    }

    // ---- schedulers -------------------------------------------------------

    pub fn set_sequencer_playing(&mut self, playing: bool) {
        let now = self.now();
        let commands = self.sequencer.set_playing(playing, now, &self.patch);
        self.dispatch(commands, NoteSource::Sequencer, now);
        if !self.sequencer.is_running() {
            self.router.sources_mut().set_seq_step(None);
            self.refresh_modulation();
        }
    }

    pub fn arp_status(&self) -> SchedulerStatus {
        self.arp.status()
    }

    pub fn sequencer_status(&self) -> SchedulerStatus {
        self.sequencer.status()
    }

    fn next_due(&self) -> Option<f64> {
        [self.events.next_due(), self.arp.next_due(), self.sequencer.next_due()]
            .into_iter()
            .flatten()
            .reduce(f64::min)
    }

    /// Run every tick and note-off due at `now`.
    fn run_due(&mut self, now: f64) {
        let horizon = now + 0.5 / self.sample_rate as f64;
        for off in self.events.pop_due(horizon) {
            self.voices.release_id(off.note, off.voice, now);
        }

        for _ in 0..MAX_TICKS_PER_INSTANT {
            let mut ticked = false;
            if self.arp.next_due().is_some_and(|at| at <= horizon) {
                let commands = self.arp.tick(&self.patch);
                self.dispatch(commands, NoteSource::Arpeggiator, now);
                ticked = true;
            }
            if self.sequencer.next_due().is_some_and(|at| at <= horizon) {
                let step = self.sequencer.tick(&self.patch);
                self.router.sources_mut().set_seq_step(step.velocity);
                self.refresh_modulation();
                self.dispatch(step.commands, NoteSource::Sequencer, now);
                ticked = true;
            }
            if !ticked {
                break;
            }
        }
    }

    fn dispatch(&mut self, commands: Vec<NoteCommand>, source: NoteSource, at: f64) {
        for command in commands {
            match command {
                NoteCommand::On {
                    note,
                    velocity,
                    duration,
                } => {
                    let voice = self.start_voice(note, velocity, source, at);
                    if let Some(duration) = duration {
                        self.events.push(TimedOff {
                            at: at + duration,
                            note,
                            voice,
                        });
                    }
                }
                NoteCommand::Off { note } => {
                    self.voices.release(note, source, at);
                }
            }
        }
    }

    fn start_voice(&mut self, note: u8, velocity: f32, source: NoteSource, at: f64) -> VoiceId {
        if let Some(old) = self.voices.take_note(note) {
            self.teardown(old.id());
        }

        let request = NoteRequest {
            id: self.voices.next_id(),
            note,
            velocity,
            source,
            at,
            active: self.voices.len(),
        };
        let mut ctx = BuildContext {
            sample_rate: self.sample_rate,
            noise: &self.noise,
            samples: &mut self.samples,
        };
        let voice = build_voice(request, &self.patch, &mut ctx);
        self.router.attach_voice(request.id, &self.patch);
        self.voices.insert(voice);
        trace!(note, velocity, ?source, id = request.id, "voice started");
        request.id
    }

    fn teardown(&mut self, voice: VoiceId) {
        self.router.detach_voice(voice);
        self.events.remove_voice(voice);
    }

    // ---- rendering --------------------------------------------------------

    /// Render mono output into `out`, advancing the audio clock.
    pub fn render_block(&mut self, out: &mut [f32]) {
        let mut offset = 0;
        while offset < out.len() {
            let now = self.now();
            self.run_due(now);

            let mut len = (out.len() - offset).min(MAX_BLOCK_SIZE);
            if let Some(next) = self.next_due() {
                let until = ((next - now) * self.sample_rate as f64).ceil();
                if until >= 1.0 {
                    len = len.min(until as usize);
                }
            }
            self.render_span(&mut out[offset..offset + len]);
            offset += len;
        }
    }

    fn poll_samples(&mut self) {
        for (key, rendered) in self.samples.poll() {
            for voice in self.voices.iter_mut() {
                for player in voice.samplers_mut() {
                    if player.waiting_for() == Some(&key) {
                        player.deliver(rendered.clone());
                    }
                }
            }
        }
    }

    fn render_span(&mut self, out: &mut [f32]) {
        let len = out.len();
        self.poll_samples();
        self.router.render_lfos(len);

        let ctx = RenderCtx::new(self.sample_rate, self.now());
        let mix = &mut self.mix[..len];
        mix.fill(0.0);
        for voice in self.voices.iter_mut() {
            let modulation = self.router.voice_mod(voice.id());
            voice.render_add(mix, &ctx, modulation);
        }

        out.copy_from_slice(mix);
        self.master.process(out, self.router.master_mod());
        self.frames += len as u64;

        for id in self.voices.reap() {
            self.teardown(id);
        }
    }

    /// The most recent output samples, oldest first.
    pub fn waveform(&self) -> Vec<f32> {
        self.master.waveform()
    }
}
