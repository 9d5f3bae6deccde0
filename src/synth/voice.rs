use super::{
    message::NoteSource,
    slot::{Fm, Slot},
};
use crate::{
    dsp::{envelope::Envelope, oscillator::Oscillator},
    graph::{
        mix::crossfade,
        node::{DetuneHandle, GraphNode, RenderCtx, SharedParam},
    },
    modulation::VoiceMod,
    patch::Patch,
    MAX_BLOCK_SIZE,
};

/// Engine-unique voice identity. Never reused, so a late event aimed at a
/// torn-down voice cannot hit the voice that replaced it.
pub type VoiceId = u64;

/// Sources keep running this long past the end of the release ramp.
pub const STOP_TAIL: f64 = 0.05;

/// Live handles into a built voice, for patch updates without a retrigger.
pub struct VoiceControls {
    /// Detune of every frequency-bearing node, per slot.
    pub detune: [Vec<DetuneHandle>; 2],
    pub macro_level: [Option<SharedParam>; 2],
    /// Crossfade position, 0 = slot 1.
    pub mix: SharedParam,
    pub fm_amount: SharedParam,
    pub ring_amount: SharedParam,
    pub sub_level: SharedParam,
}

impl VoiceControls {
    pub fn new(patch: &Patch) -> Self {
        Self {
            detune: [Vec::new(), Vec::new()],
            macro_level: [None, None],
            mix: SharedParam::new(patch.mix),
            fm_amount: SharedParam::new(patch.fm.amount),
            ring_amount: SharedParam::new(patch.ring.amount),
            sub_level: SharedParam::new(patch.sub.level),
        }
    }

    /// Push the continuous settings of `patch` into the voice.
    pub fn apply(&self, patch: &Patch) {
        for (handles, osc) in self.detune.iter().zip([&patch.osc1, &patch.osc2]) {
            let cents = osc.total_cents();
            for handle in handles {
                handle.apply(cents);
            }
        }
        for (level, osc) in self.macro_level.iter().zip([&patch.osc1, &patch.osc2]) {
            if let Some(level) = level {
                level.set(osc.macro_settings.level);
            }
        }
        self.mix.set(patch.mix);
        self.fm_amount.set(patch.fm.amount);
        self.ring_amount.set(patch.ring.amount);
        self.sub_level.set(patch.sub.level);
    }
}

/// Frequency modulation of slot 1 by slot 2.
pub struct FmLink {
    /// Unmodulated frequency of slot 1.
    pub carrier_hz: f32,
    /// Modulator frequency in Hz; deviation is `amount · modulator_hz`.
    pub modulator_hz: f32,
}

/// Scratch buffers, one block each.
struct Buffers {
    a: Vec<f32>,
    b: Vec<f32>,
    sub: Vec<f32>,
    env: Vec<f32>,
    fm: Vec<f32>,
}

impl Buffers {
    fn new() -> Self {
        Self {
            a: vec![0.0; MAX_BLOCK_SIZE],
            b: vec![0.0; MAX_BLOCK_SIZE],
            sub: vec![0.0; MAX_BLOCK_SIZE],
            env: vec![0.0; MAX_BLOCK_SIZE],
            fm: vec![0.0; MAX_BLOCK_SIZE],
        }
    }
}

/// One playing note.
///
/// ```text
///   slot 2 ──┬───────────────► crossfade ─► ring ─► (+ sub) ─► × envelope
///            └─ × fm ─► slot 1 ──┘
/// ```
///
/// The ring stage fades from the slots' plain mix (the crossfade output,
/// what the voice plays with ring off) to their product `a · b`.
pub struct Voice {
    id: VoiceId,
    note: u8,
    source: NoteSource,
    started_at: f64,
    slots: [Slot; 2],
    sub: Option<Oscillator>,
    fm: Option<FmLink>,
    ring: bool,
    controls: VoiceControls,
    envelope: Envelope,
    peak: f32,
    release_end: Option<f64>,
    buffers: Buffers,
}

/// Everything [`Voice::new`] needs besides the already built sources.
pub struct VoiceParts {
    pub id: VoiceId,
    pub note: u8,
    pub source: NoteSource,
    pub slots: [Slot; 2],
    pub sub: Option<Oscillator>,
    pub fm: Option<FmLink>,
    pub ring: bool,
    pub controls: VoiceControls,
    pub envelope: Envelope,
}

impl Voice {
    /// Assemble a voice and start its envelope at `at`.
    pub fn new(parts: VoiceParts, at: f64, peak: f32) -> Self {
        let VoiceParts {
            id,
            note,
            source,
            slots,
            sub,
            fm,
            ring,
            controls,
            mut envelope,
        } = parts;
        envelope.note_on(at, peak);
        Self {
            id,
            note,
            source,
            started_at: at,
            slots,
            sub,
            fm,
            ring,
            controls,
            envelope,
            peak,
            release_end: None,
            buffers: Buffers::new(),
        }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn note(&self) -> u8 {
        self.note
    }

    pub fn source(&self) -> NoteSource {
        self.source
    }

    pub fn started_at(&self) -> f64 {
        self.started_at
    }

    /// Envelope peak chosen at note on.
    pub fn peak(&self) -> f32 {
        self.peak
    }

    pub fn controls(&self) -> &VoiceControls {
        &self.controls
    }

    pub fn is_releasing(&self) -> bool {
        self.release_end.is_some()
    }

    /// Start the release at `at`. Every source stops shortly after the ramp
    /// ends. Returns the end of the release ramp.
    pub fn release(&mut self, at: f64) -> f64 {
        if let Some(end) = self.release_end {
            return end;
        }
        let end = self.envelope.note_off(at);
        let stop_at = end + STOP_TAIL;
        for slot in self.slots.iter_mut() {
            slot.stop(stop_at);
        }
        if let Some(sub) = self.sub.as_mut() {
            sub.stop(stop_at);
        }
        self.release_end = Some(end);
        end
    }

    /// True once the release has fully elapsed.
    pub fn is_finished(&self) -> bool {
        !self.envelope.is_active()
    }

    /// Sampler slots still waiting for a rendering.
    pub fn samplers_mut(&mut self) -> impl Iterator<Item = &mut crate::sampler::SamplePlayer> {
        self.slots.iter_mut().filter_map(Slot::sampler_mut)
    }

    /// Render one block and add it into `out`.
    pub fn render_add(&mut self, out: &mut [f32], ctx: &RenderCtx, modulation: VoiceMod) {
        let n = out.len().min(MAX_BLOCK_SIZE);
        let ctx = match modulation.pitch {
            Some(cents) => ctx.with_pitch_mod(cents),
            None => *ctx,
        };
        let Buffers { a, b, sub, env, fm } = &mut self.buffers;
        let (a, b, sub, env, fm) = (
            &mut a[..n],
            &mut b[..n],
            &mut sub[..n],
            &mut env[..n],
            &mut fm[..n],
        );

        let [slot1, slot2] = &mut self.slots;
        slot2.render_block(b, &ctx);
        match &self.fm {
            Some(link) => {
                let depth = self.controls.fm_amount.get() * link.modulator_hz;
                for (f, &m) in fm.iter_mut().zip(b.iter()) {
                    *f = depth * m;
                }
                let fm = Fm {
                    deviation_hz: fm,
                    carrier_hz: link.carrier_hz,
                };
                slot1.render_fm(a, &ctx, Some(fm));
            }
            None => slot1.render_fm(a, &ctx, None),
        }

        let sub_level = match self.sub.as_mut() {
            Some(osc) => {
                osc.render_block(sub, &ctx);
                self.controls.sub_level.get()
            }
            None => 0.0,
        };
        self.envelope.render(env, &ctx);

        let mix = self.controls.mix.get();
        let ring = if self.ring {
            self.controls.ring_amount.get().clamp(0.0, 1.0)
        } else {
            0.0
        };

        for i in 0..n {
            let offset = modulation.mix.and_then(|m| m.get(i)).copied().unwrap_or(0.0);
            let t = (mix + offset).clamp(0.0, 1.0);
            let mut sample = ring_mod(a[i], b[i], t, ring);
            if sub_level > 0.0 {
                sample += sub[i] * sub_level;
            }
            out[i] += sample * env[i];
        }
    }
}

/// Crossfade the two slots at `mix`, then fade toward their product by `ring`.
#[inline]
fn ring_mod(a: f32, b: f32, mix: f32, ring: f32) -> f32 {
    crossfade(crossfade(a, b, mix), a * b, ring)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_fades_from_the_plain_mix_to_the_product() {
        let (a, b) = (0.8, -0.5);
        let plain = crossfade(a, b, 0.5);
        assert_eq!(ring_mod(a, b, 0.5, 0.0), plain);
        assert!((ring_mod(a, b, 0.5, 1.0) - a * b).abs() < 1e-6);
        let halfway = ring_mod(a, b, 0.5, 0.5);
        assert!((halfway - (plain + a * b) / 2.0).abs() < 1e-6);
    }

    #[test]
    fn ring_follows_the_slot_mix() {
        assert!((ring_mod(0.8, -0.5, 0.0, 0.0) - 0.8).abs() < 1e-6);
        assert!((ring_mod(0.8, -0.5, 1.0, 0.0) + 0.5).abs() < 1e-6);
    }
}
