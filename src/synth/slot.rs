use crate::{
    bank::MacroOscillator,
    dsp::oscillator::Oscillator,
    graph::node::{GraphNode, RenderCtx},
    sampler::SamplePlayer,
};

/// Audio-rate frequency modulation handed to slot 1.
pub struct Fm<'a> {
    pub deviation_hz: &'a mut [f32],
    pub carrier_hz: f32,
}

/// The source behind one oscillator slot of a voice.
pub enum Slot {
    Analog(Oscillator),
    Macro(MacroOscillator),
    Sampler(SamplePlayer),
    /// Sampler mode with nothing decoded yet.
    Silent,
}

impl Slot {
    /// Render with an optional frequency deviation in Hz around
    /// `carrier_hz`.
    ///
    /// Analog oscillators take the deviation directly. Macro models have no
    /// Hz input, so the deviation is folded into the per-sample pitch offset
    /// (in cents) every pitched node already reads; `deviation_hz` is
    /// overwritten with those cents. Sampler playback ignores FM.
    pub fn render_fm(&mut self, out: &mut [f32], ctx: &RenderCtx, fm: Option<Fm<'_>>) {
        let Some(Fm {
            deviation_hz,
            carrier_hz,
        }) = fm
        else {
            self.render_block(out, ctx);
            return;
        };
        match self {
            Slot::Analog(osc) => osc.render_fm(out, ctx, Some(&*deviation_hz)),
            Slot::Macro(osc) => {
                let carrier_hz = carrier_hz.max(1.0);
                for (i, deviation) in deviation_hz.iter_mut().enumerate() {
                    let hz = (carrier_hz + *deviation).max(1.0);
                    *deviation = ctx.pitch_cents(i) + 1200.0 * (hz / carrier_hz).log2();
                }
                osc.render_block(out, &ctx.with_pitch_mod(&*deviation_hz));
            }
            other => other.render_block(out, ctx),
        }
    }

    pub fn sampler_mut(&mut self) -> Option<&mut SamplePlayer> {
        match self {
            Slot::Sampler(player) => Some(player),
            _ => None,
        }
    }
}

impl GraphNode for Slot {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        match self {
            Slot::Analog(osc) => osc.render_block(out, ctx),
            Slot::Macro(osc) => osc.render_block(out, ctx),
            Slot::Sampler(player) => player.render_block(out, ctx),
            Slot::Silent => out.fill(0.0),
        }
    }

    fn stop(&mut self, at: f64) {
        match self {
            Slot::Analog(osc) => osc.stop(at),
            Slot::Macro(osc) => osc.stop(at),
            Slot::Sampler(player) => player.stop(at),
            Slot::Silent => {}
        }
    }

    fn is_active(&self) -> bool {
        match self {
            Slot::Analog(osc) => osc.is_active(),
            Slot::Macro(osc) => osc.is_active(),
            Slot::Sampler(player) => player.is_active(),
            Slot::Silent => false,
        }
    }
}
