use super::{BuildEnv, Built};
use crate::{
    dsp::{distortion::foldback, filter::OnePole, oscillator::Oscillator},
    graph::{
        mix::Layers,
        node::{GraphNode, RenderCtx},
    },
    patch::MacroSettings,
};

struct Wavefolder {
    source: Layers,
    drive: f32,
    bias: f32,
    // Asymmetric folding leaves DC behind.
    dc: OnePole,
}

impl GraphNode for Wavefolder {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        self.source.render_block(out, ctx);
        for sample in out.iter_mut() {
            let folded = foldback(*sample + self.bias, self.drive, 1.0);
            *sample = folded - self.dc.process(folded);
        }
    }

    fn stop(&mut self, at: f64) {
        self.source.stop(at);
    }

    fn is_active(&self) -> bool {
        self.source.is_active()
    }
}

pub(super) fn build(frequency: f32, settings: &MacroSettings, env: &BuildEnv) -> Built {
    let mut source = Layers::new();
    let pitched = vec![
        source.push(Oscillator::sine(frequency), 0.0, 1.0 - settings.morph),
        source.push(Oscillator::triangle(frequency), 0.0, settings.morph),
    ];

    Built {
        node: Box::new(Wavefolder {
            source,
            drive: 1.0 + settings.harmonics * 7.0,
            bias: (settings.timbre - 0.5) * 0.8,
            dc: OnePole::new(5.0, env.sample_rate),
        }),
        pitched,
    }
}
