use crate::{
    dsp::{
        delay::DelayLine,
        filter::SVFilter,
        oscillator::cents_to_ratio,
        reverb::SchroederReverb,
    },
    modulation::MasterMod,
    patch::Patch,
};

/// Filter coefficients are refreshed this often while the cutoff is modulated.
const CUTOFF_STRIDE: usize = 16;

/*
Signal path after the voices are summed:

    voices ─► filter ─► + delay·mix ─► + reverb·mix ─► × gain ─► out
                ▲                                        ▲
           LFO cutoff tap (cents)                  LFO amp tap (fraction)

The delay is a single feedback line. Effect returns are added on top of the
dry signal, so a mix of 0 is a true bypass.
*/

#[derive(Debug, Clone, Copy)]
struct Settings {
    sample_rate: f32,
    cutoff: f32,
    q: f32,
    delay_samples: f32,
    feedback: f32,
    delay_mix: f32,
    reverb_mix: f32,
    gain: f32,
}

/// Global effects chain and the raw waveform tap.
pub struct MasterBus {
    settings: Settings,
    filter: SVFilter,
    delay: DelayLine,
    reverb: SchroederReverb,
    scope: Scope,
}

impl MasterBus {
    pub fn new(sample_rate: f32, scope_len: usize, patch: &Patch) -> Self {
        let mut bus = Self {
            settings: Settings {
                sample_rate,
                cutoff: 20_000.0,
                q: 0.707,
                delay_samples: 1.0,
                feedback: 0.0,
                delay_mix: 0.0,
                reverb_mix: 0.0,
                gain: 1.0,
            },
            filter: SVFilter::new(patch.filter.filter_type),
            delay: DelayLine::with_capacity((sample_rate * 2.0) as usize + 4),
            reverb: SchroederReverb::new(sample_rate),
            scope: Scope::new(scope_len),
        };
        bus.configure(patch);
        bus
    }

    /// Follow the filter, effects and gain of `patch`.
    pub fn configure(&mut self, patch: &Patch) {
        let settings = &mut self.settings;
        settings.cutoff = patch.filter.cutoff;
        settings.q = patch.filter.q;
        settings.delay_samples = (patch.effects.delay.time * settings.sample_rate).max(1.0);
        settings.feedback = patch.effects.delay.feedback.clamp(0.0, 0.95);
        settings.delay_mix = patch.effects.delay.mix;
        settings.reverb_mix = patch.effects.reverb.mix;
        settings.gain = patch.master.gain;

        self.filter.set_type(patch.filter.filter_type);
        self.filter.set_params(settings.cutoff, settings.q, settings.sample_rate);
        self.reverb.set_size(patch.effects.reverb.size);
        self.reverb.set_damping(patch.effects.reverb.damping);
    }

    /// Run the summed voices in `buffer` through the chain in place.
    pub fn process(&mut self, buffer: &mut [f32], modulation: MasterMod) {
        let Settings {
            sample_rate,
            cutoff,
            q,
            delay_samples,
            feedback,
            delay_mix,
            reverb_mix,
            gain,
        } = self.settings;

        for (i, sample) in buffer.iter_mut().enumerate() {
            if let Some(cents) = modulation.cutoff {
                if i % CUTOFF_STRIDE == 0 {
                    let moved = cutoff * cents_to_ratio(cents[i]);
                    self.filter.set_params(moved, q, sample_rate);
                }
            }
            let mut x = self.filter.process(*sample);

            let echo = self.delay.read_frac(delay_samples);
            self.delay.write(x + echo * feedback);
            x += echo * delay_mix;

            if reverb_mix > 0.0 {
                x += self.reverb.process(x) * reverb_mix;
            }

            let amp = modulation.amp.map_or(0.0, |amp| amp[i]);
            *sample = x * (gain * (1.0 + amp)).max(0.0);
        }

        if modulation.cutoff.is_some() {
            self.filter.set_params(cutoff, q, sample_rate);
        }
        self.scope.push(buffer);
    }

    /// The most recent output, oldest sample first.
    pub fn waveform(&self) -> Vec<f32> {
        self.scope.snapshot()
    }
}

/// Fixed-length ring of the latest output samples.
struct Scope {
    ring: Vec<f32>,
    head: usize,
}

impl Scope {
    fn new(len: usize) -> Self {
        Self {
            ring: vec![0.0; len],
            head: 0,
        }
    }

    fn push(&mut self, samples: &[f32]) {
        let len = self.ring.len();
        if len == 0 {
            return;
        }
        for &sample in samples {
            self.ring[self.head] = sample;
            self.head = (self.head + 1) % len;
        }
    }

    fn snapshot(&self) -> Vec<f32> {
        let (newer, older) = self.ring.split_at(self.head);
        older.iter().chain(newer).copied().collect()
    }
}
