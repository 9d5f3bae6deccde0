//! Reverb - Room Simulation via Delay Networks
//!
//! Classic Schroeder layout: parallel damped combs build the tail, series
//! allpasses diffuse it.
//!
//! ```text
//! Input ──┬──→ [Comb 1] ──┐
//!         ├──→ [Comb 2] ──┤
//!         ├──→ [Comb 3] ──┼──→ (+) ──→ [Allpass 1] ──→ [Allpass 2] ──→ Output
//!         └──→ [Comb 4] ──┘
//! ```
//!
//! Comb:    y[n] = x[n] + feedback * lowpass(y[n - delay])
//! Allpass: y[n] = -g * x[n] + x[n - delay] + g * y[n - delay]
//!
//! `size` stretches the comb delays (up to 1.5x) and raises their feedback,
//! `damping` darkens the tail by closing the lowpass inside each comb loop.

const COMB_DELAYS_MS: [f32; 4] = [29.7, 37.1, 41.1, 43.7];
const ALLPASS_DELAYS_MS: [f32; 2] = [5.0, 1.7];
const MAX_SIZE_STRETCH: f32 = 1.5;

fn ms_to_samples(ms: f32, sample_rate: f32) -> usize {
    ((ms * sample_rate / 1000.0) as usize).max(1)
}

pub struct CombFilter {
    buffer: Vec<f32>,
    delay_samples: usize,
    write_pos: usize,
    feedback: f32,
    damp: f32,
    filter_state: f32,
}

impl CombFilter {
    /// A comb whose delay can later grow up to `capacity` samples.
    pub fn new(delay_samples: usize, capacity: usize) -> Self {
        let capacity = capacity.max(delay_samples).max(1);
        Self {
            buffer: vec![0.0; capacity],
            delay_samples: delay_samples.clamp(1, capacity),
            write_pos: 0,
            feedback: 0.5,
            damp: 0.5,
            filter_state: 0.0,
        }
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 0.98);
    }

    pub fn set_damp(&mut self, damp: f32) {
        self.damp = damp.clamp(0.0, 1.0);
    }

    pub fn set_delay(&mut self, delay_samples: usize) {
        self.delay_samples = delay_samples.clamp(1, self.buffer.len());
        self.write_pos %= self.delay_samples;
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.write_pos];
        self.filter_state = output * (1.0 - self.damp) + self.filter_state * self.damp;
        self.buffer[self.write_pos] = input + self.filter_state * self.feedback;
        self.write_pos = (self.write_pos + 1) % self.delay_samples;
        output
    }
}

pub struct AllpassFilter {
    buffer: Vec<f32>,
    write_pos: usize,
    feedback: f32,
}

impl AllpassFilter {
    pub fn new(delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; delay_samples.max(1)],
            write_pos: 0,
            feedback: 0.5,
        }
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.write_pos];
        let output = -self.feedback * input + delayed;
        self.buffer[self.write_pos] = input + self.feedback * output;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
        output
    }
}

/// Schroeder reverb with 4 comb filters and 2 allpass filters
pub struct SchroederReverb {
    sample_rate: f32,
    combs: Vec<CombFilter>,
    allpasses: Vec<AllpassFilter>,
}

impl SchroederReverb {
    pub fn new(sample_rate: f32) -> Self {
        let combs = COMB_DELAYS_MS
            .iter()
            .map(|&ms| {
                CombFilter::new(
                    ms_to_samples(ms, sample_rate),
                    ms_to_samples(ms * MAX_SIZE_STRETCH, sample_rate),
                )
            })
            .collect();
        let allpasses = ALLPASS_DELAYS_MS
            .iter()
            .map(|&ms| AllpassFilter::new(ms_to_samples(ms, sample_rate)))
            .collect();

        let mut reverb = Self {
            sample_rate,
            combs,
            allpasses,
        };
        reverb.set_size(0.5);
        reverb
    }

    /// Room size in [0, 1]: longer combs and more feedback as it grows.
    pub fn set_size(&mut self, size: f32) {
        let size = size.clamp(0.0, 1.0);
        let stretch = 0.5 + size * (MAX_SIZE_STRETCH - 0.5);
        let feedback = 0.7 + size * 0.28; // 0.7 to 0.98
        for (comb, &ms) in self.combs.iter_mut().zip(COMB_DELAYS_MS.iter()) {
            comb.set_delay(ms_to_samples(ms * stretch, self.sample_rate));
            comb.set_feedback(feedback);
        }
    }

    pub fn set_damping(&mut self, damp: f32) {
        for comb in &mut self.combs {
            comb.set_damp(damp);
        }
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let mut output = 0.0;
        for comb in &mut self.combs {
            output += comb.process(input);
        }
        output *= 0.25;

        for allpass in &mut self.allpasses {
            output = allpass.process(output);
        }
        output
    }
}
