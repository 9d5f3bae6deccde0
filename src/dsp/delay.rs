use crate::MAX_DELAY_SAMPLES;

/// Circular delay line with integer and fractional taps.
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    pub fn new() -> Self {
        Self::with_capacity(MAX_DELAY_SAMPLES)
    }

    /// A line able to hold `capacity` samples of history.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity.max(2)],
            write_pos: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn next_sample(&mut self, sample: f32, delay_samples: usize) -> f32 {
        let len = self.buffer.len();
        let delay_samples = delay_samples.min(len - 1);

        self.buffer[self.write_pos] = sample;

        let read_pos = (self.write_pos + len - delay_samples) % len;

        let delayed = self.buffer[read_pos];

        self.write_pos = (self.write_pos + 1) % len;

        delayed
    }

    /// Read `delay` samples behind the write head with linear interpolation.
    pub fn read_frac(&self, delay: f32) -> f32 {
        let len = self.buffer.len();
        let delay = delay.clamp(1.0, (len - 2) as f32);
        let whole = delay.floor() as usize;
        let frac = delay - whole as f32;

        let newest = (self.write_pos + len - 1) % len;
        let a = self.buffer[(newest + len - (whole - 1)) % len];
        let b = self.buffer[(newest + len - whole) % len];
        a + (b - a) * frac
    }

    /// Append one sample without reading.
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    pub fn render(&mut self, buffer: &mut [f32], delay_samples: usize) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(*sample, delay_samples);
        }
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

impl Default for DelayLine {
    fn default() -> Self {
        Self::new()
    }
}
