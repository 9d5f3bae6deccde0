use std::f32::consts::{PI, TAU};

use crate::names::lenient_enum;

/*
| type              | constructed by       | passes          | rejects      |
| ----------------- | -------------------- | --------------- | ------------ |
| low-pass          | LPF                  | below cutoff    | above cutoff |
| high-pass         | HPF                  | above cutoff    | below cutoff |
| band-pass         | LPF ∘ HPF (series)   | between cutoffs | outside      |
| notch / band-stop | LPF + HPF (parallel) | outside         | between      |

The state-variable topology produces all four responses from the same two
integrators, so switching the type never resets the filter state.
*/

lenient_enum! {
    pub enum FilterType {
        LowPass = "lowpass",
        HighPass = "highpass",
        BandPass = "bandpass",
        Notch = "notch",
    }
    default = LowPass;
}

pub struct FilterOutputs {
    pub lowpass: f32,
    pub bandpass: f32,
    pub highpass: f32,
    pub notch: f32,
}

/// Trapezoidal (zero-delay feedback) state-variable filter.
pub struct SVFilter {
    ic1eq: f32, // First integrator's memory
    ic2eq: f32, // Second integrator's memory
    filter_type: FilterType,
    g: f32,
    k: f32,
}

impl SVFilter {
    pub fn new(filter_type: FilterType) -> Self {
        Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            filter_type,
            g: 0.0,
            k: 2.0,
        }
    }

    pub fn lowpass() -> Self {
        Self::new(FilterType::LowPass)
    }

    pub fn bandpass() -> Self {
        Self::new(FilterType::BandPass)
    }

    pub fn set_type(&mut self, filter_type: FilterType) {
        self.filter_type = filter_type;
    }

    /// Update coefficients. `q` follows the usual convention (0.707 = flat).
    pub fn set_params(&mut self, cutoff_hz: f32, q: f32, sample_rate: f32) {
        let nyquist_guard = sample_rate * 0.49;
        let cutoff = cutoff_hz.clamp(10.0, nyquist_guard);
        self.g = (PI * cutoff / sample_rate).tan();
        self.k = 1.0 / q.max(0.05);
    }

    pub fn next_sample(&mut self, sample: f32) -> FilterOutputs {
        let (g, k) = (self.g, self.k);
        let h = 1.0 / (1.0 + g * (g + k));
        let v3 = sample - self.ic2eq;
        let v1 = h * (self.ic1eq + g * v3);
        let v2 = self.ic2eq + g * v1;
        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        FilterOutputs {
            lowpass: v2,
            bandpass: v1,
            highpass: sample - k * v1 - v2,
            notch: sample - k * v1,
        }
    }

    /// Filter one sample, returning the configured response.
    #[inline]
    pub fn process(&mut self, sample: f32) -> f32 {
        let filter_type = self.filter_type;
        let outputs = self.next_sample(sample);
        match filter_type {
            FilterType::LowPass => outputs.lowpass,
            FilterType::HighPass => outputs.highpass,
            FilterType::BandPass => outputs.bandpass,
            FilterType::Notch => outputs.notch,
        }
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}

/// One-pole lowpass, used for damping and smoothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct OnePole {
    state: f32,
    coeff: f32,
}

impl OnePole {
    pub fn new(cutoff_hz: f32, sample_rate: f32) -> Self {
        let mut filter = Self::default();
        filter.set_cutoff(cutoff_hz, sample_rate);
        filter
    }

    pub fn set_cutoff(&mut self, cutoff_hz: f32, sample_rate: f32) {
        let cutoff = cutoff_hz.clamp(0.01, sample_rate * 0.49);
        self.coeff = 1.0 - (-TAU * cutoff / sample_rate).exp();
    }

    /// Directly set the smoothing coefficient (0 = frozen, 1 = passthrough).
    pub fn set_coeff(&mut self, coeff: f32) {
        self.coeff = coeff.clamp(0.0, 1.0);
    }

    #[inline]
    pub fn process(&mut self, sample: f32) -> f32 {
        self.state += self.coeff * (sample - self.state);
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::oscillator::Oscillator;
    use crate::graph::node::{GraphNode, RenderCtx};

    const SAMPLE_RATE: f32 = 48_000.0;

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        let ctx = RenderCtx::new(SAMPLE_RATE, 0.0);
        let mut osc = Oscillator::sine(freq);
        let mut buffer = vec![0.0f32; len];
        osc.render_block(&mut buffer, &ctx);
        buffer
    }

    fn peak_after_transient(buffer: &[f32]) -> f32 {
        let skip = buffer.len().min(64);
        buffer[skip..].iter().fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }

    #[test]
    fn test_lowpass_basic() {
        let mut filter = SVFilter::lowpass();
        filter.set_params(500.0, 0.707, SAMPLE_RATE);
        let mut buffer = vec![1.0; 512];
        filter.render(&mut buffer);
        assert!(buffer[511] > 0.99);
    }

    #[test]
    fn test_lowpass_filters_high_freq() {
        let mut filter = SVFilter::lowpass();
        filter.set_params(500.0, 0.707, SAMPLE_RATE);
        let mut buffer = sine(5_000.0, 512);
        filter.render(&mut buffer);
        let peak = peak_after_transient(&buffer);
        assert!(peak < 0.3, "Expected high freq attenuation, got peak: {}", peak);
    }

    #[test]
    fn test_bandpass_emphasizes_cutoff_frequency() {
        let mut filter = SVFilter::bandpass();
        filter.set_params(1_000.0, 4.0, SAMPLE_RATE);

        let mut pass = sine(1_000.0, 1024);
        filter.render(&mut pass);
        let pass_peak = peak_after_transient(&pass);

        filter.reset();
        let mut off = sine(200.0, 1024);
        filter.render(&mut off);
        let off_peak = peak_after_transient(&off);

        assert!(
            pass_peak > off_peak * 2.0,
            "expected bandpass to emphasize cutoff freq, got pass_peak={}, off_peak={}",
            pass_peak,
            off_peak
        );
    }

    #[test]
    fn test_notch_rejects_cutoff_frequency() {
        let mut filter = SVFilter::new(FilterType::Notch);
        filter.set_params(1_000.0, 2.0, SAMPLE_RATE);

        let mut center = sine(1_000.0, 2048);
        filter.render(&mut center);
        let center_peak = peak_after_transient(&center[1024..]);

        filter.reset();
        let mut off = sine(200.0, 2048);
        filter.render(&mut off);
        let off_peak = peak_after_transient(&off[1024..]);

        assert!(center_peak * 2.0 < off_peak, "center={center_peak}, off={off_peak}");
    }

    #[test]
    fn one_pole_converges_to_dc() {
        let mut smoother = OnePole::new(50.0, SAMPLE_RATE);
        let mut last = 0.0;
        for _ in 0..48_000 {
            last = smoother.process(1.0);
        }
        assert!((last - 1.0).abs() < 1e-3);
    }
}
