use std::f32::consts::TAU;

use rustfft::num_complex::Complex;

/*
Iterative Radix-2 FFT
=====================

The phase vocoder transforms thousands of frames of the same size, so every
table the transform needs is built once up front:

  bit_reverse   permutation index for the in-place butterfly order
  twiddles      one table per stage, e^(-2πi·j/len) for j in 0..len/2

A forward transform walks the stages with the stored twiddles. The inverse
uses the conjugated twiddles and scales the result by 1/N.

Only power-of-two sizes are supported; `Radix2Fft::new` rounds up.
*/

pub struct Radix2Fft {
    size: usize,
    bit_reverse: Vec<usize>,
    /// `twiddles[s]` serves the stage whose butterflies span `2 << s` bins.
    twiddles: Vec<Vec<Complex<f32>>>,
}

impl Radix2Fft {
    pub fn new(size: usize) -> Self {
        let size = size.max(2).next_power_of_two();
        let bits = size.trailing_zeros();

        let bit_reverse = (0..size)
            .map(|i| i.reverse_bits() >> (usize::BITS - bits))
            .collect();

        let mut twiddles = Vec::with_capacity(bits as usize);
        let mut len = 2;
        while len <= size {
            let half = len / 2;
            let stage = (0..half)
                .map(|j| {
                    let angle = -TAU * j as f32 / len as f32;
                    Complex::new(angle.cos(), angle.sin())
                })
                .collect();
            twiddles.push(stage);
            len <<= 1;
        }

        Self {
            size,
            bit_reverse,
            twiddles,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn forward(&self, data: &mut [Complex<f32>]) {
        self.transform(data, false);
    }

    /// Inverse transform including the 1/N scaling.
    pub fn inverse(&self, data: &mut [Complex<f32>]) {
        self.transform(data, true);
        let scale = 1.0 / self.size as f32;
        for value in data.iter_mut() {
            *value *= scale;
        }
    }

    fn transform(&self, data: &mut [Complex<f32>], inverse: bool) {
        debug_assert_eq!(data.len(), self.size);

        for (i, &j) in self.bit_reverse.iter().enumerate() {
            if i < j {
                data.swap(i, j);
            }
        }

        let mut len = 2;
        for stage in &self.twiddles {
            let half = len / 2;
            for start in (0..self.size).step_by(len) {
                for (j, &twiddle) in stage.iter().enumerate() {
                    let w = if inverse { twiddle.conj() } else { twiddle };
                    let a = data[start + j];
                    let b = data[start + j + half] * w;
                    data[start + j] = a + b;
                    data[start + j + half] = a - b;
                }
            }
            len <<= 1;
        }
    }
}

/// Periodic Hann window of length `size`.
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 - 0.5 * (TAU * i as f32 / size as f32).cos())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustfft::FftPlanner;

    fn test_signal(size: usize) -> Vec<Complex<f32>> {
        (0..size)
            .map(|i| {
                let t = i as f32 / size as f32;
                Complex::new((TAU * 3.0 * t).sin() + 0.25 * (TAU * 17.0 * t).cos(), 0.1 * t)
            })
            .collect()
    }

    #[test]
    fn forward_matches_rustfft() {
        let size = 256;
        let fft = Radix2Fft::new(size);
        let mut ours = test_signal(size);
        let mut reference = ours.clone();

        fft.forward(&mut ours);
        FftPlanner::<f32>::new()
            .plan_fft_forward(size)
            .process(&mut reference);

        for (a, b) in ours.iter().zip(&reference) {
            assert!((a - b).norm() < 1e-3, "ours={a}, rustfft={b}");
        }
    }

    #[test]
    fn inverse_restores_input() {
        let fft = Radix2Fft::new(512);
        let original = test_signal(512);
        let mut data = original.clone();

        fft.forward(&mut data);
        fft.inverse(&mut data);

        for (a, b) in data.iter().zip(&original) {
            assert!((a - b).norm() < 1e-4);
        }
    }

    #[test]
    fn sizes_round_up_to_power_of_two() {
        assert_eq!(Radix2Fft::new(300).size(), 512);
        assert_eq!(Radix2Fft::new(1024).size(), 1024);
    }
}
