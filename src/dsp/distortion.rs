//! Waveshaping
//!
//! A waveshaper applies a transfer function to each sample:
//!   output = f(input * drive)
//!
//! Low drive stays in the linear region of f(); higher drive pushes the
//! signal into the bends and adds harmonics. The macro oscillators use these
//! as timbre stages:
//!
//!   soft_clip   x / (1 + |x|)        warm, gradually compresses peaks
//!   saturate    tanh(x)              symmetric, used to square up PWM saws
//!   foldback    reflect past ±t      metallic, the wavefolder model

/// Soft clipping using x / (1 + |x|) transfer function.
#[inline]
pub fn soft_clip(sample: f32, drive: f32) -> f32 {
    let x = sample * drive;
    x / (1.0 + x.abs())
}

/// Hyperbolic tangent saturation normalised so that `saturate(1, d)` is 1.
#[inline]
pub fn saturate(sample: f32, drive: f32) -> f32 {
    let drive = drive.max(1e-3);
    (sample * drive).tanh() / drive.tanh()
}

/// Foldback distortion - signal folds back when exceeding threshold.
#[inline]
pub fn foldback(sample: f32, drive: f32, threshold: f32) -> f32 {
    let threshold = threshold.abs().max(1e-6);
    let x = sample * drive;
    if x.abs() <= threshold {
        return x;
    }

    // Reflecting repeatedly between ±t is a triangle wave of period 4t.
    let period = 4.0 * threshold;
    let shifted = (x + threshold).rem_euclid(period);
    if shifted < 2.0 * threshold {
        shifted - threshold
    } else {
        3.0 * threshold - shifted
    }
}

pub fn soft_clip_buffer(buffer: &mut [f32], drive: f32) {
    for sample in buffer.iter_mut() {
        *sample = soft_clip(*sample, drive);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_clip_unity_drive() {
        // f(0.1) = 0.1 / 1.1
        let output = soft_clip(0.1, 1.0);
        assert!((output - 0.0909).abs() < 0.01);
    }

    #[test]
    fn test_soft_clip_high_drive() {
        let output = soft_clip(1.0, 10.0);
        assert!(output > 0.9 && output < 1.0);
    }

    #[test]
    fn saturate_keeps_unit_peak() {
        for drive in [0.5, 1.0, 4.0, 12.0] {
            assert!((saturate(1.0, drive) - 1.0).abs() < 1e-5);
            assert!((saturate(-1.0, drive) + 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_foldback_below_threshold() {
        let output = foldback(0.3, 1.0, 1.0);
        assert!((output - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_foldback_above_threshold() {
        // 0.7 * 2 = 1.4, folds to 2*1 - 1.4 = 0.6
        let output = foldback(0.7, 2.0, 1.0);
        assert!((output - 0.6).abs() < 1e-6);
        // 3.5 folds past -1 and back: 3.5 -> -1.5 -> -0.5
        assert!((foldback(3.5, 1.0, 1.0) + 0.5).abs() < 1e-6);
        assert!((foldback(-1.4, 1.0, 1.0) + 0.6).abs() < 1e-6);
    }
}
