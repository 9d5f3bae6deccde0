use std::{io::Cursor, ops::Range};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hound::{SampleFormat, WavReader};

use crate::error::SampleError;

/// Shortest playable trim window, in seconds.
pub const MIN_TRIM: f64 = 0.005;

/// Decoded, de-interleaved audio.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self, SampleError> {
        let frames = channels.first().map_or(0, Vec::len);
        if frames == 0 || sample_rate == 0 {
            return Err(SampleError::Empty);
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Copy of the frames inside `window`.
    pub fn trimmed(&self, window: TrimWindow) -> Vec<Vec<f32>> {
        let range = window.frames(self.sample_rate, self.frames());
        self.channels
            .iter()
            .map(|channel| channel[range.clone()].to_vec())
            .collect()
    }
}

/// Trim points resolved against a decoded buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimWindow {
    pub start: f64,
    pub end: f64,
}

impl TrimWindow {
    /// Clamp both points into `[0, duration]` and keep `end` at least
    /// [`MIN_TRIM`] after `start`.
    pub fn resolve(start: f32, end: Option<f32>, duration: f64) -> Self {
        let duration = duration.max(0.0);
        let min_len = MIN_TRIM.min(duration);

        let start = (start as f64).clamp(0.0, (duration - min_len).max(0.0));
        let end = end
            .map(|end| end as f64)
            .filter(|end| end.is_finite() && *end > 0.0)
            .unwrap_or(duration)
            .max(start + min_len)
            .min(duration);
        Self { start, end }
    }

    /// Frame range for a buffer of `frames` frames at `sample_rate`.
    pub fn frames(&self, sample_rate: u32, frames: usize) -> Range<usize> {
        let to_frame = |t: f64| ((t * sample_rate as f64).round() as usize).min(frames);
        let start = to_frame(self.start);
        let end = to_frame(self.end).max(start);
        start..end
    }
}

/// Decode a RIFF/WAVE file held in memory.
pub fn decode_wav(bytes: &[u8]) -> Result<SampleBuffer, SampleError> {
    let mut reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    let channel_count = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };

    let mut channels = vec![Vec::with_capacity(interleaved.len() / channel_count); channel_count];
    for frame in interleaved.chunks_exact(channel_count) {
        for (channel, &sample) in channels.iter_mut().zip(frame) {
            channel.push(sample);
        }
    }
    SampleBuffer::new(channels, spec.sample_rate)
}

/// Decode a `data:` URL carrying a base64 WAV payload.
pub fn decode_data_url(url: &str) -> Result<SampleBuffer, SampleError> {
    let body = url
        .strip_prefix("data:")
        .ok_or_else(|| SampleError::UnsupportedUrl(truncate(url)))?;
    let (header, payload) = body
        .split_once(',')
        .ok_or_else(|| SampleError::UnsupportedUrl(truncate(url)))?;
    if !header.ends_with(";base64") {
        return Err(SampleError::UnsupportedUrl(truncate(url)));
    }
    let bytes = STANDARD.decode(payload.trim())?;
    decode_wav(&bytes)
}

/// Decode a `data:` URL or a path to a WAV file.
pub fn decode_source(source: &str) -> Result<SampleBuffer, SampleError> {
    if source.is_empty() {
        return Err(SampleError::MissingSource);
    }
    if source.starts_with("data:") {
        decode_data_url(source)
    } else {
        let bytes = std::fs::read(source)?;
        decode_wav(&bytes)
    }
}

fn truncate(url: &str) -> String {
    url.chars().take(48).collect()
}
