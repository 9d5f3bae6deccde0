use super::cache::{PitchKey, Rendered};
use crate::graph::node::{GraphNode, RenderCtx, StopTime};

/// Plays one pitch-shifted rendering, summed to mono.
///
/// A player can be created before its rendering exists (the vocoder pass is
/// still running on the loader); it stays silent until [`SamplePlayer::deliver`]
/// hands it the data and then starts from the first frame.
pub struct SamplePlayer {
    key: PitchKey,
    data: Option<Rendered>,
    position: usize,
    looped: bool,
    finished: bool,
    stop: StopTime,
}

impl SamplePlayer {
    pub fn new(key: PitchKey, data: Option<Rendered>, looped: bool) -> Self {
        Self {
            key,
            data,
            position: 0,
            looped,
            finished: false,
            stop: StopTime::default(),
        }
    }

    /// Key of the rendering this player still waits for.
    pub fn waiting_for(&self) -> Option<&PitchKey> {
        self.data.is_none().then_some(&self.key)
    }

    pub fn deliver(&mut self, data: Rendered) {
        if self.data.is_none() {
            self.data = Some(data);
            self.position = 0;
        }
    }

    #[inline]
    fn frame(data: &[Vec<f32>], index: usize) -> f32 {
        let sum: f32 = data.iter().map(|channel| channel[index]).sum();
        sum / data.len() as f32
    }
}

impl GraphNode for SamplePlayer {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        let Some(data) = self.data.as_ref() else {
            out.fill(0.0);
            return;
        };
        let frames = data.first().map_or(0, Vec::len);

        for (i, sample) in out.iter_mut().enumerate() {
            if self.finished || frames == 0 || !self.stop.running_at(ctx.sample_time(i)) {
                *sample = 0.0;
                continue;
            }
            if self.position >= frames {
                if self.looped {
                    self.position = 0;
                } else {
                    self.finished = true;
                    *sample = 0.0;
                    continue;
                }
            }
            *sample = Self::frame(data, self.position);
            self.position += 1;
        }
    }

    fn stop(&mut self, at: f64) {
        self.stop.schedule(at);
    }

    fn is_active(&self) -> bool {
        !self.finished && !self.stop.is_stopped()
    }
}
