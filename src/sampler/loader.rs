use std::{
    collections::VecDeque,
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use rtrb::{Consumer, Producer, PushError, RingBuffer};
use tracing::{debug, warn};

use super::{
    buffer::{decode_source, SampleBuffer},
    cache::PitchKey,
};
use crate::{dsp::vocoder, error::SampleError};

const QUEUE_SIZE: usize = 64;
const IDLE_WAIT: Duration = Duration::from_millis(2);

/// Work for the loader.
pub enum Job {
    Decode {
        slot: usize,
        token: u64,
        source: String,
    },
    Shift {
        key: PitchKey,
        input: Arc<Vec<Vec<f32>>>,
    },
    Shutdown,
}

pub enum JobResult {
    Decoded {
        slot: usize,
        token: u64,
        result: Result<SampleBuffer, SampleError>,
    },
    Shifted {
        key: PitchKey,
        output: Vec<Vec<f32>>,
    },
}

fn process(job: Job) -> Option<JobResult> {
    match job {
        Job::Decode {
            slot,
            token,
            source,
        } => Some(JobResult::Decoded {
            slot,
            token,
            result: decode_source(&source),
        }),
        Job::Shift { key, input } => {
            let output = vocoder::shift(&input, key.ratio());
            Some(JobResult::Shifted { key, output })
        }
        Job::Shutdown => None,
    }
}

enum Mode {
    Worker {
        jobs: Producer<Job>,
        results: Consumer<JobResult>,
        handle: Option<JoinHandle<()>>,
    },
    Inline {
        done: VecDeque<JobResult>,
    },
}

/// Runs sample decodes and vocoder passes off the caller's thread.
///
/// Jobs and results travel over two `rtrb` ring buffers. The inline mode
/// runs each job on submit instead, which keeps tests deterministic.
pub struct SampleLoader {
    mode: Mode,
}

impl SampleLoader {
    /// Start the background worker, falling back to inline processing when
    /// the thread cannot be spawned.
    pub fn spawn() -> Self {
        let (jobs, mut job_rx) = RingBuffer::<Job>::new(QUEUE_SIZE);
        let (mut result_tx, results) = RingBuffer::<JobResult>::new(QUEUE_SIZE);

        let spawned = thread::Builder::new()
            .name("saavy-sample-loader".to_string())
            .spawn(move || loop {
                let job = match job_rx.pop() {
                    Ok(job) => job,
                    Err(_) => {
                        thread::park_timeout(IDLE_WAIT);
                        continue;
                    }
                };
                let Some(mut result) = process(job) else {
                    break;
                };
                loop {
                    match result_tx.push(result) {
                        Ok(()) => break,
                        Err(PushError::Full(back)) => {
                            result = back;
                            thread::park_timeout(IDLE_WAIT);
                        }
                    }
                }
            });

        match spawned {
            Ok(handle) => Self {
                mode: Mode::Worker {
                    jobs,
                    results,
                    handle: Some(handle),
                },
            },
            Err(err) => {
                warn!(%err, "sample loader thread unavailable, decoding inline");
                Self::inline()
            }
        }
    }

    pub fn inline() -> Self {
        Self {
            mode: Mode::Inline {
                done: VecDeque::new(),
            },
        }
    }

    /// Queue a job. Returns false when the queue is full and the job was dropped.
    pub fn submit(&mut self, job: Job) -> bool {
        match &mut self.mode {
            Mode::Worker { jobs, handle, .. } => match jobs.push(job) {
                Ok(()) => {
                    if let Some(handle) = handle {
                        handle.thread().unpark();
                    }
                    true
                }
                Err(_) => {
                    warn!("sample loader queue full, job dropped");
                    false
                }
            },
            Mode::Inline { done } => {
                if let Some(result) = process(job) {
                    done.push_back(result);
                }
                true
            }
        }
    }

    /// Next finished job, if any.
    pub fn poll(&mut self) -> Option<JobResult> {
        match &mut self.mode {
            Mode::Worker { results, .. } => results.pop().ok(),
            Mode::Inline { done } => done.pop_front(),
        }
    }
}

impl Drop for SampleLoader {
    fn drop(&mut self) {
        if let Mode::Worker { jobs, handle, .. } = &mut self.mode {
            let Some(handle) = handle.take() else {
                return;
            };
            if jobs.push(Job::Shutdown).is_err() {
                // Queue full: the worker still owns its end, let it drain detached.
                debug!("sample loader detached with pending jobs");
                return;
            }
            handle.thread().unpark();
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::buffer::tests::{data_url, wav_bytes};
    use std::time::Instant;

    fn wait_for(loader: &mut SampleLoader) -> JobResult {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(result) = loader.poll() {
                return result;
            }
            assert!(Instant::now() < deadline, "loader timed out");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn worker_decodes_and_reports_token() {
        let mut loader = SampleLoader::spawn();
        let url = data_url(&wav_bytes(1, 8000, &[0.2; 32]));
        assert!(loader.submit(Job::Decode {
            slot: 1,
            token: 7,
            source: url,
        }));

        match wait_for(&mut loader) {
            JobResult::Decoded { slot, token, result } => {
                assert_eq!((slot, token), (1, 7));
                assert_eq!(result.unwrap().frames(), 32);
            }
            JobResult::Shifted { .. } => panic!("expected a decode"),
        }
    }

    #[test]
    fn inline_failures_resolve_to_errors() {
        let mut loader = SampleLoader::inline();
        loader.submit(Job::Decode {
            slot: 0,
            token: 1,
            source: "data:text/plain,nope".to_string(),
        });
        match loader.poll() {
            Some(JobResult::Decoded { result, .. }) => assert!(result.is_err()),
            _ => panic!("expected a failed decode"),
        }
        assert!(loader.poll().is_none());
    }
}
