//! saavy-synth - plays a built-in patch with the sequencer and arpeggiator
//!
//! Run with: cargo run --bin saavy-synth
//! Set RUST_LOG=saavy_synth=debug to watch the schedulers.

use std::{thread, time::Duration};

use color_eyre::eyre::{eyre, Result, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::RingBuffer;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use saavy_synth::{io::EngineCommand, EngineConfig, SynthEngine, MAX_BLOCK_SIZE};

/// Chords held for the arpeggiator, one per bar.
const CHORDS: [[u8; 3]; 4] = [[60, 64, 67], [57, 60, 64], [53, 57, 60], [55, 59, 62]];
const BAR: Duration = Duration::from_millis(2000);

fn demo_patch() -> serde_json::Value {
    json!({
        "name": "demo",
        "tempo": 120.0,
        "osc1": {"mode": "macro", "macro": {"model": "supersaw", "harmonics": 0.4, "timbre": 0.3}},
        "osc2": {"wave": "sawtooth", "detune": -7.0, "octave": -1},
        "mix": 0.35,
        "sub": {"enabled": true, "level": 0.3},
        "filter": {"type": "lowpass", "cutoff": 2400.0, "q": 1.2},
        "envelope": {"attack": 0.005, "decay": 0.2, "sustain": 0.6, "release": 0.25},
        "effects": {
            "delay": {"time": 0.375, "feedback": 0.35, "mix": 0.2},
            "reverb": {"size": 0.6, "mix": 0.2}
        },
        "lfo2": {"shape": "triangle", "rate": 0.2, "depth": 0.4, "dest": "filter"},
        "arp": {
            "enabled": true,
            "mode": "up-down",
            "octaves": 2,
            "division": "1/16",
            "gate": 0.6,
            "swing": 0.3
        },
        "sequencer": {
            "enabled": true,
            "rootMidi": 36,
            "length": 8,
            "division": "1/8",
            "progression": "pop"
        },
        "modulation": [
            {"id": "vel-timbre", "source": "velocity", "target": "macro.timbre", "amount": 0.3},
            {"id": "step-cutoff", "source": "seq-step", "target": "filter.cutoff", "amount": 0.05},
            {"id": "lfo-mix", "source": "lfo1", "target": "mix", "amount": 0.2}
        ]
    })
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let config = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;

    let sample_rate = config.sample_rate().0 as f32;
    let channels = config.channels() as usize;
    info!(sample_rate, channels, "audio device ready");

    let mut engine = SynthEngine::new(EngineConfig::default().with_sample_rate(sample_rate));
    engine
        .apply_patch(&demo_patch())
        .wrap_err("demo patch rejected")?;

    let (mut commands, mut inbox) = RingBuffer::<EngineCommand>::new(256);
    let mut render_buf = vec![0.0f32; MAX_BLOCK_SIZE];

    let stream = device.build_output_stream(
        &config.into(),
        move |data: &mut [f32], _| {
            while let Ok(command) = inbox.pop() {
                engine.apply_command(command);
            }

            let total_frames = data.len() / channels;
            let mut frames_written = 0;
            while frames_written < total_frames {
                let frames = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                let block = &mut render_buf[..frames];
                engine.render_block(block);

                // Mono to every channel.
                let out_off = frames_written * channels;
                for (i, &sample) in block.iter().enumerate() {
                    let frame = out_off + i * channels;
                    data[frame..frame + channels].fill(sample);
                }
                frames_written += frames;
            }
        },
        |err| warn!(%err, "audio stream error"),
        None,
    )?;
    stream.play()?;

    let mut send = |command: EngineCommand| {
        if commands.push(command).is_err() {
            warn!(?command, "command queue full");
        }
    };

    info!("playing, press Ctrl+C to stop");
    send(EngineCommand::SequencerPlaying(true));
    for (bar, chord) in CHORDS.iter().cycle().take(CHORDS.len() * 2).enumerate() {
        info!(bar, ?chord, "chord");
        for &note in chord {
            send(EngineCommand::NoteOn { note, velocity: 0.5 + 0.1 * (bar % 4) as f32 });
        }
        send(EngineCommand::Expression {
            x: (bar as f32 * 0.7).sin(),
            y: 0.0,
        });
        thread::sleep(BAR);
        for &note in chord {
            send(EngineCommand::NoteOff { note });
        }
    }

    send(EngineCommand::ClearExpression);
    send(EngineCommand::SequencerPlaying(false));
    send(EngineCommand::AllNotesOff);
    thread::sleep(Duration::from_millis(500));
    Ok(())
}
