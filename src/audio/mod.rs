use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::audio_api::AudioCommand;
use crate::config::EngineConfig;
use crate::error::EngineError;

mod bus;
mod engine;
mod frame;
mod offline;
mod voice;

pub use engine::Engine;
pub use frame::StereoFrame;
pub use offline::{OfflineDevice, OfflineRenderer};

// The render path's sample clock, readable from any thread.
//
// Only the render side advances it, one block at a time, so it is
// monotonic and never drifts against the audio that was actually produced.
#[derive(Clone, Debug)]
pub struct AudioClock {
    frames: Arc<AtomicU64>,
    sample_rate: u32,
}

impl AudioClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            sample_rate: sample_rate.max(1),
        }
    }

    // Seconds of audio rendered so far.
    pub fn now(&self) -> f64 {
        self.frames.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn publish(&self, frames: u64) {
        self.frames.store(frames, Ordering::Release);
    }
}

// What the scheduling side holds: a way to read the clock and a way to queue
// commands. Cheap to clone and `Send`, unlike the stream itself.
#[derive(Clone, Debug)]
pub struct RenderLink {
    tx: Sender<AudioCommand>,
    clock: AudioClock,
}

impl RenderLink {
    pub fn new(tx: Sender<AudioCommand>, clock: AudioClock) -> Self {
        Self { tx, clock }
    }

    // a full queue drops the command; the render path must never block us.
    // false when that happened
    pub fn send(&self, cmd: AudioCommand) -> bool {
        self.tx.try_send(cmd).is_ok()
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn clock(&self) -> &AudioClock {
        &self.clock
    }
}

// Seam over the audio subsystem so the engine can run against real hardware
// or an offline renderer.
pub trait AudioDevice {
    // Bring the subsystem up. Called again after success, it must hand back
    // the same link.
    fn open(&mut self, config: &EngineConfig) -> Result<RenderLink, EngineError>;

    // Un-suspend output if the platform paused it.
    fn resume(&mut self) -> Result<(), EngineError>;
}

pub struct AudioHandle {
    link: RenderLink,
    stream: cpal::Stream,
}

impl AudioHandle {
    pub fn link(&self) -> &RenderLink {
        &self.link
    }
}

// The default output device via cpal. The stream is opened lazily on the
// first `open()` and stays up until the device is dropped.
#[derive(Default)]
pub struct CpalDevice {
    handle: Option<AudioHandle>,
}

impl AudioDevice for CpalDevice {
    fn open(&mut self, config: &EngineConfig) -> Result<RenderLink, EngineError> {
        if let Some(handle) = &self.handle {
            return Ok(handle.link.clone());
        }
        let handle = start_audio(config)?;
        let link = handle.link.clone();
        self.handle = Some(handle);
        Ok(link)
    }

    fn resume(&mut self) -> Result<(), EngineError> {
        if let Some(handle) = &self.handle {
            handle.stream.play()?;
        }
        Ok(())
    }
}

pub fn start_audio(config: &EngineConfig) -> Result<AudioHandle, EngineError> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(config.command_queue);

    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(EngineError::NoOutputDevice)?;
    let supported = device.default_output_config()?;

    let sample_rate: u32 = supported.sample_rate();
    let channels = (supported.channels() as usize).max(1);
    let clock = AudioClock::new(sample_rate);

    match supported.sample_format() {
        cpal::SampleFormat::F32 => {
            let stream = build_output_stream_f32(
                &device,
                &supported.config(),
                Engine::new(config, clock.clone()),
                rx,
                channels,
            )?;
            stream.play()?;
            log::info!("audio output up: {sample_rate} Hz, {channels} channel(s)");

            Ok(AudioHandle {
                link: RenderLink::new(tx, clock),
                stream,
            })
        }
        other => Err(EngineError::UnsupportedSampleFormat(other)),
    }
}

// ── Output stream ─────────────────────────────────────────────────

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut engine: Engine,
    rx: Receiver<AudioCommand>,
    channels: usize,
) -> Result<cpal::Stream, EngineError> {
    // scratch sized for a generous block; larger device blocks are chunked
    let mut scratch = vec![StereoFrame::zero(); 4096];

    let err_fn = |err| log::error!("audio output stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info| {
            while let Ok(cmd) = rx.try_recv() { // set up command handling
                engine.handle_cmd(cmd);
            }

            for chunk in data.chunks_mut(scratch.len() * channels) {
                let n_frames = chunk.len() / channels;
                let frames = &mut scratch[..n_frames];
                engine.render_block(frames);
                write_interleaved(frames, chunk, channels);
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

// Spread stereo frames over however many channels the device has. Mono gets
// the average; channels past the second stay silent.
fn write_interleaved(frames: &[StereoFrame], out: &mut [f32], channels: usize) {
    for (frame, slot) in frames.iter().zip(out.chunks_mut(channels)) {
        match slot {
            [mono] => *mono = 0.5 * (frame.left + frame.right),
            [l, r, rest @ ..] => {
                *l = frame.left;
                *r = frame.right;
                rest.fill(0.0);
            }
            [] => {}
        }
    }
}
