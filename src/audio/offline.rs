use crossbeam_channel::Receiver;

use crate::audio_api::AudioCommand;
use crate::config::EngineConfig;
use crate::error::EngineError;

use super::engine::Engine;
use super::frame::StereoFrame;
use super::{AudioClock, AudioDevice, RenderLink};

// Frames per block, like a small device buffer. Commands are only picked up
// between blocks, same as in the output callback.
pub const OFFLINE_BLOCK: usize = 128;

// The render path without a device: the same `Engine`, driven by hand.
pub struct OfflineRenderer {
    engine: Engine,
    rx: Receiver<AudioCommand>,
    link: RenderLink,
}

impl OfflineRenderer {
    pub fn new(config: &EngineConfig) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(config.command_queue);
        let clock = AudioClock::new(config.sample_rate);
        Self {
            engine: Engine::new(config, clock.clone()),
            rx,
            link: RenderLink::new(tx, clock),
        }
    }

    pub fn link(&self) -> RenderLink {
        self.link.clone()
    }

    pub fn now(&self) -> f64 {
        self.link.now()
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn render(&mut self, frames: usize) -> Vec<StereoFrame> {
        let mut out = vec![StereoFrame::zero(); frames];
        for block in out.chunks_mut(OFFLINE_BLOCK) {
            while let Ok(cmd) = self.rx.try_recv() {
                self.engine.handle_cmd(cmd);
            }
            self.engine.render_block(block);
        }
        out
    }

    pub fn render_seconds(&mut self, seconds: f64) -> Vec<StereoFrame> {
        let frames = (seconds * self.link.clock().sample_rate() as f64).round() as usize;
        self.render(frames)
    }
}

// An `AudioDevice` backed by an `OfflineRenderer`, for tests and headless use.
// `unavailable()` builds one that refuses to open, like a machine with no
// output device.
pub struct OfflineDevice {
    renderer: Option<OfflineRenderer>,
    available: bool,
    pub resumes: usize,
}

impl OfflineDevice {
    pub fn new() -> Self {
        Self { renderer: None, available: true, resumes: 0 }
    }

    pub fn unavailable() -> Self {
        Self { renderer: None, available: false, resumes: 0 }
    }

    // The renderer, once the device has been opened.
    pub fn renderer(&mut self) -> Option<&mut OfflineRenderer> {
        self.renderer.as_mut()
    }
}

impl Default for OfflineDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioDevice for OfflineDevice {
    fn open(&mut self, config: &EngineConfig) -> Result<RenderLink, EngineError> {
        if !self.available {
            return Err(EngineError::NoOutputDevice);
        }
        let renderer = self.renderer.get_or_insert_with(|| OfflineRenderer::new(config));
        Ok(renderer.link())
    }

    fn resume(&mut self) -> Result<(), EngineError> {
        self.resumes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_api::{BusId, VoiceSpec};
    use crate::pipeline::project::{Instrument, Note};
    use crate::synth::voice_for;

    fn hat(time: f64) -> VoiceSpec {
        voice_for(Instrument::Drums, &Note::new("F#3", 0.0, 0.1, 1.0), time, 120.0, BusId(0))
    }

    #[test]
    fn commands_go_through_the_queue() {
        let mut r = OfflineRenderer::new(&EngineConfig::default());
        let link = r.link();
        link.send(AudioCommand::CreateBus { bus: BusId(0) });
        link.send(AudioCommand::PlayVoice(hat(0.01)));
        let out = r.render_seconds(0.1);
        assert!(out.iter().any(|f| f.peak() > 0.05));
        assert!((r.now() - 0.1).abs() < 1.0 / 44100.0);
    }

    #[test]
    fn device_reopens_to_the_same_clock() {
        let mut dev = OfflineDevice::new();
        let cfg = EngineConfig::default();
        let a = dev.open(&cfg).unwrap();
        dev.renderer().unwrap().render(441);
        let b = dev.open(&cfg).unwrap();
        assert_eq!(a.now(), b.now());
        assert!((b.now() - 0.01).abs() < 1e-9);
    }

    #[test]
    fn unavailable_device_refuses() {
        let mut dev = OfflineDevice::unavailable();
        assert!(dev.open(&EngineConfig::default()).is_err());
        assert!(dev.renderer().is_none());
    }
}
