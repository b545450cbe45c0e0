use crate::audio_api::{AudioCommand, BusId};
use crate::config::EngineConfig;

use super::AudioClock;
use super::bus::Bus;
use super::frame::StereoFrame;
use super::voice::Voice;

// Render-path state. Lives inside the output callback (or an offline
// renderer) and is only ever touched from there.
pub struct Engine {
    sample_rate: f32,
    smoothing: f64,
    master_gain: f32,
    clock: AudioClock,
    frame: u64, // frames rendered so far; the audio clock
    buses: Vec<Option<Bus>>, // indexed by BusId, fixed length
    voices: Vec<Voice>,      // capacity fixed up front, never grown
    max_voices: usize,
    dropped_voices: u64,
}

impl Engine {
    pub fn new(config: &EngineConfig, clock: AudioClock) -> Self {
        Self {
            sample_rate: clock.sample_rate() as f32,
            smoothing: config.smoothing,
            master_gain: config.master_gain,
            clock,
            frame: 0,
            buses: vec![None; config.max_buses],
            voices: Vec::with_capacity(config.max_voices),
            max_voices: config.max_voices,
            dropped_voices: 0,
        }
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::CreateBus { bus } => {
                if let Some(slot) = self.buses.get_mut(bus.0 as usize) {
                    if slot.is_none() {
                        *slot = Some(Bus::new(self.smoothing, self.sample_rate));
                    }
                }
            }
            AudioCommand::SetBusParams { bus, gain, pan } => {
                if let Some(b) = self.bus_mut(bus) {
                    b.retarget(gain, pan);
                }
            }
            AudioCommand::PlayVoice(spec) => {
                // no bus, no voice; and never grow the pool from in here
                if self.bus_mut(spec.bus).is_none() || self.voices.len() >= self.max_voices {
                    self.dropped_voices += 1;
                    return;
                }
                self.voices.push(Voice::new(spec, self.sample_rate));
            }
        }
    }

    fn bus_mut(&mut self, bus: BusId) -> Option<&mut Bus> {
        self.buses.get_mut(bus.0 as usize).and_then(Option::as_mut)
    }

    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        for frame in out.iter_mut() {
            for voice in self.voices.iter_mut() {
                let s = voice.tick(self.frame, self.sample_rate);
                if let Some(Some(bus)) = self.buses.get_mut(voice.bus().0 as usize) {
                    bus.add(s);
                }
            }

            let mut mix = StereoFrame::zero();
            for bus in self.buses.iter_mut().flatten() {
                mix += bus.take_frame();
            }
            *frame = mix * self.master_gain;
            self.frame += 1;
        }

        self.voices.retain(|v| v.active);
        self.clock.publish(self.frame);
    }

    pub fn live_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn dropped_voices(&self) -> u64 {
        self.dropped_voices
    }

    pub fn bus_state(&self, bus: BusId) -> Option<(f32, f32)> {
        self.buses
            .get(bus.0 as usize)
            .and_then(Option::as_ref)
            .map(|b| (b.gain(), b.pan()))
    }
}
