use crate::audio_api::{BusId, VoiceSpec};

// One live voice on the render side: an oscillator phase plus the `VoiceSpec` it
// was built from. Never reused; it is dropped once past its stop frame.
#[derive(Clone, Debug)]
pub struct Voice {
    spec: VoiceSpec,
    phase: f32, // cycles, wrapped to [0, 1)
    start_frame: u64,
    stop_frame: u64,
    pub active: bool,
}

impl Voice {
    pub fn new(spec: VoiceSpec, sample_rate: f32) -> Self {
        let sr = sample_rate as f64;
        Self {
            spec,
            phase: 0.0,
            start_frame: to_frame(spec.start, sr),
            stop_frame: to_frame(spec.stop, sr),
            active: true,
        }
    }

    pub fn bus(&self) -> BusId {
        self.spec.bus
    }

    // Render the sample for absolute `frame`. Silent until the start frame;
    // a voice that arrives late simply begins part-way through its envelope.
    #[inline]
    pub fn tick(&mut self, frame: u64, sample_rate: f32) -> f32 {
        if !self.active {
            return 0.0;
        }
        if frame >= self.stop_frame {
            self.active = false;
            return 0.0;
        }
        if frame < self.start_frame {
            return 0.0;
        }

        let t = frame as f64 / sample_rate as f64;
        let out = self.spec.waveform.sample(self.phase) * self.spec.envelope.gain_at(t);

        self.phase += self.spec.pitch.freq_at(t) / sample_rate;
        self.phase -= self.phase.floor();
        out
    }
}

fn to_frame(seconds: f64, sample_rate: f64) -> u64 {
    (seconds.max(0.0) * sample_rate).round() as u64
}
