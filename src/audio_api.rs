// The contract between the scheduling side and the render path.
//
// Commands are small `Copy`-ish values so sending one never allocates; the
// render callback drains them at the top of every block.

pub use crate::synth::{Envelope, PitchCurve, Waveform};

// Handle for a track's persistent gain/pan stage on the render side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BusId(pub u32);

// Everything needed to realise one note: oscillator, its pitch over time,
// an amplitude envelope, and the absolute audio-clock window it lives in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoiceSpec {
    pub bus: BusId,
    pub waveform: Waveform,
    pub pitch: PitchCurve,
    pub envelope: Envelope,
    pub start: f64, // seconds on the audio clock
    pub stop: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AudioCommand {
    // Buses are created once per track and live as long as the engine does
    CreateBus { bus: BusId },

    // Retarget (not jump) a bus's gain and pan
    SetBusParams { bus: BusId, gain: f32, pan: f32 },

    PlayVoice(VoiceSpec),
}
