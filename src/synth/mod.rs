// Voice synthesizer: turns one resolved note into a self-contained
// `VoiceSpec` for the render path.
//
// Drums use a three-bucket placeholder kit keyed off the note's pitch class;
// everything else is a single oscillator at the note's equal-tempered pitch.

mod envelope;
mod pitch;

pub use envelope::{Envelope, PitchCurve, SILENCE_FLOOR, Waveform};
pub use pitch::{DEFAULT_FREQ, DrumKind, midi_number, midi_to_freq, note_frequency, parse_note};

use crate::audio_api::{BusId, VoiceSpec};
use crate::pipeline::project::{Instrument, Note};
use crate::shared::bars_to_seconds;

// Fade-in for drum hits so no voice starts above zero.
pub const DECLICK_ATTACK: f64 = 0.001;
pub const MELODIC_ATTACK: f64 = 0.02;
// How long a melodic voice lingers after its decay finishes.
pub const MELODIC_TAIL: f64 = 0.1;
pub const MELODIC_PEAK: f32 = 0.5; // scaled by velocity

const KICK_FROM_HZ: f32 = 150.0;
const KICK_TO_HZ: f32 = 0.01;
const KICK_LENGTH: f64 = 0.5;
const SNARE_HZ: f32 = 300.0;
const SNARE_PEAK: f32 = 0.5;
const SNARE_LENGTH: f64 = 0.2;
const HIHAT_HZ: f32 = 1200.0;
const HIHAT_PEAK: f32 = 0.2;
const HIHAT_LENGTH: f64 = 0.05;

pub fn voice_for(instrument: Instrument, note: &Note, time: f64, bpm: f64, bus: BusId) -> VoiceSpec {
    match instrument {
        Instrument::Drums => drum_voice(DrumKind::from_pitch(&note.pitch), time, bus),
        Instrument::Bass | Instrument::Synth => melodic_voice(instrument, note, time, bpm, bus),
    }
}

pub fn drum_voice(kind: DrumKind, time: f64, bus: BusId) -> VoiceSpec {
    let (waveform, pitch, peak, length) = match kind {
        DrumKind::Kick => (
            Waveform::Sine,
            PitchCurve::Sweep {
                from: KICK_FROM_HZ,
                to: KICK_TO_HZ,
                start: time,
                end: time + KICK_LENGTH,
            },
            1.0,
            KICK_LENGTH,
        ),
        DrumKind::Snare => (Waveform::Triangle, PitchCurve::Fixed(SNARE_HZ), SNARE_PEAK, SNARE_LENGTH),
        DrumKind::HiHat => (Waveform::Square, PitchCurve::Fixed(HIHAT_HZ), HIHAT_PEAK, HIHAT_LENGTH),
    };

    VoiceSpec {
        bus,
        waveform,
        pitch,
        envelope: Envelope::new(time, DECLICK_ATTACK, peak, time + length),
        start: time,
        stop: time + length,
    }
}

pub fn melodic_voice(instrument: Instrument, note: &Note, time: f64, bpm: f64, bus: BusId) -> VoiceSpec {
    let freq = note_frequency(&note.pitch);
    let (waveform, freq) = match instrument {
        Instrument::Bass => (Waveform::Sawtooth, freq / 2.0), // octave down
        _ => (Waveform::Triangle, freq),
    };

    let duration = bars_to_seconds(note.duration_bars.max(0.0), bpm);
    let peak = note.velocity.clamp(0.0, 1.0) * MELODIC_PEAK;

    VoiceSpec {
        bus,
        waveform,
        pitch: PitchCurve::Fixed(freq),
        envelope: Envelope::new(time, MELODIC_ATTACK, peak, time + duration),
        start: time,
        stop: time + duration + MELODIC_TAIL,
    }
}
