// Turning a generative composer's answer into clip data.
//
// The composer itself lives outside the engine; it returns loosely-shaped
// JSON. Everything here validates that JSON note by note and, when nothing
// usable is left, degrades to a fixed four-on-the-floor fallback so the user
// always gets a clip.

use serde::Deserialize;

use crate::error::GenerateError;
use crate::synth::parse_note;

use super::project::{Clip, Instrument, Note};

// Length of every generated clip.
pub const GENERATED_CLIP_BARS: f64 = 4.0;
pub const DEFAULT_CLIP_NAME: &str = "AI Idea";
pub const FALLBACK_NAME: &str = "Fallback Beat";
pub const DEFAULT_DURATION: f64 = 0.25;
pub const DEFAULT_VELOCITY: f32 = 0.8;

#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedClip {
    pub name: String,
    pub notes: Vec<Note>,
}

// The external composition/chat service. The engine never calls this; the
// host does, off the UI thread, and hands the result to
// `clip_from_generation`.
pub trait Composer: Send + Sync {
    fn generate(&self, track_name: &str, instrument: Instrument, bpm: f64, key: &str) -> GeneratedClip;
    fn chat(&self, message: &str, context: &str) -> String;
}

// Kick on 1 and 3, snare on 2 and 4.
pub fn fallback_beat() -> GeneratedClip {
    GeneratedClip {
        name: FALLBACK_NAME.to_string(),
        notes: vec![
            Note::new("C3", 0.0, 0.1, 1.0),
            Note::new("D3", 1.0, 0.1, 0.8),
            Note::new("C3", 2.0, 0.1, 1.0),
            Note::new("D3", 3.0, 0.1, 0.8),
        ],
    }
}

// The request a composer is expected to answer.
pub fn generation_prompt(track_name: &str, instrument: Instrument, bpm: f64, key: &str) -> String {
    format!(
        "Compose a {bars}-bar musical sequence for a \"{inst}\" track named \"{track_name}\".\n\
         The song is in {key} at {bpm} BPM.\n\
         Return a list of notes.\n\
         For Drums: Use C3 for Kick, D3 for Snare, F#3 for HiHat.\n\
         For Melodic instruments: Use standard note names (e.g., C3, G#4).\n\
         Reply with JSON only: {{\"name\": string, \"notes\": [{{\"note\": string, \
         \"start\": bars from 0 to {bars}, \"duration\": bars, \"velocity\": 0 to 1}}]}}",
        bars = GENERATED_CLIP_BARS,
        inst = instrument.label(),
    )
}

#[derive(Deserialize)]
struct RawClip {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    notes: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct RawNote {
    note: String,
    start: f64,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    velocity: Option<f64>,
}

fn validate_note(raw: RawNote) -> Option<Note> {
    parse_note(&raw.note)?;
    if !(0.0..GENERATED_CLIP_BARS).contains(&raw.start) {
        return None;
    }
    let duration = raw.duration.unwrap_or(DEFAULT_DURATION);
    if !(duration.is_finite() && duration > 0.0) {
        return None;
    }
    let velocity = match raw.velocity {
        Some(v) if v.is_finite() => v.clamp(0.0, 1.0) as f32,
        _ => DEFAULT_VELOCITY,
    };
    Some(Note {
        pitch: raw.note,
        start_bar: raw.start,
        duration_bars: duration,
        velocity,
    })
}

// Strict-but-forgiving parse: bad notes are dropped one at a time, a missing
// name gets a default. Fails only when the JSON is unreadable or no note
// survives.
pub fn parse_generated(json: &str) -> Result<GeneratedClip, GenerateError> {
    let raw: RawClip = serde_json::from_str(json)?;
    let total = raw.notes.len();

    let notes: Vec<Note> = raw
        .notes
        .into_iter()
        .filter_map(|v| serde_json::from_value::<RawNote>(v).ok())
        .filter_map(validate_note)
        .collect();

    if notes.is_empty() {
        return Err(GenerateError::NoUsableNotes { rejected: total });
    }
    if notes.len() < total {
        log::debug!("dropped {} of {} generated notes", total - notes.len(), total);
    }

    let name = raw
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_CLIP_NAME.to_string());

    Ok(GeneratedClip { name, notes })
}

// `parse_generated`, with the fallback beat standing in for any failure.
pub fn parse_or_fallback(json: &str) -> GeneratedClip {
    parse_generated(json).unwrap_or_else(|e| {
        log::warn!("generation unusable, using fallback beat: {e}");
        fallback_beat()
    })
}

pub fn clip_from_generation(generated: GeneratedClip, start_bar: f64, id: &str) -> Clip {
    Clip {
        id: id.to_string(),
        name: generated.name,
        start_bar: start_bar.max(0.0),
        duration_bars: GENERATED_CLIP_BARS,
        notes: Some(generated.notes),
    }
}

// Works with no service at all: every request gets the fallback beat.
#[derive(Clone, Copy, Debug, Default)]
pub struct FallbackComposer;

impl Composer for FallbackComposer {
    fn generate(&self, track_name: &str, instrument: Instrument, _bpm: f64, _key: &str) -> GeneratedClip {
        log::info!("no composer configured; fallback beat for {track_name} ({})", instrument.label());
        fallback_beat()
    }

    fn chat(&self, _message: &str, _context: &str) -> String {
        CHAT_UNANSWERED.to_string()
    }
}

const CHAT_UNANSWERED: &str = "I couldn't process that request.";
const CHAT_UNREACHABLE: &str = "Error connecting to AI Co-Pilot.";

// A composer over any text-in/text-out model. `ask(system, message)` returns
// the raw reply, or None when the service couldn't be reached.
pub struct PromptComposer<F> {
    ask: F,
}

impl<F> PromptComposer<F>
where
    F: Fn(&str, &str) -> Option<String> + Send + Sync,
{
    pub fn new(ask: F) -> Self {
        Self { ask }
    }
}

impl<F> Composer for PromptComposer<F>
where
    F: Fn(&str, &str) -> Option<String> + Send + Sync,
{
    fn generate(&self, track_name: &str, instrument: Instrument, bpm: f64, key: &str) -> GeneratedClip {
        let prompt = generation_prompt(track_name, instrument, bpm, key);
        match (self.ask)("You write note data for a music sequencer.", &prompt) {
            Some(reply) => parse_or_fallback(&reply),
            None => {
                log::warn!("composer unreachable, using fallback beat for {track_name}");
                fallback_beat()
            }
        }
    }

    fn chat(&self, message: &str, context: &str) -> String {
        let system = format!("You are the SoundWeave AI Co-Pilot.\nCurrent Project Context: {context}");
        match (self.ask)(&system, message) {
            Some(reply) if !reply.trim().is_empty() => reply,
            Some(_) => CHAT_UNANSWERED.to_string(),
            None => CHAT_UNREACHABLE.to_string(),
        }
    }
}
