// The timeline data the host owns and the engine reads.
//
// Field names on the wire match the host's JSON (`startBar`, `durationBars`,
// and `note`/`start`/`duration` on notes) so AI-generated clips and host
// state deserialize straight into these types.
//
// Everything is in bars; seconds only show up at the synthesis boundary.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    #[default]
    Synth,
    Bass,
    Drums,
}

impl Instrument {
    pub fn label(self) -> &'static str {
        match self {
            Instrument::Synth => "synth",
            Instrument::Bass => "bass",
            Instrument::Drums => "drums",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(rename = "note")]
    pub pitch: String, // "C3", "F#4"; sharps only
    #[serde(rename = "start")]
    pub start_bar: f64, // relative to the clip
    #[serde(rename = "duration")]
    pub duration_bars: f64,
    pub velocity: f32,
}

impl Note {
    pub fn new(pitch: &str, start_bar: f64, duration_bars: f64, velocity: f32) -> Self {
        Self {
            pitch: pitch.to_string(),
            start_bar,
            duration_bars,
            velocity,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub start_bar: f64,
    pub duration_bars: f64,
    // None = audio-only placeholder, drawn but never scheduled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<Note>>,
}

impl Clip {
    pub fn placeholder(id: &str, name: &str, start_bar: f64, duration_bars: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            start_bar,
            duration_bars,
            notes: None,
        }
    }

    // Half-open: a clip covers `[start, start + duration)`.
    pub fn contains(&self, bar: f64) -> bool {
        bar >= self.start_bar && bar < self.start_bar + self.duration_bars
    }

    pub fn end_bar(&self) -> f64 {
        self.start_bar + self.duration_bars
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub soloed: bool,
    pub volume: f32, // 0..=1
    pub pan: f32,    // -1..=1
    #[serde(default)]
    pub instrument: Instrument,
    #[serde(default)]
    pub clips: Vec<Clip>,
}

impl Track {
    pub fn new(id: &str, name: &str, instrument: Instrument) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            muted: false,
            soloed: false,
            volume: 0.8,
            pan: 0.0,
            instrument,
            clips: Vec::new(),
        }
    }

    // Gain the track bus should settle on.
    pub fn bus_gain(&self) -> f32 {
        if self.muted { 0.0 } else { self.volume.clamp(0.0, 1.0) }
    }

    pub fn bus_pan(&self) -> f32 {
        self.pan.clamp(-1.0, 1.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectState {
    pub bpm: f64,
    #[serde(default = "default_key_root")]
    pub key_root: String,
    #[serde(default = "default_key_scale")]
    pub key_scale: String,
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub current_bar: f64, // written by the scheduler's tick reports
}

fn default_key_root() -> String {
    "C".to_string()
}

fn default_key_scale() -> String {
    "Minor".to_string()
}

impl Default for ProjectState {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            key_root: default_key_root(),
            key_scale: default_key_scale(),
            is_playing: false,
            current_bar: 0.0,
        }
    }
}

impl ProjectState {
    pub fn key(&self) -> String {
        format!("{} {}", self.key_root, self.key_scale)
    }
}

// The arrangement a fresh session opens with.
pub fn default_tracks() -> Vec<Track> {
    let mut drums = Track::new("t1", "Drums", Instrument::Drums);
    drums.clips = vec![
        Clip::placeholder("c1", "Kick Loop", 0.0, 4.0),
        Clip::placeholder("c2", "Full Kit", 4.0, 4.0),
    ];

    let mut bass = Track::new("t2", "Bass", Instrument::Bass);
    bass.volume = 0.7;

    let mut lead = Track::new("t3", "Lead Synth", Instrument::Synth);
    lead.volume = 0.6;
    lead.pan = 0.2;
    lead.clips = vec![Clip::placeholder("c3", "Arp AI", 4.0, 4.0)];

    let mut vocals = Track::new("t4", "Vocals", Instrument::Synth);
    vocals.volume = 0.9;

    vec![drums, bass, lead, vocals]
}
