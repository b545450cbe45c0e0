// The demo host's input plan:
//
//   Space         //  PlayPress (toggle transport)
//   1 2 3 4 ...   //  SelectTrack(0..)
//   m             //  ToggleMute on the selected track
//   s             //  ToggleSolo on the selected track
//   [ / ]         //  NudgeVolume(-0.05 / +0.05)
//   - / =         //  NudgePan(-0.1 / +0.1)
//   , / .         //  NudgeBpm(-1 / +1)
//   g             //  GenerateClip on the selected track at the playhead's bar
//   Esc           //  Quit
//
// Like the middle layer it feeds, everything here is plain data; the TUI
// renders a `DisplayState` every frame and never touches the engine itself.

pub const BEATS_PER_BAR: f64 = 4.0;
pub const STEPS_PER_BAR: u32 = 16;
// One sixteenth of a bar, the scheduler's grid step.
pub const STEP_BARS: f64 = 1.0 / STEPS_PER_BAR as f64;
// How close a note's start must be to the cursor to fire.
pub const NOTE_EPSILON_BARS: f64 = 0.01;
pub const TIMELINE_BARS: usize = 32;

// Wall-clock length of one bar at `bpm`.
pub fn seconds_per_bar(bpm: f64) -> f64 {
    BEATS_PER_BAR * (60.0 / bpm)
}

pub fn bars_to_seconds(bars: f64, bpm: f64) -> f64 {
    bars * seconds_per_bar(bpm)
}

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    PlayPress,
    SelectTrack(u8),
    ToggleMute,
    ToggleSolo,
    NudgeVolume(f32),
    NudgePan(f32),
    NudgeBpm(f64),
    GenerateClip,
    Quit,
}

#[derive(Clone, Debug, Default)]
pub struct DisplayState {
    pub bpm: f64,
    pub key: String,
    pub playing: bool,
    pub current_bar: f64,
    pub selected_track: usize,
    pub tracks: Vec<TrackRow>,
    pub status: String, // last thing worth telling the user
}

#[derive(Clone, Debug, Default)]
pub struct TrackRow {
    pub name: String,
    pub instrument: &'static str,
    pub muted: bool,
    pub soloed: bool,
    pub volume: f32,
    pub pan: f32,
    pub clips: Vec<ClipSpan>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClipSpan {
    pub start_bar: f64,
    pub duration_bars: f64,
    pub has_notes: bool, // placeholder audio regions draw dimmer
}
