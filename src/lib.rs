// A small playback engine for a bar-based arrangement: a look-ahead
// transport turns clips and notes into synthesized voices on per-track
// buses, rendered through cpal.
//
// `playback::AudioEngine` is the entry point. `middle` and `tui` are the
// demo host the binary runs.

pub mod audio;
pub mod audio_api;
pub mod config;
pub mod error;
pub mod middle;
pub mod pipeline;
pub mod playback;
pub mod shared;
pub mod synth;
pub mod tui;

pub use audio::{AudioDevice, CpalDevice, OfflineDevice, OfflineRenderer};
pub use config::EngineConfig;
pub use error::{EngineError, GenerateError};
pub use pipeline::project::{Clip, Instrument, Note, ProjectState, Track};
pub use playback::AudioEngine;
