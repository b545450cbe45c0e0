// The host side of the demo: owns the tracks and project state, turns
// `InputEvent`s into engine calls, and folds the scheduler's position reports
// back into state the TUI can draw.
//
// Looping lives here, not in the engine: once the reported bar passes the
// horizon we rewind to 0 and restart the transport.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use crate::audio::AudioDevice;
use crate::pipeline::generate::{Composer, GeneratedClip, clip_from_generation};
use crate::pipeline::project::{ProjectState, Track};
use crate::playback::AudioEngine;
use crate::shared::{ClipSpan, DisplayState, InputEvent, TrackRow};

const MIN_BPM: f64 = 20.0;
const MAX_BPM: f64 = 300.0;

struct Generated {
    track_id: String,
    start_bar: f64,
    clip: GeneratedClip,
}

pub struct Middle<D: AudioDevice> {
    pub tracks: Vec<Track>,
    pub project: ProjectState,
    engine: AudioEngine<D>,
    composer: Arc<dyn Composer>,
    selected: usize,
    run: u64, // bumps on every transport start so stale reports can be told apart
    position_tx: Sender<(u64, f64)>,
    position_rx: Receiver<(u64, f64)>,
    generated_tx: Sender<Generated>,
    generated_rx: Receiver<Generated>,
    next_clip: u64,
    status: String,
}

impl<D: AudioDevice> Middle<D> {
    pub fn new(engine: AudioEngine<D>, composer: Arc<dyn Composer>, tracks: Vec<Track>, project: ProjectState) -> Self {
        let (position_tx, position_rx) = crossbeam_channel::unbounded();
        let (generated_tx, generated_rx) = crossbeam_channel::unbounded();
        engine.set_bpm(project.bpm);
        Self {
            tracks,
            project,
            engine,
            composer,
            selected: 0,
            run: 0,
            position_tx,
            position_rx,
            generated_tx,
            generated_rx,
            next_clip: 0,
            status: String::new(),
        }
    }

    pub fn engine_mut(&mut self) -> &mut AudioEngine<D> {
        &mut self.engine
    }

    pub fn handle_input(&mut self, event: InputEvent) {
        match event {
            InputEvent::PlayPress => {
                if self.project.is_playing {
                    self.stop();
                } else {
                    self.start(self.project.current_bar);
                }
            }
            InputEvent::SelectTrack(n) => {
                if (n as usize) < self.tracks.len() {
                    self.selected = n as usize;
                }
            }
            InputEvent::ToggleMute => self.edit_selected(|t| t.muted = !t.muted),
            InputEvent::ToggleSolo => self.edit_selected(|t| t.soloed = !t.soloed),
            InputEvent::NudgeVolume(d) => self.edit_selected(|t| t.volume = (t.volume + d).clamp(0.0, 1.0)),
            InputEvent::NudgePan(d) => self.edit_selected(|t| t.pan = (t.pan + d).clamp(-1.0, 1.0)),
            InputEvent::NudgeBpm(d) => {
                self.project.bpm = (self.project.bpm + d).clamp(MIN_BPM, MAX_BPM);
                self.sync_engine();
            }
            InputEvent::GenerateClip => self.request_clip(),
            InputEvent::Quit => self.stop(),
        }
    }

    fn start(&mut self, bar: f64) {
        if let Err(e) = self.engine.init() {
            self.status = format!("audio unavailable: {e}");
            self.project.is_playing = false;
            return;
        }
        // buses only exist after init, so push every track through now
        self.sync_engine();

        self.run += 1;
        let run = self.run;
        let tx = self.position_tx.clone();
        self.engine.play(&self.tracks, bar, move |b| {
            let _ = tx.send((run, b));
        });
        self.project.is_playing = self.engine.is_playing();
        self.project.current_bar = bar;
    }

    fn stop(&mut self) {
        self.engine.stop();
        self.project.is_playing = false;
    }

    // Tempo plus every track's bus parameters, the way a project-state change
    // propagates.
    fn sync_engine(&mut self) {
        self.engine.set_bpm(self.project.bpm);
        for track in &self.tracks {
            self.engine.update_track_params(track);
        }
        self.engine.sync_tracks(&self.tracks);
    }

    fn edit_selected(&mut self, edit: impl FnOnce(&mut Track)) {
        let Some(track) = self.tracks.get_mut(self.selected) else {
            return;
        };
        edit(track);
        self.engine.update_track_params(track);
        self.engine.sync_tracks(&self.tracks);
    }

    fn request_clip(&mut self) {
        let Some(track) = self.tracks.get(self.selected) else {
            return;
        };
        let composer = Arc::clone(&self.composer);
        let tx = self.generated_tx.clone();
        let track_id = track.id.clone();
        let name = track.name.clone();
        let instrument = track.instrument;
        let bpm = self.project.bpm;
        let key = self.project.key();
        let start_bar = self.project.current_bar.floor();

        self.status = format!("generating for {name}...");
        let spawned = std::thread::Builder::new()
            .name("soundweave-composer".into())
            .spawn(move || {
                let clip = composer.generate(&name, instrument, bpm, &key);
                let _ = tx.send(Generated { track_id, start_bar, clip });
            });
        if let Err(e) = spawned {
            log::error!("could not start composer: {e}");
            self.status = "generation failed".to_string();
        }
    }

    // Fold in whatever the scheduler and the composer have reported since
    // the last frame.
    pub fn tick(&mut self) {
        let mut rewind = false;
        for (run, bar) in self.position_rx.try_iter() {
            if run != self.run || !self.project.is_playing {
                continue; // left over from a previous run
            }
            if bar > self.engine.config().loop_horizon_bars {
                rewind = true;
            } else {
                self.project.current_bar = bar;
            }
        }
        if rewind {
            self.engine.stop();
            self.project.current_bar = 0.0;
            self.start(0.0);
        }

        let results: Vec<Generated> = self.generated_rx.try_iter().collect();
        for g in results {
            self.add_generated(g);
        }
    }

    fn add_generated(&mut self, g: Generated) {
        let Some(track) = self.tracks.iter_mut().find(|t| t.id == g.track_id) else {
            return; // track went away while we waited
        };
        self.next_clip += 1;
        let clip = clip_from_generation(g.clip, g.start_bar, &format!("gen_{}", self.next_clip));
        self.status = format!("{}: \"{}\" at bar {}", track.name, clip.name, clip.start_bar + 1.0);
        track.clips.push(clip);
        self.engine.sync_tracks(&self.tracks);
    }

    pub fn display_state(&self) -> DisplayState {
        DisplayState {
            bpm: self.project.bpm,
            key: self.project.key(),
            playing: self.project.is_playing,
            current_bar: self.project.current_bar,
            selected_track: self.selected,
            tracks: self.tracks.iter().map(track_row).collect(),
            status: self.status.clone(),
        }
    }
}

fn track_row(track: &Track) -> TrackRow {
    TrackRow {
        name: track.name.clone(),
        instrument: track.instrument.label(),
        muted: track.muted,
        soloed: track.soloed,
        volume: track.volume,
        pan: track.pan,
        clips: track
            .clips
            .iter()
            .map(|c| ClipSpan {
                start_bar: c.start_bar,
                duration_bars: c.duration_bars,
                has_notes: c.notes.is_some(),
            })
            .collect(),
    }
}
