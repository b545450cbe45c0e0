// The engine's public face: what the host calls on user intent.
//
// `AudioEngine` owns the device, the per-track bus table and at most one
// scheduler run. Nothing here is a global; a host can hold several engines
// (tests do).

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::audio::{AudioDevice, RenderLink};
use crate::audio_api::{AudioCommand, BusId};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::pipeline::project::Track;
use crate::pipeline::transport::{BusTable, ScheduleCursor, SchedulerHandle, SharedBpm, SharedTracks, Transport};

pub struct AudioEngine<D: AudioDevice> {
    config: EngineConfig,
    device: D,
    link: Option<RenderLink>, // Some once init() succeeded
    bpm: SharedBpm,
    buses: BusTable,
    next_bus: u32,
    tracks: SharedTracks,
    scheduler: Option<SchedulerHandle>,
}

impl<D: AudioDevice> AudioEngine<D> {
    pub fn new(device: D, config: EngineConfig) -> Self {
        Self {
            config,
            device,
            link: None,
            bpm: SharedBpm::new(120.0),
            buses: Arc::new(RwLock::new(HashMap::new())),
            next_bus: 0,
            tracks: Arc::new(RwLock::new(Vec::new())),
            scheduler: None,
        }
    }

    /// Bring the audio subsystem up, or resume it if suspended. Safe to call
    /// any number of times.
    pub fn init(&mut self) -> Result<(), EngineError> {
        if self.link.is_none() {
            self.link = Some(self.device.open(&self.config)?);
            log::info!("audio engine initialised");
        }
        self.device.resume()
    }

    pub fn is_initialised(&self) -> bool {
        self.link.is_some()
    }

    /// Takes effect on the scheduler's next tick; already committed steps
    /// keep the tempo they were scheduled with.
    pub fn set_bpm(&self, bpm: f64) {
        if !(bpm.is_finite() && bpm > 0.0) {
            log::warn!("ignoring tempo {bpm}");
            return;
        }
        self.bpm.set(bpm);
    }

    pub fn bpm(&self) -> f64 {
        self.bpm.get()
    }

    /// Create the track's bus on first sight, then retarget its gain
    /// (0 when muted) and pan. Inert before `init()`.
    pub fn update_track_params(&mut self, track: &Track) {
        let Some(link) = &self.link else {
            return;
        };

        let bus = {
            let mut table = self.buses.write().unwrap_or_else(PoisonError::into_inner);
            match table.get(&track.id) {
                Some(&bus) => bus,
                None => {
                    if self.next_bus as usize >= self.config.max_buses {
                        log::warn!("no bus left for track {}; it will stay silent", track.id);
                        return;
                    }
                    let bus = BusId(self.next_bus);
                    // only claim the bus once the render side will hear about
                    // it; a rejected create is retried on the next update
                    if !link.send(AudioCommand::CreateBus { bus }) {
                        log::warn!("command queue full, bus for track {} deferred", track.id);
                        return;
                    }
                    self.next_bus += 1;
                    table.insert(track.id.clone(), bus);
                    log::debug!("track {} -> bus {}", track.id, bus.0);
                    bus
                }
            }
        };

        let sent = link.send(AudioCommand::SetBusParams {
            bus,
            gain: track.bus_gain(),
            pan: track.bus_pan(),
        });
        if !sent {
            log::warn!("command queue full, dropped params for track {}", track.id);
        }
    }

    pub fn has_bus(&self, track_id: &str) -> bool {
        self.buses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(track_id)
    }

    /// Replace the arrangement a running transport reads, from its next step on.
    pub fn sync_tracks(&self, tracks: &[Track]) {
        *self.tracks.write().unwrap_or_else(PoisonError::into_inner) = tracks.to_vec();
    }

    /// Start the transport at `start_bar`. `on_tick` hears every advance of
    /// the schedule cursor, from the scheduler's own thread after the first
    /// tick. A no-op while already playing, or if the device won't come up.
    pub fn play<F>(&mut self, tracks: &[Track], start_bar: f64, on_tick: F)
    where
        F: FnMut(f64) + Send + 'static,
    {
        if let Err(e) = self.init() {
            log::error!("cannot start playback: {e}");
            return;
        }
        if self.is_playing() {
            return;
        }
        let Some(link) = self.link.clone() else {
            return;
        };

        self.sync_tracks(tracks);
        let start_time = link.now() + self.config.start_offset;
        let mut transport = Transport::new(
            ScheduleCursor::new(start_time, start_bar.max(0.0)),
            link,
            self.tracks.clone(),
            self.buses.clone(),
            self.bpm.clone(),
            self.config.schedule_ahead,
            Box::new(on_tick),
        );

        transport.tick();
        match SchedulerHandle::spawn(transport, self.config.lookahead_duration()) {
            Ok(handle) => {
                log::info!("transport started at bar {start_bar}");
                self.scheduler = Some(handle);
            }
            Err(e) => log::error!("{}", EngineError::SpawnScheduler(e)),
        }
    }

    /// Halt the transport. Voices already handed to the render path still
    /// play out. Always safe, including when stopped.
    pub fn stop(&mut self) {
        if let Some(handle) = self.scheduler.take() {
            handle.stop();
            log::info!("transport stopped");
        }
    }

    pub fn is_playing(&self) -> bool {
        self.scheduler.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }
}

impl<D: AudioDevice> Drop for AudioEngine<D> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::OfflineDevice;
    use crate::pipeline::project::{Clip, Instrument, Note};
    use std::sync::Mutex;

    fn engine() -> AudioEngine<OfflineDevice> {
        AudioEngine::new(OfflineDevice::new(), EngineConfig::default())
    }

    fn drum_track(muted: bool) -> Track {
        let mut t = Track::new("t1", "Drums", Instrument::Drums);
        t.muted = muted;
        t.clips = vec![Clip {
            id: "c1".into(),
            name: String::new(),
            start_bar: 0.0,
            duration_bars: 4.0,
            notes: Some(vec![Note::new("C3", 0.0, 0.1, 1.0)]),
        }];
        t
    }

    fn recorder() -> (Arc<Mutex<Vec<f64>>>, impl FnMut(f64) + Send + 'static) {
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let sink = ticks.clone();
        (ticks, move |bar| sink.lock().unwrap().push(bar))
    }

    #[test]
    fn init_is_idempotent_and_resumes() {
        let mut e = engine();
        e.init().unwrap();
        e.init().unwrap();
        assert!(e.is_initialised());
        assert_eq!(e.device_mut().resumes, 2);
    }

    #[test]
    fn updates_before_init_are_inert() {
        let mut e = engine();
        e.update_track_params(&drum_track(false));
        assert!(!e.has_bus("t1"));
        e.init().unwrap();
        e.update_track_params(&drum_track(false));
        assert!(e.has_bus("t1"));
    }

    #[test]
    fn play_without_a_device_does_nothing() {
        let mut e = AudioEngine::new(OfflineDevice::unavailable(), EngineConfig::default());
        let (ticks, on_tick) = recorder();
        e.play(&[drum_track(false)], 0.0, on_tick);
        assert!(!e.is_playing());
        assert!(ticks.lock().unwrap().is_empty());
        e.stop();
    }

    #[test]
    fn bus_follows_volume_pan_and_mute() {
        let mut e = engine();
        e.init().unwrap();
        let mut t = drum_track(false);
        t.volume = 0.5;
        t.pan = -0.5;
        e.update_track_params(&t);
        let r = e.device_mut().renderer().unwrap();
        r.render_seconds(0.5);
        let (gain, pan) = r.engine().bus_state(BusId(0)).unwrap();
        assert!((gain - 0.5).abs() < 1e-3);
        assert!((pan + 0.5).abs() < 1e-3);

        t.muted = true;
        e.update_track_params(&t);
        let r = e.device_mut().renderer().unwrap();
        r.render_seconds(0.5);
        let (gain, _) = r.engine().bus_state(BusId(0)).unwrap();
        assert!(gain < 1e-3);
    }

    #[test]
    fn one_bus_per_track_id() {
        let mut e = engine();
        e.init().unwrap();
        e.update_track_params(&drum_track(false));
        e.update_track_params(&drum_track(true));
        let mut other = drum_track(false);
        other.id = "t2".into();
        e.update_track_params(&other);
        assert_eq!(e.next_bus, 2);
    }

    #[test]
    fn bus_create_rejected_by_a_full_queue_is_retried() {
        let config = EngineConfig { command_queue: 2, ..Default::default() };
        let mut e = AudioEngine::new(OfflineDevice::new(), config);
        e.init().unwrap();
        e.update_track_params(&drum_track(false)); // create + params fill the queue

        let mut bass = drum_track(false);
        bass.id = "t2".into();
        e.update_track_params(&bass);
        assert!(!e.has_bus("t2"));

        e.device_mut().renderer().unwrap().render(128);
        e.update_track_params(&bass);
        assert!(e.has_bus("t2"));

        let r = e.device_mut().renderer().unwrap();
        r.render(128);
        assert!(r.engine().bus_state(BusId(1)).is_some());

        // and it actually sounds
        let kick = crate::synth::voice_for(Instrument::Drums, &Note::new("C3", 0.0, 0.1, 1.0), r.now(), 120.0, BusId(1));
        r.link().send(AudioCommand::PlayVoice(kick));
        r.render(128);
        assert_eq!(r.engine().live_voices(), 1);
        assert_eq!(r.engine().dropped_voices(), 0);
    }

    #[test]
    fn bad_tempos_are_ignored() {
        let e = engine();
        e.set_bpm(90.0);
        e.set_bpm(0.0);
        e.set_bpm(-10.0);
        e.set_bpm(f64::NAN);
        assert_eq!(e.bpm(), 90.0);
    }

    #[test]
    fn play_runs_the_first_tick_synchronously() {
        let mut e = engine();
        e.init().unwrap();
        let track = drum_track(false);
        e.update_track_params(&track);

        let (ticks, on_tick) = recorder();
        e.play(&[track], 0.0, on_tick);
        assert!(e.is_playing());
        // clock at 0: one step fits in the window
        assert_eq!(ticks.lock().unwrap().first(), Some(&0.0625));
        e.stop();
        assert!(!e.is_playing());

        let r = e.device_mut().renderer().unwrap();
        r.render_seconds(0.06);
        assert_eq!(r.engine().live_voices(), 1);
    }

    #[test]
    fn play_while_playing_is_a_no_op() {
        let mut e = engine();
        let (first, on_tick) = recorder();
        e.play(&[], 0.0, on_tick);
        let (second, on_tick) = recorder();
        e.play(&[], 8.0, on_tick);
        assert!(second.lock().unwrap().is_empty());
        assert!(!first.lock().unwrap().is_empty());
        e.stop();
    }

    #[test]
    fn stop_then_play_restarts_from_the_new_bar() {
        let mut e = engine();
        let (first, on_tick) = recorder();
        e.play(&[], 0.0, on_tick);
        e.stop();
        e.stop(); // harmless when already stopped

        let (second, on_tick) = recorder();
        e.play(&[], 16.0, on_tick);
        assert_eq!(second.lock().unwrap().first(), Some(&16.0625));
        e.stop();

        // the first run's loop is gone; nothing more reaches its callback
        let seen = first.lock().unwrap().len();
        std::thread::sleep(std::time::Duration::from_millis(60));
        assert_eq!(first.lock().unwrap().len(), seen);
    }

    #[test]
    fn muted_track_schedules_nothing() {
        let mut e = engine();
        e.init().unwrap();
        let track = drum_track(true);
        e.update_track_params(&track);
        let (_ticks, on_tick) = recorder();
        e.play(&[track], 0.0, on_tick);
        e.stop();
        let r = e.device_mut().renderer().unwrap();
        r.render_seconds(0.1);
        assert_eq!(r.engine().live_voices(), 0);
    }
}
