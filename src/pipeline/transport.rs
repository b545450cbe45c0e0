// Look-ahead transport scheduler.
//
// A coarse timer wakes up every `lookahead_interval` and commits every grid
// step that will start before `now + schedule_ahead` on the audio clock.
// Timer jitter is absorbed by the window; the audio clock decides when
// things actually sound.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender};

use crate::audio::RenderLink;
use crate::audio_api::{AudioCommand, BusId};
use crate::shared::{STEP_BARS, seconds_per_bar};
use crate::synth::voice_for;

use super::project::Track;
use super::resolver::resolve;

// Track id → its live bus on the render side.
pub type BusTable = Arc<RwLock<HashMap<String, BusId>>>;

// The arrangement the scheduler reads each step.
pub type SharedTracks = Arc<RwLock<Vec<Track>>>;

// Tempo shared between the host and the scheduler thread; a write lands on
// the scheduler's next tick.
#[derive(Clone, Debug)]
pub struct SharedBpm(Arc<AtomicU64>);

impl SharedBpm {
    pub fn new(bpm: f64) -> Self {
        Self(Arc::new(AtomicU64::new(bpm.to_bits())))
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, bpm: f64) {
        self.0.store(bpm.to_bits(), Ordering::Relaxed);
    }
}

// Where scheduling stands: the audio time of the next uncommitted sixteenth
// and the bar it belongs to. Both only ever move forward.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduleCursor {
    pub next_event_time: f64,
    pub cursor_bar: f64,
}

impl ScheduleCursor {
    pub fn new(start_time: f64, start_bar: f64) -> Self {
        Self { next_event_time: start_time, cursor_bar: start_bar }
    }

    // One timer tick: commit every step starting before `now + ahead`.
    //
    // `dispatch(bar, time)` gets each step's bar and audio time, then
    // `on_tick(bar)` gets the advanced cursor. Returns the number of steps.
    pub fn fill(
        &mut self,
        now: f64,
        ahead: f64,
        bpm: f64,
        mut dispatch: impl FnMut(f64, f64),
        mut on_tick: impl FnMut(f64),
    ) -> usize {
        let step_seconds = seconds_per_bar(bpm) / 16.0;
        let mut steps = 0;

        if self.next_event_time < now {
            log::warn!(
                "scheduler fell behind: step at {:.3}s committed at {:.3}s",
                self.next_event_time,
                now
            );
        }

        while self.next_event_time < now + ahead {
            dispatch(self.cursor_bar, self.next_event_time);
            self.next_event_time += step_seconds;
            self.cursor_bar += STEP_BARS;
            on_tick(self.cursor_bar);
            steps += 1;
        }
        steps
    }
}

// Everything one playback run needs, owned by the scheduler thread.
pub struct Transport {
    pub cursor: ScheduleCursor,
    link: RenderLink,
    tracks: SharedTracks,
    buses: BusTable,
    bpm: SharedBpm,
    schedule_ahead: f64,
    on_tick: Box<dyn FnMut(f64) + Send>,
}

impl Transport {
    pub fn new(
        cursor: ScheduleCursor,
        link: RenderLink,
        tracks: SharedTracks,
        buses: BusTable,
        bpm: SharedBpm,
        schedule_ahead: f64,
        on_tick: Box<dyn FnMut(f64) + Send>,
    ) -> Self {
        Self { cursor, link, tracks, buses, bpm, schedule_ahead, on_tick }
    }

    pub fn tick(&mut self) -> usize {
        let Transport { cursor, link, tracks, buses, bpm, schedule_ahead, on_tick } = self;
        let bpm = bpm.get();
        let now = link.now();

        cursor.fill(
            now,
            *schedule_ahead,
            bpm,
            |bar, time| dispatch_step(bar, time, bpm, tracks, buses, link),
            |bar| on_tick(bar),
        )
    }
}

fn dispatch_step(bar: f64, time: f64, bpm: f64, tracks: &SharedTracks, buses: &BusTable, link: &RenderLink) {
    let tracks = tracks.read().unwrap_or_else(PoisonError::into_inner);
    let hits = resolve(bar, &tracks);
    if hits.is_empty() {
        return;
    }

    let buses = buses.read().unwrap_or_else(PoisonError::into_inner);
    for hit in hits {
        let Some(&bus) = buses.get(&hit.track_id) else {
            log::debug!("track {} has no bus yet, skipping {}", hit.track_id, hit.note.pitch);
            continue;
        };
        if !link.send(AudioCommand::PlayVoice(voice_for(hit.instrument, &hit.note, time, bpm, bus))) {
            log::warn!("command queue full, dropped {} on track {}", hit.note.pitch, hit.track_id);
        }
    }
}

// A running scheduler thread. The cancellation token is a channel: sending
// on it, or dropping it, ends the loop at its next wait.
pub struct SchedulerHandle {
    cancel: Sender<()>,
    thread: JoinHandle<()>,
}

impl SchedulerHandle {
    // Start the timer loop. The caller runs the first tick itself.
    pub fn spawn(mut transport: Transport, interval: Duration) -> std::io::Result<Self> {
        let (cancel, cancelled) = crossbeam_channel::bounded::<()>(1);
        let thread = thread::Builder::new()
            .name("soundweave-scheduler".into())
            .spawn(move || loop {
                match cancelled.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        transport.tick();
                    }
                    // stop requested, or the handle is gone
                    _ => break,
                }
            })?;
        Ok(Self { cancel, thread })
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    // Signal the loop and wait for it, unless we *are* the loop.
    pub fn stop(self) {
        let _ = self.cancel.try_send(());
        if thread::current().id() == self.thread.thread().id() {
            return;
        }
        if self.thread.join().is_err() {
            log::error!("scheduler thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::OfflineRenderer;
    use crate::config::EngineConfig;
    use crate::pipeline::project::{Clip, Instrument, Note};
    use std::sync::Mutex;

    #[test]
    fn fills_exactly_the_window() {
        // 120 bpm: a sixteenth is 0.125 s
        let mut cursor = ScheduleCursor::new(0.05, 0.0);
        let mut dispatched = Vec::new();
        let mut ticks = Vec::new();
        let steps = cursor.fill(0.0, 0.1, 120.0, |b, t| dispatched.push((b, t)), |b| ticks.push(b));
        assert_eq!(steps, 1);
        assert_eq!(dispatched, [(0.0, 0.05)]);
        assert_eq!(ticks, [0.0625]);
        assert!((cursor.next_event_time - 0.175).abs() < 1e-12);

        // nothing new until the clock catches up
        assert_eq!(cursor.fill(0.07, 0.1, 120.0, |_, _| {}, |_| {}), 0);
        assert_eq!(cursor.fill(0.08, 0.1, 120.0, |_, _| {}, |_| {}), 1);
    }

    #[test]
    fn catches_up_after_a_stall() {
        let mut cursor = ScheduleCursor::new(0.0, 4.0);
        let mut bars = Vec::new();
        // a whole second passed without a tick: every missed step goes out
        let steps = cursor.fill(1.0, 0.1, 120.0, |b, _| bars.push(b), |_| {});
        assert_eq!(steps, 9);
        assert_eq!(bars.first(), Some(&4.0));
        assert_eq!(bars.last(), Some(&4.5));
    }

    #[test]
    fn bar_and_time_stay_in_lockstep() {
        let mut cursor = ScheduleCursor::new(0.0, 0.0);
        for i in 0..200 {
            cursor.fill(i as f64 * 0.025, 0.1, 90.0, |_, _| {}, |_| {});
        }
        let expected_time = cursor.cursor_bar * seconds_per_bar(90.0);
        assert!((cursor.next_event_time - expected_time).abs() < 1e-9);
    }

    #[test]
    fn tempo_change_takes_effect_next_fill() {
        let mut cursor = ScheduleCursor::new(0.0, 0.0);
        cursor.fill(0.0, 0.1, 120.0, |_, _| {}, |_| {});
        assert_eq!(cursor.next_event_time, 0.125);
        cursor.fill(0.1, 0.1, 60.0, |_, _| {}, |_| {});
        assert_eq!(cursor.next_event_time, 0.375);
    }

    fn kick_track() -> Track {
        let mut t = Track::new("t1", "Drums", Instrument::Drums);
        t.clips = vec![Clip {
            id: "c1".into(),
            name: String::new(),
            start_bar: 0.0,
            duration_bars: 4.0,
            notes: Some(vec![Note::new("C3", 0.0, 0.1, 1.0), Note::new("C3", 1.0, 0.1, 1.0)]),
        }];
        t
    }

    fn transport(
        renderer: &OfflineRenderer,
        tracks: Vec<Track>,
        buses: HashMap<String, BusId>,
        ticks: Arc<Mutex<Vec<f64>>>,
    ) -> Transport {
        let link = renderer.link();
        let start = link.now() + 0.05;
        Transport::new(
            ScheduleCursor::new(start, 0.0),
            link,
            Arc::new(RwLock::new(tracks)),
            Arc::new(RwLock::new(buses)),
            SharedBpm::new(120.0),
            0.1,
            Box::new(move |bar| ticks.lock().unwrap().push(bar)),
        )
    }

    #[test]
    fn transport_sends_voices_to_known_buses() {
        let mut renderer = OfflineRenderer::new(&EngineConfig::default());
        renderer.link().send(AudioCommand::CreateBus { bus: BusId(0) });
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let buses = HashMap::from([("t1".to_string(), BusId(0))]);
        let mut t = transport(&renderer, vec![kick_track()], buses, ticks.clone());

        assert_eq!(t.tick(), 1);
        renderer.render_seconds(0.01);
        assert_eq!(renderer.engine().live_voices(), 1);
        assert_eq!(*ticks.lock().unwrap(), [0.0625]);
    }

    #[test]
    fn tracks_without_a_bus_are_skipped() {
        let mut renderer = OfflineRenderer::new(&EngineConfig::default());
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let mut t = transport(&renderer, vec![kick_track()], HashMap::new(), ticks.clone());

        assert_eq!(t.tick(), 1);
        renderer.render_seconds(0.01);
        assert_eq!(renderer.engine().live_voices(), 0);
        assert_eq!(renderer.engine().dropped_voices(), 0);
        // position still reported
        assert_eq!(ticks.lock().unwrap().len(), 1);
    }

    #[test]
    fn spawned_loop_stops_on_request() {
        let renderer = OfflineRenderer::new(&EngineConfig::default());
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let t = transport(&renderer, vec![], HashMap::new(), ticks);
        let handle = SchedulerHandle::spawn(t, Duration::from_millis(5)).unwrap();
        assert!(!handle.is_finished());
        handle.stop(); // joins; would hang if the token were ignored
    }
}
