// Which notes start at a given bar. Pure: same inputs, same output, same order
// (track order, then clip order, then note order).

use crate::shared::NOTE_EPSILON_BARS;

use super::project::{Instrument, Note, Track};

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedNote {
    pub track_id: String,
    pub instrument: Instrument,
    pub note: Note,
}

// Mute always silences a track; if anything is soloed, only soloed tracks play.
pub fn is_audible(track: &Track, any_soloed: bool) -> bool {
    !track.muted && (!any_soloed || track.soloed)
}

pub fn resolve(bar: f64, tracks: &[Track]) -> Vec<ResolvedNote> {
    let any_soloed = tracks.iter().any(|t| t.soloed);
    let mut out = Vec::new();

    for track in tracks.iter().filter(|t| is_audible(t, any_soloed)) {
        for clip in track.clips.iter().filter(|c| c.contains(bar)) {
            let Some(notes) = &clip.notes else {
                continue; // placeholder region
            };
            let relative = bar - clip.start_bar;
            for note in notes {
                // the cursor accumulates 1/16 steps, so compare loosely
                if (note.start_bar - relative).abs() < NOTE_EPSILON_BARS {
                    out.push(ResolvedNote {
                        track_id: track.id.clone(),
                        instrument: track.instrument,
                        note: note.clone(),
                    });
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::project::Clip;
    use crate::shared::STEP_BARS;

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

    fn clip_with(start_bar: f64, notes: Vec<Note>) -> Clip {
        Clip {
            id: "c".into(),
            name: String::new(),
            start_bar,
            duration_bars: 4.0,
            notes: Some(notes),
        }
    }

    #[test]
    fn drum_hit_on_the_downbeat_only() {
        let tracks = vec![drum_track(false)];
        let hits = resolve(0.0, &tracks);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].track_id, "t1");
        assert_eq!(hits[0].instrument, Instrument::Drums);
        assert_eq!(hits[0].note.pitch, "C3");
        assert!(resolve(STEP_BARS, &tracks).is_empty());
    }

    #[test]
    fn muted_track_is_silent_everywhere() {
        let tracks = vec![drum_track(true)];
        for step in 0..(16 * 8) {
            assert!(resolve(step as f64 * STEP_BARS, &tracks).is_empty());
        }
    }

    #[test]
    fn offset_note_fires_within_epsilon_only() {
        let mut t = Track::new("t2", "Bass", Instrument::Bass);
        t.clips = vec![clip_with(2.0, vec![Note::new("E2", 0.25, 0.25, 0.9)])];
        let tracks = vec![t];

        assert_eq!(resolve(2.25, &tracks).len(), 1);
        assert_eq!(resolve(2.259, &tracks).len(), 1);
        assert_eq!(resolve(2.241, &tracks).len(), 1);
        assert!(resolve(2.2, &tracks).is_empty());
        assert!(resolve(2.3125, &tracks).is_empty());
        // same relative offset, but in bar 0 the clip hasn't started
        assert!(resolve(0.25, &tracks).is_empty());
    }

    #[test]
    fn accumulated_steps_still_hit() {
        let mut t = Track::new("t3", "Lead", Instrument::Synth);
        t.clips = vec![clip_with(2.0, vec![Note::new("A4", 0.25, 0.25, 1.0)])];
        let tracks = vec![t];

        let mut bar = 0.0;
        let mut fired_at = Vec::new();
        for _ in 0..(16 * 6) {
            if !resolve(bar, &tracks).is_empty() {
                fired_at.push(bar);
            }
            bar += STEP_BARS;
        }
        assert_eq!(fired_at.len(), 1);
        assert!((fired_at[0] - 2.25).abs() < NOTE_EPSILON_BARS);
    }

    #[test]
    fn placeholder_clips_contribute_nothing() {
        let mut t = Track::new("t1", "Drums", Instrument::Drums);
        t.clips = vec![Clip::placeholder("c1", "Kick Loop", 0.0, 4.0)];
        assert!(resolve(0.0, &[t]).is_empty());
    }

    #[test]
    fn clip_end_is_exclusive() {
        let mut t = Track::new("t1", "Drums", Instrument::Drums);
        // a note sitting exactly on the clip's end never fires
        t.clips = vec![clip_with(0.0, vec![Note::new("C3", 4.0, 0.1, 1.0)])];
        assert!(resolve(4.0, &[t]).is_empty());
    }

    #[test]
    fn solo_silences_the_others_but_mute_wins() {
        let mut a = drum_track(false);
        a.id = "a".into();
        let mut b = drum_track(false);
        b.id = "b".into();
        b.soloed = true;
        let out = resolve(0.0, &[a.clone(), b.clone()]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].track_id, "b");

        b.muted = true;
        assert!(resolve(0.0, &[a, b]).is_empty());
    }

    #[test]
    fn deterministic_and_ordered() {
        let mut t1 = drum_track(false);
        t1.clips[0].notes = Some(vec![
            Note::new("C3", 0.0, 0.1, 1.0),
            Note::new("F#3", 0.0, 0.05, 0.4),
        ]);
        let mut t2 = Track::new("t2", "Bass", Instrument::Bass);
        t2.clips = vec![clip_with(0.0, vec![Note::new("C2", 0.0, 1.0, 0.8)])];
        let tracks = vec![t1, t2];

        let first = resolve(0.0, &tracks);
        let second = resolve(0.0, &tracks);
        assert_eq!(first, second);
        let order: Vec<(&str, &str)> = first
            .iter()
            .map(|r| (r.track_id.as_str(), r.note.pitch.as_str()))
            .collect();
        assert_eq!(order, [("t1", "C3"), ("t1", "F#3"), ("t2", "C2")]);
    }
}
