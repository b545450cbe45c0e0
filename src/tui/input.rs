use std::time::Duration;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crate::shared::InputEvent;

const VOLUME_STEP: f32 = 0.05;
const PAN_STEP: f32 = 0.1;
const BPM_STEP: f64 = 1.0;

// poll for a key press and map it straight to input events; no held state,
// every binding is a single press
pub fn poll_input(timeout: Duration) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(vec![]);
        }
        return Ok(handle_key(key.code).into_iter().collect());
    }
    Ok(vec![])
}

fn handle_key(code: KeyCode) -> Option<InputEvent> {
    let event = match code {
        KeyCode::Esc => InputEvent::Quit,
        KeyCode::Char(' ') => InputEvent::PlayPress,

        // track select, 1-based on the keyboard
        KeyCode::Char(c @ '1'..='9') => InputEvent::SelectTrack(c as u8 - b'1'),

        KeyCode::Char('m') => InputEvent::ToggleMute,
        KeyCode::Char('s') => InputEvent::ToggleSolo,
        KeyCode::Char('g') => InputEvent::GenerateClip,

        // knobs
        KeyCode::Char('[') => InputEvent::NudgeVolume(-VOLUME_STEP),
        KeyCode::Char(']') => InputEvent::NudgeVolume(VOLUME_STEP),
        KeyCode::Char('-') => InputEvent::NudgePan(-PAN_STEP),
        KeyCode::Char('=') => InputEvent::NudgePan(PAN_STEP),
        KeyCode::Char(',') => InputEvent::NudgeBpm(-BPM_STEP),
        KeyCode::Char('.') => InputEvent::NudgeBpm(BPM_STEP),

        _ => return None,
    };
    Some(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_select_zero_based_tracks() {
        assert_eq!(handle_key(KeyCode::Char('1')), Some(InputEvent::SelectTrack(0)));
        assert_eq!(handle_key(KeyCode::Char('4')), Some(InputEvent::SelectTrack(3)));
        assert_eq!(handle_key(KeyCode::Char('0')), None);
    }

    #[test]
    fn knobs_come_in_pairs() {
        assert_eq!(handle_key(KeyCode::Char('[')), Some(InputEvent::NudgeVolume(-0.05)));
        assert_eq!(handle_key(KeyCode::Char('=')), Some(InputEvent::NudgePan(0.1)));
        assert_eq!(handle_key(KeyCode::Char(',')), Some(InputEvent::NudgeBpm(-1.0)));
    }

    #[test]
    fn transport_and_quit() {
        assert_eq!(handle_key(KeyCode::Char(' ')), Some(InputEvent::PlayPress));
        assert_eq!(handle_key(KeyCode::Esc), Some(InputEvent::Quit));
        assert_eq!(handle_key(KeyCode::Enter), None);
    }
}
