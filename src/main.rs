use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;
use crossterm::terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use soundweave::middle::Middle;
use soundweave::pipeline::generate::{Composer, FallbackComposer, PromptComposer};
use soundweave::pipeline::project::default_tracks;
use soundweave::shared::InputEvent;
use soundweave::{AudioEngine, CpalDevice, EngineConfig, ProjectState, tui};

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let mut project = ProjectState::default();
    if let Some(arg) = std::env::args().nth(1) {
        let bpm: f64 = arg.parse()
            .map_err(|_| anyhow::anyhow!("bpm must be a number, got {arg:?}"))?;
        anyhow::ensure!(bpm.is_finite() && bpm > 0.0, "bpm must be positive, got {bpm}");
        project.bpm = bpm;
    }

    let engine = AudioEngine::new(CpalDevice::default(), EngineConfig::default());
    let mut middle = Middle::new(engine, composer(), default_tracks(), project);

    terminal::enable_raw_mode()?;
    let _guard = RawModeGuard; // auto drops when out of scope

    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let tick_rate = Duration::from_millis(16); // ~60fps

    loop {
        middle.tick();
        let ds = middle.display_state();
        term.draw(|frame| {
            tui::view::render(frame, frame.area(), &ds);
        })?;

        for event in tui::input::poll_input(tick_rate)? {
            let quit = event == InputEvent::Quit;
            middle.handle_input(event);
            if quit {
                term.clear()?;
                return Ok(());
            }
        }
    }
}

// SOUNDWEAVE_COMPOSER names a command that reads a prompt on stdin and
// answers on stdout; without it every generation gets the fallback beat
fn composer() -> Arc<dyn Composer> {
    match std::env::var("SOUNDWEAVE_COMPOSER") {
        Ok(cmd) if !cmd.trim().is_empty() => {
            log::info!("composing with `{cmd}`");
            Arc::new(PromptComposer::new(move |system: &str, message: &str| {
                ask_command(&cmd, system, message)
            }))
        }
        _ => Arc::new(FallbackComposer),
    }
}

fn ask_command(cmd: &str, system: &str, message: &str) -> Option<String> {
    let mut parts = cmd.split_whitespace();
    let program = parts.next()?;
    let mut child = Command::new(program)
        .args(parts)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .inspect_err(|e| log::warn!("composer `{program}` failed to start: {e}"))
        .ok()?;

    if let Some(mut stdin) = child.stdin.take() {
        let _ = write!(stdin, "{system}\n\n{message}");
    } // stdin closes here so the command sees EOF

    let output = child.wait_with_output().ok()?;
    if !output.status.success() {
        log::warn!("composer `{program}` exited with {}", output.status);
        return None;
    }
    String::from_utf8(output.stdout).ok()
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
