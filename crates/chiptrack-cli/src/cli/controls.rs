//! Transport commands typed on stdin while tracks play.

use std::io::BufRead;
use std::sync::Arc;
use std::thread;

use anyhow::Result;
use chiptrack_core::player::{PlaybackController, PlayerStatus};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Pause,
    Stop,
    Loop,
    Skip,
    Status,
    Quit,
}

impl Control {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "pause" | "p" => Some(Control::Pause),
            "stop" => Some(Control::Stop),
            "loop" | "l" => Some(Control::Loop),
            "skip" | "s" => Some(Control::Skip),
            "status" => Some(Control::Status),
            "quit" | "q" | "exit" => Some(Control::Quit),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Control::Pause => "pause",
            Control::Stop => "stop",
            Control::Loop => "loop",
            Control::Skip => "skip",
            Control::Status => "status",
            Control::Quit => "quit",
        }
    }
}

/// Reads commands from stdin on a dedicated thread until EOF or `quit`.
/// `quit` sets the watch value to `true`.
pub fn spawn_stdin_reader(
    player: Arc<PlaybackController>,
    quit_tx: watch::Sender<bool>,
) -> Result<()> {
    thread::Builder::new()
        .name("chiptrack-controls".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let Some(control) = Control::parse(&line) else {
                    eprintln!(
                        "unknown command: {} (pause, stop, loop, skip, status, quit)",
                        line.trim()
                    );
                    continue;
                };
                if let Err(err) = apply(&player, control) {
                    eprintln!(
                        "an error occurred while running the {} command: {:#}",
                        control.name(),
                        err
                    );
                }
                if control == Control::Quit {
                    let _ = quit_tx.send(true);
                    break;
                }
            }
        })?;
    Ok(())
}

fn apply(player: &PlaybackController, control: Control) -> Result<()> {
    tracing::debug!(command = control.name(), "control");
    match control {
        Control::Pause => player.pause(),
        Control::Stop => player.stop()?,
        Control::Loop => player.toggle_loop(),
        Control::Skip => player.skip()?,
        Control::Status => println!("{}", format_status(&player.status())),
        Control::Quit => {}
    }
    Ok(())
}

pub fn format_status(status: &PlayerStatus) -> String {
    let secs = |d: Option<std::time::Duration>| d.map(|d| d.as_secs()).unwrap_or(0);
    let (pos, len) = (secs(status.position), secs(status.length));
    format!(
        "{:?}{} {}:{:02} / {}:{:02} {} {}",
        status.state,
        if status.looping { " (loop)" } else { "" },
        pos / 60,
        pos % 60,
        len / 60,
        len % 60,
        status.title.as_deref().unwrap_or("-"),
        status.artist.as_deref().map(|a| format!("by {a}")).unwrap_or_default(),
    )
    .trim_end()
    .to_string()
}
