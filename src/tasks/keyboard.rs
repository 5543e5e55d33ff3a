//! Single-key control from the controlling terminal.

use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::events::ControlMessage;

/// How often the blocking reader checks for cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Escape or Ctrl-C quits, space toggles pause, `s` goes back and any
/// other key skips to the next picture. Releases and repeats are ignored.
pub fn key_to_message(key: &KeyEvent) -> Option<ControlMessage> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    let msg = match key.code {
        KeyCode::Esc => ControlMessage::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            ControlMessage::Quit
        }
        KeyCode::Char(' ') => ControlMessage::Paused(None),
        KeyCode::Char('s') => ControlMessage::Back,
        _ => ControlMessage::Next,
    };
    Some(msg)
}

pub async fn run(control: Sender<ControlMessage>, cancel: CancellationToken) -> Result<()> {
    info!("keyboard control enabled");
    tokio::task::spawn_blocking(move || read_keys(&control, &cancel))
        .await
        .context("keyboard reader panicked")?
}

fn read_keys(control: &Sender<ControlMessage>, cancel: &CancellationToken) -> Result<()> {
    enable_raw_mode().context("failed to put terminal into raw mode")?;
    let result = forward_keys(control, cancel);
    if let Err(err) = disable_raw_mode() {
        warn!("failed to restore terminal mode: {err}");
    }
    result
}

fn forward_keys(control: &Sender<ControlMessage>, cancel: &CancellationToken) -> Result<()> {
    while !cancel.is_cancelled() {
        if event::poll(POLL_INTERVAL)?
            && let Event::Key(key) = event::read()?
            && let Some(msg) = key_to_message(&key)
        {
            debug!(?msg, "key pressed");
            let quit = msg == ControlMessage::Quit;
            if control.blocking_send(msg).is_err() || quit {
                break;
            }
        }
    }
    Ok(())
}
