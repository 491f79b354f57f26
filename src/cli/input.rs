//! Keystroke input handling using crossterm
//!
//! Features:
//! - Non-blocking keystroke polling
//! - Esc / Ctrl+C stop, `r` restart
//! - Background reader forwarding commands to the session

use crate::session::SessionCommand;
use crossterm::event::{self, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::io::Result as IoResult;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Handles user input from terminal
pub struct InputHandler {
    /// Timeout for poll operations
    poll_timeout: Duration,
}

impl InputHandler {
    /// Create new input handler with default timeout (50ms for responsive input)
    pub fn new() -> Self {
        InputHandler {
            poll_timeout: Duration::from_millis(50),
        }
    }

    /// Poll for keystroke with timeout (non-blocking)
    /// Returns Some(KeyEvent) if key pressed, None if timeout
    pub fn read_key(&self) -> IoResult<Option<KeyEvent>> {
        if event::poll(self.poll_timeout)? {
            match event::read()? {
                event::Event::Key(key_event) if key_event.kind != KeyEventKind::Release => {
                    Ok(Some(key_event))
                }
                _ => Ok(None),
            }
        } else {
            Ok(None)
        }
    }

    /// Map a key to a session command
    pub fn command_for(key: &KeyEvent) -> Option<SessionCommand> {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(SessionCommand::Stop)
            }
            KeyCode::Esc | KeyCode::Char('q') => Some(SessionCommand::Stop),
            KeyCode::Char('r') | KeyCode::Char('R') => Some(SessionCommand::Restart),
            _ => None,
        }
    }

    /// Read keys on a blocking thread until stop or the session goes away
    pub fn spawn(self, commands: mpsc::Sender<SessionCommand>) -> JoinHandle<()> {
        tokio::task::spawn_blocking(move || {
            while !commands.is_closed() {
                let key = match self.read_key() {
                    Ok(Some(key)) => key,
                    Ok(None) => continue,
                    Err(e) => {
                        debug!("Key reader stopped: {}", e);
                        break;
                    }
                };
                if let Some(cmd) = Self::command_for(&key) {
                    if commands.blocking_send(cmd).is_err() || cmd == SessionCommand::Stop {
                        break;
                    }
                }
            }
        })
    }
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new()
    }
}
