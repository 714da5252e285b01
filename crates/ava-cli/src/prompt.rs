//! Reading answers from the terminal.

use std::io::{IsTerminal, Write};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;

/// What a key press does to a hidden entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Continue,
    Submit,
    Abort,
}

/// Apply one key press to `buf`.
pub fn apply_key(buf: &mut String, key: KeyEvent) -> KeyOutcome {
    if key.kind == KeyEventKind::Release {
        return KeyOutcome::Continue;
    }
    match key.code {
        KeyCode::Enter => KeyOutcome::Submit,
        KeyCode::Esc => KeyOutcome::Abort,
        KeyCode::Char('c' | 'd') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            KeyOutcome::Abort
        }
        KeyCode::Char(c) => {
            buf.push(c);
            KeyOutcome::Continue
        }
        KeyCode::Backspace => {
            buf.pop();
            KeyOutcome::Continue
        }
        _ => KeyOutcome::Continue,
    }
}

/// Leaves raw mode when dropped, including on early return.
struct RawMode;

impl RawMode {
    fn enable() -> std::io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn read_hidden() -> eyre::Result<String> {
    let mut buf = String::new();
    let outcome = {
        let _raw = RawMode::enable()?;
        loop {
            if let Event::Key(key) = event::read()? {
                match apply_key(&mut buf, key) {
                    KeyOutcome::Continue => {}
                    done => break done,
                }
            }
        }
    };
    eprintln!();
    match outcome {
        KeyOutcome::Abort => Err(eyre::eyre!("input cancelled")),
        _ => Ok(buf),
    }
}

fn read_line() -> eyre::Result<String> {
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Ask for a value. With `hidden`, typed characters are not echoed when
/// stdin is a terminal.
pub async fn ask(label: &'static str, hidden: bool) -> eyre::Result<String> {
    tokio::task::spawn_blocking(move || -> eyre::Result<String> {
        eprint!("{label}: ");
        std::io::stderr().flush()?;
        if hidden && std::io::stdin().is_terminal() {
            read_hidden()
        } else {
            read_line().map(|s| s.trim().to_string())
        }
    })
    .await?
}
