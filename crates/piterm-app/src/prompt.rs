//! Interactive input from the real terminal.

use std::io::{self, BufRead, Write};

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, read};
use crossterm::terminal;

use piterm_terminal::Prompter;
use piterm_types::{PitermError, Result};

/// Prompter backed by stdin/stdout.
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn prompt(&mut self, label: &str) -> Result<String> {
        print!("{label}");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn prompt_secret(&mut self, label: &str) -> Result<String> {
        print!("{label}");
        io::stdout().flush()?;

        terminal::enable_raw_mode()?;
        let result = read_hidden();
        let _ = terminal::disable_raw_mode();
        println!();
        result
    }
}

/// Collect keystrokes without echoing until Enter.
fn read_hidden() -> Result<String> {
    let mut entered = String::new();
    loop {
        if let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = read()?
        {
            match code {
                KeyCode::Enter => return Ok(entered),
                KeyCode::Backspace => {
                    entered.pop();
                },
                KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                    return Err(PitermError::Command("login cancelled".to_string()));
                },
                KeyCode::Char(c) => entered.push(c),
                _ => {},
            }
        }
    }
}
