//! Asking the user for the short code the remote tool displays.

use std::io::{BufRead, Write};

/// Source of the short code shown by the remote tool during authorisation.
pub trait ShortCodePrompt {
    /// Returns the code the user entered, or `None` when they declined.
    fn short_code(&mut self) -> Option<String>;
}

/// Declines every request. Used when nobody can answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclinePrompt;

impl ShortCodePrompt for DeclinePrompt {
    fn short_code(&mut self) -> Option<String> {
        None
    }
}

/// Reads the code as one line from `input` after writing a prompt to `output`.
pub struct ReaderPrompt<R, W> {
    input: R,
    output: W,
}

impl<R, W> ReaderPrompt<R, W> {
    /// Prompts on `output` and reads from `input`.
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> ShortCodePrompt for ReaderPrompt<R, W> {
    fn short_code(&mut self) -> Option<String> {
        write!(self.output, "Enter the short code shown by COLT: ").ok()?;
        self.output.flush().ok()?;
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                let code = line.trim();
                (!code.is_empty()).then(|| code.to_owned())
            }
        }
    }
}
