// ABOUTME: Live console output — streams each agent's fragments to the terminal in its color.
// ABOUTME: Purely presentational; transcript data never depends on what is printed here.

use std::io::{self, Stdout, Write};

use crossterm::queue;
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};

use crate::conversation::DisplayColor;

/// Receives streamed output as it arrives.
pub trait LiveOutput: Send {
    /// A new turn is about to stream.
    fn turn_started(&mut self, agent: &str, color: DisplayColor, round: u32);

    /// One fragment, in arrival order.
    fn fragment(&mut self, text: &str);

    /// The current turn ended, successfully or not.
    fn turn_finished(&mut self);
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullOutput;

impl LiveOutput for NullOutput {
    fn turn_started(&mut self, _agent: &str, _color: DisplayColor, _round: u32) {}
    fn fragment(&mut self, _text: &str) {}
    fn turn_finished(&mut self) {}
}

fn terminal_color(color: DisplayColor) -> Color {
    match color {
        DisplayColor::Red => Color::Red,
        DisplayColor::Green => Color::Green,
        DisplayColor::Yellow => Color::Yellow,
        DisplayColor::Blue => Color::Blue,
        DisplayColor::Magenta => Color::Magenta,
        DisplayColor::Cyan => Color::Cyan,
        DisplayColor::White => Color::White,
    }
}

/// Writes colored, flushed-per-fragment output to a terminal.
pub struct ConsoleOutput<W: Write + Send = Stdout> {
    out: W,
}

impl ConsoleOutput<Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write + Send> ConsoleOutput<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

// Console write failures are ignored: the terminal is feedback only.
impl<W: Write + Send> LiveOutput for ConsoleOutput<W> {
    fn turn_started(&mut self, agent: &str, color: DisplayColor, round: u32) {
        let color = terminal_color(color);
        let _ = queue!(
            self.out,
            Print("\n"),
            SetForegroundColor(color),
            SetAttribute(Attribute::Bold),
            Print(format!("[round {round}] {agent}")),
            SetAttribute(Attribute::Reset),
            SetForegroundColor(color),
            Print("\n"),
        );
        let _ = self.out.flush();
    }

    fn fragment(&mut self, text: &str) {
        let _ = queue!(self.out, Print(text));
        let _ = self.out.flush();
    }

    fn turn_finished(&mut self) {
        let _ = queue!(self.out, ResetColor, Print("\n"));
        let _ = self.out.flush();
    }
}
