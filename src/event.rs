//! Event model for the terminal stream interpreter
//!
//! The interpreter turns an open-ended byte stream into a flat sequence of
//! events. Display-level effects (text, cursor motion, erasure, color) are
//! [`TerminalEvent`]s; shell-level boundaries reported by the cooperating
//! shell profile (prompt spans, command output start/stop) are
//! [`SessionEvent`]s.

use crate::color::Color;

/// A display-level effect decoded from the terminal byte stream.
///
/// This is a closed set: every control sequence the interpreter understands
/// maps to one of these, and everything else is logged and dropped before it
/// can reach a renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalEvent {
    /// Plain text to write at the cursor.
    Text(String),
    /// Move the cursor up `n` rows, keeping the column.
    CursorUp(usize),
    /// Move the cursor down `n` rows, keeping the column.
    CursorDown(usize),
    /// Move the cursor left `n` positions, clamped at the home watermark.
    CursorLeft(usize),
    /// Move the cursor right `n` positions, clamped at the buffer end.
    CursorRight(usize),
    /// Absolute move to (row, col), 0-based, relative to the home row.
    CursorMoveTo(usize, usize),
    /// Carriage return: move to the start of the current line. The count
    /// records the length of the CR run it was decoded from.
    CursorReturn(usize),
    /// Line feed (also emitted for a CR run terminated by LF).
    LineFeed,
    /// Erase from the cursor to the end of the line.
    ClearToEndOfLine,
    /// Erase from the start of the line to the cursor.
    ClearToStartOfLine,
    /// Erase the whole line the cursor is on.
    ClearLine,
    /// Insert `n` blank characters at the cursor, shifting the rest of the
    /// line right.
    Insert(usize),
    /// Delete `n` characters at the cursor, shifting the rest of the line
    /// left.
    Delete(usize),
    /// Change the active rendition to (foreground, background).
    Rendition(Color, Color),
}

/// A shell-level boundary reported by the injected shell profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The primary prompt is about to be (re)displayed.
    Prompt1Starts,
    /// The primary prompt has been displayed; command input follows.
    Prompt1Stops,
    /// A continuation prompt begins (multi-line command input).
    Prompt2Starts,
    /// The continuation prompt has been displayed; input continues.
    Prompt2Stops,
    /// The shell is about to run the entered command; output follows.
    OutputStarts,
    /// The command finished. `status` is the shell's `$?`, `cwd` the working
    /// directory after the command ran.
    OutputStops { status: String, cwd: String },
}

/// A single item in the interpreter's output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Terminal(TerminalEvent),
    Session(SessionEvent),
}

impl From<TerminalEvent> for Event {
    fn from(ev: TerminalEvent) -> Self {
        Event::Terminal(ev)
    }
}

impl From<SessionEvent> for Event {
    fn from(ev: SessionEvent) -> Self {
        Event::Session(ev)
    }
}
