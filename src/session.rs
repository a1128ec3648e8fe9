//! Live shell session
//!
//! Ties the pieces together: pulls raw bytes from the shell, runs them
//! through the interpreter, applies display events to the host's buffer,
//! and follows the prompt cycle to track entered commands, exit status,
//! working directory, and elapsed time.

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::event::{Event, SessionEvent, TerminalEvent};
use crate::history::{CommandSpan, HistoryIndex};
use crate::interpreter::Interpreter;
use crate::label;
use crate::screen::Screen;
use crate::shell::{PtyShell, ShellProcess};
use crate::surface::BufferSurface;

/// Upper bound on chunks consumed per [`Session::pump`] call, so a
/// fire-hose of output cannot starve the host's event loop.
const MAX_CHUNKS_PER_PUMP: usize = 16;

/// What a [`Session::pump`] call accomplished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpStatus {
    /// Output was applied; the host should redraw and pump again soon.
    Dirty,
    /// No output was waiting.
    Idle,
    /// The shell has exited; no more output will ever arrive.
    Disconnected,
}

/// Where we are in the prompt cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Waiting for the first prompt.
    Startup,
    /// A prompt is showing; echoed keystrokes are command input.
    Input,
    /// A command is running; bytes are its output.
    Output,
}

pub struct Session {
    shell: Box<dyn ShellProcess>,
    interpreter: Interpreter,
    screen: Screen,
    history: HistoryIndex,
    phase: Phase,
    /// Start of the input region currently being typed, if any.
    input_begin: Option<usize>,
    /// Completed regions of the command being entered (one per line for
    /// multi-line commands).
    input_regions: Vec<(usize, usize)>,
    /// Echoed text of the command being entered, for the tab label.
    input_text: String,
    /// Span of the command whose output is streaming, filed into history
    /// when the command completes.
    pending_command: Option<CommandSpan>,
    command_words: Vec<String>,
    command_started: Option<Instant>,
    cwd: String,
    last_status: Option<String>,
    last_elapsed: Option<String>,
    disconnected: bool,
}

impl Session {
    /// Wrap an already-running shell. The screen starts at `origin`,
    /// usually the end of the host buffer.
    pub fn new(shell: Box<dyn ShellProcess>, cwd: String, origin: usize) -> Self {
        Self {
            shell,
            interpreter: Interpreter::new(),
            screen: Screen::at(origin),
            history: HistoryIndex::new(),
            phase: Phase::Startup,
            input_begin: None,
            input_regions: Vec::new(),
            input_text: String::new(),
            pending_command: None,
            command_words: Vec::new(),
            command_started: None,
            cwd,
            last_status: None,
            last_elapsed: None,
            disconnected: false,
        }
    }

    /// Spawn bash in `cwd` and wrap it in a session.
    pub fn spawn(cwd: &Path, origin: usize) -> anyhow::Result<Self> {
        let shell = PtyShell::spawn(cwd)?;
        let cwd = cwd.to_string_lossy().into_owned();
        Ok(Self::new(Box::new(shell), cwd, origin))
    }

    /// Forward `text` to the shell's input. Returns false once the shell
    /// is gone.
    pub fn send(&mut self, text: &str) -> bool {
        !self.disconnected && self.shell.send(text)
    }

    /// Consume pending shell output and apply it to `surface`. Processes
    /// at most a bounded number of chunks so the host stays responsive;
    /// call again while this returns [`PumpStatus::Dirty`].
    pub fn pump(&mut self, surface: &mut dyn BufferSurface) -> PumpStatus {
        if self.disconnected {
            return PumpStatus::Disconnected;
        }
        let mut dirty = false;
        for _ in 0..MAX_CHUNKS_PER_PUMP {
            match self.shell.receive() {
                Some(chunk) if chunk.is_empty() => {
                    self.disconnected = true;
                    let events = self.interpreter.finish();
                    self.apply_events(events, surface);
                    return PumpStatus::Disconnected;
                }
                Some(chunk) => {
                    let events = self.interpreter.push(&chunk);
                    self.apply_events(events, surface);
                    dirty = true;
                }
                None => {
                    return if dirty { PumpStatus::Dirty } else { PumpStatus::Idle };
                }
            }
        }
        PumpStatus::Dirty
    }

    fn apply_events(&mut self, events: Vec<Event>, surface: &mut dyn BufferSurface) {
        for event in events {
            match event {
                Event::Terminal(ev) => {
                    // input_begin is vacated while a continuation prompt
                    // renders, so its "> " never counts as typed input.
                    if self.phase == Phase::Input && self.input_begin.is_some() {
                        if let TerminalEvent::Text(ref text) = ev {
                            self.input_text.push_str(text);
                        }
                    }
                    self.screen.apply(&ev, surface);
                }
                Event::Session(ev) => self.handle_session_event(ev, surface),
            }
        }
    }

    fn handle_session_event(&mut self, event: SessionEvent, surface: &mut dyn BufferSurface) {
        match event {
            SessionEvent::Prompt1Starts => {
                surface.set_style_scope(None);
            }
            SessionEvent::Prompt1Stops => {
                self.phase = Phase::Input;
                self.input_begin = Some(self.screen.cursor());
                self.input_regions.clear();
                self.input_text.clear();
            }
            SessionEvent::Prompt2Starts => {
                self.close_input_region();
            }
            SessionEvent::Prompt2Stops => {
                self.input_begin = Some(self.screen.cursor());
                self.input_text.push(' ');
            }
            SessionEvent::OutputStarts => {
                self.close_input_region();
                if !self.input_regions.is_empty() {
                    self.pending_command =
                        Some(CommandSpan::new(std::mem::take(&mut self.input_regions)));
                }
                self.command_words = self
                    .input_text
                    .split_whitespace()
                    .map(str::to_string)
                    .collect();
                self.command_started = Some(Instant::now());
                self.phase = Phase::Output;
            }
            SessionEvent::OutputStops { status, cwd } => {
                if let Some(span) = self.pending_command.take() {
                    self.history.append(span);
                }
                self.last_elapsed = self
                    .command_started
                    .take()
                    .map(|start| format_elapsed(start.elapsed()));
                debug!(status = %status, cwd = %cwd, "command finished");
                self.last_status = Some(status);
                self.cwd = cwd;
                self.screen.set_cursor(surface.size());
                self.screen.advance_home();
            }
        }
    }

    /// Finish the input region currently being typed. The cursor has
    /// already moved past the echoed newline, so the region ends just
    /// before it.
    fn close_input_region(&mut self) {
        if let Some(begin) = self.input_begin.take() {
            let end = self.screen.cursor().saturating_sub(1).max(begin);
            if end > begin {
                self.input_regions.push((begin, end));
            }
        }
    }

    /// Label for the session's tab, at most `width` columns wide.
    pub fn tab_label(&self, width: usize) -> String {
        let words: Vec<&str> = self.command_words.iter().map(String::as_str).collect();
        label::tab_label(&self.cwd, &words, width)
    }

    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    /// Exit status reported by the most recently completed command.
    pub fn last_status(&self) -> Option<&str> {
        self.last_status.as_deref()
    }

    /// Wall-clock runtime of the most recently completed command,
    /// formatted `H:MM:SS`.
    pub fn last_elapsed(&self) -> Option<&str> {
        self.last_elapsed.as_deref()
    }

    pub fn history(&self) -> &HistoryIndex {
        &self.history
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    /// True while a prompt span is still being accumulated; hosts should
    /// keep pumping rather than treat the stream as settled.
    pub fn in_prompt(&self) -> bool {
        self.interpreter.in_prompt()
    }
}

/// Format a duration as `H:MM:SS`, rounding to the nearest second.
fn format_elapsed(elapsed: Duration) -> String {
    let secs = (elapsed.as_millis() + 500) / 1000;
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{}:{:02}:{:02}", hours, minutes, seconds)
}
