//! Shell sessions embedded in an editor text buffer.
//!
//! A [`Session`] runs bash in a PTY and renders its output into an
//! append-only host buffer: the stream of bytes is decoded, tokenized into
//! control sequences, and applied as edits through the host's
//! [`BufferSurface`]. Prompts announce themselves with in-band markers, so
//! the session also knows where every entered command lives, what it
//! exited with, and how long it ran.
//!
//! The lower layers are usable on their own: [`Interpreter`] turns raw
//! terminal bytes into [`Event`]s without any shell or buffer attached,
//! and accepts input split at arbitrary chunk boundaries.

pub mod color;
pub mod decode;
pub mod dispatch;
pub mod event;
pub mod history;
pub mod interpreter;
pub mod label;
pub mod prompt;
pub mod screen;
pub mod session;
pub mod shell;
pub mod surface;
pub mod tokenizer;

pub use color::Color;
pub use event::{Event, SessionEvent, TerminalEvent};
pub use history::{CommandSpan, HistoryIndex};
pub use interpreter::Interpreter;
pub use label::tab_label;
pub use screen::Screen;
pub use session::{PumpStatus, Session};
pub use shell::{PtyShell, ShellProcess};
pub use surface::{BufferSurface, StringSurface};
