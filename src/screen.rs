//! Cursor/buffer coordinate model
//!
//! Tracks an absolute cursor offset plus the home watermark against an
//! append-only buffer, and applies [`TerminalEvent`]s through the host's
//! [`BufferSurface`]. The home watermark is advanced after each command
//! cycle completes; relative motions can never climb above it, which bounds
//! how much of the buffer a misbehaving program can rewrite.

use crate::color::Color;
use crate::event::TerminalEvent;
use crate::surface::BufferSurface;

#[derive(Debug)]
pub struct Screen {
    cursor: usize,
    home: usize,
}

impl Screen {
    /// Start with both cursor and home at `offset` (usually the buffer end).
    pub fn at(offset: usize) -> Self {
        Self {
            cursor: offset,
            home: offset,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn home(&self) -> usize {
        self.home
    }

    /// Reset the baseline for the next command cycle: the current cursor
    /// becomes the new home watermark.
    pub fn advance_home(&mut self) {
        self.home = self.cursor;
    }

    /// Re-place the cursor after an out-of-band edit by the host.
    pub fn set_cursor(&mut self, offset: usize) {
        self.cursor = offset.max(self.home);
    }

    /// Apply one display event to the buffer.
    pub fn apply(&mut self, event: &TerminalEvent, surface: &mut dyn BufferSurface) {
        match event {
            TerminalEvent::Text(text) => {
                self.cursor = surface.overwrite_at(self.cursor, text);
            }
            TerminalEvent::CursorUp(n) => {
                let (row, col) = surface.row_col(self.cursor);
                let home_row = surface.row_col(self.home).0;
                let target = row.saturating_sub(*n).max(home_row);
                self.cursor = surface.offset_of(target, col).max(self.home);
            }
            TerminalEvent::CursorDown(n) => {
                let (row, col) = surface.row_col(self.cursor);
                self.cursor = surface.offset_of(row + n, col);
            }
            TerminalEvent::CursorLeft(n) => {
                self.cursor = self.cursor.saturating_sub(*n).max(self.home);
            }
            TerminalEvent::CursorRight(n) => {
                self.cursor = (self.cursor + n).min(surface.size());
            }
            TerminalEvent::CursorReturn(_) => {
                self.cursor = surface.line_start(self.cursor).max(self.home);
            }
            TerminalEvent::CursorMoveTo(row, col) => {
                let home_row = surface.row_col(self.home).0;
                self.cursor = surface.offset_of(home_row + row, *col).max(self.home);
            }
            TerminalEvent::LineFeed => {
                if surface.line_end(self.cursor) == surface.size() {
                    // Already on the last line: grow the buffer.
                    let end = surface.size();
                    self.cursor = surface.insert_at(end, "\n");
                } else {
                    let (row, col) = surface.row_col(self.cursor);
                    self.cursor = surface.offset_of(row + 1, col);
                }
            }
            TerminalEvent::ClearToEndOfLine => {
                let end = surface.line_end(self.cursor);
                surface.erase_range(self.cursor, end);
            }
            TerminalEvent::ClearToStartOfLine => {
                let start = surface.line_start(self.cursor).max(self.home);
                let end = (self.cursor + 1).min(surface.line_end(self.cursor));
                surface.erase_range(start, end);
            }
            TerminalEvent::ClearLine => {
                let start = surface.line_start(self.cursor).max(self.home);
                let end = surface.line_end(self.cursor);
                surface.erase_range(start, end);
            }
            TerminalEvent::Insert(n) => {
                let blanks = " ".repeat(*n);
                surface.insert_at(self.cursor, &blanks);
            }
            TerminalEvent::Delete(n) => {
                let end = (self.cursor + n).min(surface.line_end(self.cursor));
                surface.delete_range(self.cursor, end);
            }
            TerminalEvent::Rendition(fg, bg) => {
                if *fg == Color::Default && *bg == Color::Default {
                    surface.set_style_scope(None);
                } else {
                    surface.set_style_scope(Some(&format!("sgr.{}-on-{}", fg, bg)));
                }
            }
        }
    }
}
