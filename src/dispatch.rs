//! Control token dispatch
//!
//! Maps complete control tokens onto the closed [`TerminalEvent`] set. The
//! supported CSI final bytes are an exhaustive match (`@ A B C D H f K P m`);
//! anything else is logged and ignored rather than rendered, so stray
//! sequences can never corrupt the buffer.

use crate::color::{resolve_sgr, Color};
use crate::event::TerminalEvent;
use crate::tokenizer::Token;

/// A parsed CSI sequence.
#[derive(Debug)]
pub struct Csi<'a> {
    /// Semicolon-separated numeric parameters; `None` for empty slots.
    pub params: Vec<Option<u16>>,
    /// Intermediate bytes (0x20-0x2f), usually empty.
    pub intermediates: &'a str,
    /// Final byte (0x40-0x7e).
    pub final_byte: u8,
}

impl<'a> Csi<'a> {
    /// Parse the raw text of a complete CSI control token.
    pub fn parse(raw: &'a str) -> Option<Csi<'a>> {
        let body = raw.strip_prefix("\x1b[")?;
        let bytes = body.as_bytes();
        let mut split = bytes.len();
        // Walk back over the final byte and intermediates.
        let final_byte = *bytes.last()?;
        if !(0x40..=0x7e).contains(&final_byte) {
            return None;
        }
        split -= 1;
        let mut inter_start = split;
        while inter_start > 0 && (0x20..=0x2f).contains(&bytes[inter_start - 1]) {
            inter_start -= 1;
        }
        let param_str = &body[..inter_start];
        let intermediates = &body[inter_start..split];
        let params = if param_str.is_empty() {
            Vec::new()
        } else {
            param_str
                .split(';')
                .map(|p| {
                    if p.is_empty() {
                        None
                    } else {
                        match p.parse::<u16>() {
                            Ok(v) => Some(v),
                            Err(_) => {
                                tracing::debug!("unparseable CSI parameter {:?} in {:?}", p, body);
                                None
                            }
                        }
                    }
                })
                .collect()
        };
        Some(Csi {
            params,
            intermediates,
            final_byte,
        })
    }

    /// Numeric argument `i`, with the usual default of 1 for missing/zero.
    fn count(&self, i: usize) -> usize {
        match self.params.get(i).copied().flatten() {
            Some(0) | None => 1,
            Some(n) => n as usize,
        }
    }

    /// Flattened parameter list for SGR resolution (empty slots become 0,
    /// which is the reset the terminal intends for `ESC[m` and `ESC[;m`).
    fn sgr_params(&self) -> Vec<u16> {
        if self.params.is_empty() {
            vec![0]
        } else {
            self.params.iter().map(|p| p.unwrap_or(0)).collect()
        }
    }
}

/// Stateful dispatcher; tracks the active rendition so each SGR list can be
/// resolved into an absolute (fg, bg) pair.
#[derive(Debug)]
pub struct Dispatcher {
    rendition: (Color, Color),
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            rendition: (Color::Default, Color::Default),
        }
    }

    /// Dispatch one token, appending zero or more events.
    pub fn dispatch(&mut self, token: &Token, out: &mut Vec<TerminalEvent>) {
        match token {
            Token::Plain(text) => out.push(TerminalEvent::Text(text.clone())),
            Token::Control(raw) => self.dispatch_control(raw, out),
        }
    }

    fn dispatch_control(&mut self, raw: &str, out: &mut Vec<TerminalEvent>) {
        let bytes = raw.as_bytes();
        match bytes[0] {
            0x07 => {} // BEL: nothing to display
            0x08 => out.push(TerminalEvent::CursorLeft(bytes.len())),
            b'\n' => out.push(TerminalEvent::LineFeed),
            b'\r' => {
                if bytes.ends_with(b"\n") {
                    // CR+LF is a plain newline.
                    out.push(TerminalEvent::LineFeed);
                } else {
                    out.push(TerminalEvent::CursorReturn(bytes.len()));
                }
            }
            0x1b => match bytes.get(1) {
                Some(b'[') => self.dispatch_csi(raw, out),
                // Codeset selects and title sequences carry nothing for the
                // buffer.
                Some(b'(') | Some(b')') | Some(b']') => {}
                other => {
                    tracing::debug!("ignoring unexpected escape form {:?}", other);
                }
            },
            other => {
                tracing::debug!("ignoring unexpected control token start {:#04x}", other);
            }
        }
    }

    fn dispatch_csi(&mut self, raw: &str, out: &mut Vec<TerminalEvent>) {
        let Some(csi) = Csi::parse(raw) else {
            tracing::debug!("malformed CSI token {:?}", raw);
            return;
        };
        if !csi.intermediates.is_empty() {
            // Sequences with intermediates (including the prompt protocol's
            // standalone markers) have no display effect here.
            tracing::debug!("ignoring CSI with intermediates {:?}", raw);
            return;
        }
        match csi.final_byte {
            b'@' => out.push(TerminalEvent::Insert(csi.count(0))),
            b'A' => out.push(TerminalEvent::CursorUp(csi.count(0))),
            b'B' => out.push(TerminalEvent::CursorDown(csi.count(0))),
            b'C' => out.push(TerminalEvent::CursorRight(csi.count(0))),
            b'D' => out.push(TerminalEvent::CursorLeft(csi.count(0))),
            b'H' | b'f' => {
                // row[;col], 1-based with a default origin of (1,1).
                let row = csi.count(0) - 1;
                let col = csi.count(1) - 1;
                out.push(TerminalEvent::CursorMoveTo(row, col));
            }
            b'K' => {
                let mode = csi.params.first().copied().flatten().unwrap_or(0);
                match mode {
                    0 => out.push(TerminalEvent::ClearToEndOfLine),
                    1 => out.push(TerminalEvent::ClearToStartOfLine),
                    2 => out.push(TerminalEvent::ClearLine),
                    other => {
                        tracing::debug!("ignoring unknown erase-line mode {}", other);
                    }
                }
            }
            b'P' => out.push(TerminalEvent::Delete(csi.count(0))),
            b'm' => {
                self.rendition = resolve_sgr(&csi.sgr_params(), self.rendition);
                out.push(TerminalEvent::Rendition(self.rendition.0, self.rendition.1));
            }
            other => {
                tracing::debug!("ignoring unhandled CSI final byte {:?}", other as char);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatch_one(d: &mut Dispatcher, token: Token) -> Vec<TerminalEvent> {
        let mut out = Vec::new();
        d.dispatch(&token, &mut out);
        out
    }

    fn control(raw: &str) -> Token {
        Token::Control(raw.to_string())
    }

    #[test]
    fn test_cursor_moves_default_to_one() {
        let mut d = Dispatcher::new();
        assert_eq!(
            dispatch_one(&mut d, control("\x1b[A")),
            vec![TerminalEvent::CursorUp(1)]
        );
        assert_eq!(
            dispatch_one(&mut d, control("\x1b[3B")),
            vec![TerminalEvent::CursorDown(3)]
        );
        assert_eq!(
            dispatch_one(&mut d, control("\x1b[0C")),
            vec![TerminalEvent::CursorRight(1)]
        );
    }

    #[test]
    fn test_move_to_converts_to_zero_based() {
        let mut d = Dispatcher::new();
        assert_eq!(
            dispatch_one(&mut d, control("\x1b[H")),
            vec![TerminalEvent::CursorMoveTo(0, 0)]
        );
        assert_eq!(
            dispatch_one(&mut d, control("\x1b[5;7f")),
            vec![TerminalEvent::CursorMoveTo(4, 6)]
        );
        assert_eq!(
            dispatch_one(&mut d, control("\x1b[;7H")),
            vec![TerminalEvent::CursorMoveTo(0, 6)]
        );
    }

    #[test]
    fn test_erase_line_modes() {
        let mut d = Dispatcher::new();
        assert_eq!(
            dispatch_one(&mut d, control("\x1b[K")),
            vec![TerminalEvent::ClearToEndOfLine]
        );
        assert_eq!(
            dispatch_one(&mut d, control("\x1b[1K")),
            vec![TerminalEvent::ClearToStartOfLine]
        );
        assert_eq!(
            dispatch_one(&mut d, control("\x1b[2K")),
            vec![TerminalEvent::ClearLine]
        );
    }

    #[test]
    fn test_insert_delete_counts() {
        let mut d = Dispatcher::new();
        assert_eq!(
            dispatch_one(&mut d, control("\x1b[4@")),
            vec![TerminalEvent::Insert(4)]
        );
        assert_eq!(
            dispatch_one(&mut d, control("\x1b[P")),
            vec![TerminalEvent::Delete(1)]
        );
    }

    #[test]
    fn test_sgr_tracks_state_across_tokens() {
        let mut d = Dispatcher::new();
        assert_eq!(
            dispatch_one(&mut d, control("\x1b[31m")),
            vec![TerminalEvent::Rendition(Color::Red, Color::Default)]
        );
        // Background set; foreground carried over from last time.
        assert_eq!(
            dispatch_one(&mut d, control("\x1b[44m")),
            vec![TerminalEvent::Rendition(Color::Red, Color::Blue)]
        );
        assert_eq!(
            dispatch_one(&mut d, control("\x1b[m")),
            vec![TerminalEvent::Rendition(Color::Default, Color::Default)]
        );
    }

    #[test]
    fn test_backspace_and_cr_runs() {
        let mut d = Dispatcher::new();
        assert_eq!(
            dispatch_one(&mut d, control("\x08\x08\x08")),
            vec![TerminalEvent::CursorLeft(3)]
        );
        assert_eq!(
            dispatch_one(&mut d, control("\r\r")),
            vec![TerminalEvent::CursorReturn(2)]
        );
        assert_eq!(
            dispatch_one(&mut d, control("\r\n")),
            vec![TerminalEvent::LineFeed]
        );
    }

    #[test]
    fn test_unknown_final_byte_is_noop() {
        let mut d = Dispatcher::new();
        assert_eq!(dispatch_one(&mut d, control("\x1b[6n")), vec![]);
        assert_eq!(dispatch_one(&mut d, control("\x1b[?25l")), vec![]);
    }

    #[test]
    fn test_ignored_sequences() {
        let mut d = Dispatcher::new();
        assert_eq!(dispatch_one(&mut d, control("\x07")), vec![]);
        assert_eq!(dispatch_one(&mut d, control("\x1b(B")), vec![]);
        assert_eq!(dispatch_one(&mut d, control("\x1b]0;t\x07")), vec![]);
    }
}
