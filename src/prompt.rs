//! Prompt protocol state machine
//!
//! The injected shell profile brackets each prompt/command/output cycle with
//! reserved CSI markers:
//!
//! - `CSI 0 ! p` — standalone: command output is about to start
//! - `CSI 2 ! p` — standalone: a continuation prompt was shown
//! - `CSI 1 p <status> @ <cwd> CSI ~` — span: emitted right before the next
//!   prompt, carrying the exit status and working directory
//! - `CSI 5 p <text> CSI ~` — span: the literal rendered prompt text
//!
//! The `!` intermediate keeps the standalone forms clear of ordinary CSI.
//! Tokens inside an open span are accumulated, not rendered. Protocol
//! violations never abort the session: the machine logs and resynchronizes.

use crate::dispatch::{Csi, Dispatcher};
use crate::event::{Event, SessionEvent, TerminalEvent};
use crate::tokenizer::{Token, Tokenizer};

/// Which span marker is currently open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptKind {
    /// `1`: status@cwd, reported when the prompt is about to be redrawn.
    Info,
    /// `5`: the rendered prompt text to redisplay.
    Text,
}

#[derive(Debug)]
enum State {
    Idle,
    InPrompt { kind: PromptKind, acc: String },
}

/// Recognizes prompt markers in the token stream and turns them into
/// [`SessionEvent`]s; everything else passes through untouched.
#[derive(Debug)]
pub struct PromptTracker {
    state: State,
    /// Whether an `OutputStarts` has been emitted without its matching
    /// `OutputStops` yet.
    output_open: bool,
}

impl Default for PromptTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptTracker {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            output_open: false,
        }
    }

    /// True while inside an open prompt span.
    pub fn in_prompt(&self) -> bool {
        matches!(self.state, State::InPrompt { .. })
    }

    /// Examine one token. Returns `true` if the token belonged to the
    /// protocol (and was consumed), `false` if the caller should dispatch it
    /// normally. Consumed markers append their session events to `out`.
    pub fn handle(
        &mut self,
        token: &Token,
        dispatcher: &mut Dispatcher,
        out: &mut Vec<Event>,
    ) -> bool {
        match &mut self.state {
            State::InPrompt { kind, acc } => {
                if is_close_marker(token) {
                    let kind = *kind;
                    let acc = std::mem::take(acc);
                    self.state = State::Idle;
                    self.close_span(kind, acc, dispatcher, out);
                } else {
                    // Interpolated prompt content, raw controls included, is
                    // buffered rather than rendered.
                    match token {
                        Token::Plain(text) => acc.push_str(text),
                        Token::Control(raw) => acc.push_str(raw),
                    }
                }
                true
            }
            State::Idle => self.handle_idle(token, out),
        }
    }

    fn handle_idle(&mut self, token: &Token, out: &mut Vec<Event>) -> bool {
        let Token::Control(raw) = token else {
            return false;
        };
        let Some(csi) = (raw.starts_with("\x1b[")).then(|| Csi::parse(raw)).flatten() else {
            return false;
        };
        match (csi.final_byte, csi.intermediates) {
            (b'p', "!") => {
                match csi.params.first().copied().flatten() {
                    Some(0) => {
                        if self.output_open {
                            tracing::warn!(
                                "output-starts marker while output already open, resyncing"
                            );
                        } else {
                            self.output_open = true;
                            out.push(SessionEvent::OutputStarts.into());
                        }
                    }
                    Some(2) => {
                        out.push(SessionEvent::Prompt2Starts.into());
                        out.push(TerminalEvent::Text("> ".to_string()).into());
                        out.push(SessionEvent::Prompt2Stops.into());
                    }
                    other => {
                        tracing::warn!("unknown standalone prompt marker {:?}", other);
                    }
                }
                true
            }
            (b'p', "") => match csi.params.first().copied().flatten() {
                Some(1) => {
                    self.state = State::InPrompt {
                        kind: PromptKind::Info,
                        acc: String::new(),
                    };
                    true
                }
                Some(5) => {
                    self.state = State::InPrompt {
                        kind: PromptKind::Text,
                        acc: String::new(),
                    };
                    true
                }
                _ => false,
            },
            (b'~', "") if csi.params.is_empty() => {
                tracing::warn!("prompt close marker with no open span, resyncing");
                true
            }
            _ => false,
        }
    }

    fn close_span(
        &mut self,
        kind: PromptKind,
        acc: String,
        dispatcher: &mut Dispatcher,
        out: &mut Vec<Event>,
    ) {
        match kind {
            PromptKind::Info => {
                let (status, cwd) = match acc.split_once('@') {
                    Some((status, cwd)) => (status.to_string(), cwd.to_string()),
                    None => {
                        tracing::warn!(
                            "prompt info span without '@' separator: {:?}",
                            acc
                        );
                        (acc, String::new())
                    }
                };
                if !self.output_open {
                    // Normal at session start: the shell draws its first
                    // prompt before any command has produced output.
                    tracing::debug!("status report outside an output region");
                }
                self.output_open = false;
                out.push(SessionEvent::OutputStops { status, cwd }.into());
            }
            PromptKind::Text => {
                // The captured prompt may itself contain styling sequences;
                // run it back through a fresh tokenizer against the shared
                // dispatcher so rendition state stays continuous.
                out.push(SessionEvent::Prompt1Starts.into());
                let mut tokenizer = Tokenizer::new();
                let mut tokens = tokenizer.tokenize(&acc);
                tokens.extend(tokenizer.finish());
                let mut events = Vec::new();
                for token in &tokens {
                    dispatcher.dispatch(token, &mut events);
                }
                out.extend(events.into_iter().map(Event::Terminal));
                out.push(SessionEvent::Prompt1Stops.into());
            }
        }
    }
}

/// The bare `CSI ~` close marker.
fn is_close_marker(token: &Token) -> bool {
    matches!(token, Token::Control(raw) if raw == "\x1b[~")
}
