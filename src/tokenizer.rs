//! Escape-sequence tokenizer
//!
//! Splits decoded text into alternating plain-text and control tokens.
//! Because PTY reads can end in the middle of an escape sequence, a trailing
//! fragment that is a valid prefix of a recognized control grammar is
//! withheld as carry and prepended to the next call's input. Plain text is
//! never withheld.
//!
//! Recognized control forms:
//! - BEL
//! - a run of BACKSPACE
//! - a run of CR, optionally terminated by LF (so CR+LF stays one token)
//! - lone LF
//! - codeset selects `ESC ( x` / `ESC ) x`
//! - title sequences `ESC ] ... BEL` / `ESC ] ... ESC \`
//! - CSI `ESC [ [0x30-0x3f]* [0x20-0x2f]* [0x40-0x7e]`
//!
//! Anything else after an ESC is not a control sequence: the ESC is dropped
//! with a logged warning and the following bytes are re-scanned as plain
//! text, so nothing is ever silently lost.

const ESC: u8 = 0x1b;
const BEL: u8 = 0x07;
const BS: u8 = 0x08;

/// Upper bound on an unterminated title sequence before it is declared
/// malformed instead of being carried forever.
const MAX_TITLE_LEN: usize = 1024;

/// A fully-partitioned piece of tokenizer input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Ordinary text to display.
    Plain(String),
    /// A complete control sequence, raw bytes included.
    Control(String),
}

/// Result of trying to match an escape sequence at some position.
enum EscMatch {
    /// A complete sequence of this many bytes.
    Complete(usize),
    /// The input ends inside the sequence; more bytes are needed.
    NeedMore,
    /// The bytes after ESC do not form a recognized sequence.
    Invalid,
}

/// Incremental tokenizer; owns the carry between calls.
#[derive(Debug, Default)]
pub struct Tokenizer {
    carry: String,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenize a chunk of decoded text, prepending any carried fragment.
    pub fn tokenize(&mut self, text: &str) -> Vec<Token> {
        let input = if self.carry.is_empty() {
            text.to_string()
        } else {
            let mut s = std::mem::take(&mut self.carry);
            s.push_str(text);
            s
        };
        self.scan(&input, false)
    }

    /// Flush the carried fragment at stream end. An incomplete escape
    /// sequence is treated as malformed (warned, ESC dropped, remainder
    /// re-scanned as plain text); control runs are emitted as-is.
    pub fn finish(&mut self) -> Vec<Token> {
        let input = std::mem::take(&mut self.carry);
        if input.is_empty() {
            Vec::new()
        } else {
            self.scan(&input, true)
        }
    }

    fn scan(&mut self, input: &str, final_chunk: bool) -> Vec<Token> {
        let bytes = input.as_bytes();
        let mut tokens: Vec<Token> = Vec::new();
        let mut plain_start = 0usize;
        let mut i = 0usize;

        // Plain text accumulates between plain_start and the next control
        // byte; adjacent plain runs within one call end up in one token.
        let push_plain = |tokens: &mut Vec<Token>, from: usize, to: usize| {
            if from < to {
                match tokens.last_mut() {
                    Some(Token::Plain(s)) => s.push_str(&input[from..to]),
                    _ => tokens.push(Token::Plain(input[from..to].to_string())),
                }
            }
        };

        while i < bytes.len() {
            match bytes[i] {
                BEL => {
                    push_plain(&mut tokens, plain_start, i);
                    tokens.push(Token::Control("\x07".to_string()));
                    i += 1;
                    plain_start = i;
                }
                BS => {
                    let mut j = i + 1;
                    while j < bytes.len() && bytes[j] == BS {
                        j += 1;
                    }
                    if j == bytes.len() && !final_chunk {
                        // The run may continue in the next chunk.
                        push_plain(&mut tokens, plain_start, i);
                        self.carry = input[i..].to_string();
                        return tokens;
                    }
                    push_plain(&mut tokens, plain_start, i);
                    tokens.push(Token::Control(input[i..j].to_string()));
                    i = j;
                    plain_start = i;
                }
                b'\r' => {
                    let mut j = i + 1;
                    while j < bytes.len() && bytes[j] == b'\r' {
                        j += 1;
                    }
                    if j == bytes.len() && !final_chunk {
                        // A LF may follow in the next chunk, turning the run
                        // into a newline.
                        push_plain(&mut tokens, plain_start, i);
                        self.carry = input[i..].to_string();
                        return tokens;
                    }
                    if j < bytes.len() && bytes[j] == b'\n' {
                        j += 1;
                    }
                    push_plain(&mut tokens, plain_start, i);
                    tokens.push(Token::Control(input[i..j].to_string()));
                    i = j;
                    plain_start = i;
                }
                b'\n' => {
                    push_plain(&mut tokens, plain_start, i);
                    tokens.push(Token::Control("\n".to_string()));
                    i += 1;
                    plain_start = i;
                }
                ESC => match match_escape(bytes, i, final_chunk) {
                    EscMatch::Complete(len) => {
                        push_plain(&mut tokens, plain_start, i);
                        tokens.push(Token::Control(input[i..i + len].to_string()));
                        i += len;
                        plain_start = i;
                    }
                    EscMatch::NeedMore => {
                        push_plain(&mut tokens, plain_start, i);
                        self.carry = input[i..].to_string();
                        return tokens;
                    }
                    EscMatch::Invalid => {
                        tracing::warn!(
                            "unrecognized escape sequence at {:?}, dropping ESC",
                            preview(&input[i..])
                        );
                        push_plain(&mut tokens, plain_start, i);
                        i += 1;
                        plain_start = i;
                    }
                },
                _ => i += 1,
            }
        }
        push_plain(&mut tokens, plain_start, bytes.len());
        tokens
    }
}

/// Match an escape sequence starting at `i` (which holds ESC).
fn match_escape(bytes: &[u8], i: usize, final_chunk: bool) -> EscMatch {
    let need_more = || {
        if final_chunk {
            EscMatch::Invalid
        } else {
            EscMatch::NeedMore
        }
    };
    let Some(&selector) = bytes.get(i + 1) else {
        return need_more();
    };
    match selector {
        b'[' => {
            let mut j = i + 2;
            while j < bytes.len() && (0x30..=0x3f).contains(&bytes[j]) {
                j += 1;
            }
            while j < bytes.len() && (0x20..=0x2f).contains(&bytes[j]) {
                j += 1;
            }
            match bytes.get(j) {
                None => need_more(),
                Some(final_byte) if (0x40..=0x7e).contains(final_byte) => {
                    EscMatch::Complete(j + 1 - i)
                }
                Some(_) => EscMatch::Invalid,
            }
        }
        b'(' | b')' => match bytes.get(i + 2) {
            None => need_more(),
            Some(designator) if designator.is_ascii() => EscMatch::Complete(3),
            Some(_) => EscMatch::Invalid,
        },
        b']' => {
            let mut j = i + 2;
            while j < bytes.len() {
                match bytes[j] {
                    BEL => return EscMatch::Complete(j + 1 - i),
                    ESC => {
                        return match bytes.get(j + 1) {
                            None => need_more(),
                            Some(b'\\') => EscMatch::Complete(j + 2 - i),
                            Some(_) => EscMatch::Invalid,
                        }
                    }
                    _ => j += 1,
                }
                if j - i > MAX_TITLE_LEN {
                    return EscMatch::Invalid;
                }
            }
            need_more()
        }
        _ => EscMatch::Invalid,
    }
}

/// Short printable preview of raw input for log messages.
fn preview(s: &str) -> String {
    s.chars().take(12).collect::<String>()
}
