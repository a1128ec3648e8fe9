//! The terminal stream interpreter
//!
//! Owns the decode → tokenize → dispatch pipeline plus the prompt protocol
//! tracker, and exposes it as a plain push call: the host feeds whatever
//! bytes the PTY produced and gets back the complete batch of events those
//! bytes imply. All suspension state (decoder remainder, tokenizer carry,
//! prompt accumulator, active rendition) lives in this struct between calls,
//! so the host scheduler decides when to run, not a coroutine.

use crate::decode::Decoder;
use crate::dispatch::Dispatcher;
use crate::event::Event;
use crate::prompt::PromptTracker;
use crate::tokenizer::Tokenizer;

/// Incremental byte-stream → event interpreter.
#[derive(Debug, Default)]
pub struct Interpreter {
    decoder: Decoder,
    tokenizer: Tokenizer,
    dispatcher: Dispatcher,
    prompt: PromptTracker,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of raw PTY bytes, returning every event it completes.
    /// Each token produces its full set of events before the next token is
    /// examined, so a batch is never torn mid-sequence.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Event> {
        let text = self.decoder.decode(bytes, false);
        let tokens = self.tokenizer.tokenize(&text);
        self.process(&tokens)
    }

    /// Flush carried state at stream end (EOF on the PTY).
    pub fn finish(&mut self) -> Vec<Event> {
        let text = self.decoder.decode(&[], true);
        let mut tokens = self.tokenizer.tokenize(&text);
        tokens.extend(self.tokenizer.finish());
        self.process(&tokens)
    }

    /// True while the interpreter is buffering an open prompt span.
    pub fn in_prompt(&self) -> bool {
        self.prompt.in_prompt()
    }

    fn process(&mut self, tokens: &[crate::tokenizer::Token]) -> Vec<Event> {
        let mut out = Vec::new();
        for token in tokens {
            if self.prompt.handle(token, &mut self.dispatcher, &mut out) {
                continue;
            }
            let mut events = Vec::new();
            self.dispatcher.dispatch(token, &mut events);
            out.extend(events.into_iter().map(Event::Terminal));
        }
        out
    }
}
