//! Incremental byte-stream decoding
//!
//! PTY reads arrive in arbitrary-sized chunks, so a multi-byte UTF-8
//! sequence can be split across reads. The decoder carries undecoded
//! trailing bytes between calls and never fails: byte runs that are not
//! valid UTF-8 are re-decoded as Latin-1 (every byte maps to its own
//! codepoint), which matches how shells on legacy locales leak bytes into
//! the stream.

/// Incremental UTF-8 decoder with Latin-1 fallback.
#[derive(Debug, Default)]
pub struct Decoder {
    /// Trailing bytes of an incomplete UTF-8 sequence from the last call.
    pending: Vec<u8>,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a chunk of raw bytes, returning all text that can be produced
    /// so far. With `final_chunk` set, any incomplete trailing sequence is
    /// flushed through the fallback instead of being carried.
    pub fn decode(&mut self, bytes: &[u8], final_chunk: bool) -> String {
        let mut buf = std::mem::take(&mut self.pending);
        buf.extend_from_slice(bytes);

        let mut out = String::with_capacity(buf.len());
        let mut rest = buf.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    // valid_up_to guarantees this part is well-formed
                    out.push_str(unsafe { std::str::from_utf8_unchecked(valid) });
                    match err.error_len() {
                        Some(len) => {
                            tracing::debug!(
                                "invalid UTF-8 run {:02x?}, decoding as Latin-1",
                                &after[..len]
                            );
                            out.extend(after[..len].iter().map(|&b| b as char));
                            rest = &after[len..];
                        }
                        None => {
                            // Incomplete trailing sequence.
                            if final_chunk {
                                tracing::debug!(
                                    "truncated UTF-8 tail {:02x?} at stream end, \
                                     decoding as Latin-1",
                                    after
                                );
                                out.extend(after.iter().map(|&b| b as char));
                            } else {
                                self.pending = after.to_vec();
                            }
                            break;
                        }
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8() {
        let mut d = Decoder::new();
        assert_eq!(
            d.decode(b"gid\xf0\x9f\x98\x8aterm", false),
            "gid\u{1F60A}term"
        );
    }

    #[test]
    fn test_decode_invalid_start_byte() {
        // Not valid UTF-8 but decodable as Latin-1.
        let mut d = Decoder::new();
        assert_eq!(d.decode(b"gid\xa0term", false), "gid\u{a0}term");
    }

    #[test]
    fn test_decode_invalid_continuation_byte() {
        let mut d = Decoder::new();
        assert_eq!(d.decode(b"gid\xe3\xa0term", false), "gid\u{e3}\u{a0}term");
    }

    #[test]
    fn test_split_multibyte_across_calls() {
        let mut d = Decoder::new();
        let bytes = "héllo🙂".as_bytes();
        for split in 0..=bytes.len() {
            let mut d2 = Decoder::new();
            let mut text = d2.decode(&bytes[..split], false);
            text.push_str(&d2.decode(&bytes[split..], true));
            assert_eq!(text, "héllo🙂", "split at {}", split);
        }
        // Whole feed for good measure.
        assert_eq!(d.decode(bytes, true), "héllo🙂");
    }

    #[test]
    fn test_final_flushes_partial_tail() {
        let mut d = Decoder::new();
        assert_eq!(d.decode(b"ok\xf0\x9f", false), "ok");
        assert_eq!(d.decode(b"", true), "\u{f0}\u{9f}");
    }

    #[test]
    fn test_carry_completes_later() {
        let mut d = Decoder::new();
        assert_eq!(d.decode(b"a\xe2", false), "a");
        assert_eq!(d.decode(b"\x86\x92b", false), "\u{2192}b");
    }
}
