//! Line framing for server-sent event streams.
//!
//! The response body arrives as arbitrary byte chunks.  [`LineDecoder`] turns them into
//! complete text lines, carrying over whatever did not end on a line terminator, including
//! a multi-byte character cut in half by the transport.

/// Incremental UTF-8 line decoder.
///
/// Feed it chunks with [`LineDecoder::push`]; each call returns the lines completed by that
/// chunk.  The final fragment after the last `\n` is never emitted from `push` because the
/// producer may not have finished writing it.  When the stream ends, call
/// [`LineDecoder::finish`] to drop that fragment.
#[derive(Debug, Default)]
pub struct LineDecoder {
    // Bytes of an incomplete UTF-8 sequence at the tail of the last chunk.
    pending: Vec<u8>,
    // Decoded text not yet terminated by '\n'.
    buffer: String,
}

impl LineDecoder {
    /// Creates an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `chunk` and returns every line it completes, without terminators.
    ///
    /// A trailing `\r` is removed so that CRLF-framed streams decode the same as LF-framed
    /// ones.  Invalid UTF-8 decodes to U+FFFD rather than failing the stream.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        self.decode_pending();

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[start..].find('\n') {
            let end = start + offset;
            let line = &self.buffer[start..end];
            lines.push(line.strip_suffix('\r').unwrap_or(line).to_string());
            start = end + 1;
        }
        self.buffer.drain(..start);
        lines
    }

    /// Returns true if an unterminated fragment is being carried over.
    pub fn has_partial(&self) -> bool {
        !self.buffer.is_empty() || !self.pending.is_empty()
    }

    /// Ends the stream, discarding any unterminated fragment.
    ///
    /// Returns the number of bytes discarded.  A truncated final line is malformed input
    /// and is not handed to the interpreter.
    pub fn finish(&mut self) -> usize {
        let discarded = self.buffer.len() + self.pending.len();
        self.buffer.clear();
        self.pending.clear();
        discarded
    }

    fn decode_pending(&mut self) {
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    self.pending.clear();
                    return;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    if let Ok(text) = std::str::from_utf8(&self.pending[..valid]) {
                        self.buffer.push_str(text);
                    }
                    match err.error_len() {
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                        None => {
                            // Incomplete sequence at the end; wait for the next chunk.
                            self.pending.drain(..valid);
                            return;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_lines_only() {
        let mut decoder = LineDecoder::new();
        assert_eq!(decoder.push(b"data: a\ndata: b\ndata: c"), vec!["data: a", "data: b"]);
        assert!(decoder.has_partial());
        assert_eq!(decoder.push(b"\n"), vec!["data: c"]);
        assert!(!decoder.has_partial());
    }

    #[test]
    fn n_terminators_emit_n_lines() {
        let mut decoder = LineDecoder::new();
        assert_eq!(decoder.push(b"a\n\nb\n"), vec!["a", "", "b"]);
        assert_eq!(decoder.push(b""), Vec::<String>::new());
    }

    #[test]
    fn line_split_across_chunks() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"data: {\"con").is_empty());
        assert!(decoder.push(b"tent\":\"Hi\"}").is_empty());
        assert_eq!(decoder.push(b"\n"), vec![r#"data: {"content":"Hi"}"#]);
    }

    #[test]
    fn byte_by_byte_matches_whole() {
        let input = "data: {\"content\":\"héllo ✓ 🦀\"}\n: ping\ndata: [DONE]\n".as_bytes();
        let mut whole = LineDecoder::new();
        let expected = whole.push(input);

        let mut split = LineDecoder::new();
        let mut actual = Vec::new();
        for byte in input {
            actual.extend(split.push(std::slice::from_ref(byte)));
        }
        assert_eq!(actual, expected);
        assert_eq!(actual.len(), 3);
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        let crab = "🦀".as_bytes();
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(&crab[..1]).is_empty());
        assert!(decoder.push(&crab[1..3]).is_empty());
        let mut tail = crab[3..].to_vec();
        tail.push(b'\n');
        assert_eq!(decoder.push(&tail), vec!["🦀"]);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let mut decoder = LineDecoder::new();
        assert_eq!(decoder.push(b"a\xffb\n"), vec!["a\u{FFFD}b"]);
    }

    #[test]
    fn crlf_is_stripped() {
        let mut decoder = LineDecoder::new();
        assert_eq!(decoder.push(b"data: x\r\n\r\n"), vec!["data: x", ""]);
    }

    #[test]
    fn finish_discards_partial() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"data: {\"content\":\"lost\"}").is_empty());
        assert_eq!(decoder.finish(), 24);
        assert!(!decoder.has_partial());
        assert_eq!(decoder.push(b"\n"), vec![""]);
    }

    #[test]
    fn finish_counts_incomplete_sequence() {
        let mut decoder = LineDecoder::new();
        decoder.push(&"é".as_bytes()[..1]);
        assert!(decoder.has_partial());
        assert_eq!(decoder.finish(), 1);
    }
}
