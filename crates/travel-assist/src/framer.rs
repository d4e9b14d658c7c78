//! Reassembles arbitrarily split body chunks into complete text lines.

/// Splits a chunked byte stream into `\n`-terminated lines.
///
/// Bytes are buffered until a terminator arrives, so a multi-byte UTF-8
/// sequence split across chunks is decoded only once it is whole. A trailing
/// `\r` is stripped from each line.
#[derive(Debug, Default)]
pub struct LineFramer {
    buf: Vec<u8>,
    // Bytes before this offset are known to contain no terminator.
    scanned: usize,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns every line it completed, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        let mut start = 0;
        let mut i = self.scanned;
        while let Some(offset) = self.buf[i..].iter().position(|b| *b == b'\n') {
            let end = i + offset;
            lines.push(decode_line(&self.buf[start..end]));
            start = end + 1;
            i = start;
        }
        if start > 0 {
            self.buf.drain(..start);
        }
        self.scanned = self.buf.len();
        lines
    }

    /// Flushes the unterminated tail at end of stream.
    ///
    /// Returns `None` when nothing is pending. The framer is empty afterwards.
    pub fn finish(&mut self) -> Option<String> {
        self.scanned = 0;
        if self.buf.is_empty() {
            return None;
        }
        let tail = std::mem::take(&mut self.buf);
        Some(decode_line(&tail))
    }

    /// Number of buffered bytes not yet part of a complete line.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_partial_line_until_terminated() {
        let mut framer = LineFramer::new();
        let head = b"data: {\"type\":\"con";
        assert!(framer.feed(head).is_empty());
        assert_eq!(framer.pending_len(), head.len());
        let lines = framer.feed(b"tent\",\"content\":\"X\"}\n");
        assert_eq!(lines, vec![r#"data: {"type":"content","content":"X"}"#]);
        assert_eq!(framer.pending_len(), 0);
        assert_eq!(framer.finish(), None);
    }

    #[test]
    fn emits_blank_lines_and_multiple_lines_per_chunk() {
        let mut framer = LineFramer::new();
        let lines = framer.feed(b"a\n\nb\r\nc");
        assert_eq!(lines, vec!["a", "", "b"]);
        assert_eq!(framer.finish().as_deref(), Some("c"));
        assert_eq!(framer.finish(), None);
    }

    #[test]
    fn multibyte_sequence_split_across_chunks_is_preserved() {
        let text = "data: café ✈\n".as_bytes();
        // Split inside the three-byte airplane glyph.
        let split = text.len() - 3;
        let mut framer = LineFramer::new();
        assert!(framer.feed(&text[..split]).is_empty());
        assert_eq!(framer.feed(&text[split..]), vec!["data: café ✈"]);
    }

    #[test]
    fn byte_at_a_time_matches_whole_input() {
        let input = b"one\ntwo\n\nthree\nfour";
        let mut whole = LineFramer::new();
        let mut expected = whole.feed(input);
        expected.extend(whole.finish());

        let mut framer = LineFramer::new();
        let mut got = Vec::new();
        for byte in input {
            got.extend(framer.feed(std::slice::from_ref(byte)));
        }
        got.extend(framer.finish());
        assert_eq!(got, expected);
    }
}
