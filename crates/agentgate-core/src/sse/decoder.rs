//! Byte chunk to line framing.

/// Splits arbitrary byte chunks into complete text lines.
///
/// Lines end at `\n`; a trailing `\r` is dropped. Bytes after the last
/// newline are held until the next chunk, so a multi-byte character or a
/// line split across chunk boundaries is reassembled before decoding.
#[derive(Debug, Default)]
pub struct LineDecoder {
    pending: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every line it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|b| *b == b'\n') {
            self.pending.extend_from_slice(&rest[..pos]);
            lines.push(Self::decode(&std::mem::take(&mut self.pending)));
            rest = &rest[pos + 1..];
        }
        self.pending.extend_from_slice(rest);
        lines
    }

    /// Flush the unterminated tail at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        Some(Self::decode(&std::mem::take(&mut self.pending)))
    }

    fn decode(raw: &[u8]) -> String {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        String::from_utf8_lossy(raw).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_lines_within_one_chunk() {
        let mut dec = LineDecoder::new();
        let lines = dec.push(b"event: a\ndata: {}\n\n");
        assert_eq!(lines, vec!["event: a", "data: {}", ""]);
        assert_eq!(dec.finish(), None);
    }

    #[test]
    fn reassembles_lines_across_chunks() {
        let mut dec = LineDecoder::new();
        assert!(dec.push(b"data: {\"te").is_empty());
        assert_eq!(dec.push(b"xt\":\"hi\"}\n"), vec!["data: {\"text\":\"hi\"}"]);
    }

    #[test]
    fn strips_carriage_returns() {
        let mut dec = LineDecoder::new();
        assert_eq!(dec.push(b"event: x\r\n\r\n"), vec!["event: x", ""]);
    }

    #[test]
    fn keeps_split_multibyte_characters_intact() {
        let bytes = "data: ⏳\n".as_bytes();
        let (head, tail) = bytes.split_at(8);
        let mut dec = LineDecoder::new();
        assert!(dec.push(head).is_empty());
        assert_eq!(dec.push(tail), vec!["data: ⏳"]);
    }

    #[test]
    fn finish_returns_unterminated_tail() {
        let mut dec = LineDecoder::new();
        dec.push(b"data: tail");
        assert_eq!(dec.finish().as_deref(), Some("data: tail"));
        assert_eq!(dec.finish(), None);
    }
}
