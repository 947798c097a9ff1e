use std::fmt::Display;

use futures::StreamExt as _;
use futures::stream;
use tracing::warn;

/// Splits a chunked byte stream into text lines.
///
/// Chunk boundaries may fall anywhere, including inside a multi-byte
/// character; bytes are only decoded once a full line is buffered.
#[derive(Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
    /// Prefix of `buf` already known to contain no newline.
    scanned: usize,
}

impl LineDecoder {
    /// Buffers `chunk` and returns every line it completes.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(pos) = self.buf[from..].iter().position(|b| *b == b'\n') {
            let end = from + pos;
            lines.push(decode_line(&self.buf[start..end]));
            start = end + 1;
            from = start;
        }
        self.buf.drain(..start);
        self.scanned = self.buf.len();
        lines
    }

    /// Bytes held back waiting for a line terminator.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Returns the trailing unterminated line, if any.
    pub fn finish(&mut self) -> Option<String> {
        self.scanned = 0;
        if self.buf.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buf);
        Some(decode_line(&rest))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Adapts an HTTP body stream into a line stream.
///
/// A read error ends the line stream early; the error is logged here because
/// the transcoder only observes end-of-input.
pub fn lines_from_bytes<S, E>(bytes_stream: S) -> impl futures::Stream<Item = String> + Send
where
    S: futures::Stream<Item = Result<bytes::Bytes, E>> + Send + Unpin,
    E: Display + Send,
{
    struct State<S> {
        bytes_stream: S,
        decoder: LineDecoder,
        pending: std::collections::VecDeque<String>,
        done: bool,
    }

    stream::unfold(
        State {
            bytes_stream,
            decoder: LineDecoder::default(),
            pending: std::collections::VecDeque::new(),
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(line) = state.pending.pop_front() {
                    return Some((line, state));
                }
                if state.done {
                    return None;
                }
                match state.bytes_stream.next().await {
                    Some(Ok(chunk)) => state.pending.extend(state.decoder.push_chunk(&chunk)),
                    Some(Err(e)) => {
                        warn!(error = %e, "upstream read failed; ending line stream");
                        state.done = true;
                    }
                    None => {
                        state.pending.extend(state.decoder.finish());
                        state.done = true;
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn decoder_handles_partial_chunk_boundaries() {
        let mut decoder = LineDecoder::default();
        assert!(decoder.push_chunk(b"data: te").is_empty());
        assert_eq!(decoder.push_chunk(b"xt\ndata: {\"msg\""), vec!["data: text"]);
        assert_eq!(
            decoder.push_chunk(b":\"hi\"}\r\n\r\n"),
            vec!["data: {\"msg\":\"hi\"}", ""]
        );
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn decoder_joins_split_multibyte_characters() {
        let text = "data: {\"msg\":\"你好\"}\n".as_bytes();
        let (a, b) = text.split_at(16);
        let mut decoder = LineDecoder::default();
        assert!(decoder.push_chunk(a).is_empty());
        assert_eq!(decoder.push_chunk(b), vec!["data: {\"msg\":\"你好\"}"]);
    }

    #[test]
    fn byte_at_a_time_feed_only_scans_new_bytes() {
        let input = "data: text\r\ndata: {\"msg\":\"好\"}\n";
        let mut decoder = LineDecoder::default();
        let mut lines = Vec::new();
        for byte in input.as_bytes() {
            lines.extend(decoder.push_chunk(std::slice::from_ref(byte)));
        }
        assert_eq!(lines, vec!["data: text", r#"data: {"msg":"好"}"#]);
        assert_eq!(decoder.buffered_len(), 0);

        assert!(decoder.push_chunk(b"data: par").is_empty());
        assert_eq!(decoder.buffered_len(), 9);
        assert_eq!(decoder.push_chunk(b"tial\nda"), vec!["data: partial"]);
        assert_eq!(decoder.finish().as_deref(), Some("da"));
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn finish_flushes_unterminated_line() {
        let mut decoder = LineDecoder::default();
        assert!(decoder.push_chunk(b"data: [DONE]").is_empty());
        assert_eq!(decoder.finish().as_deref(), Some("data: [DONE]"));
        assert_eq!(decoder.finish(), None);
    }

    #[tokio::test]
    async fn read_error_ends_line_stream() {
        let chunks: Vec<Result<Bytes, String>> = vec![
            Ok(Bytes::from_static(b"data: text\ndata: {\"msg\"")),
            Err("connection reset".to_string()),
            Ok(Bytes::from_static(b"data: [DONE]\n")),
        ];
        let lines: Vec<String> = lines_from_bytes(stream::iter(chunks)).collect().await;
        assert_eq!(lines, vec!["data: text"]);
    }

    #[tokio::test]
    async fn trailing_line_is_delivered_at_end_of_body() {
        let chunks: Vec<Result<Bytes, String>> = vec![
            Ok(Bytes::from_static(b"data: status\n")),
            Ok(Bytes::from_static(b"data: [DONE]")),
        ];
        let lines: Vec<String> = lines_from_bytes(stream::iter(chunks)).collect().await;
        assert_eq!(lines, vec!["data: status", "data: [DONE]"]);
    }
}
