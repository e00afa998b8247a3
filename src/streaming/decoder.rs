use bytes::BytesMut;

use crate::models::gateway::StreamChunk;

/// Prefix of an SSE data line
pub const DATA_PREFIX: &str = "data: ";

/// Payload of the terminal data line
pub const DONE_SENTINEL: &str = "[DONE]";

/// Lifecycle of one decode.
///
/// Every state except `Streaming` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    Streaming,
    /// Sentinel seen or the byte stream closed
    Done,
    /// The underlying read failed
    Failed,
    /// The caller abandoned the decode
    Cancelled,
}

impl DecoderState {
    pub fn is_terminal(self) -> bool {
        self != DecoderState::Streaming
    }
}

/// Bounds on how long an unfinished JSON payload is held back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderLimits {
    /// A held-back payload larger than this is dropped
    pub max_pending_bytes: usize,
    /// Number of continuation lines a held-back payload may absorb
    pub max_rebuffer_attempts: usize,
}

impl Default for DecoderLimits {
    fn default() -> Self {
        Self {
            max_pending_bytes: 64 * 1024,
            max_rebuffer_attempts: 8,
        }
    }
}

/// A `data:` payload whose JSON ended before the line did.
///
/// It sits logically at the front of the carry buffer and is retried with
/// the next physical line appended.
#[derive(Debug)]
struct PendingPayload {
    json: String,
    attempts: usize,
}

/// Incremental decoder for chat-completion SSE streams.
///
/// Bytes go in through [`feed`](Self::feed) in whatever chunks the network
/// delivers; text deltas come out in stream order. Lines are only decoded
/// once their `\n` has arrived, so UTF-8 sequences split across chunks
/// survive intact.
pub struct ChatStreamDecoder {
    buffer: BytesMut,
    pending: Option<PendingPayload>,
    reply: String,
    state: DecoderState,
    limits: DecoderLimits,
    deltas_emitted: usize,
}

impl ChatStreamDecoder {
    pub fn new() -> Self {
        Self::with_limits(DecoderLimits::default())
    }

    pub fn with_limits(limits: DecoderLimits) -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
            pending: None,
            reply: String::new(),
            state: DecoderState::Streaming,
            limits,
            deltas_emitted: 0,
        }
    }

    /// Feed a chunk and return the deltas completed by it
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        if self.state.is_terminal() {
            return Vec::new();
        }

        self.buffer.extend_from_slice(chunk);
        let mut deltas = Vec::new();

        while self.state == DecoderState::Streaming {
            let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') else {
                break;
            };
            let raw = self.buffer.split_to(newline + 1);
            let line = String::from_utf8_lossy(&raw[..newline]);
            self.process_line(&line, &mut deltas);
        }

        if self.state.is_terminal() {
            self.release();
        }

        deltas
    }

    /// Signal that the byte stream closed normally.
    ///
    /// A trailing line without `\n` is processed as the last line.
    pub fn finish(&mut self) -> Vec<String> {
        if self.state.is_terminal() {
            return Vec::new();
        }

        let mut deltas = Vec::new();
        if !self.buffer.is_empty() {
            let rest = self.buffer.split();
            let line = String::from_utf8_lossy(&rest).into_owned();
            self.process_line(&line, &mut deltas);
        }

        if let Some(pending) = self.pending.take() {
            tracing::debug!(
                size = pending.json.len(),
                "Discarding unfinished data payload at end of stream"
            );
        }

        if self.state == DecoderState::Streaming {
            self.state = DecoderState::Done;
        }
        self.release();

        tracing::debug!(
            deltas = self.deltas_emitted,
            reply_len = self.reply.len(),
            "Chat stream finished"
        );

        deltas
    }

    /// Mark the decode as failed. The reply built so far is kept.
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = DecoderState::Failed;
        }
        self.release();
    }

    /// Mark the decode as cancelled by the caller. The reply built so far is kept.
    pub fn cancel(&mut self) {
        if !self.state.is_terminal() {
            self.state = DecoderState::Cancelled;
        }
        self.release();
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Concatenation of every delta emitted so far
    pub fn reply(&self) -> &str {
        &self.reply
    }

    pub fn into_reply(self) -> String {
        self.reply
    }

    pub fn deltas_emitted(&self) -> usize {
        self.deltas_emitted
    }

    /// Bytes currently held in the carry buffer, including a held-back payload
    pub fn buffered_len(&self) -> usize {
        self.buffer.len() + self.pending.as_ref().map_or(0, |p| p.json.len())
    }

    fn process_line(&mut self, line: &str, deltas: &mut Vec<String>) {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if let Some(pending) = self.pending.take() {
            if line.starts_with(DATA_PREFIX) {
                tracing::warn!(
                    size = pending.json.len(),
                    "Dropping unfinished data payload, next frame started"
                );
            } else {
                let mut json = pending.json;
                json.push('\n');
                json.push_str(line);
                self.parse_payload(json, pending.attempts + 1, deltas);
                return;
            }
        }

        if line.starts_with(':') || line.trim().is_empty() {
            return;
        }

        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            tracing::debug!(line = %line, "Skipping non-data line");
            return;
        };

        let payload = payload.trim();
        if payload == DONE_SENTINEL {
            tracing::debug!("Received stream sentinel");
            self.state = DecoderState::Done;
            return;
        }

        self.parse_payload(payload.to_string(), 0, deltas);
    }

    fn parse_payload(&mut self, json: String, attempts: usize, deltas: &mut Vec<String>) {
        match serde_json::from_str::<StreamChunk>(json.trim()) {
            Ok(chunk) => {
                if let Some(content) = chunk.into_content() {
                    self.reply.push_str(&content);
                    self.deltas_emitted += 1;
                    deltas.push(content);
                }
            }
            Err(e) if e.is_eof() => {
                if json.len() > self.limits.max_pending_bytes
                    || attempts >= self.limits.max_rebuffer_attempts
                {
                    tracing::warn!(
                        size = json.len(),
                        attempts,
                        "Dropping data payload that never completed"
                    );
                } else {
                    tracing::debug!(size = json.len(), attempts, "Holding back unfinished data payload");
                    self.pending = Some(PendingPayload { json, attempts });
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, payload = %json, "Dropping malformed data payload");
            }
        }
    }

    fn release(&mut self) {
        self.buffer = BytesMut::new();
        self.pending = None;
    }
}

impl Default for ChatStreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(content: &str) -> String {
        format!(
            "data: {}\n",
            serde_json::json!({"choices": [{"delta": {"content": content}}]})
        )
    }

    #[test]
    fn test_single_delta() {
        let mut decoder = ChatStreamDecoder::new();
        let deltas = decoder.feed(data("Hello").as_bytes());
        assert_eq!(deltas, vec!["Hello"]);
        assert_eq!(decoder.reply(), "Hello");
        assert_eq!(decoder.state(), DecoderState::Streaming);
    }

    #[test]
    fn test_incomplete_line_waits_for_newline() {
        let mut decoder = ChatStreamDecoder::new();
        assert!(decoder.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel").is_empty());
        assert!(decoder.buffered_len() > 0);

        let deltas = decoder.feed(b"lo\"}}]}\n");
        assert_eq!(deltas, vec!["Hello"]);
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut decoder = ChatStreamDecoder::new();
        let input = data("a").replace('\n', "\r\n") + "data: [DONE]\r\n";
        let deltas = decoder.feed(input.as_bytes());
        assert_eq!(deltas, vec!["a"]);
        assert_eq!(decoder.state(), DecoderState::Done);
    }

    #[test]
    fn test_comments_blank_and_foreign_lines_ignored() {
        let mut decoder = ChatStreamDecoder::new();
        let input = format!(
            ": keep-alive\n\n   \nevent: message\nid: 7\ndata:{}\n{}",
            r#"{"choices":[{"delta":{"content":"no space"}}]}"#,
            data("yes")
        );
        let deltas = decoder.feed(input.as_bytes());
        assert_eq!(deltas, vec!["yes"]);
    }

    #[test]
    fn test_done_ignores_trailing_bytes() {
        let mut decoder = ChatStreamDecoder::new();
        let input = format!("{}data: [DONE]\n{}", data("one"), data("two"));
        let deltas = decoder.feed(input.as_bytes());
        assert_eq!(deltas, vec!["one"]);
        assert_eq!(decoder.state(), DecoderState::Done);
        assert_eq!(decoder.buffered_len(), 0);

        assert!(decoder.feed(data("three").as_bytes()).is_empty());
        assert!(decoder.finish().is_empty());
        assert_eq!(decoder.reply(), "one");
    }

    #[test]
    fn test_done_sentinel_is_trimmed() {
        let mut decoder = ChatStreamDecoder::new();
        decoder.feed(b"data:   [DONE]   \n");
        assert_eq!(decoder.state(), DecoderState::Done);
    }

    #[test]
    fn test_malformed_line_is_dropped() {
        let mut decoder = ChatStreamDecoder::new();
        let input = format!("data: {{not json}}\ndata: [1,2]\n{}", data("after"));
        let deltas = decoder.feed(input.as_bytes());
        assert_eq!(deltas, vec!["after"]);
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn test_payload_continued_on_next_line() {
        let mut decoder = ChatStreamDecoder::new();
        let deltas =
            decoder.feed(b"data: {\"choices\":[{\"delta\":\n{\"content\":\"joined\"}}]}\n");
        assert_eq!(deltas, vec!["joined"]);
    }

    #[test]
    fn test_unfinished_payload_dropped_when_next_frame_starts() {
        let mut decoder = ChatStreamDecoder::new();
        let input = format!("data: {{\"choices\":[{{\n{}", data("next"));
        let deltas = decoder.feed(input.as_bytes());
        assert_eq!(deltas, vec!["next"]);
        assert_eq!(decoder.reply(), "next");
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn test_rebuffer_attempts_capped() {
        let mut decoder = ChatStreamDecoder::with_limits(DecoderLimits {
            max_pending_bytes: 1024,
            max_rebuffer_attempts: 2,
        });
        decoder.feed(b"data: {\"choices\":[\n");
        decoder.feed(b"\n");
        assert!(decoder.buffered_len() > 0);
        decoder.feed(b"\n");
        assert_eq!(decoder.buffered_len(), 0);
        assert_eq!(decoder.state(), DecoderState::Streaming);
    }

    #[test]
    fn test_oversized_pending_payload_dropped() {
        let mut decoder = ChatStreamDecoder::with_limits(DecoderLimits {
            max_pending_bytes: 16,
            max_rebuffer_attempts: 8,
        });
        decoder.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"long enough\"\n");
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn test_finish_processes_trailing_line() {
        let mut decoder = ChatStreamDecoder::new();
        decoder.feed(data("a").as_bytes());
        decoder.feed(data("b").trim_end().as_bytes());
        let deltas = decoder.finish();
        assert_eq!(deltas, vec!["b"]);
        assert_eq!(decoder.state(), DecoderState::Done);
        assert_eq!(decoder.reply(), "ab");
    }

    #[test]
    fn test_fail_keeps_partial_reply() {
        let mut decoder = ChatStreamDecoder::new();
        decoder.feed(data("partial").as_bytes());
        decoder.feed(b"data: {\"cho");
        decoder.fail();
        assert_eq!(decoder.state(), DecoderState::Failed);
        assert_eq!(decoder.reply(), "partial");
        assert_eq!(decoder.buffered_len(), 0);
        assert!(decoder.feed(data("late").as_bytes()).is_empty());
    }

    #[test]
    fn test_terminal_states_do_not_change() {
        let mut decoder = ChatStreamDecoder::new();
        decoder.feed(b"data: [DONE]\n");
        decoder.fail();
        decoder.cancel();
        assert_eq!(decoder.state(), DecoderState::Done);

        let mut decoder = ChatStreamDecoder::new();
        decoder.cancel();
        assert!(decoder.finish().is_empty());
        assert_eq!(decoder.state(), DecoderState::Cancelled);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut decoder = ChatStreamDecoder::new();
        let mut input = b"data: {\"choices\":[{\"delta\":{\"content\":\"a".to_vec();
        input.push(0xff);
        input.extend_from_slice(b"b\"}}]}\n");
        let deltas = decoder.feed(&input);
        assert_eq!(deltas, vec!["a\u{fffd}b"]);
    }
}
