use futures::stream::{AbortHandle, Abortable};
use futures::{Stream, StreamExt};
use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;
use std::task::{Context, Poll};

use super::decoder::{ChatStreamDecoder, DecoderLimits, DecoderState};
use crate::error::{AssistantError, Result};

/// Decode a chat SSE body into a stream of text deltas
pub fn decode<S>(stream: S) -> DeltaStream<S> {
    DeltaStream::with_limits(stream, DecoderLimits::default())
}

/// Lazy, non-restartable stream of reply deltas over a byte stream.
///
/// Yields one `Ok(delta)` per decoded text fragment. A read error is
/// surfaced once as `Err(AssistantError::Stream)` and ends the stream.
/// Aborting through [`abort_handle`](Self::abort_handle) ends it promptly
/// and drops the body stream together with the carry buffer.
///
/// [`reply`](Self::reply) only ever holds deltas that were yielded, so a
/// chunk decoded ahead of the consumer never leaks into it.
pub struct DeltaStream<S> {
    inner: Option<Abortable<S>>,
    abort: AbortHandle,
    decoder: ChatStreamDecoder,
    ready: VecDeque<String>,
    surfaced: String,
}

impl<S> DeltaStream<S> {
    pub fn with_limits(stream: S, limits: DecoderLimits) -> Self {
        let (abort, registration) = AbortHandle::new_pair();
        Self {
            inner: Some(Abortable::new(stream, registration)),
            abort,
            decoder: ChatStreamDecoder::with_limits(limits),
            ready: VecDeque::new(),
            surfaced: String::new(),
        }
    }

    /// Handle that cancels this decode from anywhere
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn state(&self) -> DecoderState {
        self.decoder.state()
    }

    /// Concatenation of the deltas yielded so far
    pub fn reply(&self) -> &str {
        &self.surfaced
    }

    pub fn into_reply(self) -> String {
        self.surfaced
    }

    fn shut_down(&mut self, cancelled: bool) {
        self.inner = None;
        if cancelled {
            self.ready.clear();
            self.decoder.cancel();
        }
    }
}

impl<S, B, E> DeltaStream<S>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
{
    /// Drain the stream, handing every delta to `on_delta`.
    ///
    /// On a read error the partial reply stays available through
    /// [`reply`](Self::reply).
    pub async fn for_each_delta<F>(&mut self, mut on_delta: F) -> Result<()>
    where
        F: FnMut(&str),
    {
        while let Some(item) = self.next().await {
            on_delta(&item?);
        }
        Ok(())
    }
}

impl<S, B, E> Stream for DeltaStream<S>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
{
    type Item = Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        loop {
            if this.abort.is_aborted() {
                if this.inner.is_some() || !this.ready.is_empty() {
                    tracing::debug!(
                        reply_len = this.surfaced.len(),
                        discarded = this.ready.len(),
                        "Chat stream aborted"
                    );
                }
                this.shut_down(true);
                return Poll::Ready(None);
            }

            if let Some(delta) = this.ready.pop_front() {
                this.surfaced.push_str(&delta);
                return Poll::Ready(Some(Ok(delta)));
            }

            let Some(inner) = this.inner.as_mut() else {
                return Poll::Ready(None);
            };

            match inner.poll_next_unpin(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(chunk))) => {
                    let deltas = this.decoder.feed(chunk.as_ref());
                    this.ready.extend(deltas);
                    if this.decoder.state().is_terminal() {
                        this.shut_down(false);
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    tracing::error!(
                        error = %e,
                        reply_len = this.surfaced.len(),
                        "Chat stream read failed"
                    );
                    this.decoder.fail();
                    this.shut_down(false);
                    return Poll::Ready(Some(Err(AssistantError::Stream(e.to_string()))));
                }
                Poll::Ready(None) => {
                    let deltas = this.decoder.finish();
                    this.ready.extend(deltas);
                    this.shut_down(false);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::stream;

    fn chunks(parts: &[&str]) -> impl Stream<Item = std::result::Result<Bytes, String>> + Unpin {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::copy_from_slice(p.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_yields_deltas_in_order() {
        let mut deltas = decode(chunks(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\ndata: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n",
            "data: [DONE]\n",
        ]));

        let mut seen = Vec::new();
        deltas.for_each_delta(|d| seen.push(d.to_string())).await.unwrap();

        assert_eq!(seen, vec!["a", "b"]);
        assert_eq!(deltas.reply(), "ab");
        assert_eq!(deltas.state(), DecoderState::Done);
    }

    #[tokio::test]
    async fn test_read_error_ends_stream() {
        let parts: Vec<std::result::Result<Bytes, String>> = vec![
            Ok(Bytes::from_static(
                b"data: {\"choices\":[{\"delta\":{\"content\":\"half\"}}]}\n",
            )),
            Err("connection reset".to_string()),
            Ok(Bytes::from_static(
                b"data: {\"choices\":[{\"delta\":{\"content\":\"never\"}}]}\n",
            )),
        ];
        let mut deltas = decode(stream::iter(parts));

        assert_eq!(deltas.next().await.unwrap().unwrap(), "half");
        let err = deltas.next().await.unwrap().unwrap_err();
        assert!(matches!(err, AssistantError::Stream(ref msg) if msg.contains("connection reset")));
        assert!(deltas.next().await.is_none());
        assert_eq!(deltas.state(), DecoderState::Failed);
        assert_eq!(deltas.reply(), "half");
    }

    #[tokio::test]
    async fn test_abort_discards_unyielded_deltas() {
        let mut deltas = decode(chunks(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\ndata: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n",
        ]));

        assert_eq!(deltas.next().await.unwrap().unwrap(), "a");
        deltas.abort_handle().abort();

        assert!(deltas.next().await.is_none());
        assert_eq!(deltas.state(), DecoderState::Cancelled);
        assert_eq!(deltas.reply(), "a");
        assert_eq!(deltas.into_reply(), "a");
    }
}
