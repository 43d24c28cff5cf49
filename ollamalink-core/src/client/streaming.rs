//! NDJSON streaming support
//!
//! The service streams responses as newline-delimited JSON, one frame per
//! line (not SSE). [`NdjsonLines`] turns a raw byte stream into lines, and
//! the two reader state machines below interpret those lines: one
//! accumulates a single completion, the other collects every chat frame.
//! Both run against the [`LineSource`] seam, so any line-oriented transport
//! works in place of HTTP.

use crate::client::listener::{ChatListener, StreamListener};
use crate::error::{ClientError, ClientResult};
use crate::protocol::ResponseFrame;
use crate::trace::{Direction, TraceBuffer};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::{debug, warn};

/// A line-oriented reader over a response body.
///
/// Yields `Ok(None)` at end of stream; transport faults surface as errors.
#[async_trait]
pub trait LineSource: Send {
    async fn next_line(&mut self) -> ClientResult<Option<String>>;
}

/// Adapter from a byte stream to NDJSON lines.
///
/// Buffers chunks as they arrive and splits on `\n` (a trailing `\r` is
/// stripped). A final unterminated line is yielded once the stream ends.
pub struct NdjsonLines<S> {
    stream: S,
    buffer: Vec<u8>,
    exhausted: bool,
}

impl<S> NdjsonLines<S>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: Vec::new(),
            exhausted: false,
        }
    }

    fn take_line(&mut self, end: usize) -> String {
        let rest = self.buffer.split_off(end + 1);
        let mut line = std::mem::replace(&mut self.buffer, rest);
        line.pop(); // the newline itself
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        String::from_utf8_lossy(&line).into_owned()
    }
}

#[async_trait]
impl<S> LineSource for NdjsonLines<S>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + Unpin,
{
    async fn next_line(&mut self) -> ClientResult<Option<String>> {
        loop {
            if let Some(end) = self.buffer.iter().position(|&b| b == b'\n') {
                return Ok(Some(self.take_line(end)));
            }
            if self.exhausted {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let line = std::mem::take(&mut self.buffer);
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }
            match self.stream.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => return Err(e.into()),
                None => self.exhausted = true,
            }
        }
    }
}

/// Whether a line is an in-band error object.
///
/// The service signals errors as stream content, a JSON object whose first
/// field name starts with `error`.
fn is_error_line(line: &str) -> bool {
    line.trim_start().starts_with("{\"error")
}

/// Single-result state machine for the completion endpoint.
///
/// Reads frames until the terminal one, concatenating the partial fragments
/// in arrival order. The returned terminal frame carries the full
/// concatenation in `response`, not just the last delta. Returns `Ok(None)`
/// when the listener declines continuation; nothing past that line is read
/// or recorded. An in-band error line yields a synthesized terminal frame,
/// which is a normal result, not a fault.
///
/// # Errors
///
/// [`ClientError::StreamTruncated`] if the stream ends without a terminal
/// frame, [`ClientError::Parse`] for an undecodable line, and transport
/// faults from the line source.
pub async fn read_generate<L>(
    source: &mut dyn LineSource,
    trace: &TraceBuffer,
    endpoint: &str,
    listener: &mut L,
) -> ClientResult<Option<ResponseFrame>>
where
    L: StreamListener + ?Sized,
{
    let mut assembled = String::new();
    while let Some(line) = source.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        trace.record(Direction::Inbound, endpoint, &line);
        if is_error_line(&line) {
            warn!(endpoint, "service reported an in-band error");
            let frame = ResponseFrame::in_band_error(&line);
            listener.on_frame(&frame);
            return Ok(Some(frame));
        }
        let mut frame: ResponseFrame = serde_json::from_str(&line)?;
        if frame.done {
            frame.response = assembled;
            return Ok(Some(frame));
        }
        assembled.push_str(&frame.response);
        if !listener.on_frame(&frame) {
            debug!(endpoint, "listener declined continuation, aborting read");
            return Ok(None);
        }
    }
    Err(ClientError::StreamTruncated)
}

/// List-accumulation state machine for the chat endpoint.
///
/// Collects every frame in arrival order and stops after the terminal one.
/// An in-band error line appends a synthesized terminal frame and ends the
/// call immediately. The listener is informational only; chat reads are not
/// cancellable. If the stream ends without a terminal frame, whatever was
/// collected is returned.
pub async fn read_chat(
    source: &mut dyn LineSource,
    trace: &TraceBuffer,
    endpoint: &str,
    mut listener: Option<&mut dyn ChatListener>,
) -> ClientResult<Vec<ResponseFrame>> {
    let mut frames = Vec::new();
    while let Some(line) = source.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        trace.record(Direction::Inbound, endpoint, &line);
        if is_error_line(&line) {
            warn!(endpoint, "service reported an in-band error");
            let frame = ResponseFrame::in_band_error(&line);
            if let Some(listener) = listener.as_deref_mut() {
                listener.on_frame(&frame);
            }
            frames.push(frame);
            return Ok(frames);
        }
        let frame: ResponseFrame = serde_json::from_str(&line)?;
        let done = frame.done;
        if let Some(listener) = listener.as_deref_mut() {
            listener.on_frame(&frame);
        }
        frames.push(frame);
        if done {
            break;
        }
    }
    Ok(frames)
}
