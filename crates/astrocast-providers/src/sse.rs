//! Minimal server-sent-events decoding: yields the payload of each `data:`
//! line. Event names, ids, and comments are ignored.

use std::collections::VecDeque;

use futures::stream::{self, BoxStream, Stream, StreamExt};

use crate::error::ProviderError;
use crate::provider::StreamEvent;

/// Outcome of interpreting one `data:` payload.
#[derive(Debug)]
pub(crate) enum SseStep {
    Emit(StreamEvent),
    /// One payload carrying several events, delivered in order.
    EmitMany(Vec<StreamEvent>),
    Skip,
    Done,
}

/// Split a byte stream into `data:` payloads. Lines may be split across
/// chunks; a trailing unterminated line is flushed when the body ends.
pub(crate) fn data_lines<S, B>(body: S) -> impl Stream<Item = Result<String, ProviderError>>
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + Unpin,
    B: AsRef<[u8]>,
{
    stream::unfold(
        (body, Vec::<u8>::new(), false),
        |(mut body, mut buffer, mut finished)| async move {
            loop {
                if let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=pos).collect();
                    if let Some(data) = parse_data_line(&line) {
                        return Some((Ok(data), (body, buffer, finished)));
                    }
                    continue;
                }
                if finished {
                    if buffer.is_empty() {
                        return None;
                    }
                    let line = std::mem::take(&mut buffer);
                    return parse_data_line(&line).map(|data| (Ok(data), (body, buffer, finished)));
                }
                match body.next().await {
                    Some(Ok(chunk)) => buffer.extend_from_slice(chunk.as_ref()),
                    Some(Err(e)) => {
                        finished = true;
                        buffer.clear();
                        return Some((Err(ProviderError::Http(e)), (body, buffer, finished)));
                    }
                    None => finished = true,
                }
            }
        },
    )
}

fn parse_data_line(raw: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim_end_matches(['\n', '\r']);
    let data = line.strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data);
    if data.is_empty() {
        return None;
    }
    Some(data.to_owned())
}

struct EventState<L, F> {
    provider: &'static str,
    lines: L,
    interpret: F,
    pending: VecDeque<StreamEvent>,
    finished: bool,
}

/// Turn a response body into provider events using a per-vendor payload
/// interpreter. The stream ends at the first [`SseStep::Done`] or error. A
/// body that closes before the terminal event yields a final
/// [`ProviderError::Stream`].
pub(crate) fn event_stream<F>(
    provider: &'static str,
    response: reqwest::Response,
    interpret: F,
) -> BoxStream<'static, Result<StreamEvent, ProviderError>>
where
    F: Fn(&str) -> Result<SseStep, ProviderError> + Send + 'static,
{
    events(provider, data_lines(response.bytes_stream().boxed()).boxed(), interpret)
}

fn events<L, F>(
    provider: &'static str,
    lines: L,
    interpret: F,
) -> BoxStream<'static, Result<StreamEvent, ProviderError>>
where
    L: Stream<Item = Result<String, ProviderError>> + Send + Unpin + 'static,
    F: Fn(&str) -> Result<SseStep, ProviderError> + Send + 'static,
{
    let state = EventState {
        provider,
        lines,
        interpret,
        pending: VecDeque::new(),
        finished: false,
    };
    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((Ok(event), state));
            }
            if state.finished {
                return None;
            }
            let Some(line) = state.lines.next().await else {
                state.finished = true;
                let err = ProviderError::Stream {
                    provider: state.provider.to_owned(),
                    message: "stream ended before terminal event".to_owned(),
                };
                return Some((Err(err), state));
            };
            match line.and_then(|data| (state.interpret)(&data)) {
                Ok(SseStep::Emit(event)) => return Some((Ok(event), state)),
                Ok(SseStep::EmitMany(events)) => state.pending.extend(events),
                Ok(SseStep::Skip) => {}
                Ok(SseStep::Done) => return None,
                Err(e) => {
                    state.finished = true;
                    return Some((Err(e), state));
                }
            }
        }
    })
    .boxed()
}
