use std::collections::VecDeque;

use futures::StreamExt as _;
use futures::stream;
use serde::Serialize as _;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::chunk::{ChatCompletion, ChunkBuilder, OutputEvent};
use crate::classify::{Category, LineKind, classify};
use crate::errors::TranscodeError;

/// Finish reason reported when no text payload supplies one.
pub const DEFAULT_FINISH_REASON: &str = "stop";

/// Mutable state owned by one stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscoderState {
    pub current_category: Category,
    pub finish_reason: String,
}

impl Default for TranscoderState {
    fn default() -> Self {
        Self {
            current_category: Category::Unset,
            finish_reason: DEFAULT_FINISH_REASON.to_string(),
        }
    }
}

#[derive(serde::Serialize)]
struct SearchDoc<'a> {
    url: &'a Value,
    title: &'a Value,
}

/// Writes `", "` between items and `": "` after keys, leaving non-ASCII text
/// unescaped.
struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> std::io::Result<()>
    where
        W: ?Sized + std::io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> std::io::Result<()>
    where
        W: ?Sized + std::io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> std::io::Result<()>
    where
        W: ?Sized + std::io::Write,
    {
        writer.write_all(b": ")
    }
}

fn encode_docs(docs: &[SearchDoc<'_>], category: Category) -> Result<String, TranscodeError> {
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    docs.serialize(&mut serializer)
        .map_err(|e| TranscodeError::malformed(category, e))?;
    String::from_utf8(buf).map_err(|e| TranscodeError::malformed(category, e))
}

/// Single-pass transcoder from Yuanbao SSE lines to normalized events.
///
/// Create one per upstream stream. After the terminal sentinel the transcoder
/// is finished and ignores further input. After a fatal error it is failed
/// and every later line returns that same error.
#[derive(Debug)]
pub struct Transcoder {
    state: TranscoderState,
    builder: ChunkBuilder,
    finished: bool,
    failure: Option<TranscodeError>,
}

impl Transcoder {
    pub fn new(builder: ChunkBuilder) -> Self {
        Self {
            state: TranscoderState::default(),
            builder,
            finished: false,
            failure: None,
        }
    }

    pub fn state(&self) -> &TranscoderState {
        &self.state
    }

    pub fn builder(&self) -> &ChunkBuilder {
        &self.builder
    }

    /// True once the terminal sentinel has been processed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The fatal error that stopped this transcoder, if any.
    pub fn failure(&self) -> Option<&TranscodeError> {
        self.failure.as_ref()
    }

    /// Processes one raw line and returns the events it produces.
    pub fn push_line(&mut self, line: &str) -> Result<Vec<OutputEvent>, TranscodeError> {
        let mut out = Vec::new();
        self.push_line_into(line, &mut out)?;
        Ok(out)
    }

    fn push_line_into<E: Extend<OutputEvent>>(
        &mut self,
        line: &str,
        out: &mut E,
    ) -> Result<(), TranscodeError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        if self.finished {
            debug!("line after terminal sentinel ignored");
            return Ok(());
        }
        match classify(line) {
            LineKind::Ignorable => {}
            LineKind::CategoryMarker(category) => {
                debug!(from = %self.state.current_category, to = %category, "category switch");
                self.state.current_category = category;
            }
            LineKind::TerminalSentinel => {
                let finish_reason = self.state.finish_reason.clone();
                debug!(finish_reason = %finish_reason, "terminal sentinel");
                out.extend([
                    OutputEvent::Chunk(self.builder.build("", Some(finish_reason))),
                    OutputEvent::Finish,
                ]);
                self.finished = true;
            }
            LineKind::JsonPayload(raw) => {
                if let Err(err) = self.dispatch_payload(raw, out) {
                    self.failure = Some(err.clone());
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    fn dispatch_payload<E: Extend<OutputEvent>>(
        &mut self,
        raw: &str,
        out: &mut E,
    ) -> Result<(), TranscodeError> {
        let category = self.state.current_category;
        let payload: Map<String, Value> =
            serde_json::from_str(raw).map_err(|e| TranscodeError::malformed(category, e))?;

        match category {
            Category::Text => {
                let msg = truthy_str(&payload, category, "msg")?;
                let reason = truthy_str(&payload, category, "stopReason")?;
                if let Some(msg) = msg {
                    self.emit(category, msg, out);
                }
                if let Some(reason) = reason {
                    self.state.finish_reason = reason.to_string();
                }
            }
            Category::Reasoning => {
                let content = required_str(&payload, category, "content")?;
                self.emit(category, content, out);
            }
            Category::SearchResult => {
                let docs = project_docs(&payload, category)?;
                let encoded = encode_docs(&docs, category)?;
                self.emit(category, &encoded, out);
            }
            Category::Unset => debug!("payload before any category marker dropped"),
            Category::Status => {}
        }

        // Evaluated independently of the chain above.
        if category == Category::Status {
            let msg = required_str(&payload, category, "msg")?;
            self.emit(category, msg, out);
        }
        Ok(())
    }

    fn emit<E: Extend<OutputEvent>>(&self, category: Category, body: &str, out: &mut E) {
        debug!(category = %category, len = body.len(), "chunk");
        out.extend([OutputEvent::Chunk(self.builder.build(category.tag(body), None))]);
    }

    /// Pulls lines from `lines` lazily, yielding events until the finish
    /// signal, the first error, or the end of input.
    pub fn transcode_lines<I>(self, lines: I) -> TranscodeLines<I::IntoIter>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        TranscodeLines {
            transcoder: self,
            lines: lines.into_iter(),
            pending: VecDeque::new(),
            done: false,
        }
    }
}

/// `null`, `false`, zero and empty containers count as absent.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

/// Optional string field; a truthy value of any other type is malformed.
fn truthy_str<'a>(
    payload: &'a Map<String, Value>,
    category: Category,
    field: &str,
) -> Result<Option<&'a str>, TranscodeError> {
    match payload.get(field) {
        Some(value) if !is_truthy(value) => Ok(None),
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(TranscodeError::malformed(
            category,
            format!("field `{field}` must be a string, got {other}"),
        )),
    }
}

fn required_str<'a>(
    payload: &'a Map<String, Value>,
    category: Category,
    field: &'static str,
) -> Result<&'a str, TranscodeError> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| TranscodeError::missing(category, field))
}

fn project_docs(
    payload: &Map<String, Value>,
    category: Category,
) -> Result<Vec<SearchDoc<'_>>, TranscodeError> {
    let docs = match payload.get("docs") {
        None => return Ok(Vec::new()),
        Some(Value::Array(docs)) => docs,
        Some(other) => {
            return Err(TranscodeError::malformed(
                category,
                format!("field `docs` must be an array, got {other}"),
            ));
        }
    };
    let mut projected = Vec::with_capacity(docs.len());
    for doc in docs {
        let url = doc
            .get("url")
            .ok_or_else(|| TranscodeError::missing(category, "url"))?;
        let title = doc
            .get("title")
            .ok_or_else(|| TranscodeError::missing(category, "title"))?;
        projected.push(SearchDoc { url, title });
    }
    Ok(projected)
}

/// Synchronous pull iterator returned by [`Transcoder::transcode_lines`].
pub struct TranscodeLines<I> {
    transcoder: Transcoder,
    lines: I,
    pending: VecDeque<OutputEvent>,
    done: bool,
}

impl<I> Iterator for TranscodeLines<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    type Item = Result<OutputEvent, TranscodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            if self.done || self.transcoder.is_finished() {
                return None;
            }
            let Some(line) = self.lines.next() else {
                self.done = true;
                return None;
            };
            if let Err(err) = self
                .transcoder
                .push_line_into(line.as_ref(), &mut self.pending)
            {
                self.done = true;
                self.pending.clear();
                return Some(Err(err));
            }
        }
    }
}

impl<I> std::iter::FusedIterator for TranscodeLines<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
}

/// Asynchronous counterpart of [`Transcoder::transcode_lines`].
///
/// Upstream lines are pulled only when the consumer asks for the next event.
/// A fatal error is yielded once and ends the stream; an input that ends
/// before the sentinel ends the output without [`OutputEvent::Finish`].
pub fn transcode_stream<S>(
    lines: S,
    builder: ChunkBuilder,
) -> impl futures::Stream<Item = Result<OutputEvent, TranscodeError>> + Send
where
    S: futures::Stream<Item = String> + Send + Unpin,
{
    struct State<S> {
        lines: S,
        transcoder: Transcoder,
        pending: VecDeque<OutputEvent>,
    }

    stream::try_unfold(
        State {
            lines,
            transcoder: Transcoder::new(builder),
            pending: VecDeque::new(),
        },
        |mut state| async move {
            loop {
                if let Some(event) = state.pending.pop_front() {
                    return Ok(Some((event, state)));
                }
                if state.transcoder.is_finished() {
                    return Ok(None);
                }
                match state.lines.next().await {
                    Some(line) => {
                        if let Err(err) = state.transcoder.push_line_into(&line, &mut state.pending) {
                            warn!(error = %err, "transcoding aborted");
                            return Err(err);
                        }
                    }
                    None => {
                        warn!(
                            category = %state.transcoder.state().current_category,
                            "upstream ended before terminal sentinel"
                        );
                        return Ok(None);
                    }
                }
            }
        },
    )
}

/// Drains a transcoded stream into one non-streaming completion.
///
/// Chunk contents are concatenated in order; the finish reason comes from the
/// final chunk. Fails with [`TranscodeError::IncompleteStream`] when the
/// stream ends without a finish signal.
pub async fn collect_completion<S>(
    events: S,
    builder: &ChunkBuilder,
) -> Result<ChatCompletion, TranscodeError>
where
    S: futures::Stream<Item = Result<OutputEvent, TranscodeError>>,
{
    let mut events = std::pin::pin!(events);
    let mut content = String::new();
    let mut finish_reason = DEFAULT_FINISH_REASON.to_string();
    while let Some(event) = events.next().await {
        match event? {
            OutputEvent::Chunk(chunk) => {
                content.push_str(chunk.content());
                if let Some(reason) = chunk.finish_reason() {
                    finish_reason = reason.to_string();
                }
            }
            OutputEvent::Finish => {
                return Ok(ChatCompletion::from_parts(builder, content, finish_reason));
            }
        }
    }
    Err(TranscodeError::IncompleteStream)
}
