//! Streaming execution
//!
//! Wraps one command execution as a stream of chunks: zero or more `Data`
//! chunks followed by exactly one terminal chunk (`Complete` or `Error`).
//! Handlers are not preempted; an abort only stops further output.

use crate::commands::{CommandContext, CommandError, CommandRegistry, CommandResult, ResultMetadata};
use crate::error::ErrorCode;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

pub mod signal;

pub use signal::{AbortController, AbortSignal, ListenerGuard};

/// One element of a command stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamChunk {
    #[serde(rename_all = "camelCase")]
    Progress {
        /// Percentage in 0..=100
        progress: f64,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        current_step: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total_steps: Option<u32>,
    },
    #[serde(rename_all = "camelCase")]
    Data {
        data: Value,
        index: usize,
        is_last: bool,
    },
    #[serde(rename_all = "camelCase")]
    Complete {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        confidence: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reasoning: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<ResultMetadata>,
        total_chunks: usize,
        duration_ms: u64,
    },
    #[serde(rename_all = "camelCase")]
    Error {
        error: CommandError,
        recoverable: bool,
    },
}

impl StreamChunk {
    /// Whether this chunk ends the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamChunk::Complete { .. } | StreamChunk::Error { .. })
    }
}

pub fn progress_chunk(progress: f64, message: impl Into<String>) -> StreamChunk {
    StreamChunk::Progress {
        progress: progress.clamp(0.0, 100.0),
        message: message.into(),
        current_step: None,
        total_steps: None,
    }
}

/// Progress chunk positioned within a multi-step operation
pub fn progress_chunk_with_steps(
    progress: f64,
    message: impl Into<String>,
    current_step: u32,
    total_steps: u32,
) -> StreamChunk {
    StreamChunk::Progress {
        progress: progress.clamp(0.0, 100.0),
        message: message.into(),
        current_step: Some(current_step),
        total_steps: Some(total_steps),
    }
}

pub fn data_chunk(data: Value, index: usize, is_last: bool) -> StreamChunk {
    StreamChunk::Data {
        data,
        index,
        is_last,
    }
}

pub fn complete_chunk(
    confidence: Option<f64>,
    reasoning: Option<String>,
    metadata: Option<ResultMetadata>,
    total_chunks: usize,
    duration_ms: u64,
) -> StreamChunk {
    StreamChunk::Complete {
        confidence,
        reasoning,
        metadata,
        total_chunks,
        duration_ms,
    }
}

pub fn error_chunk(error: CommandError, recoverable: bool) -> StreamChunk {
    StreamChunk::Error { error, recoverable }
}

fn aborted_chunk() -> StreamChunk {
    error_chunk(
        CommandError::new(ErrorCode::STREAM_ABORTED, "Stream was aborted")
            .with_suggestion("Re-issue the stream to try again")
            .with_retryable(true),
        true,
    )
}

/// Maps a finished result onto stream chunks
///
/// A successful array payload yields one `Data` chunk per element, any other
/// payload a single `Data` chunk; a `Complete` chunk follows. A failure
/// yields a single `Error` chunk.
pub fn chunks_from_result(result: CommandResult, duration_ms: u64) -> Vec<StreamChunk> {
    if !result.success {
        let error = result
            .error
            .unwrap_or_else(|| CommandError::internal("Command failed without an error"));
        let recoverable = error.retryable.unwrap_or(false);
        return vec![error_chunk(error, recoverable)];
    }

    let mut chunks: Vec<StreamChunk> = match result.data.unwrap_or(Value::Null) {
        Value::Array(items) => {
            let last = items.len().saturating_sub(1);
            items
                .into_iter()
                .enumerate()
                .map(|(index, item)| data_chunk(item, index, index == last))
                .collect()
        }
        other => vec![data_chunk(other, 0, true)],
    };

    let total_chunks = chunks.len();
    chunks.push(complete_chunk(
        result.confidence,
        result.reasoning,
        result.metadata,
        total_chunks,
        duration_ms,
    ));
    chunks
}

impl CommandRegistry {
    /// Executes a command as a stream of chunks
    ///
    /// When `ctx` carries a signal that has already fired, the stream yields a
    /// single recoverable `STREAM_ABORTED` error and the command never runs.
    /// An abort during execution lets the handler finish, discards its result
    /// and yields `STREAM_ABORTED` instead. An abort while chunks are being
    /// delivered ends the stream with `STREAM_ABORTED` in place of the next
    /// chunk.
    pub fn execute_stream<'a>(
        &'a self,
        name: &'a str,
        input: Value,
        ctx: Option<&'a CommandContext>,
    ) -> BoxStream<'a, StreamChunk> {
        let signal = ctx.and_then(|c| c.signal.clone());
        stream::once(self.stream_chunks(name, input, ctx))
            .flat_map(move |chunks| deliver(chunks, signal.clone()))
            .boxed()
    }

    async fn stream_chunks(
        &self,
        name: &str,
        input: Value,
        ctx: Option<&CommandContext>,
    ) -> Vec<StreamChunk> {
        let signal = ctx.and_then(|c| c.signal.clone());

        if signal.as_ref().is_some_and(AbortSignal::is_aborted) {
            debug!(command = name, "Stream aborted before start");
            return vec![aborted_chunk()];
        }

        let aborted = Arc::new(AtomicBool::new(false));
        let guard = signal.as_ref().map(|signal| {
            let aborted = Arc::clone(&aborted);
            signal.add_listener(move || aborted.store(true, Ordering::SeqCst))
        });

        let start = Instant::now();
        let result = self.execute(name, input, ctx).await;
        let duration_ms = start.elapsed().as_millis() as u64;
        drop(guard);

        if aborted.load(Ordering::SeqCst) {
            warn!(command = name, "Stream aborted during execution, result discarded");
            return vec![aborted_chunk()];
        }

        chunks_from_result(result, duration_ms)
    }
}

/// Yields `chunks` until the signal fires, then a single `STREAM_ABORTED`
fn deliver(
    chunks: Vec<StreamChunk>,
    signal: Option<AbortSignal>,
) -> impl Stream<Item = StreamChunk> + Send {
    stream::unfold(
        (chunks.into_iter(), signal, false),
        |(mut chunks, signal, done)| async move {
            if done {
                return None;
            }
            let chunk = chunks.next()?;
            if signal.as_ref().is_some_and(AbortSignal::is_aborted) {
                debug!("Stream aborted during delivery");
                return Some((aborted_chunk(), (chunks, signal, true)));
            }
            Some((chunk, (chunks, signal, false)))
        },
    )
}

/// What a consumer saw after draining a stream
#[derive(Debug, Clone, PartialEq)]
pub struct StreamOutcome {
    pub data: Vec<Value>,
    pub progress: Vec<StreamChunk>,
    /// Always `Complete` or `Error`
    pub terminal: StreamChunk,
}

impl StreamOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self.terminal, StreamChunk::Complete { .. })
    }

    pub fn error(&self) -> Option<&CommandError> {
        match &self.terminal {
            StreamChunk::Error { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Drains a stream up to its terminal chunk
///
/// A stream that ends without one produces a synthetic
/// `STREAM_ENDED_UNEXPECTEDLY` error.
pub async fn collect_stream<S>(stream: S) -> StreamOutcome
where
    S: Stream<Item = StreamChunk>,
{
    futures::pin_mut!(stream);
    let mut data = Vec::new();
    let mut progress = Vec::new();

    while let Some(chunk) = stream.next().await {
        match chunk {
            StreamChunk::Data { data: item, .. } => data.push(item),
            StreamChunk::Progress { .. } => progress.push(chunk),
            terminal => {
                return StreamOutcome {
                    data,
                    progress,
                    terminal,
                }
            }
        }
    }

    warn!("Stream ended without a terminal chunk");
    StreamOutcome {
        data,
        progress,
        terminal: error_chunk(
            CommandError::new(
                ErrorCode::STREAM_ENDED_UNEXPECTEDLY,
                "Stream ended without a complete or error chunk",
            )
            .with_suggestion("Retry the command; the producer stopped early")
            .with_retryable(true),
            false,
        ),
    }
}
