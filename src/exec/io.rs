// src/exec/io.rs

//! Stream wiring between a child and its caller.
//!
//! A stream is either handed straight to the child (inherited or null) or
//! piped through a pump task that can tee it into a capture buffer, a live
//! destination, or both.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::spec::InputSource;
use crate::bufpool::{lend_from, BufferPool, PooledBuffer};

type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Destination for a child's stdout or stderr.
pub enum OutputSink {
    /// The caller's own stdout/stderr.
    Inherit,
    Discard,
    /// An in-memory buffer the caller keeps a handle to.
    Buffer(SharedBuffer),
    Writer(BoxWriter),
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputSink::Inherit => f.write_str("Inherit"),
            OutputSink::Discard => f.write_str("Discard"),
            OutputSink::Buffer(buf) => write!(f, "Buffer({} bytes)", buf.len()),
            OutputSink::Writer(_) => f.write_str("Writer(..)"),
        }
    }
}

/// Cloneable in-memory writer; every clone appends to the same bytes.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }

    pub fn len(&self) -> usize {
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AsyncWrite for SharedBuffer {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    fn as_str(self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }

    fn live_writer(self) -> BoxWriter {
        match self {
            StreamKind::Stdout => Box::new(tokio::io::stdout()),
            StreamKind::Stderr => Box::new(tokio::io::stderr()),
        }
    }
}

/// How one output stream of the child is connected.
pub(crate) enum Wiring {
    Inherit,
    Null,
    Pipe {
        forward: Option<BoxWriter>,
        capture: bool,
    },
}

impl Wiring {
    /// Resolve a sink against the capture flag.
    ///
    /// With capture on, the sink becomes the forwarding half of a tee whose
    /// other half is the capture buffer.
    pub(crate) fn resolve(sink: OutputSink, capture: bool, kind: StreamKind) -> Wiring {
        match (sink, capture) {
            (OutputSink::Inherit, false) => Wiring::Inherit,
            (OutputSink::Discard, false) => Wiring::Null,
            (OutputSink::Inherit, true) => Wiring::Pipe {
                forward: Some(kind.live_writer()),
                capture: true,
            },
            (OutputSink::Discard, true) => Wiring::Pipe {
                forward: None,
                capture: true,
            },
            (OutputSink::Buffer(buf), capture) => Wiring::Pipe {
                forward: Some(Box::new(buf)),
                capture,
            },
            (OutputSink::Writer(writer), capture) => Wiring::Pipe {
                forward: Some(writer),
                capture,
            },
        }
    }

    pub(crate) fn stdio(&self) -> Stdio {
        match self {
            Wiring::Inherit => Stdio::inherit(),
            Wiring::Null => Stdio::null(),
            Wiring::Pipe { .. } => Stdio::piped(),
        }
    }
}

/// What a pump task hands back once its stream closes or it is told to stop.
#[derive(Debug, Default)]
pub(crate) struct Drained {
    pub captured: Option<PooledBuffer>,
    /// Reading the child's pipe failed.
    pub error: Option<io::Error>,
    /// The pipe was still open when the pump was stopped; `captured` holds
    /// everything read up to that point.
    pub abandoned: bool,
}

impl Drained {
    pub(crate) fn text(&self) -> String {
        self.captured
            .as_ref()
            .map(|buf| buf.to_string_lossy())
            .unwrap_or_default()
    }
}

/// A running pump task and the token that makes it give up early.
pub(crate) struct Pump {
    pub task: JoinHandle<Drained>,
    pub stop: CancellationToken,
}

/// Spawn a task copying `reader` into the capture buffer and/or forward
/// writer until EOF, or until the pump's stop token is cancelled.
///
/// A failing forward writer is dropped and capture continues.
pub(crate) fn spawn_pump<R>(
    reader: R,
    wiring: Wiring,
    kind: StreamKind,
    pool: Option<&BufferPool>,
) -> Option<Pump>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let Wiring::Pipe { forward, capture } = wiring else {
        return None;
    };
    let captured = capture.then(|| lend_from(pool));
    let stop = CancellationToken::new();

    let task = tokio::spawn(pump(reader, forward, captured, kind, stop.clone()));
    Some(Pump { task, stop })
}

async fn pump<R>(
    mut reader: R,
    mut forward: Option<BoxWriter>,
    mut captured: Option<PooledBuffer>,
    kind: StreamKind,
    stop: CancellationToken,
) -> Drained
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; 8192];
    let mut error = None;
    let mut abandoned = false;

    loop {
        let read = tokio::select! {
            biased;

            _ = stop.cancelled() => {
                abandoned = true;
                break;
            }
            read = reader.read(&mut chunk) => read,
        };

        let n = match read {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(stream = kind.as_str(), error = %e, "reading child output failed");
                error = Some(e);
                break;
            }
        };

        if let Some(buf) = captured.as_mut() {
            buf.extend_from_slice(&chunk[..n]);
        }

        if let Some(writer) = forward.as_mut() {
            if let Err(e) = writer.write_all(&chunk[..n]).await {
                debug!(stream = kind.as_str(), error = %e, "forward destination failed; capture only from here");
                forward = None;
            }
        }
    }

    if let Some(mut writer) = forward {
        let _ = writer.flush().await;
    }

    Drained {
        captured,
        error,
        abandoned,
    }
}

/// How the child's stdin is connected, plus any bytes to feed it.
pub(crate) enum StdinPlan {
    Inherit,
    Null,
    Feed(Box<dyn AsyncRead + Send + Unpin>),
}

impl StdinPlan {
    pub(crate) fn from_source(source: InputSource) -> StdinPlan {
        match source {
            InputSource::Inherit => StdinPlan::Inherit,
            InputSource::Null => StdinPlan::Null,
            InputSource::Bytes(bytes) => StdinPlan::Feed(Box::new(io::Cursor::new(bytes))),
            InputSource::Reader(reader) => StdinPlan::Feed(reader),
        }
    }

    pub(crate) fn stdio(&self) -> Stdio {
        match self {
            StdinPlan::Inherit => Stdio::inherit(),
            StdinPlan::Null => Stdio::null(),
            StdinPlan::Feed(_) => Stdio::piped(),
        }
    }
}

/// Copy `source` into the child's stdin, then close it.
///
/// The child may exit without reading everything; a broken pipe is expected
/// then and is not reported.
pub(crate) fn spawn_feeder<W>(mut source: Box<dyn AsyncRead + Send + Unpin>, mut stdin: W) -> JoinHandle<()>
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        match tokio::io::copy(&mut source, &mut stdin).await {
            Ok(bytes) => debug!(bytes, "fed child stdin"),
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                debug!("child closed stdin early")
            }
            Err(e) => warn!(error = %e, "feeding child stdin failed"),
        }
        let _ = stdin.shutdown().await;
    })
}
