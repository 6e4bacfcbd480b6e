//! Request multiplexing over a single vault connection.
//!
//! Every [`Multiplexer::call`] gets a fresh request id and waits on a
//! one-shot completion handle registered under that id. A background reader
//! task owns the read half: it feeds inbound chunks into a [`FrameBuffer`],
//! and each decoded response is routed to its waiter purely by id, so
//! responses may arrive in any order.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::SinkExt;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedWrite;
use tracing::{debug, warn};
use vaultwire_frame::{FrameBuffer, FrameError, JsonCodec};

use crate::error::{ClientError, Result};
use crate::rpc::{Params, Request, Response};
use crate::vault_error::raise_on_error;

const READ_CHUNK_SIZE: usize = 8 * 1024;

type Waiter = oneshot::Sender<Result<Params>>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// State shared between callers and the reader task.
struct Shared {
    pending: Mutex<HashMap<u64, Waiter>>,
    connected: AtomicBool,
}

impl Shared {
    fn pending(&self) -> MutexGuard<'_, HashMap<u64, Waiter>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a waiter for `id`. Checked under the pending lock so a
    /// concurrent [`Shared::fail_all`] can never miss it.
    fn register(&self, id: u64) -> Result<oneshot::Receiver<Result<Params>>> {
        let mut pending = self.pending();
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ClientError::NotConnected);
        }
        let (tx, rx) = oneshot::channel();
        pending.insert(id, tx);
        Ok(rx)
    }

    fn take(&self, id: u64) -> Option<Waiter> {
        self.pending().remove(&id)
    }

    /// Mark the connection dead and fail every outstanding call.
    fn fail_all(&self, reason: &str) {
        let waiters: Vec<Waiter> = {
            let mut pending = self.pending();
            self.connected.store(false, Ordering::SeqCst);
            pending.drain().map(|(_, waiter)| waiter).collect()
        };
        if !waiters.is_empty() {
            debug!(count = waiters.len(), reason, "failing outstanding calls");
        }
        for waiter in waiters {
            let _ = waiter.send(Err(ClientError::Disconnected(reason.to_string())));
        }
    }
}

/// Removes the pending entry if the caller stops waiting early.
struct PendingGuard<'a> {
    shared: &'a Shared,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.shared.take(self.id);
    }
}

/// Inbound half: receive buffer plus routing to waiters.
pub(crate) struct Demux {
    buffer: FrameBuffer,
    shared: Arc<Shared>,
}

impl Demux {
    /// Consume one inbound chunk, dispatching every frame it completes.
    ///
    /// A trailing partial frame stays buffered. Errors are fatal for the
    /// connection.
    pub(crate) fn on_data(&mut self, chunk: &[u8]) -> std::result::Result<(), FrameError> {
        self.buffer.extend(chunk);
        while let Some(value) = self.buffer.next_frame()? {
            self.dispatch(value);
        }
        Ok(())
    }

    fn dispatch(&self, value: Value) {
        let Some(id) = value.get("id").and_then(Value::as_u64) else {
            warn!("dropping frame without a numeric id");
            return;
        };
        let Some(waiter) = self.shared.take(id) else {
            debug!(id, "dropping response for unknown request id");
            return;
        };

        let response: Response = match serde_json::from_value(value) {
            Ok(response) => response,
            Err(err) => {
                warn!(id, error = %err, "malformed response");
                let _ = waiter.send(Err(ClientError::Protocol(format!(
                    "malformed response for request {id}: {err}"
                ))));
                return;
            }
        };

        debug!(id = response.id, ok = response.error.is_none(), "received response");
        let outcome = match raise_on_error(&response) {
            Ok(()) => Ok(response.result.unwrap_or_default()),
            Err(err) => Err(ClientError::Vault(err)),
        };
        let _ = waiter.send(outcome);
    }
}

/// Correlates concurrent requests and responses on one connection.
pub struct Multiplexer {
    shared: Arc<Shared>,
    writer: tokio::sync::Mutex<Option<FramedWrite<BoxedWriter, JsonCodec>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
    next_id: AtomicU64,
}

impl Multiplexer {
    /// Take ownership of a connected stream and start the reader task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let shared = Arc::new(Shared {
            pending: Mutex::new(HashMap::new()),
            connected: AtomicBool::new(true),
        });

        let demux = Demux {
            buffer: FrameBuffer::new(),
            shared: Arc::clone(&shared),
        };
        let reader = tokio::spawn(read_loop(read_half, demux));

        let writer: BoxedWriter = Box::new(write_half);
        Self {
            shared,
            writer: tokio::sync::Mutex::new(Some(FramedWrite::new(writer, JsonCodec::new()))),
            reader: Mutex::new(Some(reader)),
            next_id: AtomicU64::new(0),
        }
    }

    /// Send `method` with `params` and wait for the matching response.
    ///
    /// Resolves with the response's `result` (empty if absent), or the
    /// typed error the daemon reported.
    pub async fn call(&self, method: &str, params: Params) -> Result<Params> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let rx = self.shared.register(id)?;
        let _guard = PendingGuard {
            shared: &self.shared,
            id,
        };

        debug!(id, method, "sending request");
        self.send(&Request::new(id, method, params)).await?;

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(ClientError::Disconnected(
                "connection dropped before response".to_string(),
            )),
        }
    }

    async fn send(&self, request: &Request) -> Result<()> {
        let mut writer = self.writer.lock().await;
        let sink = writer.as_mut().ok_or(ClientError::NotConnected)?;
        match sink.send(request).await {
            Ok(()) => Ok(()),
            Err(FrameError::Io(io)) => {
                let reason = format!("write failed: {io}");
                warn!(error = %io, "write failed; closing connection");
                self.shared.fail_all(&reason);
                Err(ClientError::Disconnected(reason))
            }
            Err(other) => Err(ClientError::Frame(other)),
        }
    }

    /// Returns true while the connection is usable.
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Number of calls currently waiting for a response.
    pub fn pending_count(&self) -> usize {
        self.shared.pending().len()
    }

    /// Close the write half, stop reading, and fail outstanding calls.
    ///
    /// Safe to call more than once.
    pub async fn shutdown(&self) {
        let writer = self.writer.lock().await.take();
        if let Some(sink) = writer {
            let mut inner = sink.into_inner();
            if let Err(err) = inner.shutdown().await {
                debug!(error = %err, "error shutting down write half");
            }
        }

        let reader = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = reader {
            handle.abort();
        }

        self.shared.fail_all("connection closed by client");
    }
}

impl Drop for Multiplexer {
    fn drop(&mut self) {
        let reader = self
            .reader
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = reader {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for Multiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Multiplexer")
            .field("connected", &self.is_connected())
            .field("pending", &self.pending_count())
            .field("next_id", &self.next_id.load(Ordering::SeqCst))
            .finish()
    }
}

async fn read_loop<R>(mut reader: R, mut demux: Demux)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];
    let reason = loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break "connection closed by vault".to_string(),
            Ok(n) => {
                if let Err(err) = demux.on_data(&chunk[..n]) {
                    warn!(error = %err, "unrecoverable frame error; closing connection");
                    break format!("frame error: {err}");
                }
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => break format!("read failed: {err}"),
        }
    };
    debug!(reason = %reason, "reader stopped");
    demux.shared.fail_all(&reason);
}
