//! Duplex IPC link to one editor instance.
//!
//! A `Transport` owns the platform stream (Unix domain socket or Windows
//! named pipe), frames outbound messages, decodes inbound frames, and
//! supervises the link: an unexpected drop is reported exactly once, then
//! the transport keeps trying to re-establish the stream on its own until
//! [`Transport::close`] is called.
//!
//! # Thread Safety
//!
//! All I/O happens on one owned tokio task. Callers interact through
//! channels; `close()` signals the task and joins it, so no reconnect timer
//! outlives its owner.

use crate::config::{TransportConfig, TransportOptions};
use crate::error::{Result, StagehandError};
use crate::protocol::{decode_frame, write_frame};
use bytes::BytesMut;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

#[cfg(unix)]
type IoStream = tokio::net::UnixStream;
#[cfg(windows)]
type IoStream = tokio::net::windows::named_pipe::NamedPipeClient;

/// Notifications surfaced to the transport's single consumer.
#[derive(Debug)]
pub enum TransportEvent {
    /// One complete inbound frame payload.
    Message(Vec<u8>),
    /// The link dropped unexpectedly. Sent exactly once per drop; the
    /// transport is already scheduling reconnect attempts.
    Disconnected,
    /// The link was re-established after a drop.
    Reconnected,
}

/// Why the inner I/O loop returned.
enum LinkEnd {
    /// `close()` was requested; stop entirely.
    Shutdown,
    /// The stream failed; enter the reconnect loop.
    Dropped,
}

/// A supervised duplex link to one editor endpoint.
pub struct Transport {
    endpoint: String,
    outbound_tx: mpsc::Sender<Vec<u8>>,
    events_rx: Option<mpsc::Receiver<TransportEvent>>,
    connected: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
    io_task: Option<tokio::task::JoinHandle<()>>,
}

impl Transport {
    /// Connect to `endpoint`, racing the attempt against
    /// `options.connect_timeout`. On timeout the attempt is abandoned with
    /// no half-open handle left behind.
    pub async fn connect(endpoint: impl Into<String>, options: TransportOptions) -> Result<Self> {
        let endpoint = endpoint.into();
        let stream = open_stream(&endpoint, options.connect_timeout).await?;
        debug!("Transport connected to {}", endpoint);

        let (outbound_tx, outbound_rx) =
            mpsc::channel::<Vec<u8>>(TransportConfig::OUTBOUND_CHANNEL_CAPACITY);
        let (events_tx, events_rx) =
            mpsc::channel::<TransportEvent>(TransportConfig::INBOUND_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let connected = Arc::new(AtomicBool::new(true));

        let io_task = tokio::spawn(run_link(
            stream,
            endpoint.clone(),
            options,
            outbound_rx,
            events_tx,
            connected.clone(),
            shutdown_rx,
        ));

        Ok(Self {
            endpoint,
            outbound_tx,
            events_rx: Some(events_rx),
            connected,
            shutdown_tx,
            io_task: Some(io_task),
        })
    }

    /// The rendezvous endpoint this transport targets.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether the link is currently up.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Take the inbound event stream. Yields `None` on the second call;
    /// there is exactly one consumer per transport.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<TransportEvent>> {
        self.events_rx.take()
    }

    /// Queue one framed message for writing.
    ///
    /// Fails fast with `PeerDisconnected` while the link is down instead of
    /// queueing into a dead stream.
    pub async fn send(&self, payload: Vec<u8>) -> Result<()> {
        if !self.is_connected() {
            return Err(StagehandError::PeerDisconnected);
        }
        self.outbound_tx
            .send(payload)
            .await
            .map_err(|_| StagehandError::PeerDisconnected)
    }

    /// Shut the link down: cancel any pending reconnect timer and join the
    /// I/O task. Idempotent.
    pub async fn close(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.io_task.take() {
            let _ = handle.await;
        }
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        // Last-resort cleanup for a transport dropped without close().
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.io_task.take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("endpoint", &self.endpoint)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

/// Open the platform stream, racing against `timeout`.
#[cfg(unix)]
async fn open_stream(endpoint: &str, timeout: Duration) -> Result<IoStream> {
    match tokio::time::timeout(timeout, tokio::net::UnixStream::connect(endpoint)).await {
        Err(_) => Err(StagehandError::ConnectTimeout {
            endpoint: endpoint.to_string(),
            timeout,
        }),
        Ok(Err(e)) => Err(StagehandError::Transport {
            message: format!("Connect to {} failed", endpoint),
            source: Some(e),
        }),
        Ok(Ok(stream)) => Ok(stream),
    }
}

/// Open the platform stream, racing against `timeout`.
///
/// Pipe opens either succeed immediately or fail; a busy pipe is retried
/// until the deadline.
#[cfg(windows)]
async fn open_stream(endpoint: &str, timeout: Duration) -> Result<IoStream> {
    use tokio::net::windows::named_pipe::ClientOptions;

    const ERROR_PIPE_BUSY: i32 = 231;
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        match ClientOptions::new().open(endpoint) {
            Ok(client) => return Ok(client),
            Err(e) if e.raw_os_error() == Some(ERROR_PIPE_BUSY) => {
                if tokio::time::Instant::now() >= deadline {
                    return Err(StagehandError::ConnectTimeout {
                        endpoint: endpoint.to_string(),
                        timeout,
                    });
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            Err(e) => {
                return Err(StagehandError::Transport {
                    message: format!("Connect to {} failed", endpoint),
                    source: Some(e),
                })
            }
        }
    }
}

/// Supervise one link: run the I/O loop, and on unexpected drops keep
/// reconnecting (with backoff) until shutdown.
async fn run_link(
    stream: IoStream,
    endpoint: String,
    options: TransportOptions,
    mut outbound_rx: mpsc::Receiver<Vec<u8>>,
    events_tx: mpsc::Sender<TransportEvent>,
    connected: Arc<AtomicBool>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut stream = stream;

    loop {
        let end = io_loop(stream, &mut outbound_rx, &events_tx, &mut shutdown_rx).await;
        connected.store(false, Ordering::SeqCst);

        match end {
            LinkEnd::Shutdown => break,
            LinkEnd::Dropped => {
                warn!("Link to {} dropped, scheduling reconnect", endpoint);
                // Frames queued before the drop target a dead stream.
                while outbound_rx.try_recv().is_ok() {}
                if events_tx.send(TransportEvent::Disconnected).await.is_err() {
                    break; // consumer gone, nothing left to serve
                }
            }
        }

        let mut backoff = options.reconnect.backoff();
        stream = loop {
            let delay = backoff.next_delay();
            tokio::select! {
                _ = shutdown_rx.changed() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            match open_stream(&endpoint, options.connect_timeout).await {
                Ok(s) => break s,
                Err(e) => debug!("Reconnect to {} failed: {}", endpoint, e),
            }
        };

        connected.store(true, Ordering::SeqCst);
        debug!("Link to {} re-established", endpoint);
        if events_tx.send(TransportEvent::Reconnected).await.is_err() {
            break;
        }
    }
}

/// Pump one live stream until it drops or shutdown is requested.
async fn io_loop(
    stream: IoStream,
    outbound_rx: &mut mpsc::Receiver<Vec<u8>>,
    events_tx: &mpsc::Sender<TransportEvent>,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> LinkEnd {
    let (mut read_half, mut write_half) = tokio::io::split(stream);
    let mut buf = BytesMut::with_capacity(8192);

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => return LinkEnd::Shutdown,

            maybe_frame = outbound_rx.recv() => match maybe_frame {
                // All senders dropped: the owning Transport is gone.
                None => return LinkEnd::Shutdown,
                Some(payload) => {
                    if let Err(e) = write_frame(&mut write_half, &payload).await {
                        debug!("Write failed: {}", e);
                        return LinkEnd::Dropped;
                    }
                }
            },

            read = read_half.read_buf(&mut buf) => match read {
                Ok(0) => return LinkEnd::Dropped,
                Ok(_) => loop {
                    match decode_frame(&mut buf) {
                        Ok(Some(payload)) => {
                            if events_tx.send(TransportEvent::Message(payload)).await.is_err() {
                                return LinkEnd::Shutdown;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            // Framing is broken; the stream cannot be resynced.
                            warn!("Inbound framing error: {}", e);
                            return LinkEnd::Dropped;
                        }
                    }
                },
                Err(e) => {
                    debug!("Read failed: {}", e);
                    return LinkEnd::Dropped;
                }
            },
        }
    }
}
