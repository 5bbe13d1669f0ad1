//! Request/response correlation over a transport.
//!
//! Outbound requests get a fresh identifier and a pending entry; inbound
//! frames are matched back by identifier, with unmatched `type`-tagged
//! messages fanned out to event subscribers. Requests resolve exactly once:
//! whichever side removes the pending entry — the matching response, a
//! timeout, or a disconnect — owns the outcome.

use crate::config::CorrelatorConfig;
use crate::error::{Result, StagehandError};
use crate::events::EditorEvent;
use crate::protocol::{MessageKind, WireMessage};
use crate::transport::{Transport, TransportEvent};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, warn};

/// Link-state change observed on the underlying transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// The transport dropped; its pending requests have been failed.
    Down,
    /// The transport reconnected on its own.
    Up,
}

/// One outstanding request.
struct PendingRequest {
    command: String,
    resolver: oneshot::Sender<Result<Value>>,
}

type PendingMap = Arc<StdMutex<HashMap<String, PendingRequest>>>;

/// Matches editor responses to requests and routes editor events.
pub struct Correlator {
    transport: tokio::sync::Mutex<Transport>,
    pending: PendingMap,
    next_id: AtomicU64,
    events_tx: broadcast::Sender<EditorEvent>,
    link_tx: broadcast::Sender<LinkEvent>,
    dispatch_task: StdMutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Correlator {
    /// Wrap a freshly-connected transport.
    ///
    /// Takes ownership of the transport's inbound stream; one correlator
    /// per transport.
    pub fn new(mut transport: Transport) -> Self {
        let events = transport
            .take_events()
            .expect("transport events already taken; one correlator per transport");

        let pending: PendingMap = Arc::new(StdMutex::new(HashMap::new()));
        let (events_tx, _) = broadcast::channel(CorrelatorConfig::EVENT_CHANNEL_CAPACITY);
        let (link_tx, _) = broadcast::channel(8);

        let dispatch_task = tokio::spawn(dispatch_loop(
            events,
            pending.clone(),
            events_tx.clone(),
            link_tx.clone(),
        ));

        Self {
            transport: tokio::sync::Mutex::new(transport),
            pending,
            next_id: AtomicU64::new(1),
            events_tx,
            link_tx,
            dispatch_task: StdMutex::new(Some(dispatch_task)),
        }
    }

    /// Whether the underlying link is currently up.
    pub async fn is_connected(&self) -> bool {
        self.transport.lock().await.is_connected()
    }

    /// Subscribe to editor events. Every subscriber receives every event.
    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.events_tx.subscribe()
    }

    /// Subscribe to link-state changes (transport drop/reconnect).
    pub fn subscribe_link(&self) -> broadcast::Receiver<LinkEvent> {
        self.link_tx.subscribe()
    }

    /// Send `command` and await the response bearing the same identifier.
    ///
    /// Responses are matched by identifier, not send order; concurrent
    /// requests interleave freely. An unanswered request fails with
    /// `RequestTimeout` at its deadline without disturbing other pending
    /// requests; a transport drop fails every pending request immediately.
    pub async fn request(&self, command: &str, params: Value, timeout: Duration) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();
        let (resolver, mut rx) = oneshot::channel();

        {
            let mut pending = self.pending.lock().expect("pending map poisoned");
            pending.insert(
                id.clone(),
                PendingRequest {
                    command: command.to_string(),
                    resolver,
                },
            );
        }

        let message = WireMessage::request(&id, command, params);
        let send_result = self.transport.lock().await.send(message.to_bytes()).await;
        if let Err(e) = send_result {
            self.pending.lock().expect("pending map poisoned").remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(timeout, &mut rx).await {
            Ok(Ok(outcome)) => outcome,
            // Resolver dropped without a verdict: dispatch loop is gone.
            Ok(Err(_)) => Err(StagehandError::PeerDisconnected),
            Err(_) => {
                let removed = self
                    .pending
                    .lock()
                    .expect("pending map poisoned")
                    .remove(&id);
                match removed {
                    Some(_) => Err(StagehandError::RequestTimeout {
                        command: command.to_string(),
                        timeout,
                    }),
                    // The response won the race to the pending entry; honor it.
                    None => match rx.try_recv() {
                        Ok(outcome) => outcome,
                        Err(_) => Err(StagehandError::PeerDisconnected),
                    },
                }
            }
        }
    }

    /// [`Correlator::request`] with the default deadline.
    pub async fn request_default(&self, command: &str, params: Value) -> Result<Value> {
        self.request(command, params, CorrelatorConfig::REQUEST_TIMEOUT)
            .await
    }

    /// Close the transport and fail whatever is still pending. Idempotent.
    pub async fn close(&self) {
        self.transport.lock().await.close().await;
        let task = self.dispatch_task.lock().expect("task slot poisoned").take();
        if let Some(handle) = task {
            let _ = handle.await;
        }
        // The dispatch loop drains pending on exit; this is a backstop for
        // entries registered after the loop already ended.
        fail_all_pending(&self.pending);
    }
}

impl std::fmt::Debug for Correlator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Correlator").finish_non_exhaustive()
    }
}

/// Route inbound transport events until the transport closes.
async fn dispatch_loop(
    mut events: mpsc::Receiver<TransportEvent>,
    pending: PendingMap,
    events_tx: broadcast::Sender<EditorEvent>,
    link_tx: broadcast::Sender<LinkEvent>,
) {
    while let Some(event) = events.recv().await {
        match event {
            TransportEvent::Message(payload) => dispatch_message(&payload, &pending, &events_tx),
            TransportEvent::Disconnected => {
                fail_all_pending(&pending);
                let _ = link_tx.send(LinkEvent::Down);
            }
            TransportEvent::Reconnected => {
                debug!("Editor link restored");
                let _ = link_tx.send(LinkEvent::Up);
            }
        }
    }
    // Transport closed for good.
    fail_all_pending(&pending);
}

fn dispatch_message(
    payload: &[u8],
    pending: &PendingMap,
    events_tx: &broadcast::Sender<EditorEvent>,
) {
    let message = match WireMessage::from_bytes(payload) {
        Ok(m) => m,
        Err(e) => {
            warn!("Dropping undecodable message: {}", e);
            return;
        }
    };

    match message.kind() {
        MessageKind::Correlated => {
            let id = message.id.clone().expect("correlated message has id");
            let entry = pending.lock().expect("pending map poisoned").remove(&id);
            match entry {
                Some(request) => {
                    let outcome = response_outcome(&request.command, message);
                    // First match wins; a receiver gone mid-race just means
                    // the caller timed out a moment ago.
                    let _ = request.resolver.send(outcome);
                }
                None => {
                    debug!("Ignoring response with unknown or duplicate id {}", id);
                }
            }
        }
        MessageKind::Event => {
            if let Some(event) = EditorEvent::from_wire(message) {
                // No subscribers is fine.
                let _ = events_tx.send(event);
            }
        }
        MessageKind::Unroutable => {
            debug!("Dropping message with neither id nor type");
        }
    }
}

/// Fold a response message into the request's outcome.
fn response_outcome(command: &str, message: WireMessage) -> Result<Value> {
    let failed = message.success == Some(false) || message.error.is_some();
    if failed {
        Err(StagehandError::CommandFailed {
            command: command.to_string(),
            message: message
                .error
                .unwrap_or_else(|| "editor reported failure".to_string()),
        })
    } else {
        Ok(message.data.unwrap_or(Value::Null))
    }
}

/// Fail every pending request with `PeerDisconnected`, immediately.
fn fail_all_pending(pending: &PendingMap) {
    let drained: Vec<PendingRequest> = {
        let mut map = pending.lock().expect("pending map poisoned");
        map.drain().map(|(_, req)| req).collect()
    };
    if !drained.is_empty() {
        debug!("Failing {} pending request(s) after disconnect", drained.len());
    }
    for request in drained {
        let _ = request.resolver.send(Err(StagehandError::PeerDisconnected));
    }
}
