//! Event types emitted by the correlator and the registry.

use crate::protocol::WireMessage;
use serde_json::Value;
use std::path::PathBuf;

/// Well-known editor event type tags.
pub mod editor_events {
    pub const STATE_UPDATE: &str = "state_update";
    pub const PLAY_MODE_CHANGED: &str = "play_mode_changed";
    pub const SCENE_OPENED: &str = "scene_opened";
    pub const HIERARCHY_CHANGED: &str = "hierarchy_changed";
}

/// An asynchronous event received from the editor.
///
/// The payload is opaque to this crate and passed through verbatim.
#[derive(Debug, Clone)]
pub struct EditorEvent {
    pub event_type: String,
    pub data: Option<Value>,
    pub timestamp: Option<String>,
}

impl EditorEvent {
    /// Build from an inbound wire message. Returns `None` when the message
    /// has no `type` tag.
    pub fn from_wire(msg: WireMessage) -> Option<Self> {
        Some(Self {
            event_type: msg.event_type?,
            data: msg.data,
            timestamp: msg.timestamp,
        })
    }
}

/// Event published on a registry's broadcast channel.
#[derive(Debug, Clone)]
pub enum BridgeEvent {
    /// An editor event, re-emitted after the peer-state cache was updated.
    Editor { target: PathBuf, event: EditorEvent },
    /// A health check failed and the entry transitioned to `Error`.
    ConnectionError { target: PathBuf, message: String },
    /// The transport to this target dropped; reconnection is in progress.
    EditorDisconnected { target: PathBuf },
    /// The transport to this target came back after a drop.
    EditorReconnected { target: PathBuf },
}
