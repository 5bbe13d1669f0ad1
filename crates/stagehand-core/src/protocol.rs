//! Wire protocol types and framing.
//!
//! Every message exchanged with the editor is a single JSON object carried
//! in a length-prefixed frame:
//!
//! ```text
//! [u32 BE: len][UTF-8 JSON bytes of len]
//! ```
//!
//! Requests carry `{id, command, parameters, timestamp}`, responses echo the
//! request's `{id}` with `{success, data|error, timestamp}`, and events carry
//! `{type, data, timestamp}` with no `id`.

use crate::config::TransportConfig;
use crate::error::{Result, StagehandError};
use bytes::{Buf, BytesMut};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// A single message on the editor link.
///
/// All fields are optional at the serde level because the peer owns the wire
/// contract; [`WireMessage::kind`] classifies whatever actually arrived.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Routing classification of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Carries an `id`: a response to (or echo of) a correlated request.
    Correlated,
    /// No `id` but a `type` tag: an asynchronous editor event.
    Event,
    /// Neither: cannot be routed.
    Unroutable,
}

impl WireMessage {
    /// Create an outbound request.
    pub fn request(id: impl Into<String>, command: impl Into<String>, parameters: Value) -> Self {
        Self {
            id: Some(id.into()),
            command: Some(command.into()),
            parameters: Some(parameters),
            timestamp: Some(now_timestamp()),
            ..Default::default()
        }
    }

    /// Create a success response echoing `id`.
    pub fn response_ok(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: Some(id.into()),
            success: Some(true),
            data: Some(data),
            timestamp: Some(now_timestamp()),
            ..Default::default()
        }
    }

    /// Create an error response echoing `id`.
    pub fn response_err(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            success: Some(false),
            error: Some(message.into()),
            timestamp: Some(now_timestamp()),
            ..Default::default()
        }
    }

    /// Create an event message.
    pub fn event(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: Some(event_type.into()),
            data: Some(data),
            timestamp: Some(now_timestamp()),
            ..Default::default()
        }
    }

    /// Classify this message for routing.
    pub fn kind(&self) -> MessageKind {
        if self.id.is_some() {
            MessageKind::Correlated
        } else if self.event_type.is_some() {
            MessageKind::Event
        } else {
            MessageKind::Unroutable
        }
    }

    /// Serialize to JSON bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        // A struct of Options and Values cannot fail to serialize.
        serde_json::to_vec(self).expect("WireMessage serialization should not fail")
    }

    /// Deserialize from JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| {
            StagehandError::Protocol(format!("Malformed wire message: {}", e))
        })
    }
}

/// Current UTC time as an RFC 3339 string, the wire timestamp format.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Read a length-prefixed frame from an async reader.
///
/// Returns `None` on clean EOF (peer closed the stream between frames).
pub async fn read_frame<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    check_frame_len(len)?;

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;

    Ok(Some(payload))
}

/// Write a length-prefixed frame to an async writer.
pub async fn write_frame<W: AsyncWriteExt + Unpin>(writer: &mut W, payload: &[u8]) -> Result<()> {
    check_frame_len(payload.len())?;
    let len = payload.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Extract the next complete frame from an accumulation buffer, if any.
///
/// Used by the transport read loop, which appends raw stream bytes to `buf`
/// and drains complete frames. Partial frames stay buffered.
pub fn decode_frame(buf: &mut BytesMut) -> Result<Option<Vec<u8>>> {
    if buf.len() < 4 {
        return Ok(None);
    }

    let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    check_frame_len(len)?;

    if buf.len() < 4 + len {
        return Ok(None);
    }

    buf.advance(4);
    let payload = buf.split_to(len);
    Ok(Some(payload.to_vec()))
}

fn check_frame_len(len: usize) -> Result<()> {
    if len > TransportConfig::MAX_FRAME_SIZE {
        return Err(StagehandError::Protocol(format!(
            "Frame size {} exceeds maximum {}",
            len,
            TransportConfig::MAX_FRAME_SIZE
        )));
    }
    Ok(())
}
