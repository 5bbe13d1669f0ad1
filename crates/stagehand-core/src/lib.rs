//! Stagehand Core - Connection management for driving a game-engine editor
//! from an external automation client.
//!
//! The editor is a long-lived, independently-owned process that may start,
//! stop, or be unreachable at any time. This crate handles everything about
//! that relationship: discovering running editor instances, maintaining one
//! framed IPC link per project, matching asynchronous responses to their
//! requests, and keeping a registry of per-project connection health. It
//! deliberately does not interpret what the editor commands mean.
//!
//! # Example
//!
//! ```rust,ignore
//! use stagehand_core::ConnectionRegistry;
//!
//! #[tokio::main]
//! async fn main() -> stagehand_core::Result<()> {
//!     let registry = ConnectionRegistry::new();
//!
//!     let info = registry.connect("/home/dev/projects/racer").await?;
//!     println!("{}: {}", info.target.display(), info.status);
//!
//!     // Fails fast with EditorRequired if no live editor is attached.
//!     registry.enter_play_mode(None).await?;
//!
//!     registry.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod correlator;
pub mod endpoint;
pub mod error;
pub mod events;
pub mod locator;
pub mod platform;
pub mod protocol;
pub mod registry;
pub mod state;
pub mod transport;

// Re-export commonly used types
pub use config::{ReconnectPolicy, TransportOptions};
pub use correlator::{Correlator, LinkEvent};
pub use endpoint::{endpoint_name, endpoint_path};
pub use error::{Result, StagehandError};
pub use events::{BridgeEvent, EditorEvent};
pub use locator::{EditorProcess, ProcessLocator, ProcessScanner, SystemProcessScanner};
pub use protocol::{MessageKind, WireMessage};
pub use registry::{
    editor_commands, ConnectionInfo, ConnectionRegistry, ConnectionStatus, RegistrySnapshot,
};
pub use state::DerivedEditorState;
pub use transport::{Transport, TransportEvent};
