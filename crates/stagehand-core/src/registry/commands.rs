//! Pass-through editor commands.
//!
//! The registry does not interpret what these commands mean; it resolves
//! the target, insists on a live editor, and forwards command + parameters
//! to the correlator.

use super::ConnectionRegistry;
use crate::error::Result;
use serde_json::{json, Value};
use std::path::Path;

/// Command names from the editor's wire contract.
pub mod editor_commands {
    pub const PING: &str = "ping";
    pub const GET_STATE: &str = "get_state";
    pub const ENTER_PLAY_MODE: &str = "enter_play_mode";
    pub const EXIT_PLAY_MODE: &str = "exit_play_mode";
    pub const LOAD_SCENE: &str = "load_scene";
    pub const REFRESH_ASSETS: &str = "refresh_assets";
}

impl ConnectionRegistry {
    /// Send an arbitrary command to the editor attached to `target`
    /// (defaulting to the active target).
    ///
    /// Fails with `EditorRequired` when the entry has no live editor, so
    /// callers can fall back to degraded functionality instead of hanging.
    pub async fn send_command(
        &self,
        target: Option<&Path>,
        command: &str,
        params: Value,
    ) -> Result<Value> {
        let target = self.resolve_target(target).await?;
        let correlator = self.correlator_for(&target).await?;
        correlator.request_default(command, params).await
    }

    /// Liveness probe.
    pub async fn ping(&self, target: Option<&Path>) -> Result<Value> {
        self.send_command(target, editor_commands::PING, json!({})).await
    }

    /// Fetch the editor's current state and fold it into the cached bag.
    pub async fn editor_state(&self, target: Option<&Path>) -> Result<Value> {
        let target = self.resolve_target(target).await?;
        let correlator = self.correlator_for(&target).await?;
        let value = correlator
            .request_default(editor_commands::GET_STATE, json!({}))
            .await?;

        {
            let mut state = self.inner.state.write().await;
            if let Some(entry) = state.entries.get_mut(&target) {
                entry.state.merge(&value);
                entry.last_heartbeat = Some(chrono::Utc::now());
            }
        }

        Ok(value)
    }

    /// Start play mode.
    pub async fn enter_play_mode(&self, target: Option<&Path>) -> Result<Value> {
        self.send_command(target, editor_commands::ENTER_PLAY_MODE, json!({}))
            .await
    }

    /// Stop play mode.
    pub async fn exit_play_mode(&self, target: Option<&Path>) -> Result<Value> {
        self.send_command(target, editor_commands::EXIT_PLAY_MODE, json!({}))
            .await
    }

    /// Open a scene by project-relative path.
    pub async fn load_scene(&self, target: Option<&Path>, scene_path: &str) -> Result<Value> {
        self.send_command(
            target,
            editor_commands::LOAD_SCENE,
            json!({ "scenePath": scene_path }),
        )
        .await
    }

    /// Trigger an asset database refresh.
    pub async fn refresh_assets(&self, target: Option<&Path>) -> Result<Value> {
        self.send_command(target, editor_commands::REFRESH_ASSETS, json!({}))
            .await
    }
}
