//! Per-project connection registry.
//!
//! The registry owns every connection: the map from project path to
//! {transport+correlator, cached editor state, health status} and the
//! active-target selection. Callers only ever receive copies of entry
//! state; status transitions happen exclusively in here.
//!
//! # Thread Safety
//!
//! The entry map is the only shared mutable state, behind a `tokio`
//! `RwLock`. Guards are never held across `.await`: each transition is a
//! synchronous critical section, and the `Connecting` status doubles as the
//! guard that serializes a connect attempt against concurrent connects and
//! the health sweep for the same target.

mod commands;
mod health;
pub mod project;

pub use commands::editor_commands;

use crate::config::{RegistryConfig, TransportOptions};
use crate::correlator::{Correlator, LinkEvent};
use crate::endpoint::endpoint_path;
use crate::error::{Result, StagehandError};
use crate::events::BridgeEvent;
use crate::locator::ProcessLocator;
use crate::state::{DerivedEditorState, EditorStateCache};
use crate::transport::Transport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{broadcast, watch, RwLock};
use tracing::{debug, info, warn};

/// Lifecycle status of one registry entry.
///
/// `Disconnected` is the conceptual initial state of a target with no
/// entry; entries are removed on explicit disconnect, so a listed entry is
/// always in one of the other states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No connection exists for this target.
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// A live transport exists and the editor answered a liveness probe.
    Connected,
    /// The project directory is valid but no live editor was reachable.
    ProjectOnly,
    /// A health check failed; `connect` may be retried.
    Error,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Connected => write!(f, "connected"),
            ConnectionStatus::ProjectOnly => write!(f, "project_only"),
            ConnectionStatus::Error => write!(f, "error"),
        }
    }
}

/// Caller-facing copy of one registry entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    /// Project path this entry is keyed by.
    pub target: PathBuf,
    /// Lifecycle status.
    pub status: ConnectionStatus,
    /// When a health check or editor event last touched this entry.
    pub last_heartbeat: Option<DateTime<Utc>>,
    /// Editor process id, when one was located.
    pub editor_pid: Option<u32>,
    /// Last known editor-reported state, verbatim.
    pub editor_state: serde_json::Map<String, serde_json::Value>,
}

/// Immutable snapshot of the whole registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySnapshot {
    /// All current entries, sorted by target.
    pub connections: Vec<ConnectionInfo>,
    /// The active target, if any.
    pub active: Option<PathBuf>,
    /// Derived flags from the active entry's cached state.
    pub editor: DerivedEditorState,
}

/// One registry entry. Owned exclusively by the registry.
struct ConnectionEntry {
    status: ConnectionStatus,
    last_heartbeat: Option<DateTime<Utc>>,
    editor_pid: Option<u32>,
    state: EditorStateCache,
    correlator: Option<Arc<Correlator>>,
    pump_task: Option<tokio::task::JoinHandle<()>>,
}

impl ConnectionEntry {
    fn connecting(state: EditorStateCache) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            last_heartbeat: None,
            editor_pid: None,
            state,
            correlator: None,
            pump_task: None,
        }
    }

    fn info(&self, target: &Path) -> ConnectionInfo {
        ConnectionInfo {
            target: target.to_path_buf(),
            status: self.status,
            last_heartbeat: self.last_heartbeat,
            editor_pid: self.editor_pid,
            editor_state: self.state.snapshot(),
        }
    }
}

/// Entry map plus active-target selection; mutated only inside one lock.
struct RegistryState {
    entries: HashMap<PathBuf, ConnectionEntry>,
    active: Option<PathBuf>,
}

/// Shared core of a registry, held by the public handle and its tasks.
struct RegistryInner {
    state: RwLock<RegistryState>,
    locator: ProcessLocator,
    options: TransportOptions,
    events_tx: broadcast::Sender<BridgeEvent>,
}

/// The connection registry. One instance per controller scope; it owns its
/// background tasks and publishes events on its own channel — there is no
/// process-global state.
pub struct ConnectionRegistry {
    inner: Arc<RegistryInner>,
    sweep_shutdown: watch::Sender<bool>,
    sweep_task: StdMutex<Option<tokio::task::JoinHandle<()>>>,
}

impl ConnectionRegistry {
    /// Registry backed by the OS process table and default transport
    /// options. Must be called from within a tokio runtime: the health
    /// sweep task starts immediately.
    pub fn new() -> Self {
        Self::with_locator(ProcessLocator::system())
    }

    /// Registry with a custom process locator (tests inject a canned one).
    pub fn with_locator(locator: ProcessLocator) -> Self {
        Self::with_parts(locator, TransportOptions::default())
    }

    /// Registry with full control over locator and transport options.
    pub fn with_parts(locator: ProcessLocator, options: TransportOptions) -> Self {
        let (events_tx, _) = broadcast::channel(RegistryConfig::EVENT_CHANNEL_CAPACITY);
        let inner = Arc::new(RegistryInner {
            state: RwLock::new(RegistryState {
                entries: HashMap::new(),
                active: None,
            }),
            locator,
            options,
            events_tx,
        });

        let (sweep_shutdown, shutdown_rx) = watch::channel(false);
        let sweep_task = tokio::spawn(health::run_sweep(inner.clone(), shutdown_rx));

        Self {
            inner,
            sweep_shutdown,
            sweep_task: StdMutex::new(Some(sweep_task)),
        }
    }

    /// Subscribe to this registry's events. Every subscriber receives every
    /// event.
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.inner.events_tx.subscribe()
    }

    /// Connect to a project.
    ///
    /// Idempotent for a target that is already `Connected`. Validates the
    /// project directory (`InvalidTarget` is fatal and never retried), then
    /// tries to reach a live editor; every expected failure on that path —
    /// no editor process, connect timeout, failed liveness probe — degrades
    /// the entry to `ProjectOnly` rather than erroring. On success the
    /// target becomes the registry's active target.
    pub async fn connect(&self, target: impl AsRef<Path>) -> Result<ConnectionInfo> {
        let target = target.as_ref().to_path_buf();

        // Fatal check first, outside the lock: cheap metadata reads.
        project::validate_project(&target)?;

        // Guard: claim the entry inside one critical section.
        let displaced = {
            let mut state = self.inner.state.write().await;
            if let Some(entry) = state.entries.get(&target) {
                match entry.status {
                    ConnectionStatus::Connected => {
                        let info = entry.info(&target);
                        state.active = Some(target.clone());
                        return Ok(info);
                    }
                    // An attempt is already in flight and owns the
                    // transition; report what exists today.
                    ConnectionStatus::Connecting => return Ok(entry.info(&target)),
                    _ => {}
                }
            }
            let carried_state = state
                .entries
                .get(&target)
                .map(|e| e.state.clone())
                .unwrap_or_default();
            state
                .entries
                .insert(target.clone(), ConnectionEntry::connecting(carried_state))
        };

        // A displaced ProjectOnly/Error entry has no live connection, but
        // close defensively in case a teardown was interrupted.
        if let Some(old) = displaced {
            close_entry(old).await;
        }

        // Attempt, with no registry lock held.
        let (status, editor_pid, correlator) = self.attempt(&target).await;

        // Commit.
        let info = {
            let mut state = self.inner.state.write().await;
            let Some(entry) = state.entries.get_mut(&target) else {
                // A concurrent disconnect removed the entry; honor it.
                drop(state);
                if let Some(correlator) = correlator {
                    correlator.close().await;
                }
                return Err(StagehandError::NotConnected(target));
            };
            entry.status = status;
            entry.editor_pid = editor_pid;
            entry.last_heartbeat = Some(Utc::now());
            entry.correlator = correlator.clone();
            if let Some(ref correlator) = correlator {
                entry.pump_task = Some(spawn_event_pump(
                    self.inner.clone(),
                    target.clone(),
                    correlator,
                ));
            }
            let info = entry.info(&target);
            state.active = Some(target.clone());
            info
        };

        info!("Connected to {:?} with status {}", info.target, info.status);
        Ok(info)
    }

    /// Run the locate → transport → liveness-probe pipeline for one target.
    async fn attempt(
        &self,
        target: &Path,
    ) -> (ConnectionStatus, Option<u32>, Option<Arc<Correlator>>) {
        let editor = match self.inner.locator.locate_target(target).await {
            Ok(found) => found,
            Err(e) => {
                // Enumeration being unavailable means "no peers found".
                warn!("{}", e);
                None
            }
        };

        let Some(editor) = editor else {
            debug!("No running editor for {:?}", target);
            return (ConnectionStatus::ProjectOnly, None, None);
        };

        let endpoint = endpoint_path(target);
        let transport = match Transport::connect(&endpoint, self.inner.options).await {
            Ok(t) => t,
            Err(e) => {
                info!(
                    "Editor pid {} found for {:?} but transport failed: {}",
                    editor.pid, target, e
                );
                return (ConnectionStatus::ProjectOnly, Some(editor.pid), None);
            }
        };

        let correlator = Arc::new(Correlator::new(transport));
        match correlator
            .request_default(editor_commands::PING, json!({}))
            .await
        {
            Ok(_) => (
                ConnectionStatus::Connected,
                Some(editor.pid),
                Some(correlator),
            ),
            Err(e) => {
                info!("Editor at {:?} did not answer liveness probe: {}", target, e);
                correlator.close().await;
                (ConnectionStatus::ProjectOnly, Some(editor.pid), None)
            }
        }
    }

    /// Tear down a connection and remove its entry.
    ///
    /// Defaults to the active target; fails with `NoActiveConnection` when
    /// none is specified and none is active, and `NotConnected` for a
    /// target with no entry.
    pub async fn disconnect(&self, target: Option<&Path>) -> Result<()> {
        let target = self.resolve_target(target).await?;

        let entry = {
            let mut state = self.inner.state.write().await;
            let entry = state
                .entries
                .remove(&target)
                .ok_or_else(|| StagehandError::NotConnected(target.clone()))?;
            if state.active.as_deref() == Some(target.as_path()) {
                state.active = None;
            }
            entry
        };

        close_entry(entry).await;
        info!("Disconnected from {:?}", target);
        Ok(())
    }

    /// Immutable snapshot of all entries, the active target, and the
    /// derived editor flags. Always succeeds.
    pub async fn status(&self) -> RegistrySnapshot {
        let state = self.inner.state.read().await;

        let mut connections: Vec<ConnectionInfo> = state
            .entries
            .iter()
            .map(|(target, entry)| entry.info(target))
            .collect();
        connections.sort_by(|a, b| a.target.cmp(&b.target));

        let editor = state
            .active
            .as_ref()
            .and_then(|t| state.entries.get(t))
            .map(|entry| entry.state.derived())
            .unwrap_or_default();

        RegistrySnapshot {
            connections,
            active: state.active.clone(),
            editor,
        }
    }

    /// The currently active target, if any.
    pub async fn active(&self) -> Option<PathBuf> {
        self.inner.state.read().await.active.clone()
    }

    /// Make `target` the active target. Requires status `Connected`.
    pub async fn set_active(&self, target: impl AsRef<Path>) -> Result<()> {
        let target = target.as_ref().to_path_buf();
        let mut state = self.inner.state.write().await;

        let connected = state
            .entries
            .get(&target)
            .map(|entry| entry.status == ConnectionStatus::Connected)
            .unwrap_or(false);
        if !connected {
            return Err(StagehandError::NotConnected(target));
        }

        state.active = Some(target);
        Ok(())
    }

    /// Find project directories under `search_root`.
    pub fn discover(&self, search_root: &Path) -> Result<Vec<PathBuf>> {
        project::discover(search_root)
    }

    /// Run one health sweep immediately, in addition to the background
    /// cadence.
    pub async fn sweep_now(&self) {
        health::sweep_once(&self.inner).await;
    }

    /// Stop the health sweep and tear down every connection.
    pub async fn shutdown(&self) {
        let _ = self.sweep_shutdown.send(true);
        let task = self.sweep_task.lock().expect("sweep slot poisoned").take();
        if let Some(handle) = task {
            let _ = handle.await;
        }

        let entries: Vec<ConnectionEntry> = {
            let mut state = self.inner.state.write().await;
            state.active = None;
            state.entries.drain().map(|(_, entry)| entry).collect()
        };
        for entry in entries {
            close_entry(entry).await;
        }
        info!("Registry shut down");
    }

    /// Resolve an optional target to a concrete one, defaulting to active.
    async fn resolve_target(&self, target: Option<&Path>) -> Result<PathBuf> {
        match target {
            Some(t) => Ok(t.to_path_buf()),
            None => self
                .inner
                .state
                .read()
                .await
                .active
                .clone()
                .ok_or(StagehandError::NoActiveConnection),
        }
    }

    /// Clone the correlator handle for a target, or fail with the precise
    /// caller error: `NotConnected` when no entry exists, `EditorRequired`
    /// when the entry has no live editor attached.
    async fn correlator_for(&self, target: &Path) -> Result<Arc<Correlator>> {
        let state = self.inner.state.read().await;
        let entry = state
            .entries
            .get(target)
            .ok_or_else(|| StagehandError::NotConnected(target.to_path_buf()))?;
        entry
            .correlator
            .clone()
            .ok_or_else(|| StagehandError::EditorRequired(target.to_path_buf()))
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ConnectionRegistry {
    fn drop(&mut self) {
        // Best-effort for a registry dropped without shutdown(); entry
        // tasks end when their correlators are dropped with the map.
        let _ = self.sweep_shutdown.send(true);
        if let Some(handle) = self.sweep_task.lock().expect("sweep slot poisoned").take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry").finish_non_exhaustive()
    }
}

/// Close a removed entry's connection and join its event pump.
async fn close_entry(entry: ConnectionEntry) {
    close_connection(entry.correlator, entry.pump_task).await;
}

/// Close a connection's parts in order: correlator first (which ends the
/// pump's channels), then join the pump.
async fn close_connection(
    correlator: Option<Arc<Correlator>>,
    pump: Option<tokio::task::JoinHandle<()>>,
) {
    if let Some(correlator) = correlator {
        correlator.close().await;
    }
    if let Some(pump) = pump {
        // The pump ends on its own once the correlator's channels close.
        let _ = pump.await;
    }
}

/// Pump one connection's editor and link events into the registry: update
/// the cached state, then re-emit on the registry channel.
fn spawn_event_pump(
    inner: Arc<RegistryInner>,
    target: PathBuf,
    correlator: &Correlator,
) -> tokio::task::JoinHandle<()> {
    let mut events = correlator.subscribe();
    let mut links = correlator.subscribe_link();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(event) => {
                        {
                            let mut state = inner.state.write().await;
                            let Some(entry) = state.entries.get_mut(&target) else {
                                break; // entry was removed under us
                            };
                            entry.state.apply_event(&event);
                            entry.last_heartbeat = Some(Utc::now());
                        }
                        let _ = inner.events_tx.send(BridgeEvent::Editor {
                            target: target.clone(),
                            event,
                        });
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Event pump for {:?} dropped {} event(s)", target, n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                link = links.recv() => match link {
                    Ok(LinkEvent::Down) => {
                        let _ = inner
                            .events_tx
                            .send(BridgeEvent::EditorDisconnected { target: target.clone() });
                    }
                    Ok(LinkEvent::Up) => {
                        let _ = inner
                            .events_tx
                            .send(BridgeEvent::EditorReconnected { target: target.clone() });
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::locator::ProcessScanner;
    use async_trait::async_trait;
    use tempfile::TempDir;

    /// Scanner that reports no processes at all.
    struct EmptyScanner;

    #[async_trait]
    impl ProcessScanner for EmptyScanner {
        async fn scan(&self) -> Result<Vec<(u32, String)>> {
            Ok(Vec::new())
        }
    }

    /// Scanner whose enumeration mechanism is broken.
    struct BrokenScanner;

    #[async_trait]
    impl ProcessScanner for BrokenScanner {
        async fn scan(&self) -> Result<Vec<(u32, String)>> {
            Err(StagehandError::Locate {
                message: "ps unavailable".to_string(),
                source: None,
            })
        }
    }

    fn make_project(root: &Path, name: &str) -> PathBuf {
        let project = root.join(name);
        for marker in EditorConfig::PROJECT_MARKERS {
            std::fs::create_dir_all(project.join(marker)).unwrap();
        }
        project
    }

    fn offline_registry() -> ConnectionRegistry {
        ConnectionRegistry::with_locator(ProcessLocator::with_scanner(Arc::new(EmptyScanner)))
    }

    #[tokio::test]
    async fn test_connect_without_editor_is_project_only() {
        let dir = TempDir::new().unwrap();
        let project = make_project(dir.path(), "racer");
        let registry = offline_registry();

        let info = registry.connect(&project).await.unwrap();
        assert_eq!(info.status, ConnectionStatus::ProjectOnly);
        assert_eq!(info.editor_pid, None);

        let snapshot = registry.status().await;
        assert_eq!(snapshot.connections.len(), 1);
        assert_eq!(snapshot.active, Some(project));
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_connect_invalid_target_is_fatal_and_unlisted() {
        let dir = TempDir::new().unwrap();
        let registry = offline_registry();

        let result = registry.connect(dir.path().join("missing")).await;
        assert!(matches!(result, Err(StagehandError::InvalidTarget { .. })));

        assert!(registry.status().await.connections.is_empty());
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_locate_failure_degrades_to_project_only() {
        let dir = TempDir::new().unwrap();
        let project = make_project(dir.path(), "racer");
        let registry =
            ConnectionRegistry::with_locator(ProcessLocator::with_scanner(Arc::new(BrokenScanner)));

        let info = registry.connect(&project).await.unwrap();
        assert_eq!(info.status, ConnectionStatus::ProjectOnly);
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_command_without_editor_fails_with_editor_required() {
        let dir = TempDir::new().unwrap();
        let project = make_project(dir.path(), "racer");
        let registry = offline_registry();
        registry.connect(&project).await.unwrap();

        let result = registry.enter_play_mode(None).await;
        assert!(matches!(result, Err(StagehandError::EditorRequired(_))));

        // The entry is still listed after the failed command.
        assert_eq!(registry.status().await.connections.len(), 1);
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_command_on_unknown_target_fails_with_not_connected() {
        let registry = offline_registry();
        let result = registry
            .send_command(Some(Path::new("/never/connected")), "ping", json!({}))
            .await;
        assert!(matches!(result, Err(StagehandError::NotConnected(_))));
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_disconnect_defaults_to_active() {
        let dir = TempDir::new().unwrap();
        let project = make_project(dir.path(), "racer");
        let registry = offline_registry();
        registry.connect(&project).await.unwrap();

        registry.disconnect(None).await.unwrap();
        let snapshot = registry.status().await;
        assert!(snapshot.connections.is_empty());
        assert_eq!(snapshot.active, None);

        // Nothing active anymore.
        assert!(matches!(
            registry.disconnect(None).await,
            Err(StagehandError::NoActiveConnection)
        ));
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_disconnect_unknown_target() {
        let registry = offline_registry();
        let result = registry.disconnect(Some(Path::new("/never/connected"))).await;
        assert!(matches!(result, Err(StagehandError::NotConnected(_))));
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_set_active_requires_connected_status() {
        let dir = TempDir::new().unwrap();
        let project = make_project(dir.path(), "racer");
        let registry = offline_registry();
        registry.connect(&project).await.unwrap();

        // ProjectOnly is not good enough for set_active.
        let result = registry.set_active(&project).await;
        assert!(matches!(result, Err(StagehandError::NotConnected(_))));
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_connect_is_idempotent_per_target() {
        let dir = TempDir::new().unwrap();
        let project = make_project(dir.path(), "racer");
        let registry = offline_registry();

        registry.connect(&project).await.unwrap();
        registry.connect(&project).await.unwrap();

        assert_eq!(registry.status().await.connections.len(), 1);
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_sweep_isolates_failures_per_target() {
        let dir = TempDir::new().unwrap();
        let project_a = make_project(dir.path(), "a");
        let project_b = make_project(dir.path(), "b");
        let registry = offline_registry();
        registry.connect(&project_a).await.unwrap();
        registry.connect(&project_b).await.unwrap();

        let mut events = registry.subscribe();

        // Delete project A behind the registry's back.
        std::fs::remove_dir_all(&project_a).unwrap();
        registry.sweep_now().await;

        let snapshot = registry.status().await;
        let by_target = |t: &PathBuf| {
            snapshot
                .connections
                .iter()
                .find(|c| &c.target == t)
                .unwrap()
                .status
        };
        assert_eq!(by_target(&project_a), ConnectionStatus::Error);
        assert_eq!(by_target(&project_b), ConnectionStatus::ProjectOnly);

        match events.try_recv() {
            Ok(BridgeEvent::ConnectionError { target, .. }) => assert_eq!(target, project_a),
            other => panic!("Expected ConnectionError event, got {:?}", other),
        }
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_sweep_refreshes_heartbeat_on_healthy_entries() {
        let dir = TempDir::new().unwrap();
        let project = make_project(dir.path(), "racer");
        let registry = offline_registry();
        let before = registry.connect(&project).await.unwrap();

        registry.sweep_now().await;

        let snapshot = registry.status().await;
        let after = &snapshot.connections[0];
        assert_eq!(after.status, ConnectionStatus::ProjectOnly);
        assert!(after.last_heartbeat >= before.last_heartbeat);
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_connect_after_error_retries() {
        let dir = TempDir::new().unwrap();
        let project = make_project(dir.path(), "racer");
        let registry = offline_registry();
        registry.connect(&project).await.unwrap();

        std::fs::remove_dir_all(&project).unwrap();
        registry.sweep_now().await;
        assert_eq!(
            registry.status().await.connections[0].status,
            ConnectionStatus::Error
        );

        // The project comes back; connect re-enters the attempt.
        for marker in EditorConfig::PROJECT_MARKERS {
            std::fs::create_dir_all(project.join(marker)).unwrap();
        }
        let info = registry.connect(&project).await.unwrap();
        assert_eq!(info.status, ConnectionStatus::ProjectOnly);
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_discover_lists_projects() {
        let dir = TempDir::new().unwrap();
        let a = make_project(dir.path(), "a");
        let registry = offline_registry();

        let found = registry.discover(dir.path()).unwrap();
        assert_eq!(found, vec![a]);
        registry.shutdown().await;
    }
}
