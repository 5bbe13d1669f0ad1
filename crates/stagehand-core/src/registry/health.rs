//! Background connection health sweep.
//!
//! The sweep only performs cheap local checks — project directory layout
//! and process-table liveness — never a round-trip to the editor, so a
//! busy editor is not penalized for slow command latency. A failing check
//! on one target must not affect any other, and the sweep itself must
//! never bring the process down.

use super::{close_connection, project, ConnectionStatus, RegistryInner};
use crate::config::RegistryConfig;
use crate::events::BridgeEvent;
use crate::platform::is_process_alive;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Run sweeps at the configured interval until shutdown is signalled.
pub(super) async fn run_sweep(inner: Arc<RegistryInner>, mut shutdown: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep(RegistryConfig::SWEEP_INTERVAL) => {}
        }
        sweep_once(&inner).await;
    }
    debug!("Health sweep stopped");
}

/// Check every entry once.
pub(super) async fn sweep_once(inner: &RegistryInner) {
    // Snapshot the work list first; checks run without the lock held.
    let checks: Vec<(PathBuf, ConnectionStatus, Option<u32>)> = {
        let state = inner.state.read().await;
        state
            .entries
            .iter()
            .map(|(target, entry)| (target.clone(), entry.status, entry.editor_pid))
            .collect()
    };

    for (target, status, editor_pid) in checks {
        // An in-flight connect owns this entry; leave it alone.
        if status == ConnectionStatus::Connecting {
            continue;
        }

        let failure = check_entry(&target, status, editor_pid);

        match failure {
            None => {
                let mut state = inner.state.write().await;
                if let Some(entry) = state.entries.get_mut(&target) {
                    if entry.status != ConnectionStatus::Connecting {
                        entry.last_heartbeat = Some(Utc::now());
                    }
                }
            }
            Some(reason) => {
                warn!("Health check failed for {:?}: {}", target, reason);
                let torn_down = {
                    let mut state = inner.state.write().await;
                    match state.entries.get_mut(&target) {
                        // The entry changed hands while we were checking.
                        None => None,
                        Some(entry) if entry.status == ConnectionStatus::Connecting => None,
                        Some(entry) => {
                            entry.status = ConnectionStatus::Error;
                            let correlator = entry.correlator.take();
                            let pump = entry.pump_task.take();
                            Some((correlator, pump))
                        }
                    }
                };

                if let Some((correlator, pump)) = torn_down {
                    close_connection(correlator, pump).await;
                    let _ = inner.events_tx.send(BridgeEvent::ConnectionError {
                        target: target.clone(),
                        message: reason,
                    });
                }
            }
        }
    }
}

/// Cheap local health checks for one entry. Returns the failure reason.
fn check_entry(
    target: &std::path::Path,
    status: ConnectionStatus,
    editor_pid: Option<u32>,
) -> Option<String> {
    if project::validate_project(target).is_err() {
        return Some("project directory missing or malformed".to_string());
    }

    if status == ConnectionStatus::Connected {
        if let Some(pid) = editor_pid {
            if !is_process_alive(pid) {
                return Some(format!("editor process {} exited", pid));
            }
        }
    }

    None
}
