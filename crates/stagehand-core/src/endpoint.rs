//! Rendezvous endpoint naming.
//!
//! The controller and the editor never exchange addresses out of band; both
//! derive the same endpoint name from the project path alone. The name is a
//! stable 32-bit hash of the path, so two processes that agree on the target
//! agree on the rendezvous point.

use crate::config::EditorConfig;
use std::path::Path;

/// Endpoint name for a target: `stagehand-<abs(fnv1a32(path))>`.
pub fn endpoint_name(target: &Path) -> String {
    let hash = fnv1a32(target.to_string_lossy().as_bytes());
    // The peer contract uses the absolute value of the signed interpretation.
    let n = (hash as i32).unsigned_abs();
    format!("{}-{}", EditorConfig::ENDPOINT_PREFIX, n)
}

/// Platform rendezvous path for a target.
///
/// Named pipe on Windows, filesystem domain socket elsewhere.
#[cfg(windows)]
pub fn endpoint_path(target: &Path) -> String {
    format!(r"\\.\pipe\{}", endpoint_name(target))
}

/// Platform rendezvous path for a target.
///
/// Named pipe on Windows, filesystem domain socket elsewhere.
#[cfg(not(windows))]
pub fn endpoint_path(target: &Path) -> String {
    format!("/tmp/{}", endpoint_name(target))
}

/// 32-bit FNV-1a over `bytes`.
fn fnv1a32(bytes: &[u8]) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;

    let mut hash = OFFSET_BASIS;
    for &b in bytes {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}
