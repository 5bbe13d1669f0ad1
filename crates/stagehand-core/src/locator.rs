//! Editor process discovery.
//!
//! Enumerates the OS process table, filters to editor processes, and
//! extracts the project path each one was launched against. Results are a
//! point-in-time snapshot: a process may exit between enumeration and use,
//! so callers treat them as advisory.

use crate::config::EditorConfig;
use crate::error::{Result, StagehandError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// A discovered editor process. Ephemeral — recomputed on every locate call.
#[derive(Debug, Clone)]
pub struct EditorProcess {
    /// OS process id.
    pub pid: u32,
    /// Raw command line as reported by the process table.
    pub command_line: String,
    /// Project path extracted from the launch arguments.
    pub project_path: PathBuf,
}

/// Source of raw `(pid, command line)` rows.
///
/// The production implementation shells out to the OS process lister; tests
/// substitute a canned table.
#[async_trait]
pub trait ProcessScanner: Send + Sync {
    /// Enumerate all visible processes.
    ///
    /// Fails only when the enumeration mechanism itself cannot run; an empty
    /// table is a valid result.
    async fn scan(&self) -> Result<Vec<(u32, String)>>;
}

/// Scanner backed by the platform process lister (`ps` / `wmic`).
#[derive(Debug, Default)]
pub struct SystemProcessScanner;

#[async_trait]
impl ProcessScanner for SystemProcessScanner {
    #[cfg(unix)]
    async fn scan(&self) -> Result<Vec<(u32, String)>> {
        let output = tokio::process::Command::new("ps")
            .args(["-eo", "pid=,args="])
            .output()
            .await
            .map_err(|e| StagehandError::Locate {
                message: "Failed to run ps".to_string(),
                source: Some(e),
            })?;

        if !output.status.success() {
            return Err(StagehandError::Locate {
                message: format!("ps exited with {}", output.status),
                source: None,
            });
        }

        Ok(parse_process_table(&String::from_utf8_lossy(&output.stdout)))
    }

    #[cfg(windows)]
    async fn scan(&self) -> Result<Vec<(u32, String)>> {
        let output = tokio::process::Command::new("wmic")
            .args(["process", "get", "processid,commandline", "/format:csv"])
            .output()
            .await
            .map_err(|e| StagehandError::Locate {
                message: "Failed to run wmic".to_string(),
                source: Some(e),
            })?;

        if !output.status.success() {
            return Err(StagehandError::Locate {
                message: format!("wmic exited with {}", output.status),
                source: None,
            });
        }

        Ok(parse_wmic_csv(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parse whitespace-separated `pid command...` rows.
///
/// Header rows, blank lines, and truncated rows are silently skipped —
/// partial results are expected and useful.
#[cfg(unix)]
fn parse_process_table(stdout: &str) -> Vec<(u32, String)> {
    stdout
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let (pid, cmdline) = line.split_once(char::is_whitespace)?;
            let pid: u32 = pid.trim().parse().ok()?;
            let cmdline = cmdline.trim();
            if cmdline.is_empty() {
                return None;
            }
            Some((pid, cmdline.to_string()))
        })
        .collect()
}

/// Parse wmic CSV rows: `Node,CommandLine,ProcessId`.
#[cfg(windows)]
fn parse_wmic_csv(stdout: &str) -> Vec<(u32, String)> {
    stdout
        .lines()
        .skip(1) // header
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            let parts: Vec<&str> = line.split(',').collect();
            if parts.len() < 3 {
                return None;
            }
            // CommandLine may itself contain commas; ProcessId is last.
            let pid: u32 = parts[parts.len() - 1].trim().parse().ok()?;
            let cmdline = parts[1..parts.len() - 1].join(",");
            if cmdline.is_empty() {
                return None;
            }
            Some((pid, cmdline))
        })
        .collect()
}

/// Extract the `-projectPath` value from an editor command line.
///
/// Handles both bare and double-quoted values. Returns `None` when the flag
/// is absent or has no value.
pub fn extract_project_path(command_line: &str) -> Option<PathBuf> {
    static PATTERN: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    let re = PATTERN.get_or_init(|| {
        regex::Regex::new(&format!(
            r#"{}\s+(?:"([^"]+)"|(\S+))"#,
            regex::escape(EditorConfig::PROJECT_PATH_FLAG)
        ))
        .expect("project path pattern is valid")
    });

    let caps = re.captures(command_line)?;
    let raw = caps.get(1).or_else(|| caps.get(2))?.as_str();
    Some(PathBuf::from(raw))
}

/// Finds running editor processes and the projects they were launched with.
#[derive(Clone)]
pub struct ProcessLocator {
    scanner: Arc<dyn ProcessScanner>,
}

impl ProcessLocator {
    /// Locator backed by the OS process table.
    pub fn system() -> Self {
        Self {
            scanner: Arc::new(SystemProcessScanner),
        }
    }

    /// Locator backed by a custom scanner.
    pub fn with_scanner(scanner: Arc<dyn ProcessScanner>) -> Self {
        Self { scanner }
    }

    /// Enumerate running editor processes.
    ///
    /// Rows that are not editor processes, or whose command line has no
    /// parsable project path, are skipped. An empty list is not an error.
    pub async fn locate(&self) -> Result<Vec<EditorProcess>> {
        let rows = self.scanner.scan().await?;
        let found: Vec<EditorProcess> = rows
            .into_iter()
            .filter(|(_, cmdline)| cmdline.contains(EditorConfig::PROCESS_NAME))
            .filter_map(|(pid, command_line)| {
                let project_path = extract_project_path(&command_line)?;
                Some(EditorProcess {
                    pid,
                    command_line,
                    project_path,
                })
            })
            .collect();

        debug!("Located {} editor process(es)", found.len());
        Ok(found)
    }

    /// Find the editor process launched against `target`, if any.
    pub async fn locate_target(&self, target: &Path) -> Result<Option<EditorProcess>> {
        let found = self.locate().await?;
        Ok(found
            .into_iter()
            .find(|proc| paths_match(&proc.project_path, target)))
    }
}

impl std::fmt::Debug for ProcessLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessLocator").finish_non_exhaustive()
    }
}

/// Compare two project paths, canonicalizing when possible so symlinked and
/// trailing-slash spellings of the same project match.
fn paths_match(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(ca), Ok(cb)) => ca == cb,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeScanner(Vec<(u32, String)>);

    #[async_trait]
    impl ProcessScanner for FakeScanner {
        async fn scan(&self) -> Result<Vec<(u32, String)>> {
            Ok(self.0.clone())
        }
    }

    struct FailingScanner;

    #[async_trait]
    impl ProcessScanner for FailingScanner {
        async fn scan(&self) -> Result<Vec<(u32, String)>> {
            Err(StagehandError::Locate {
                message: "ps missing".to_string(),
                source: None,
            })
        }
    }

    #[test]
    fn test_extract_project_path_bare() {
        let path = extract_project_path("/opt/Unity/Editor/Unity -projectPath /home/dev/racer");
        assert_eq!(path, Some(PathBuf::from("/home/dev/racer")));
    }

    #[test]
    fn test_extract_project_path_quoted() {
        let path = extract_project_path(
            r#"C:\Unity\Editor\Unity.exe -batchmode -projectPath "C:\Projects\My Game" -logFile"#,
        );
        assert_eq!(path, Some(PathBuf::from(r"C:\Projects\My Game")));
    }

    #[test]
    fn test_extract_project_path_absent() {
        assert_eq!(extract_project_path("/usr/bin/vim main.rs"), None);
        assert_eq!(extract_project_path("Unity -projectPath"), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_parse_process_table_tolerates_noise() {
        let table = "  PID COMMAND\n\
                     \n\
                     1234 /opt/Unity/Editor/Unity -projectPath /proj/a\n\
                     not-a-pid something\n\
                     5678\n\
                     91 ps -eo pid=,args=\n";
        let rows = parse_process_table(table);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, 1234);
        assert_eq!(rows[1], (91, "ps -eo pid=,args=".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_parse_process_table_empty() {
        assert!(parse_process_table("").is_empty());
    }

    #[tokio::test]
    async fn test_locate_filters_and_extracts() {
        let locator = ProcessLocator::with_scanner(Arc::new(FakeScanner(vec![
            (100, "/usr/bin/bash".to_string()),
            (
                200,
                "/opt/Unity/Editor/Unity -projectPath /proj/a".to_string(),
            ),
            // Editor process with an unparsable command line: skipped.
            (300, "/opt/Unity/Editor/Unity -batchmode".to_string()),
        ])));

        let found = locator.locate().await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].pid, 200);
        assert_eq!(found[0].project_path, PathBuf::from("/proj/a"));
    }

    #[tokio::test]
    async fn test_locate_target_misses_other_projects() {
        let locator = ProcessLocator::with_scanner(Arc::new(FakeScanner(vec![(
            200,
            "/opt/Unity/Editor/Unity -projectPath /proj/a".to_string(),
        )])));

        assert!(locator
            .locate_target(Path::new("/proj/a"))
            .await
            .unwrap()
            .is_some());
        assert!(locator
            .locate_target(Path::new("/proj/b"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_locate_propagates_mechanism_failure() {
        let locator = ProcessLocator::with_scanner(Arc::new(FailingScanner));
        assert!(matches!(
            locator.locate().await,
            Err(StagehandError::Locate { .. })
        ));
    }
}
