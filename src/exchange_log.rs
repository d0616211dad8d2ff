use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::warn;

use crate::diff::changed_paths;

/// How refreshed snapshots are written to the exchange log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeLogMode {
    /// Every snapshot in full.
    Full,
    /// First snapshot in full, then only the changed paths.
    Diffed,
}

/// NDJSON trace of the exchanges with the vendor API.
pub(crate) struct ExchangeLogger {
    mode: ExchangeLogMode,
    file: File,
    previous: Option<Value>,
}

impl ExchangeLogger {
    pub fn new(mode: ExchangeLogMode, path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            mode,
            file,
            previous: None,
        })
    }

    pub fn log_request(&mut self, method: &str, path: &str, status: u16) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "req",
            "method": method,
            "path": path,
            "status": status,
        });
        self.write_line(&entry);
    }

    pub fn log_command(&mut self, action: &str, zone: Option<&str>, body: Option<&Value>) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "cmd",
            "action": action,
            "zone": zone,
            "body": body,
        });
        self.write_line(&entry);
    }

    pub fn log_snapshot(&mut self, snapshot: &Value) {
        let entry = match (self.mode, self.previous.as_ref()) {
            (ExchangeLogMode::Diffed, Some(prev)) => {
                let changes: Vec<Value> = changed_paths(prev, snapshot)
                    .into_iter()
                    .map(|c| json!({ "path": c.path, "old": c.old, "new": c.new }))
                    .collect();
                json!({
                    "ts": Utc::now().to_rfc3339(),
                    "dir": "snapshot",
                    "changes": changes,
                })
            }
            _ => json!({
                "ts": Utc::now().to_rfc3339(),
                "dir": "snapshot",
                "full": true,
                "body": snapshot,
            }),
        };
        self.write_line(&entry);
        if self.mode == ExchangeLogMode::Diffed {
            self.previous = Some(snapshot.clone());
        }
    }

    fn write_line(&mut self, entry: &Value) {
        if let Ok(line) = serde_json::to_string(entry)
            && let Err(e) = writeln!(self.file, "{line}")
        {
            warn!("failed to write exchange log entry: {e}");
        }
    }
}
