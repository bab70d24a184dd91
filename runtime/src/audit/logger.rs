//! JSONL audit logger: append-only log of every harvest event.

use crate::error::HarvestResult;
use crate::events::{EventSink, HarvestEvent};
use chrono::Utc;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use tracing::warn;

/// A single audit line.
#[derive(Debug, Clone, Serialize)]
pub struct AuditLine<'a> {
    pub timestamp: String,
    pub run_id: &'a str,
    #[serde(flatten)]
    pub event: &'a HarvestEvent,
}

/// Append-only JSONL audit logger.
pub struct AuditLogger {
    file: Mutex<File>,
    run_id: String,
}

impl AuditLogger {
    /// Open or create the audit log file.
    pub fn open(path: &Path) -> HarvestResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            file: Mutex::new(file),
            run_id: uuid::Uuid::new_v4().to_string(),
        })
    }

    /// Identifier shared by every line this logger writes.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Append one event.
    pub fn log(&self, event: &HarvestEvent) -> HarvestResult<()> {
        let line = AuditLine {
            timestamp: Utc::now().to_rfc3339(),
            run_id: &self.run_id,
            event,
        };
        let json = serde_json::to_string(&line)?;
        let mut file = match self.file.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        writeln!(file, "{json}")?;
        Ok(())
    }
}

impl EventSink for AuditLogger {
    fn emit(&self, event: HarvestEvent) {
        if let Err(e) = self.log(&event) {
            warn!("audit log write failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_are_appended_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/audit.jsonl");
        let logger = AuditLogger::open(&path).unwrap();

        logger.emit(HarvestEvent::Captured {
            subject: "11".into(),
        });
        logger.emit(HarvestEvent::NotFound {
            subject: "12".into(),
        });

        let raw = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = raw
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "captured");
        assert_eq!(lines[1]["subject"], "12");
        assert_eq!(lines[0]["run_id"], logger.run_id());
        assert!(lines[0]["timestamp"].is_string());
    }

    #[test]
    fn test_reopen_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        AuditLogger::open(&path)
            .unwrap()
            .emit(HarvestEvent::BlankImage { subject: "x".into() });
        AuditLogger::open(&path)
            .unwrap()
            .emit(HarvestEvent::BlankImage { subject: "y".into() });
        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw.lines().count(), 2);
    }
}
