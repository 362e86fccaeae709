//! Post-run processing utilities.
//!
//! Persists terminal transcripts: auto-named saves under the user data dir and explicit
//! exports to a chosen path.

use crate::model::LogEntry;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Transcript {
    pub saved_at_utc: String,
    pub entries: Vec<LogEntry>,
}

impl Transcript {
    pub fn new(entries: Vec<LogEntry>) -> Self {
        Self {
            saved_at_utc: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| "now".into()),
            entries,
        }
    }
}

fn transcripts_dir() -> Result<PathBuf> {
    let base = dirs::data_local_dir().context("no local data directory on this platform")?;
    Ok(base.join("automattuner").join("transcripts"))
}

/// Write `transcript` as pretty JSON to `path`, creating parent directories.
pub(crate) fn export_json(path: &Path, transcript: &Transcript) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(transcript).context("serialize transcript")?;
    std::fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Save into the default transcripts directory under a timestamped name.
pub(crate) fn save_transcript(transcript: &Transcript) -> Result<PathBuf> {
    save_transcript_in(&transcripts_dir()?, transcript)
}

fn save_transcript_in(dir: &Path, transcript: &Transcript) -> Result<PathBuf> {
    let name = format!(
        "transcript-{}.json",
        transcript.saved_at_utc.replace(':', "-").replace('T', "_")
    );
    let path = dir.join(name);
    export_json(&path, transcript)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FixedClock, LogKind};
    use time::macros::time;

    #[test]
    fn saved_transcript_round_trips_entries() {
        let dir = tempfile::tempdir().unwrap();
        let clock = FixedClock(time!(10:11:12));
        let entries = vec![
            LogEntry::create("> SUCCESS: done", LogKind::Success, &clock),
            LogEntry::create("> OPERATION COMPLETE. WAITING...", LogKind::Muted, &clock),
        ];

        let path = save_transcript_in(&dir.path().join("nested"), &Transcript::new(entries.clone()))
            .unwrap();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("transcript-"));

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"type\": \"muted\""));
        let back: Transcript = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.entries, entries);
    }
}
