use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use time::macros::format_description;

/// Target CPU architecture passed through to the packaging engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    #[default]
    X64,
    X86,
    Arm64,
}

impl Architecture {
    pub const ALL: [Architecture; 3] = [Architecture::X64, Architecture::X86, Architecture::Arm64];

    pub fn as_str(self) -> &'static str {
        match self {
            Architecture::X64 => "x64",
            Architecture::X86 => "x86",
            Architecture::Arm64 => "arm64",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Installer context (machine-wide or per-user).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InstallContext {
    #[default]
    System,
    User,
}

impl InstallContext {
    pub const ALL: [InstallContext; 2] = [InstallContext::System, InstallContext::User];

    pub fn as_str(self) -> &'static str {
        match self {
            InstallContext::System => "system",
            InstallContext::User => "user",
        }
    }
}

impl fmt::Display for InstallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator intent for a single run. Produced by the form, read-only to the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub app_ids: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub architecture: Architecture,
    #[serde(default)]
    pub context: InstallContext,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

/// Rejection raised before a run may start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingAppIds,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingAppIds => f.write_str("Application IDs are required."),
        }
    }
}

impl std::error::Error for ValidationError {}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.app_ids.trim().is_empty() {
            return Err(ValidationError::MissingAppIds);
        }
        Ok(())
    }

    /// Individual identifiers from the comma-separated list, blanks dropped.
    pub fn app_id_list(&self) -> Vec<&str> {
        self.app_ids
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Version to request; an empty field means "latest".
    pub fn effective_version(&self) -> &str {
        let v = self.version.trim();
        if v.is_empty() {
            "latest"
        } else {
            v
        }
    }

    /// Tenant identifier if one was supplied and is not blank.
    pub fn tenant(&self) -> Option<&str> {
        self.tenant_id
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Severity of a terminal line. Only affects presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Success,
    Warning,
    Error,
    Muted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(u64);

static NEXT_ENTRY_ID: AtomicU64 = AtomicU64::new(1);

impl EntryId {
    fn fresh() -> Self {
        EntryId(NEXT_ENTRY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Wall-clock source for entry timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> time::Time;
}

/// Local time of day, falling back to UTC when the local offset cannot be determined
/// (the `time` crate refuses it once other threads are running on some platforms).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> time::Time {
        time::OffsetDateTime::now_local()
            .unwrap_or_else(|_| time::OffsetDateTime::now_utc())
            .time()
    }
}

#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub time::Time);

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> time::Time {
        self.0
    }
}

/// One immutable terminal line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: EntryId,
    pub timestamp: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: LogKind,
}

impl LogEntry {
    /// Build an entry with a fresh id; the timestamp is captured now, not at render time.
    pub fn create(message: impl Into<String>, kind: LogKind, clock: &dyn Clock) -> Self {
        let fmt = format_description!("[hour repr:24]:[minute]:[second]");
        let timestamp = clock
            .now()
            .format(&fmt)
            .unwrap_or_else(|_| "--:--:--".into());
        Self {
            id: EntryId::fresh(),
            timestamp,
            message: message.into(),
            kind,
        }
    }
}

/// Orchestrator lifecycle flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    #[default]
    Idle,
    Running,
}

impl RunState {
    pub fn is_running(self) -> bool {
        matches!(self, RunState::Running)
    }

    /// Submit control label for this state.
    pub fn submit_label(self) -> &'static str {
        match self {
            RunState::Idle => "INITIATE SEQUENCE",
            RunState::Running => "PROCESSING...",
        }
    }
}

/// Core-to-display contract: an ordered stream of terminal mutations.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
    Cleared,
    Appended { entry: LogEntry, typed: bool },
    Revealed { id: EntryId, text: String },
    StateChanged(RunState),
}

/// Request body for `POST /api/run`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    pub app_ids: String,
    pub version: String,
    pub architecture: Architecture,
    pub installer_context: InstallContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

impl From<&RunConfig> for RunRequest {
    fn from(cfg: &RunConfig) -> Self {
        Self {
            app_ids: cfg.app_id_list().join(","),
            version: cfg.effective_version().to_string(),
            architecture: cfg.architecture,
            installer_context: cfg.context,
            tenant_id: cfg.tenant().map(str::to_string),
        }
    }
}

/// Response body; every field is optional because success and failure share one shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
    #[serde(default)]
    pub logs: Option<serde_json::Value>,
    /// Usually a string, but any JSON value is accepted so a structured error still
    /// reads as an application failure.
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl RunResponse {
    /// Engine output to show verbatim, if the payload carries any.
    ///
    /// `details.logs` wins (string as-is, string array joined by newlines); otherwise the
    /// whole `details` object is pretty-printed. A top-level `logs` is used when there is
    /// no `details` at all.
    pub fn detail_text(&self) -> Option<String> {
        match self.details.as_ref() {
            Some(serde_json::Value::Null) | None => self.logs.as_ref().and_then(logs_text),
            Some(details) => details
                .get("logs")
                .and_then(logs_text)
                .or_else(|| serde_json::to_string_pretty(details).ok()),
        }
    }

    /// The `error` field as display text. Strings are used as-is, other values are
    /// rendered as compact JSON. Blank strings count as absent.
    pub fn error_text(&self) -> Option<String> {
        match self.error.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) if s.trim().is_empty() => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

fn logs_text(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::Array(items) => {
            let lines: Vec<&str> = items.iter().filter_map(|i| i.as_str()).collect();
            if lines.is_empty() {
                None
            } else {
                Some(lines.join("\n"))
            }
        }
        _ => None,
    }
}

/// Classified reply from the execution endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReply {
    pub ok: bool,
    pub status_code: u16,
    pub body: RunResponse,
}
