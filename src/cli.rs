use crate::model::{Architecture, InstallContext, PanelEvent, RunConfig, SystemClock};
use crate::orchestrator::{self, LogSink, Orchestrator, ProducerMode, StepperTiming, Transcript};
use crate::reveal::RevealMode;
use crate::terminal::Terminal;
use crate::transport::HttpTransport;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

/// Where run output comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RunMode {
    /// POST the configuration to the execution service
    Server,
    /// Play a local, paced simulation (no network)
    Simulated,
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "automattuner",
    version,
    about = "Control panel for Automattuner tuning runs with optional TUI"
)]
pub struct Cli {
    /// Base URL of the execution service (the run endpoint is <endpoint>/api/run)
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    pub endpoint: String,

    /// Produce run output from the server or from a local simulation
    #[arg(long, value_enum, default_value_t = RunMode::Server)]
    pub mode: RunMode,

    /// How terminal lines appear
    #[arg(long, value_enum, default_value_t = RevealMode::Typed)]
    pub reveal: RevealMode,

    /// Delay between revealed characters
    #[arg(long, default_value = "10ms")]
    pub reveal_delay: humantime::Duration,

    /// Fail the request after this long (default: wait indefinitely)
    #[arg(long)]
    pub request_timeout: Option<humantime::Duration>,

    /// Multiply simulated stage pauses (0 disables pacing, at most 1000)
    #[arg(long, default_value_t = 1.0, value_parser = parse_step_scale)]
    pub step_scale: f64,

    /// Comma-separated application identifiers (e.g. "Mozilla.Firefox, Zoom.Zoom")
    #[arg(long, default_value = "")]
    pub app_ids: String,

    /// Target version (empty means latest)
    #[arg(long = "app-version", default_value = "")]
    pub app_version: String,

    /// Package architecture
    #[arg(long, value_enum, default_value_t = Architecture::X64)]
    pub architecture: Architecture,

    /// Installer context
    #[arg(long, value_enum, default_value_t = InstallContext::System)]
    pub context: InstallContext,

    /// Tenant to target
    #[arg(long)]
    pub tenant_id: Option<String>,

    /// Submit the configuration once, print JSON transcript and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Submit the configuration once, print terminal lines and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Export the final transcript as JSON
    #[arg(long)]
    pub export_json: Option<std::path::PathBuf>,

    /// Write diagnostic logs to this file (filter with RUST_LOG)
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,

    /// Submit the configuration from the flags as soon as the TUI starts
    #[arg(long)]
    pub submit_on_launch: bool,
}

const MAX_STEP_SCALE: f64 = 1000.0;

fn parse_step_scale(s: &str) -> Result<f64, String> {
    let factor: f64 = s.parse().map_err(|e| format!("not a number: {e}"))?;
    if !factor.is_finite() || !(0.0..=MAX_STEP_SCALE).contains(&factor) {
        return Err(format!("must be between 0 and {MAX_STEP_SCALE}"));
    }
    Ok(factor)
}

/// Resolved runtime settings for one panel.
#[derive(Debug, Clone)]
pub struct PanelSettings {
    pub endpoint: String,
    pub producer: ProducerMode,
    pub reveal: RevealMode,
    pub char_delay: Duration,
    pub request_timeout: Option<Duration>,
    pub user_agent: String,
}

/// Build `PanelSettings` from CLI arguments.
pub fn build_settings(args: &Cli) -> PanelSettings {
    let producer = match args.mode {
        RunMode::Server => ProducerMode::Server,
        RunMode::Simulated => {
            ProducerMode::Simulated(StepperTiming::default().scaled(args.step_scale))
        }
    };
    PanelSettings {
        endpoint: args.endpoint.clone(),
        producer,
        reveal: args.reveal,
        char_delay: Duration::from(args.reveal_delay),
        request_timeout: args.request_timeout.map(Duration::from),
        user_agent: format!("automattuner-console/{}", env!("CARGO_PKG_VERSION")),
    }
}

/// Build the initial `RunConfig` (form contents) from CLI arguments.
pub fn build_config(args: &Cli) -> RunConfig {
    RunConfig {
        app_ids: args.app_ids.clone(),
        version: args.app_version.clone(),
        architecture: args.architecture,
        context: args.context,
        tenant_id: args.tenant_id.clone(),
    }
}

/// Wire an orchestrator to the HTTP transport and the given panel channel.
pub(crate) fn build_orchestrator(
    settings: &PanelSettings,
    event_tx: mpsc::UnboundedSender<PanelEvent>,
) -> Result<Orchestrator<HttpTransport>> {
    let transport = HttpTransport::new(
        &settings.endpoint,
        &settings.user_agent,
        settings.request_timeout,
    )?;
    let sink = LogSink::new(
        event_tx,
        settings.reveal,
        settings.char_delay,
        Arc::new(SystemClock),
    );
    Ok(Orchestrator::new(transport, sink, settings.producer))
}

/// Entry point after parsing. Returns whether the (last) run succeeded; interactive
/// sessions always report success.
pub async fn run(args: Cli) -> Result<bool> {
    if args.json && args.text {
        return Err(anyhow::anyhow!("--json and --text are mutually exclusive"));
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            crate::tui::run(args).await?;
            return Ok(true);
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_headless(args).await;
        }
    }

    run_headless(args).await
}

/// Submit once without a TUI, streaming lines to stdout (text) or printing the final
/// transcript (JSON).
async fn run_headless(args: Cli) -> Result<bool> {
    let mut settings = build_settings(&args);
    // Frames are meaningless on a line-oriented stream.
    settings.reveal = RevealMode::Verbatim;
    let config = build_config(&args);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<PanelEvent>();
    let mut orchestrator = build_orchestrator(&settings, event_tx)?;
    let (out_tx, out_handle) = spawn_output_writer();

    tracing::info!(endpoint = %settings.endpoint, mode = ?args.mode, "headless run");
    let handle = tokio::spawn(async move { orchestrator.submit(&config).await });

    let mut terminal = Terminal::new();
    while let Some(ev) = event_rx.recv().await {
        if let (false, PanelEvent::Appended { entry, .. }) = (args.json, &ev) {
            let mut rows = entry.message.split('\n');
            let first = rows.next().unwrap_or_default();
            let _ = out_tx.send(OutputLine::Stdout(format!("[{}] {}", entry.timestamp, first)));
            for row in rows {
                let _ = out_tx.send(OutputLine::Stdout(format!("           {row}")));
            }
        }
        terminal.apply(ev);
    }

    let outcome = handle.await.context("run task failed")?;
    let transcript = Transcript::new(terminal.entries());

    if args.json {
        let out = serde_json::to_string_pretty(&transcript)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    }
    if let Some(p) = args.export_json.as_deref() {
        orchestrator::export_json(p, &transcript)?;
        let _ = out_tx.send(OutputLine::Stderr(format!("Exported JSON: {}", p.display())));
    }

    drop(out_tx);
    let _ = out_handle.await;

    Ok(outcome.is_success())
}
