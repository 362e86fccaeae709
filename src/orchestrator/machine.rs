//! Run lifecycle state machine: `Idle -> Running -> Idle`.

use super::sink::LogSink;
use super::stepper::{self, StepperTiming};
use crate::model::{LogKind, RunConfig, RunState};
use crate::transport::RunTransport;

pub const FALLBACK_FAILURE: &str = "Unknown failure";
pub const COMPLETION_LINE: &str = "> OPERATION COMPLETE. WAITING...";

/// Where a run's result lines come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerMode {
    /// Call the execution endpoint and render its reply.
    Server,
    /// Play a locally paced sequence of stage lines.
    Simulated(StepperTiming),
}

/// How a submission ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Validation failed; the run never started.
    Rejected,
    Succeeded,
    /// The endpoint answered with a failure status.
    Failed,
    /// The exchange itself broke (network, timeout, unreadable body).
    Crashed,
}

impl RunOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, RunOutcome::Succeeded)
    }
}

pub struct Orchestrator<T> {
    transport: T,
    sink: LogSink,
    mode: ProducerMode,
    state: RunState,
}

impl<T: RunTransport> Orchestrator<T> {
    pub(crate) fn new(transport: T, sink: LogSink, mode: ProducerMode) -> Self {
        Self {
            transport,
            sink,
            mode,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Startup banner shown before the first run.
    pub fn welcome(&mut self) {
        self.sink.emit("> SYSTEM INITIALIZED.", LogKind::Success);
        self.sink.emit("> READY FOR INPUT.", LogKind::Info);
    }

    /// Drive one submission through the state machine. Every path that enters `Running`
    /// leaves it again before returning.
    pub async fn submit(&mut self, config: &RunConfig) -> RunOutcome {
        if let Err(e) = config.validate() {
            tracing::info!("submission rejected: {e}");
            self.sink.emit(format!("> ERROR: {e}"), LogKind::Error);
            return RunOutcome::Rejected;
        }

        self.enter_running(config);

        let outcome = match self.mode {
            ProducerMode::Server => self.produce_from_server(config).await,
            ProducerMode::Simulated(timing) => {
                stepper::run(&mut self.sink, config, &timing).await;
                RunOutcome::Succeeded
            }
        };

        self.exit_running(outcome);
        outcome
    }

    fn enter_running(&mut self, config: &RunConfig) {
        self.set_state(RunState::Running);
        self.sink.clear();
        self.sink
            .emit("> INITIATING AUTOMATTUNER PROTOCOL...", LogKind::Info);
        self.sink.emit(
            format!(
                "> PARAMETERS: {} | {} | {} | {}",
                config.app_id_list().join(", "),
                config.effective_version(),
                config.architecture,
                config.context
            ),
            LogKind::Info,
        );
        if let Some(tenant) = config.tenant() {
            self.sink
                .emit(format!("> TARGET TENANT LOCK: [{tenant}]"), LogKind::Info);
        }
        tracing::info!(
            app_ids = %config.app_ids.trim(),
            architecture = %config.architecture,
            context = %config.context,
            "run started"
        );
    }

    async fn produce_from_server(&mut self, config: &RunConfig) -> RunOutcome {
        match self.transport.run_tuning_job(config).await {
            Ok(reply) if reply.ok => {
                let body = reply.body;
                let status = body.status.as_deref().unwrap_or("-");
                let message = body.message.as_deref().unwrap_or("-");
                self.sink
                    .emit(format!("> SUCCESS: {status}"), LogKind::Success);
                self.sink
                    .emit(format!("> MESSAGE: {message}"), LogKind::Success);
                if let Some(details) = body.detail_text() {
                    self.sink
                        .emit(format!("> DETAILS:\n{details}"), LogKind::Info);
                }
                tracing::info!(status_code = reply.status_code, "run succeeded");
                RunOutcome::Succeeded
            }
            Ok(reply) => {
                let error = reply
                    .body
                    .error_text()
                    .unwrap_or_else(|| FALLBACK_FAILURE.to_string());
                tracing::warn!(status_code = reply.status_code, %error, "run failed");
                self.sink.emit(format!("> ERROR: {error}"), LogKind::Error);
                RunOutcome::Failed
            }
            Err(e) => {
                tracing::error!(error = %e, "run transport failure");
                self.sink
                    .emit(format!("> CRITICAL FAILURE: {e}"), LogKind::Error);
                RunOutcome::Crashed
            }
        }
    }

    fn exit_running(&mut self, outcome: RunOutcome) {
        self.set_state(RunState::Idle);
        if outcome != RunOutcome::Crashed {
            self.sink.emit(COMPLETION_LINE, LogKind::Muted);
        }
    }

    fn set_state(&mut self, state: RunState) {
        self.state = state;
        self.sink.set_state(state);
    }
}
