//! Run lifecycle controller.
//!
//! Single writer for the orchestrator: serializes UI commands, runs one submission at a
//! time and ignores submits that arrive while a run is in flight.

use super::machine::{Orchestrator, RunOutcome};
use crate::model::RunConfig;
use crate::transport::RunTransport;
use tokio::sync::mpsc::UnboundedReceiver;

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Submit(RunConfig),
    Quit,
}

/// Process commands until Quit (or the UI hangs up). Returns the last finished outcome.
pub(crate) async fn run_controller<T: RunTransport>(
    mut orchestrator: Orchestrator<T>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Option<RunOutcome> {
    let mut last = None;
    orchestrator.welcome();

    while let Some(cmd) = cmd_rx.recv().await {
        let config = match cmd {
            UiCommand::Submit(config) => config,
            UiCommand::Quit => break,
        };

        let run = orchestrator.submit(&config);
        tokio::pin!(run);
        // Keep draining commands while the run is in flight so Quit stays responsive.
        let finished = loop {
            tokio::select! {
                outcome = &mut run => break Some(outcome),
                cmd = cmd_rx.recv() => match cmd {
                    Some(UiCommand::Submit(_)) => {
                        tracing::debug!("submit ignored: run already in progress");
                    }
                    Some(UiCommand::Quit) | None => break None,
                }
            }
        };

        match finished {
            Some(outcome) => {
                tracing::debug!(?outcome, "run finished");
                last = Some(outcome);
            }
            None => {
                tracing::info!("quit requested during run; abandoning in-flight request");
                return last;
            }
        }
    }

    last
}
