//! Line production for the orchestrator.
//!
//! Every line goes out as an `Appended` event at emission time, so display order is
//! emission order no matter when a typed reveal finishes.

use crate::model::{Clock, EntryId, LogEntry, LogKind, PanelEvent, RunState};
use crate::reveal::{spawn_reveal, RevealMode, RevealToken};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

pub(crate) struct LogSink {
    tx: UnboundedSender<PanelEvent>,
    mode: RevealMode,
    char_delay: Duration,
    clock: Arc<dyn Clock>,
    in_flight: Vec<(RevealToken, JoinHandle<()>)>,
}

impl LogSink {
    pub fn new(
        tx: UnboundedSender<PanelEvent>,
        mode: RevealMode,
        char_delay: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tx,
            mode,
            char_delay,
            clock,
            in_flight: Vec::new(),
        }
    }

    pub fn emit(&mut self, message: impl Into<String>, kind: LogKind) -> EntryId {
        let entry = LogEntry::create(message, kind, self.clock.as_ref());
        let id = entry.id;
        tracing::trace!(%id, ?kind, message = %entry.message, "emit");

        match self.mode {
            RevealMode::Verbatim => {
                let _ = self.tx.send(PanelEvent::Appended { entry, typed: false });
            }
            RevealMode::Typed => {
                let message = entry.message.clone();
                let _ = self.tx.send(PanelEvent::Appended { entry, typed: true });
                self.in_flight.retain(|(_, h)| !h.is_finished());
                let token = RevealToken::default();
                let handle =
                    spawn_reveal(id, message, self.char_delay, self.tx.clone(), token.clone());
                self.in_flight.push((token, handle));
            }
        }
        id
    }

    /// Empty the terminal and stop every reveal still running against it.
    pub fn clear(&mut self) {
        for (token, _) in self.in_flight.drain(..) {
            token.cancel();
        }
        let _ = self.tx.send(PanelEvent::Cleared);
    }

    pub fn set_state(&self, state: RunState) {
        let _ = self.tx.send(PanelEvent::StateChanged(state));
    }

    #[cfg(test)]
    pub fn in_flight(&self) -> usize {
        self.in_flight.iter().filter(|(_, h)| !h.is_finished()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FixedClock;
    use crate::terminal::Terminal;
    use time::macros::time;
    use tokio::sync::mpsc;

    fn sink(mode: RevealMode) -> (LogSink, mpsc::UnboundedReceiver<PanelEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let clock = Arc::new(FixedClock(time!(9:30)));
        (LogSink::new(tx, mode, Duration::from_millis(10), clock), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<PanelEvent>, term: &mut Terminal) {
        while let Ok(ev) = rx.try_recv() {
            term.apply(ev);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_reveals_keep_emission_order() {
        let (mut sink, mut rx) = sink(RevealMode::Typed);
        let mut term = Terminal::new();

        sink.emit("a much longer first line", LogKind::Info);
        sink.emit("2nd", LogKind::Success);
        tokio::time::sleep(Duration::from_millis(50)).await;
        drain(&mut rx, &mut term);

        let lines = term.lines();
        assert_eq!(lines[0].entry.message, "a much longer first line");
        assert_eq!(lines[1].visible, "2nd");
        assert!(!lines[0].is_complete());

        tokio::time::sleep(Duration::from_secs(1)).await;
        drain(&mut rx, &mut term);
        assert!(term.lines().iter().all(|l| l.is_complete()));
    }

    #[tokio::test(start_paused = true)]
    async fn clear_cancels_outstanding_reveals() {
        let (mut sink, mut rx) = sink(RevealMode::Typed);
        let mut term = Terminal::new();

        sink.emit("x".repeat(100), LogKind::Info);
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(sink.in_flight(), 1);

        sink.clear();
        sink.emit("next run", LogKind::Info);
        tokio::time::sleep(Duration::from_secs(2)).await;
        drain(&mut rx, &mut term);

        assert_eq!(term.lines().len(), 1);
        assert_eq!(term.lines()[0].visible, "next run");
    }

    #[tokio::test]
    async fn verbatim_lines_are_whole_immediately() {
        let (mut sink, mut rx) = sink(RevealMode::Verbatim);
        let mut term = Terminal::new();
        sink.emit("> DETAILS:\nA\nB", LogKind::Info);
        drain(&mut rx, &mut term);
        assert!(term.lines()[0].is_complete());
        assert_eq!(term.row_count(), 4);
    }
}
