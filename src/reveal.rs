//! Typed reveal animation.
//!
//! A message is turned into a lazy sequence of growing prefixes. One tokio task per line
//! paces the frames out onto the panel channel; tasks never touch the terminal buffer
//! directly and stop as soon as their token is raised.

use crate::model::{EntryId, PanelEvent};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

pub const DEFAULT_CHAR_DELAY: Duration = Duration::from_millis(10);

/// How new lines become visible. Picked once per panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RevealMode {
    /// Character-by-character reveal.
    Typed,
    /// Whole message shown immediately.
    Verbatim,
}

/// Growing prefixes of a message: lengths 1..=N, counted in chars.
#[derive(Debug, Clone)]
pub struct RevealFrames {
    message: String,
    // Byte offset of the end of the last emitted prefix.
    end: usize,
}

impl RevealFrames {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            end: 0,
        }
    }
}

impl Iterator for RevealFrames {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let ch = self.message[self.end..].chars().next()?;
        self.end += ch.len_utf8();
        Some(self.message[..self.end].to_string())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.message[self.end..].chars().count();
        (n, Some(n))
    }
}

impl ExactSizeIterator for RevealFrames {}

/// Cancellation flag shared between a reveal task and whoever may clear its line.
#[derive(Debug, Clone, Default)]
pub struct RevealToken(Arc<AtomicBool>);

impl RevealToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Spawn the frame pump for one line. The first frame goes out immediately, each later
/// frame after `delay`. Returns when the message is fully shown, the token is raised, or
/// the panel has gone away.
pub fn spawn_reveal(
    id: EntryId,
    message: String,
    delay: Duration,
    tx: UnboundedSender<PanelEvent>,
    token: RevealToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut frames = RevealFrames::new(message).peekable();
        while let Some(text) = frames.next() {
            if token.is_cancelled() {
                return;
            }
            if tx.send(PanelEvent::Revealed { id, text }).is_err() {
                return;
            }
            if frames.peek().is_some() {
                tokio::time::sleep(delay).await;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FixedClock, LogEntry, LogKind};
    use time::macros::time;
    use tokio::sync::mpsc;
    use tokio::time::Instant;

    fn entry_id() -> EntryId {
        LogEntry::create("", LogKind::Info, &FixedClock(time!(0:00))).id
    }

    #[test]
    fn frames_grow_one_char_at_a_time() {
        let frames: Vec<String> = RevealFrames::new("OK").collect();
        assert_eq!(frames, vec!["O", "OK"]);
        assert_eq!(RevealFrames::new("").count(), 0);
    }

    #[test]
    fn frames_respect_char_boundaries() {
        let frames: Vec<String> = RevealFrames::new("é✓\n").collect();
        assert_eq!(frames, vec!["é", "é✓", "é✓\n"]);
    }

    #[test]
    fn frames_are_restartable() {
        let mut frames = RevealFrames::new("abc");
        frames.next();
        let replay = frames.clone();
        assert_eq!(replay.collect::<Vec<_>>(), vec!["ab", "abc"]);
        assert_eq!(frames.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reveal_paces_frames_by_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = entry_id();
        let delay = Duration::from_millis(10);
        let start = Instant::now();
        let handle = spawn_reveal(id, "OK".into(), delay, tx, RevealToken::default());

        let first = rx.recv().await.unwrap();
        assert_eq!(first, PanelEvent::Revealed { id, text: "O".into() });
        assert_eq!(start.elapsed(), Duration::ZERO);

        let second = rx.recv().await.unwrap();
        assert_eq!(second, PanelEvent::Revealed { id, text: "OK".into() });
        assert_eq!(start.elapsed(), delay);

        handle.await.unwrap();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_reveal_stops_emitting() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let token = RevealToken::default();
        let handle = spawn_reveal(
            entry_id(),
            "long message".into(),
            Duration::from_millis(10),
            tx,
            token.clone(),
        );

        assert!(rx.recv().await.is_some());
        token.cancel();
        handle.await.unwrap();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn empty_message_emits_nothing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        spawn_reveal(entry_id(), String::new(), DEFAULT_CHAR_DELAY, tx, RevealToken::default())
            .await
            .unwrap();
        assert!(rx.recv().await.is_none());
    }
}
