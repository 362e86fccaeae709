//! Append-only terminal buffer with a permanent trailing cursor marker.
//!
//! The buffer is owned by exactly one writer (the presentation loop) and is mutated only
//! through [`Terminal::apply`]. Reveal frames address lines by id; frames for lines that
//! no longer exist are dropped.

use crate::model::{EntryId, LogEntry, LogKind, PanelEvent};

pub const CURSOR_MARKER: &str = "_";

/// A log entry plus how much of it is currently visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalLine {
    pub entry: LogEntry,
    pub visible: String,
}

impl TerminalLine {
    pub fn is_complete(&self) -> bool {
        self.visible.len() == self.entry.message.len()
    }
}

/// One display row. Multi-line messages produce several rows for the same entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row<'a> {
    Text {
        timestamp: Option<&'a str>,
        text: &'a str,
        kind: LogKind,
    },
    Cursor,
}

#[derive(Debug, Default)]
pub struct Terminal {
    lines: Vec<TerminalLine>,
    // Rows hidden below the viewport when the operator has scrolled up.
    scroll_back: usize,
}

impl Terminal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a line just before the cursor marker.
    pub fn append(&mut self, entry: LogEntry, typed: bool) {
        let visible = if typed {
            String::new()
        } else {
            entry.message.clone()
        };
        self.lines.push(TerminalLine { entry, visible });
        self.scroll_to_bottom();
    }

    /// Drop every line; only the cursor marker remains.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.scroll_back = 0;
    }

    /// Update the visible prefix of a line. Returns false when the line is gone.
    pub fn apply_frame(&mut self, id: EntryId, text: String) -> bool {
        let Some(line) = self.lines.iter_mut().rev().find(|l| l.entry.id == id) else {
            return false;
        };
        line.visible = text;
        self.scroll_to_bottom();
        true
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_back = 0;
    }

    pub fn scroll_up(&mut self, rows: usize) {
        let max = self.row_count().saturating_sub(1);
        self.scroll_back = (self.scroll_back + rows).min(max);
    }

    pub fn scroll_down(&mut self, rows: usize) {
        self.scroll_back = self.scroll_back.saturating_sub(rows);
    }

    pub fn scroll_back(&self) -> usize {
        self.scroll_back
    }

    /// Apply one panel event. State changes are not the terminal's concern.
    pub fn apply(&mut self, ev: PanelEvent) {
        match ev {
            PanelEvent::Cleared => self.clear(),
            PanelEvent::Appended { entry, typed } => self.append(entry, typed),
            PanelEvent::Revealed { id, text } => {
                self.apply_frame(id, text);
            }
            PanelEvent::StateChanged(_) => {}
        }
    }

    pub fn lines(&self) -> &[TerminalLine] {
        &self.lines
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.lines.iter().map(|l| l.entry.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Display rows in order; the cursor is always the last row.
    pub fn rows(&self) -> Vec<Row<'_>> {
        let mut rows = Vec::with_capacity(self.lines.len() + 1);
        for line in &self.lines {
            for (i, text) in line.visible.split('\n').enumerate() {
                rows.push(Row::Text {
                    timestamp: (i == 0).then_some(line.entry.timestamp.as_str()),
                    text,
                    kind: line.entry.kind,
                });
            }
        }
        rows.push(Row::Cursor);
        rows
    }

    pub fn row_count(&self) -> usize {
        self.lines
            .iter()
            .map(|l| l.visible.split('\n').count())
            .sum::<usize>()
            + 1
    }
}
