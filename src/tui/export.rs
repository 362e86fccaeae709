use crate::orchestrator::{save_transcript, Transcript};
use anyhow::Result;
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::time::Duration;

use super::state::UiState;

// Global clipboard manager channel - initialized once on first use
static CLIPBOARD_SENDER: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

/// Save the current terminal contents and report the path in the status line.
pub fn save_and_show_path(state: &mut UiState) {
    if state.terminal.is_empty() {
        state.info = "Nothing to save yet.".into();
        return;
    }
    match save_transcript(&Transcript::new(state.terminal.entries())) {
        Ok(path) => {
            state.last_exported_path = Some(path.to_string_lossy().to_string());
            state.info = format!("Saved: {} (Ctrl-Y to copy path)", path.display());
        }
        Err(e) => {
            state.info = format!("Save failed: {e:#}");
        }
    }
}

/// Copy the last saved path, updating the status line either way.
pub fn copy_saved_path(state: &mut UiState) {
    let Some(path) = state.last_exported_path.clone() else {
        state.info = "No saved transcript yet. Save one first (Ctrl-S)".into();
        return;
    };
    match copy_to_clipboard(&path) {
        Ok(()) => {
            let len = path.chars().count();
            let display_path = if len > 60 {
                let tail: String = path.chars().skip(len - 57).collect();
                format!("...{tail}")
            } else {
                path
            };
            state.info = format!("✓ Copied to clipboard: {display_path}");
        }
        Err(e) => {
            state.info = format!("Clipboard copy failed: {e:#}");
        }
    }
}

/// Initialize the clipboard manager thread if not already initialized.
/// Each clipboard instance is kept alive for a while so clipboard managers on Linux
/// have time to read the contents.
fn init_clipboard_manager() -> Result<&'static std_mpsc::Sender<String>> {
    CLIPBOARD_SENDER.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();

        std::thread::spawn(move || {
            use arboard::Clipboard;

            for text in rx {
                if let Ok(mut clipboard) = Clipboard::new() {
                    if clipboard.set_text(&text).is_ok() {
                        std::thread::sleep(Duration::from_secs(2));
                    }
                }
            }
        });

        tx
    });

    CLIPBOARD_SENDER
        .get()
        .ok_or_else(|| anyhow::anyhow!("Failed to initialize clipboard manager"))
}

/// Queue text for the clipboard thread; returns without blocking the UI.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let sender = init_clipboard_manager()?;
    sender
        .send(text.to_string())
        .map_err(|_| anyhow::anyhow!("Clipboard manager channel closed"))?;
    Ok(())
}
