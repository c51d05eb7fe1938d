use crate::Result;

/// Read-only clipboard access for the polling loop.
///
/// A trait so the orchestrator can be unit-tested with a scripted source
/// instead of the OS clipboard.
pub trait ClipboardSource: Send {
    /// Current clipboard text; `None` when the clipboard is empty or holds
    /// non-text content.
    fn read_text(&mut self) -> Result<Option<String>>;
}

/// Production clipboard source backed by arboard.
///
/// Opens a short-lived handle per read instead of holding one: an
/// `arboard::Clipboard` is not `Send` on every platform and is cheap to
/// open.
pub struct SystemClipboard;

impl SystemClipboard {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardSource for SystemClipboard {
    fn read_text(&mut self) -> Result<Option<String>> {
        let mut clipboard = arboard::Clipboard::new()
            .map_err(|e| anyhow::anyhow!("cannot open clipboard: {}", e))?;

        match clipboard.get_text() {
            Ok(text) => Ok(Some(text)),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("clipboard read failed: {}", e)),
        }
    }
}
