//! Clipboard access.
//!
//! [`ClipboardPort`] is the seam the dispatch engine writes through.
//! [`SystemClipboard`] talks to the OS, [`MemoryClipboard`] stays in-process.

use arboard::Clipboard;
use parking_lot::Mutex;
use std::sync::mpsc;
use std::thread;
use thiserror::Error;
use tracing::{debug, instrument, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
}

/// Read/write access to the shared text clipboard.
pub trait ClipboardPort: Send + Sync {
    fn set_text(&self, text: &str) -> Result<(), ClipboardError>;
    fn get_text(&self) -> Result<String, ClipboardError>;
}

/// The OS clipboard.
///
/// One owner thread holds the `arboard` handle for the life of the value. On
/// X11 the owning handle must stay alive for other applications to read what
/// was written, and the handle itself never crosses threads.
pub struct SystemClipboard {
    requests: mpsc::Sender<ClipboardRequest>,
}

enum ClipboardRequest {
    Set(String, mpsc::Sender<Result<(), ClipboardError>>),
    Get(mpsc::Sender<Result<String, ClipboardError>>),
}

impl SystemClipboard {
    pub fn new() -> Self {
        let (requests, rx) = mpsc::channel::<ClipboardRequest>();
        let spawned = thread::Builder::new()
            .name("clipboard-owner".into())
            .spawn(move || serve_clipboard(rx));
        if let Err(e) = spawned {
            // Requests fail with Unavailable once the receiver is gone.
            warn!(error = %e, "Failed to spawn clipboard owner thread");
        }
        Self { requests }
    }

    fn request<T>(
        &self,
        make: impl FnOnce(mpsc::Sender<Result<T, ClipboardError>>) -> ClipboardRequest,
    ) -> Result<T, ClipboardError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.requests
            .send(make(reply_tx))
            .map_err(|_| ClipboardError::Unavailable("clipboard thread stopped".into()))?;
        reply_rx
            .recv()
            .map_err(|_| ClipboardError::Unavailable("clipboard thread stopped".into()))?
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

fn serve_clipboard(rx: mpsc::Receiver<ClipboardRequest>) {
    let mut handle: Option<Clipboard> = None;
    for request in rx {
        if handle.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => handle = Some(clipboard),
                Err(e) => {
                    let err = ClipboardError::Unavailable(e.to_string());
                    match request {
                        ClipboardRequest::Set(_, reply) => {
                            let _ = reply.send(Err(err));
                        }
                        ClipboardRequest::Get(reply) => {
                            let _ = reply.send(Err(err));
                        }
                    }
                    continue;
                }
            }
        }
        let Some(clipboard) = handle.as_mut() else {
            continue;
        };
        let failed = match request {
            ClipboardRequest::Set(text, reply) => {
                let result = clipboard
                    .set_text(text)
                    .map_err(|e| ClipboardError::Unavailable(e.to_string()));
                let failed = result.is_err();
                let _ = reply.send(result);
                failed
            }
            ClipboardRequest::Get(reply) => {
                let result = clipboard
                    .get_text()
                    .map_err(|e| ClipboardError::Unavailable(e.to_string()));
                let failed = result.is_err();
                let _ = reply.send(result);
                failed
            }
        };
        if failed {
            // Reopen on the next request in case the handle went stale.
            handle = None;
        }
    }
    debug!("Clipboard owner thread exiting");
}

impl ClipboardPort for SystemClipboard {
    #[instrument(skip_all, fields(text_len = text.len()))]
    fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        let text = text.to_string();
        self.request(|reply| ClipboardRequest::Set(text, reply))?;
        debug!("Clipboard text set");
        Ok(())
    }

    fn get_text(&self) -> Result<String, ClipboardError> {
        self.request(ClipboardRequest::Get)
    }
}

/// In-process clipboard, used when no OS clipboard should be touched.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    text: Mutex<Option<String>>,
    fail: Mutex<bool>,
    writes: Mutex<usize>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent calls fail with `ClipboardError::Unavailable`.
    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock() = fail;
    }

    pub fn contents(&self) -> Option<String> {
        self.text.lock().clone()
    }

    pub fn write_count(&self) -> usize {
        *self.writes.lock()
    }
}

impl ClipboardPort for MemoryClipboard {
    fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        if *self.fail.lock() {
            return Err(ClipboardError::Unavailable("clipboard locked".into()));
        }
        *self.text.lock() = Some(text.to_string());
        *self.writes.lock() += 1;
        Ok(())
    }

    fn get_text(&self) -> Result<String, ClipboardError> {
        if *self.fail.lock() {
            return Err(ClipboardError::Unavailable("clipboard locked".into()));
        }
        Ok(self.text.lock().clone().unwrap_or_default())
    }
}
