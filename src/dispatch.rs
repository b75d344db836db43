//! Template dispatch: resolve, copy, optionally paste, notify.
//!
//! [`DispatchEngine`] runs one dispatch synchronously. [`Dispatcher`] owns a
//! worker thread so hook callbacks only enqueue and return; the clipboard and
//! paste calls never run on the OS hook delivery thread.

use async_channel::{Receiver, Sender, TrySendError};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, instrument, warn};

use crate::clipboard::ClipboardPort;
use crate::error::{DispatchError, Severity};
use crate::hotkeys::OnFire;
use crate::notify::{Notification, NotificationSink};
use crate::paste::{PasteError, PasteSynthesizer};
use crate::templates::TemplateResolver;

/// Pending dispatches allowed before `trigger` starts dropping presses.
const DISPATCH_QUEUE_CAPACITY: usize = 32;

/// Whether to send the paste keystroke after copying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteMode {
    Never,
    Always,
    /// Use the engine's configured flag.
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Copied,
    CopiedAndPasted,
    /// The text is on the clipboard; only the keystroke failed.
    CopiedPasteFailed(PasteError),
}

impl DispatchOutcome {
    fn notification(&self) -> Notification {
        match self {
            Self::Copied => Notification::info("Template copied to clipboard."),
            Self::CopiedAndPasted => Notification::info("Template copied and pasted."),
            Self::CopiedPasteFailed(e) => Notification::warning(e.user_message()),
        }
    }
}

pub struct DispatchEngine {
    resolver: Arc<dyn TemplateResolver>,
    clipboard: Arc<dyn ClipboardPort>,
    paste: Arc<dyn PasteSynthesizer>,
    sink: Arc<dyn NotificationSink>,
    paste_by_default: bool,
    notification_duration_ms: u64,
}

impl DispatchEngine {
    pub fn new(
        resolver: Arc<dyn TemplateResolver>,
        clipboard: Arc<dyn ClipboardPort>,
        paste: Arc<dyn PasteSynthesizer>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            resolver,
            clipboard,
            paste,
            sink,
            paste_by_default: crate::config::DEFAULT_AUTO_PASTE_ON_CLICK,
            notification_duration_ms: crate::config::DEFAULT_NOTIFICATION_DURATION_MS,
        }
    }

    pub fn with_paste_by_default(mut self, paste: bool) -> Self {
        self.paste_by_default = paste;
        self
    }

    pub fn with_notification_duration(mut self, duration_ms: u64) -> Self {
        self.notification_duration_ms = duration_ms;
        self
    }

    pub fn paste_by_default(&self) -> bool {
        self.paste_by_default
    }

    pub fn set_paste_by_default(&mut self, paste: bool) {
        self.paste_by_default = paste;
    }

    /// Run one dispatch and report the result on the notification sink.
    ///
    /// A missing template or an unusable clipboard aborts the dispatch and
    /// leaves the clipboard as it was. A failed paste does not: the text
    /// stays on the clipboard and the outcome is `CopiedPasteFailed`.
    #[instrument(skip(self))]
    pub fn dispatch(
        &self,
        template_id: &str,
        mode: PasteMode,
    ) -> Result<DispatchOutcome, DispatchError> {
        let result = self.run(template_id, mode);
        match &result {
            Ok(outcome) => {
                info!(template_id, outcome = ?outcome, "Dispatched template");
                self.notify(outcome.notification());
            }
            Err(e) => {
                warn!(template_id, error = %e, "Dispatch failed");
                let notification = match e.severity() {
                    Severity::Error => Notification::error(e.user_message()),
                    Severity::Warning => Notification::warning(e.user_message()),
                    Severity::Info => Notification::info(e.user_message()),
                };
                self.notify(notification);
            }
        }
        result
    }

    /// Copy without pasting.
    pub fn copy_only(&self, template_id: &str) -> Result<DispatchOutcome, DispatchError> {
        self.dispatch(template_id, PasteMode::Never)
    }

    fn run(&self, template_id: &str, mode: PasteMode) -> Result<DispatchOutcome, DispatchError> {
        let text = self
            .resolver
            .resolve(template_id)
            .ok_or_else(|| DispatchError::TemplateNotFound(template_id.to_string()))?;

        self.clipboard.set_text(&text)?;

        let paste = match mode {
            PasteMode::Never => false,
            PasteMode::Always => true,
            PasteMode::Default => self.paste_by_default,
        };
        if !paste {
            return Ok(DispatchOutcome::Copied);
        }

        match self.paste.simulate() {
            Ok(()) => Ok(DispatchOutcome::CopiedAndPasted),
            Err(e) => {
                warn!(error = %e, "Paste failed; text left on clipboard");
                Ok(DispatchOutcome::CopiedPasteFailed(e))
            }
        }
    }

    fn notify(&self, notification: Notification) {
        self.sink
            .notify(notification.with_duration(self.notification_duration_ms));
    }
}

struct Job {
    template_id: String,
    mode: PasteMode,
}

/// Runs dispatches on a background worker thread.
pub struct Dispatcher {
    engine: Arc<DispatchEngine>,
    jobs: Sender<Job>,
    worker: Option<JoinHandle<()>>,
}

impl Dispatcher {
    pub fn spawn(engine: Arc<DispatchEngine>) -> io::Result<Self> {
        let (jobs, rx) = async_channel::bounded(DISPATCH_QUEUE_CAPACITY);
        let worker_engine = Arc::clone(&engine);
        let worker = thread::Builder::new()
            .name("dispatch-worker".into())
            .spawn(move || run_worker(worker_engine, rx))?;
        Ok(Self {
            engine,
            jobs,
            worker: Some(worker),
        })
    }

    pub fn engine(&self) -> &Arc<DispatchEngine> {
        &self.engine
    }

    /// Queue a dispatch. Never blocks; returns false if the job was dropped.
    pub fn trigger(&self, template_id: &str, mode: PasteMode) -> bool {
        enqueue(&self.jobs, template_id, mode)
    }

    /// The `on_fire` callback handed to the hotkey registry.
    pub fn hook_callback(&self, paste_on_hotkey: bool) -> OnFire {
        let jobs = self.jobs.clone();
        let mode = if paste_on_hotkey {
            PasteMode::Always
        } else {
            PasteMode::Never
        };
        Arc::new(move |template_id: &str| {
            enqueue(&jobs, template_id, mode);
        })
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // Queued jobs still run; the worker exits once the queue is empty.
        self.jobs.close();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Dispatch worker panicked");
            }
        }
    }
}

fn enqueue(jobs: &Sender<Job>, template_id: &str, mode: PasteMode) -> bool {
    let job = Job {
        template_id: template_id.to_string(),
        mode,
    };
    match jobs.try_send(job) {
        Ok(()) => true,
        Err(TrySendError::Full(job)) => {
            warn!(template_id = %job.template_id, "Dispatch queue full, dropping trigger");
            false
        }
        Err(TrySendError::Closed(job)) => {
            debug!(template_id = %job.template_id, "Dispatcher closed, dropping trigger");
            false
        }
    }
}

fn run_worker(engine: Arc<DispatchEngine>, jobs: Receiver<Job>) {
    while let Ok(job) = jobs.recv_blocking() {
        // Errors were already reported on the sink.
        let _ = engine.dispatch(&job.template_id, job.mode);
    }
    debug!("Dispatch worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::{ClipboardError, MemoryClipboard};
    use crate::notify::MemorySink;
    use crate::paste::ScriptedPaste;
    use std::collections::HashMap;

    struct Fixed(HashMap<String, String>);

    impl TemplateResolver for Fixed {
        fn resolve(&self, template_id: &str) -> Option<String> {
            self.0.get(template_id).cloned()
        }
    }

    struct Harness {
        clipboard: Arc<MemoryClipboard>,
        paste: Arc<ScriptedPaste>,
        sink: Arc<MemorySink>,
        engine: DispatchEngine,
    }

    fn harness(paste: ScriptedPaste) -> Harness {
        let resolver = Arc::new(Fixed(HashMap::from([(
            "abc".to_string(),
            "Hello".to_string(),
        )])));
        let clipboard = Arc::new(MemoryClipboard::new());
        let paste = Arc::new(paste);
        let sink = Arc::new(MemorySink::new());
        let engine = DispatchEngine::new(
            resolver,
            clipboard.clone(),
            paste.clone(),
            sink.clone(),
        );
        Harness {
            clipboard,
            paste,
            sink,
            engine,
        }
    }

    #[test]
    fn copy_and_paste_reports_both() {
        let h = harness(ScriptedPaste::succeeding());
        let outcome = h.engine.dispatch("abc", PasteMode::Always).unwrap();

        assert_eq!(outcome, DispatchOutcome::CopiedAndPasted);
        assert_eq!(h.clipboard.contents().as_deref(), Some("Hello"));
        let last = h.sink.last().unwrap();
        assert!(last.message.contains("copied and pasted"));
        assert_eq!(last.severity, Severity::Info);
    }

    #[test]
    fn paste_failure_still_leaves_text_on_clipboard() {
        let h = harness(ScriptedPaste::failing(PasteError::Unavailable(
            "no input driver".into(),
        )));
        let outcome = h.engine.dispatch("abc", PasteMode::Always).unwrap();

        assert!(matches!(
            outcome,
            DispatchOutcome::CopiedPasteFailed(PasteError::Unavailable(_))
        ));
        assert_eq!(h.clipboard.contents().as_deref(), Some("Hello"));
        let last = h.sink.last().unwrap();
        assert!(last.message.starts_with("Copied"));
        assert!(!last.message.contains("pasted"));
        assert_eq!(last.severity, Severity::Warning);
    }

    #[test]
    fn denied_paste_degrades_to_copied() {
        let h = harness(ScriptedPaste::failing(PasteError::Denied("untrusted".into())));
        let outcome = h.engine.dispatch("abc", PasteMode::Always).unwrap();
        assert_eq!(
            outcome,
            DispatchOutcome::CopiedPasteFailed(PasteError::Denied("untrusted".into()))
        );
        assert_eq!(h.clipboard.contents().as_deref(), Some("Hello"));
    }

    #[test]
    fn missing_template_does_not_touch_clipboard() {
        let h = harness(ScriptedPaste::succeeding());
        h.clipboard.set_text("previous").unwrap();

        let err = h.engine.dispatch("deleted", PasteMode::Always).unwrap_err();

        assert!(matches!(err, DispatchError::TemplateNotFound(ref id) if id == "deleted"));
        assert_eq!(h.clipboard.contents().as_deref(), Some("previous"));
        assert_eq!(h.clipboard.write_count(), 1);
        assert_eq!(h.paste.attempts(), 0);
        assert_eq!(h.sink.last().unwrap().severity, Severity::Warning);
    }

    #[test]
    fn clipboard_failure_aborts_before_paste() {
        let h = harness(ScriptedPaste::succeeding());
        h.clipboard.set_failing(true);

        let err = h.engine.dispatch("abc", PasteMode::Always).unwrap_err();

        assert!(matches!(
            err,
            DispatchError::Clipboard(ClipboardError::Unavailable(_))
        ));
        assert_eq!(h.paste.attempts(), 0);
        assert_eq!(h.sink.last().unwrap().severity, Severity::Error);
    }

    #[test]
    fn paste_mode_default_follows_engine_flag() {
        let mut h = harness(ScriptedPaste::succeeding());
        h.engine.set_paste_by_default(false);
        assert_eq!(
            h.engine.dispatch("abc", PasteMode::Default).unwrap(),
            DispatchOutcome::Copied
        );
        h.engine.set_paste_by_default(true);
        assert_eq!(
            h.engine.dispatch("abc", PasteMode::Default).unwrap(),
            DispatchOutcome::CopiedAndPasted
        );
    }

    #[test]
    fn copy_only_never_pastes() {
        let h = harness(ScriptedPaste::succeeding());
        assert_eq!(h.engine.copy_only("abc").unwrap(), DispatchOutcome::Copied);
        assert_eq!(h.paste.attempts(), 0);
        assert!(h.sink.last().unwrap().message.contains("copied to clipboard"));
    }

    #[test]
    fn notifications_use_configured_duration() {
        let h = harness(ScriptedPaste::succeeding());
        let engine = h.engine.with_notification_duration(250);
        engine.copy_only("abc").unwrap();
        assert_eq!(h.sink.last().unwrap().duration_ms, 250);
    }

    #[test]
    fn dispatcher_runs_queued_jobs_before_shutdown() {
        let h = harness(ScriptedPaste::succeeding());
        let sink = h.sink.clone();
        let clipboard = h.clipboard.clone();
        let dispatcher = Dispatcher::spawn(Arc::new(h.engine)).unwrap();

        let on_fire = dispatcher.hook_callback(true);
        on_fire("abc");
        assert!(dispatcher.trigger("missing", PasteMode::Never));
        drop(dispatcher);

        assert_eq!(clipboard.contents().as_deref(), Some("Hello"));
        assert_eq!(sink.notifications().len(), 2);
        assert_eq!(h.paste.attempts(), 1);
    }

    #[test]
    fn hook_callback_after_shutdown_is_dropped() {
        let h = harness(ScriptedPaste::succeeding());
        let dispatcher = Dispatcher::spawn(Arc::new(h.engine)).unwrap();
        let on_fire = dispatcher.hook_callback(false);
        drop(dispatcher);

        on_fire("abc");
        assert!(h.clipboard.contents().is_none());
        assert!(h.sink.notifications().is_empty());
    }
}
