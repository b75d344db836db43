//! The action surface the UI (or CLI) drives.
//!
//! [`HotkeyApp`] wires the binding store, the hotkey registry and the
//! dispatcher together. Every method here runs on the caller's thread; only
//! hook-initiated dispatches go through the background worker.

use std::io;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};

use crate::bindings::{BindingStore, StoreError};
use crate::clipboard::ClipboardPort;
use crate::combo::Combo;
use crate::dispatch::{DispatchEngine, DispatchOutcome, Dispatcher, PasteMode};
use crate::error::{DispatchError, HotkeyError};
use crate::hotkeys::{HotkeyRegistry, OnFire, ReconcileReport};
use crate::notify::{Notification, NotificationSink};
use crate::paste::PasteSynthesizer;
use crate::templates::SharedLibrary;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Hotkey(#[from] HotkeyError),
    #[error("template '{0}' not found")]
    TemplateNotFound(String),
}

/// OS-facing collaborators of the dispatch path.
pub struct Ports {
    pub clipboard: Arc<dyn ClipboardPort>,
    pub paste: Arc<dyn PasteSynthesizer>,
    pub sink: Arc<dyn NotificationSink>,
}

pub struct HotkeyApp {
    store: BindingStore,
    registry: HotkeyRegistry,
    dispatcher: Dispatcher,
    on_fire: OnFire,
    sink: Arc<dyn NotificationSink>,
    library: SharedLibrary,
    torn_down: bool,
}

impl HotkeyApp {
    /// Build the app and register every bound combo.
    ///
    /// A settings load problem and per-combo registration failures are
    /// reported on the sink; none of them stop startup.
    #[instrument(skip_all)]
    pub fn start(
        store: BindingStore,
        library: SharedLibrary,
        registry: HotkeyRegistry,
        ports: Ports,
    ) -> io::Result<Self> {
        let settings = store.settings().clone();

        if let Some(e) = store.load_warning() {
            ports.sink.notify(
                Notification::warning(format!("Settings could not be read ({}); using defaults.", e))
                    .with_duration(settings.notification_duration_ms),
            );
        }

        let engine = DispatchEngine::new(
            Arc::new(library.clone()),
            ports.clipboard,
            ports.paste,
            Arc::clone(&ports.sink),
        )
        .with_paste_by_default(settings.auto_paste_on_click)
        .with_notification_duration(settings.notification_duration_ms);
        let dispatcher = Dispatcher::spawn(Arc::new(engine))?;
        let on_fire = dispatcher.hook_callback(settings.paste_on_hotkey);

        let mut app = Self {
            store,
            registry,
            dispatcher,
            on_fire,
            sink: ports.sink,
            library,
            torn_down: false,
        };
        app.reconcile();
        info!(
            live = app.registry.live_combos().len(),
            available = app.registry.is_available(),
            "Hotkey app started"
        );
        Ok(app)
    }

    pub fn store(&self) -> &BindingStore {
        &self.store
    }

    pub fn registry(&self) -> &HotkeyRegistry {
        &self.registry
    }

    pub fn library(&self) -> &SharedLibrary {
        &self.library
    }

    /// Bring live hooks in line with the store, reporting failures.
    pub fn reconcile(&mut self) -> ReconcileReport {
        if self.torn_down {
            return ReconcileReport::default();
        }
        let report = self.registry.reconcile(&self.store.bound(), &self.on_fire);
        for failure in &report.failures {
            self.notify(Notification::warning(failure.user_message()));
        }
        report
    }

    /// Point `combo` at `template_id` and register it.
    ///
    /// Refused when global hotkeys are unavailable on this system.
    #[instrument(skip(self))]
    pub fn assign(&mut self, combo: &str, template_id: &str) -> Result<Combo, AppError> {
        if let Some(reason) = self.registry.unavailable_reason() {
            let err = HotkeyError::CapabilityUnavailable(reason.to_string());
            self.notify(Notification::warning(err.user_message()));
            return Err(err.into());
        }

        let Some(title) = self
            .library
            .read(|lib| lib.get_template_by_id(template_id).map(|t| t.title.clone()))
        else {
            self.notify(Notification::warning("Template no longer exists."));
            return Err(AppError::TemplateNotFound(template_id.to_string()));
        };

        let parsed = match self.store.bind(combo, template_id) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.notify(Notification::error(format!("Shortcut not saved: {}", e)));
                return Err(e.into());
            }
        };

        self.reconcile();
        if self.registry.live_target(&parsed) == Some(template_id) {
            self.notify(Notification::info(format!(
                "{} assigned to \"{}\".",
                parsed, title
            )));
        }
        Ok(parsed)
    }

    /// Clear `combo` and release its hook. Unknown combos are a no-op.
    #[instrument(skip(self))]
    pub fn unassign(&mut self, combo: &str) -> Result<(), AppError> {
        let bound = Combo::parse(combo)
            .ok()
            .filter(|c| self.store.get(c).is_some());
        self.store.unbind(combo)?;
        self.reconcile();
        if let Some(parsed) = bound {
            self.notify(Notification::info(format!("Shortcut {} removed.", parsed)));
        }
        Ok(())
    }

    /// Use a template from the list. `PasteMode::Default` follows the
    /// `auto_paste_on_click` setting.
    pub fn use_template(
        &self,
        template_id: &str,
        mode: PasteMode,
    ) -> Result<DispatchOutcome, DispatchError> {
        let mode = match mode {
            PasteMode::Default if self.store.settings().auto_paste_on_click => PasteMode::Always,
            PasteMode::Default => PasteMode::Never,
            explicit => explicit,
        };
        self.dispatcher.engine().dispatch(template_id, mode)
    }

    /// The "copy to clipboard" action: never pastes.
    pub fn copy_template(&self, template_id: &str) -> Result<DispatchOutcome, DispatchError> {
        self.dispatcher.engine().copy_only(template_id)
    }

    pub fn set_auto_paste_on_click(&mut self, value: bool) -> Result<(), AppError> {
        self.store.set_auto_paste_on_click(value)?;
        Ok(())
    }

    /// Release every hook. Safe to call more than once.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.registry.unregister_all();
        self.torn_down = true;
        info!(event_type = "app_lifecycle", action = "teardown", "Hotkeys released");
    }

    fn notify(&self, notification: Notification) {
        let duration = self.store.settings().notification_duration_ms;
        self.sink.notify(notification.with_duration(duration));
    }
}

impl Drop for HotkeyApp {
    fn drop(&mut self) {
        self.teardown();
    }
}
