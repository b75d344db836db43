//! Persisted combo -> template bindings.
//!
//! Bindings live in the `hotkeys` table of the settings document. An unbound
//! combo stays in the table with a `null` target. Every mutation is written
//! to disk before the call returns.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::combo::{Combo, ComboParseError};
use crate::config::{self, LoadError, Settings};

/// A combo and the template it fires, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub combo: Combo,
    pub template_id: Option<String>,
}

impl Binding {
    pub fn is_bound(&self) -> bool {
        self.template_id.is_some()
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid combo '{input}': {source}")]
    InvalidCombo {
        input: String,
        #[source]
        source: ComboParseError,
    },
    #[error("failed to persist bindings: {0}")]
    Persist(#[from] io::Error),
}

pub struct BindingStore {
    path: PathBuf,
    settings: Settings,
    load_warning: Option<LoadError>,
}

impl BindingStore {
    /// Load the store from `path`.
    ///
    /// A missing, unreadable or corrupt file yields the default document; the
    /// load error is logged once and kept for [`BindingStore::load_warning`].
    #[instrument(name = "load_bindings")]
    pub fn load(path: &Path) -> Self {
        let (settings, load_warning) = match config::load_settings(path) {
            Ok(settings) => (settings, None),
            Err(e) => {
                warn!(error = %e, "Settings unusable, starting with default bindings");
                (Settings::default(), Some(e))
            }
        };

        let mut store = Self {
            path: path.to_path_buf(),
            settings,
            load_warning,
        };
        store.normalize_keys();
        store
    }

    /// Re-key the table by canonical combo, dropping keys that do not parse.
    fn normalize_keys(&mut self) {
        let raw = std::mem::take(&mut self.settings.hotkeys);
        for (key, target) in raw {
            match Combo::parse(&key) {
                Ok(combo) => {
                    let canonical = combo.to_canonical_string();
                    if canonical != key {
                        info!(from = %key, to = %canonical, "Normalized combo key");
                    }
                    // A bound entry wins over an unbound duplicate.
                    let slot = self.settings.hotkeys.entry(canonical).or_insert(None);
                    if target.is_some() {
                        *slot = target;
                    }
                }
                Err(e) => warn!(combo = %key, error = %e, "Dropping unparseable combo"),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn load_warning(&self) -> Option<&LoadError> {
        self.load_warning.as_ref()
    }

    pub fn get(&self, combo: &Combo) -> Option<&str> {
        self.settings
            .hotkeys
            .get(&combo.to_canonical_string())
            .and_then(|target| target.as_deref())
    }

    /// Point `combo` at `template_id`, replacing any previous target.
    #[instrument(skip(self))]
    pub fn bind(&mut self, combo: &str, template_id: &str) -> Result<Combo, StoreError> {
        let parsed = Combo::parse(combo).map_err(|source| StoreError::InvalidCombo {
            input: combo.to_string(),
            source,
        })?;
        let mut next = self.settings.clone();
        next.hotkeys
            .insert(parsed.to_canonical_string(), Some(template_id.to_string()));
        self.commit(next)?;
        info!(combo = %parsed, template_id, "Bound combo");
        Ok(parsed)
    }

    /// Clear the target of `combo`.
    ///
    /// Unknown, unparseable or already-unbound combos are a no-op and do not
    /// touch the file.
    #[instrument(skip(self))]
    pub fn unbind(&mut self, combo: &str) -> Result<(), StoreError> {
        let Ok(parsed) = Combo::parse(combo) else {
            return Ok(());
        };
        let key = parsed.to_canonical_string();
        if matches!(self.settings.hotkeys.get(&key), Some(Some(_))) {
            let mut next = self.settings.clone();
            next.hotkeys.insert(key, None);
            self.commit(next)?;
            info!(combo = %parsed, "Unbound combo");
        }
        Ok(())
    }

    /// Every known combo, bound or not.
    pub fn all(&self) -> Vec<Binding> {
        self.settings
            .hotkeys
            .iter()
            .filter_map(|(key, target)| {
                Combo::parse(key).ok().map(|combo| Binding {
                    combo,
                    template_id: target.clone(),
                })
            })
            .collect()
    }

    /// Only the combos that currently have a target.
    pub fn bound(&self) -> Vec<Binding> {
        self.all().into_iter().filter(Binding::is_bound).collect()
    }

    pub fn set_auto_paste_on_click(&mut self, value: bool) -> Result<(), StoreError> {
        let mut next = self.settings.clone();
        next.auto_paste_on_click = value;
        self.commit(next)
    }

    /// Write `next` to disk, then adopt it. On failure the in-memory
    /// document is left as it was.
    fn commit(&mut self, next: Settings) -> Result<(), StoreError> {
        config::save_settings(&self.path, &next)?;
        self.settings = next;
        Ok(())
    }
}
