//! Snippet Hotkeys - global key combinations that copy (and paste) text templates.
//!
//! The pieces, from the OS inward:
//! - [`hotkeys`] owns every OS hook and reconciles them with the bindings
//! - [`dispatch`] resolves a template, writes the clipboard and pastes
//! - [`bindings`] and [`templates`] are the two persisted documents
//! - [`app`] ties them together behind the actions a UI would call

pub mod app;
pub mod bindings;
pub mod clipboard;
pub mod combo;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod hotkeys;
pub mod logging;
pub mod notify;
pub mod paste;
pub mod templates;
