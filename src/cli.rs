use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Global hotkeys that copy (and paste) text templates
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Settings document (bindings and flags)
    #[arg(long = "settings", value_name = "FILE", global = true)]
    pub settings: Option<PathBuf>,

    /// Template library
    #[arg(long = "templates", value_name = "FILE", global = true)]
    pub templates: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show categories, templates and bindings
    List,

    /// Bind a key combination to a template
    Bind {
        /// e.g. "ctrl+shift+t"
        combo: String,
        template_id: String,
    },

    /// Remove the template bound to a key combination
    Unbind { combo: String },

    /// Copy a template, pasting it when enabled
    Use {
        template_id: String,

        /// Always send the paste keystroke
        #[arg(long, conflicts_with = "no_paste")]
        paste: bool,

        /// Only copy
        #[arg(long = "no-paste")]
        no_paste: bool,
    },

    /// Copy a template without pasting
    Copy { template_id: String },

    /// Add a template category
    AddCategory { name: String },

    /// Add a template to a category
    AddTemplate {
        /// Index as shown by `list`
        category: usize,
        title: String,
        text: String,
    },

    /// Register every bound combo and serve until stdin reads "quit" or closes
    Run,
}
