use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::{self, BufRead};
use std::path::Path;
use std::sync::{mpsc, Arc};
use std::thread;
use tracing::{info, warn};

use snippet_hotkeys::app::{HotkeyApp, Ports};
use snippet_hotkeys::bindings::BindingStore;
use snippet_hotkeys::clipboard::SystemClipboard;
use snippet_hotkeys::config;
use snippet_hotkeys::dispatch::{DispatchEngine, DispatchOutcome, PasteMode};
use snippet_hotkeys::hotkeys::HotkeyRegistry;
use snippet_hotkeys::logging;
use snippet_hotkeys::notify::LogSink;
use snippet_hotkeys::paste::SystemPaste;
use snippet_hotkeys::templates::{SharedLibrary, TemplateLibrary};

mod cli;

use cli::{Args, Command};

fn main() -> Result<()> {
    let args = Args::parse();
    let _guard = logging::init(&logging::default_log_dir());

    let settings_path = args
        .settings
        .unwrap_or_else(config::default_settings_path);
    let templates_path = args
        .templates
        .unwrap_or_else(config::default_templates_path);

    TemplateLibrary::ensure_default(&templates_path)
        .with_context(|| format!("creating {}", templates_path.display()))?;

    match args.command {
        Command::List => {
            let library = TemplateLibrary::load(&templates_path);
            let store = BindingStore::load(&settings_path);
            for (index, category) in library.categories().iter().enumerate() {
                println!("[{}] {}", index, category.name);
                for template in &category.templates {
                    println!("    {}  {}", template.id, template.title);
                }
            }
            println!();
            println!("Bindings ({}):", settings_path.display());
            for binding in store.all() {
                let target = binding.template_id.as_deref().unwrap_or("-");
                println!("    {:<20} {}", binding.combo, target);
            }
        }
        Command::Bind { combo, template_id } => {
            let library = TemplateLibrary::load(&templates_path);
            if library.get_template_by_id(&template_id).is_none() {
                bail!("no template with id '{}'", template_id);
            }
            let mut store = BindingStore::load(&settings_path);
            let parsed = store.bind(&combo, &template_id)?;
            println!("{} -> {}", parsed, template_id);
        }
        Command::Unbind { combo } => {
            let mut store = BindingStore::load(&settings_path);
            store.unbind(&combo)?;
            println!("{} unbound", combo);
        }
        Command::Use {
            template_id,
            paste,
            no_paste,
        } => {
            let mode = if paste {
                PasteMode::Always
            } else if no_paste {
                PasteMode::Never
            } else {
                PasteMode::Default
            };
            let outcome = one_shot_engine(&settings_path, &templates_path)
                .dispatch(&template_id, mode)?;
            report(&outcome);
        }
        Command::Copy { template_id } => {
            let outcome =
                one_shot_engine(&settings_path, &templates_path).copy_only(&template_id)?;
            report(&outcome);
        }
        Command::AddCategory { name } => {
            let mut library = TemplateLibrary::load(&templates_path);
            let index = library.add_category(&name)?;
            println!("[{}] {}", index, name.trim());
        }
        Command::AddTemplate {
            category,
            title,
            text,
        } => {
            let mut library = TemplateLibrary::load(&templates_path);
            let id = library.add_template(category, &title, &text)?;
            println!("{}", id);
        }
        Command::Run => serve(&settings_path, &templates_path)?,
    }

    Ok(())
}

fn one_shot_engine(settings_path: &Path, templates_path: &Path) -> DispatchEngine {
    let store = BindingStore::load(settings_path);
    let settings = store.settings();
    let library = SharedLibrary::new(TemplateLibrary::load(templates_path));
    DispatchEngine::new(
        Arc::new(library),
        Arc::new(SystemClipboard::new()),
        Arc::new(SystemPaste),
        Arc::new(LogSink),
    )
    .with_paste_by_default(settings.auto_paste_on_click)
    .with_notification_duration(settings.notification_duration_ms)
}

fn report(outcome: &DispatchOutcome) {
    match outcome {
        DispatchOutcome::Copied => println!("copied"),
        DispatchOutcome::CopiedAndPasted => println!("copied and pasted"),
        DispatchOutcome::CopiedPasteFailed(e) => println!("copied (paste failed: {})", e),
    }
}

fn serve(settings_path: &Path, templates_path: &Path) -> Result<()> {
    let store = BindingStore::load(settings_path);
    let registry = HotkeyRegistry::detect(store.settings().registration_timeout());
    let library = SharedLibrary::new(TemplateLibrary::load(templates_path));

    let mut app = HotkeyApp::start(
        store,
        library,
        registry,
        Ports {
            clipboard: Arc::new(SystemClipboard::new()),
            paste: Arc::new(SystemPaste),
            sink: Arc::new(LogSink),
        },
    )
    .context("starting dispatch worker")?;

    for combo in app.registry().live_combos() {
        println!("listening: {}", combo);
    }
    println!("type \"quit\" to exit");

    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    ctrlc::set_handler(signal_handler(shutdown_tx.clone()))
        .context("installing signal handler")?;
    thread::Builder::new()
        .name("stdin-commands".into())
        .spawn(move || watch_stdin(io::stdin().lock(), shutdown_tx))
        .context("starting stdin reader")?;

    let reason = shutdown_rx.recv().unwrap_or(Shutdown::EndOfInput);
    info!(event_type = "app_lifecycle", action = "quit", ?reason, "Shutting down");
    app.teardown();
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shutdown {
    Command,
    EndOfInput,
    Signal,
}

/// Ctrl+C and SIGTERM both end the serve loop so hooks are released.
fn signal_handler(tx: mpsc::Sender<Shutdown>) -> impl FnMut() + Send + 'static {
    move || {
        let _ = tx.send(Shutdown::Signal);
    }
}

fn watch_stdin(input: impl BufRead, tx: mpsc::Sender<Shutdown>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "stdin read failed");
                break;
            }
        };
        match line.trim() {
            "quit" | "exit" => {
                let _ = tx.send(Shutdown::Command);
                return;
            }
            "" => {}
            other => println!("unknown command: {}", other),
        }
    }
    let _ = tx.send(Shutdown::EndOfInput);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn quit_command_requests_shutdown() {
        let (tx, rx) = mpsc::channel();
        watch_stdin(Cursor::new("hello\n\n  quit  \nignored\n"), tx);
        assert_eq!(rx.recv().unwrap(), Shutdown::Command);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn end_of_input_requests_shutdown() {
        let (tx, rx) = mpsc::channel();
        watch_stdin(Cursor::new("hello\n"), tx);
        assert_eq!(rx.recv().unwrap(), Shutdown::EndOfInput);
    }

    #[test]
    fn signal_requests_shutdown_while_stdin_is_open() {
        let (tx, rx) = mpsc::channel();
        let _stdin_still_open = tx.clone();
        let mut handler = signal_handler(tx);
        handler();
        assert_eq!(rx.recv().unwrap(), Shutdown::Signal);
    }
}
