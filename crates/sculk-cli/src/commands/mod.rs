pub mod add;
pub mod completions;
pub mod export;
pub mod import;
pub mod init;
pub mod install;
pub mod link;
pub mod man_pages;
pub mod migrate;
pub mod refresh;
pub mod remove;
pub mod update;

use indicatif::{ProgressBar, ProgressStyle};
use sculk_core::{CoreError, Interaction, PackSession, Services};
use sculk_remote::ApiConfig;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_MANIFEST_ERROR: u8 = 2;
pub const EXIT_INTEGRITY_ERROR: u8 = 3;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

/// Render an operation error with the prefix `main` maps to an exit code.
pub fn describe(err: impl Into<CoreError>) -> String {
    let err = err.into();
    if err.is_manifest_error() {
        format!("manifest error: {err}")
    } else if err.is_integrity_error() {
        format!("integrity error: {err}")
    } else {
        err.to_string()
    }
}

pub fn open_session(pack: &Path) -> Result<PackSession, String> {
    PackSession::open(pack).map_err(describe)
}

pub fn services() -> Result<Services, String> {
    let config = ApiConfig::load_default().map_err(|e| format!("config error: {e}"))?;
    Ok(Services::new(&config))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

/// Run `op` under a spinner unless the output is JSON.
pub fn with_spinner<T>(
    json: bool,
    msg: &str,
    done: &str,
    op: impl FnOnce() -> Result<T, CoreError>,
) -> Result<T, String> {
    let pb = (!json).then(|| spinner(msg));
    match op() {
        Ok(value) => {
            if let Some(pb) = &pb {
                spin_ok(pb, done);
            }
            Ok(value)
        }
        Err(e) => {
            if let Some(pb) = &pb {
                spin_fail(pb, "failed");
            }
            Err(describe(e))
        }
    }
}

pub fn green(text: &str) -> String {
    console::Style::new().green().apply_to(text).to_string()
}

pub fn yellow(text: &str) -> String {
    console::Style::new().yellow().apply_to(text).to_string()
}

pub fn dim(text: &str) -> String {
    console::Style::new().dim().apply_to(text).to_string()
}

/// Prompts and progress on the terminal.
///
/// Prompts are only shown when stderr is a TTY and the output is not JSON;
/// otherwise a lone search hit is taken, anything ambiguous fails and
/// confirmations use their default.
pub struct TerminalUi {
    interactive: bool,
    show_progress: bool,
    bar: Mutex<Option<ProgressBar>>,
}

impl TerminalUi {
    pub fn new(json: bool) -> Self {
        let tty = console::Term::stderr().is_term();
        Self {
            interactive: tty && !json,
            show_progress: tty && !json,
            bar: Mutex::new(None),
        }
    }

    fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        let guard = self.bar.lock().ok();
        match guard.as_ref().and_then(|g| g.as_ref()) {
            Some(bar) => bar.suspend(f),
            None => f(),
        }
    }
}

impl Interaction for TerminalUi {
    fn select(&self, prompt: &str, options: &[String]) -> Option<usize> {
        if !self.interactive {
            return (options.len() == 1).then_some(0);
        }
        self.suspend(|| {
            dialoguer::Select::new()
                .with_prompt(prompt)
                .items(options)
                .default(0)
                .interact_opt()
                .ok()
                .flatten()
        })
    }

    fn confirm(&self, prompt: &str, default: bool) -> bool {
        if !self.interactive {
            return default;
        }
        self.suspend(|| {
            dialoguer::Confirm::new()
                .with_prompt(prompt)
                .default(default)
                .interact()
                .unwrap_or(default)
        })
    }

    fn progress(&self, done: usize, total: usize, item: &str) {
        if !self.show_progress {
            return;
        }
        let Ok(mut guard) = self.bar.lock() else {
            return;
        };
        let bar = guard.get_or_insert_with(|| {
            let pb = ProgressBar::new(total as u64);
            pb.set_style(
                ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} {wide_msg}")
                    .expect("valid template"),
            );
            pb
        });
        bar.set_position(done as u64);
        bar.set_message(item.to_owned());
        if done >= total {
            bar.finish_and_clear();
            *guard = None;
        }
    }
}
