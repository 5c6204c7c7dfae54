//! Terminal output for acquisition runs
//!
//! Progress goes to stdout, problems and debug lines to stderr. Debug lines
//! are only printed once `set_debug(true)` has been called.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

static DEBUG: AtomicBool = AtomicBool::new(false);

const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Indent for lines that belong to the track header above them
const INDENT: &str = "    ";

/// Enable or disable debug output for the rest of the process.
pub fn set_debug(enabled: bool) {
    DEBUG.store(enabled, Ordering::Relaxed);
}

pub fn debug_enabled() -> bool {
    DEBUG.load(Ordering::Relaxed)
}

/// Start of a run phase, e.g. `:: Monitoring 3 downloads`
pub fn heading(message: impl Display) {
    println!("{} {}", "::".blue().bold(), message.bold());
}

/// Header for one track of the batch, e.g. `[2/5] Song - Band`
pub fn track_header(current: usize, total: usize, details: &str) {
    println!("{} {}", track_counter(current, total).cyan(), details.bold());
}

fn track_counter(current: usize, total: usize) -> String {
    format!("[{}/{}]", current, total)
}

pub fn detail(message: impl Display) {
    println!("{INDENT}{}", message.dimmed());
}

pub fn success(message: impl Display) {
    println!("{INDENT}{} {}", "ok".green().bold(), message.green());
}

pub fn warning(message: impl Display) {
    eprintln!("{INDENT}{} {}", "warn".yellow().bold(), message.yellow());
}

pub fn error(message: impl Display) {
    eprintln!("{INDENT}{} {}", "fail".red().bold(), message.red());
}

/// Raw bodies and per-poll details; silent unless debug is enabled.
pub fn debug(message: impl Display) {
    if debug_enabled() {
        eprintln!("{INDENT}{} {}", "debug".magenta(), message.dimmed());
    }
}

/// Spinner shown while a search is polled.
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("    {spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(SPINNER_CHARS);
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn progress_done(pb: ProgressBar) {
    pb.finish_and_clear();
}
