//! Terminal implementations of the client and watch hooks.
//!
//! Loading shows an `indicatif` spinner on stderr, toasts are colored
//! stderr lines, the login redirect prints a hint, and the alarm sink
//! rings the terminal bell and redraws a one-line status.

use std::io::{self, Write};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use opsdesk_api::{Feedback, LoginRedirect};
use opsdesk_core::{AlertSink, Indicator, IndicatorFrame};

use crate::output;

// ── Request feedback ────────────────────────────────────────────────

pub struct TerminalFeedback {
    spinner: Mutex<Option<ProgressBar>>,
    quiet: bool,
    color: bool,
    redirected: AtomicBool,
}

impl TerminalFeedback {
    pub fn new(quiet: bool, color: bool) -> Self {
        Self {
            spinner: Mutex::new(None),
            quiet,
            color,
            redirected: AtomicBool::new(false),
        }
    }
}

impl Feedback for TerminalFeedback {
    fn loading(&self, active: bool) {
        if self.quiet {
            return;
        }
        let mut slot = self.spinner.lock().expect("spinner lock poisoned");
        if active {
            if slot.is_none() {
                let bar = ProgressBar::new_spinner();
                if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
                    bar.set_style(style);
                }
                bar.set_message("Working...");
                bar.enable_steady_tick(Duration::from_millis(100));
                *slot = Some(bar);
            }
        } else if let Some(bar) = slot.take() {
            bar.finish_and_clear();
        }
    }

    fn toast(&self, message: &str) {
        eprintln!("{}", output::yellow(&format!("! {message}"), self.color));
    }
}

impl LoginRedirect for TerminalFeedback {
    fn redirect_to_login(&self, return_to: Option<&str>) {
        if self.redirected.swap(true, Ordering::SeqCst) {
            return;
        }
        let hint = match return_to {
            Some(command) => format!("Session ended. Run `opsdesk login`, then retry `{command}`."),
            None => "Session ended. Run `opsdesk login` to sign in again.".to_owned(),
        };
        eprintln!("{}", output::red(&hint, self.color));
    }
}

// ── Alarm sink ──────────────────────────────────────────────────────

/// Bell plus a redrawn status line. `status` is set by the watch loop;
/// each indicator frame redraws it.
pub struct TerminalAlertSink {
    color: bool,
    status: Mutex<String>,
    released: AtomicBool,
}

impl TerminalAlertSink {
    pub fn new(color: bool) -> Self {
        Self {
            color,
            status: Mutex::new(String::new()),
            released: AtomicBool::new(false),
        }
    }

    pub fn set_status(&self, status: String) {
        *self.status.lock().expect("status lock poisoned") = status;
    }

    fn glyph(&self, frame: IndicatorFrame) -> String {
        if !frame.visible {
            return " ".to_owned();
        }
        match frame.indicator {
            Indicator::FlashingRed | Indicator::SteadyRed => output::red("●", self.color),
            Indicator::SteadyGreen => output::green("●", self.color),
        }
    }
}

impl AlertSink for TerminalAlertSink {
    fn pulse(&self) {
        if self.released.load(Ordering::SeqCst) {
            return;
        }
        let mut stderr = io::stderr().lock();
        let _ = stderr.write_all(b"\x07");
        let _ = stderr.flush();
    }

    fn indicator(&self, frame: IndicatorFrame) {
        if self.released.load(Ordering::SeqCst) {
            return;
        }
        let status = self.status.lock().expect("status lock poisoned").clone();
        let mut stderr = io::stderr().lock();
        let _ = write!(stderr, "\r\x1b[2K{} {status}", self.glyph(frame));
        let _ = stderr.flush();
    }

    fn release(&self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            eprintln!();
        }
    }
}
