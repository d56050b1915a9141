// ── User-facing side effects ──
//
// Loading indicator, toasts, and the login redirect are hooks so the
// request client stays headless. Front ends plug in their own.

use std::sync::Arc;

use tracing::{info, warn};

/// Loading indicator and transient notifications.
pub trait Feedback: Send + Sync {
    fn loading(&self, active: bool);
    fn toast(&self, message: &str);
}

/// Navigates to the login route after a forced logout.
pub trait LoginRedirect: Send + Sync {
    /// `return_to` is the location active when the session was lost.
    fn redirect_to_login(&self, return_to: Option<&str>);
}

/// Default hooks: everything goes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFeedback;

impl Feedback for TracingFeedback {
    fn loading(&self, _active: bool) {}

    fn toast(&self, message: &str) {
        warn!(message, "request failed");
    }
}

impl LoginRedirect for TracingFeedback {
    fn redirect_to_login(&self, return_to: Option<&str>) {
        info!(?return_to, "login required");
    }
}

/// Turns the loading indicator off when dropped, including on
/// cancellation and early returns.
pub(crate) struct LoadingGuard {
    feedback: Arc<dyn Feedback>,
}

impl LoadingGuard {
    pub(crate) fn start(feedback: Arc<dyn Feedback>) -> Self {
        feedback.loading(true);
        Self { feedback }
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.feedback.loading(false);
    }
}
