// ── Forced logout ──
//
// Runs when the server says the session is gone (HTTP 401 or a sentinel
// `err`). At most one sequence is in flight: triggers that arrive while a
// redirect is pending are dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::error::ExpiryCause;
use crate::feedback::LoginRedirect;
use crate::scope::SessionScopes;
use crate::session::SessionStore;

/// Delay between clearing the session and redirecting to login.
pub const DEFAULT_LOGOUT_DELAY: Duration = Duration::from_millis(300);

pub(crate) struct ForcedLogout {
    scopes: Arc<SessionScopes>,
    sessions: SessionStore,
    redirect: Arc<dyn LoginRedirect>,
    delay: Duration,
    pending: Arc<AtomicBool>,
    settled: Arc<Notify>,
}

impl ForcedLogout {
    pub(crate) fn new(
        scopes: Arc<SessionScopes>,
        sessions: SessionStore,
        redirect: Arc<dyn LoginRedirect>,
        delay: Duration,
    ) -> Self {
        Self {
            scopes,
            sessions,
            redirect,
            delay,
            pending: Arc::new(AtomicBool::new(false)),
            settled: Arc::new(Notify::new()),
        }
    }

    /// Start the logout sequence. Returns `false` if one is already pending.
    ///
    /// 1. cancel every request in the current session scope
    /// 2. install a fresh scope
    /// 3. clear persisted session state
    /// 4. after `delay`, redirect to login with `return_to`
    pub(crate) fn trigger(&self, cause: ExpiryCause, return_to: Option<String>) -> bool {
        if self.pending.swap(true, Ordering::AcqRel) {
            debug!(%cause, "forced logout already pending");
            return false;
        }
        warn!(%cause, "session lost, forcing logout");

        let cancelled = self.scopes.cancel_current();
        debug!(scope = cancelled, "in-flight requests cancelled");

        if let Err(e) = self.sessions.clear() {
            warn!(error = %e, "failed to clear stored session");
        }

        let redirect = Arc::clone(&self.redirect);
        let pending = Arc::clone(&self.pending);
        let settled = Arc::clone(&self.settled);
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            redirect.redirect_to_login(return_to.as_deref());
            pending.store(false, Ordering::Release);
            settled.notify_waiters();
        });
        true
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Resolve once no sequence is pending.
    pub(crate) async fn settled(&self) {
        loop {
            let notified = self.settled.notified();
            if !self.is_pending() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;
    use crate::models::LoginResponse;
    use crate::session::{Session, UserInfo};
    use crate::storage::MemoryStore;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Option<String>>>,
    }

    impl LoginRedirect for Recorder {
        fn redirect_to_login(&self, return_to: Option<&str>) {
            self.calls.lock().unwrap().push(return_to.map(String::from));
        }
    }

    fn logged_in_store() -> SessionStore {
        let store = SessionStore::new(Arc::new(MemoryStore::new()));
        let session = Session::from_login(
            LoginResponse {
                access_token: "tok".into(),
                expires_in: 3600,
                refresh_in: None,
                user: Some(UserInfo {
                    account: "ops".into(),
                    name: String::new(),
                    role: String::new(),
                }),
            },
            Utc::now(),
            None,
        )
        .unwrap();
        store.save(&session).unwrap();
        store
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_triggers_run_one_sequence() {
        let scopes = Arc::new(SessionScopes::new());
        let sessions = logged_in_store();
        let recorder = Arc::new(Recorder::default());
        let logout = ForcedLogout::new(
            Arc::clone(&scopes),
            sessions.clone(),
            Arc::clone(&recorder) as Arc<dyn LoginRedirect>,
            DEFAULT_LOGOUT_DELAY,
        );
        let first_scope = scopes.current();

        assert!(logout.trigger(ExpiryCause::Unauthorized, Some("/dashboard".into())));
        assert!(!logout.trigger(ExpiryCause::SessionInvalid { code: 401 }, None));
        assert!(logout.is_pending());

        assert!(first_scope.is_cancelled());
        assert!(sessions.load().is_none());

        // Nothing yet: the redirect is deferred.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(recorder.calls.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(
            *recorder.calls.lock().unwrap(),
            vec![Some("/dashboard".to_owned())]
        );
        assert!(!logout.is_pending());

        // A later loss starts a new sequence.
        assert!(logout.trigger(ExpiryCause::Unauthorized, None));
    }

    #[tokio::test(start_paused = true)]
    async fn settled_waits_for_the_redirect() {
        let recorder = Arc::new(Recorder::default());
        let logout = ForcedLogout::new(
            Arc::new(SessionScopes::new()),
            logged_in_store(),
            Arc::clone(&recorder) as Arc<dyn LoginRedirect>,
            DEFAULT_LOGOUT_DELAY,
        );

        // Nothing pending: returns at once.
        logout.settled().await;
        assert!(recorder.calls.lock().unwrap().is_empty());

        logout.trigger(ExpiryCause::Unauthorized, Some("/devices".into()));
        logout.settled().await;
        assert_eq!(
            *recorder.calls.lock().unwrap(),
            vec![Some("/devices".to_owned())]
        );
        assert!(!logout.is_pending());
    }
}
