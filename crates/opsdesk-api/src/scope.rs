// ── Session cancellation scopes ──
//
// Each request runs under a child token of the current session scope.
// Cancelling a scope aborts every request it spawned, after which a fresh
// scope takes over for later requests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// One generation of in-flight requests.
#[derive(Debug)]
pub struct SessionScope {
    id: u64,
    token: CancellationToken,
}

impl SessionScope {
    fn new(id: u64) -> Self {
        Self {
            id,
            token: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// A token for one request; cancelled together with the scope.
    pub fn request_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Registry of the current scope. Owned by one client, never global.
#[derive(Debug)]
pub struct SessionScopes {
    current: ArcSwap<SessionScope>,
    next_id: AtomicU64,
    rotate: Mutex<()>,
}

impl Default for SessionScopes {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionScopes {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(SessionScope::new(0)),
            next_id: AtomicU64::new(1),
            rotate: Mutex::new(()),
        }
    }

    pub fn current(&self) -> Arc<SessionScope> {
        self.current.load_full()
    }

    /// Cancel scope `id` and install a fresh one.
    ///
    /// Returns `false` if `id` is no longer the current scope (it was
    /// already cancelled and replaced).
    pub fn cancel_session(&self, id: u64) -> bool {
        let _guard = self.rotate.lock().expect("scope lock poisoned");
        let current = self.current.load_full();
        if current.id != id {
            return false;
        }
        current.token.cancel();
        let fresh = SessionScope::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(cancelled = id, fresh = fresh.id, "session scope rotated");
        self.current.store(Arc::new(fresh));
        true
    }

    /// Cancel whatever scope is current. Returns the cancelled scope's id.
    pub fn cancel_current(&self) -> u64 {
        loop {
            let id = self.current.load().id;
            if self.cancel_session(id) {
                return id;
            }
        }
    }
}
