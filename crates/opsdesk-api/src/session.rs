// ── Session persistence ──
//
// A session is spread over four storage keys. Loading is all-or-nothing:
// a missing or unparseable key means "no session".

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::LoginResponse;
use crate::storage::{KvStore, StorageError, keys};

/// The logged-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub account: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
}

/// An authenticated session.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: SecretString,
    pub expires_at: DateTime<Utc>,
    pub refresh_after: DateTime<Utc>,
    pub user: UserInfo,
}

impl Session {
    /// Build a session from a login or refresh response.
    ///
    /// Without an explicit `refresh_in`, the token is due for refresh at
    /// half its lifetime. `fallback_user` covers refresh responses that
    /// omit the user block.
    pub fn from_login(
        resp: LoginResponse,
        now: DateTime<Utc>,
        fallback_user: Option<UserInfo>,
    ) -> Option<Self> {
        let user = resp.user.or(fallback_user)?;
        let lifetime = Duration::seconds(resp.expires_in.max(0));
        let refresh_in = resp
            .refresh_in
            .map_or(lifetime / 2, |secs| Duration::seconds(secs.max(0)));
        Some(Self {
            access_token: SecretString::from(resp.access_token),
            expires_at: now + lifetime,
            refresh_after: now + refresh_in.min(lifetime),
            user,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now >= self.refresh_after
    }
}

/// Typed view over the session keys of a [`KvStore`].
#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KvStore>,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// The backing store (shared with other persisted state).
    pub fn kv(&self) -> &Arc<dyn KvStore> {
        &self.kv
    }

    pub fn load(&self) -> Option<Session> {
        let access_token = self.kv.get(keys::ACCESS_TOKEN)?;
        let expires_at = parse_time(&self.kv.get(keys::TOKEN_EXPIRES_AT)?)?;
        let refresh_after = parse_time(&self.kv.get(keys::REFRESH_AFTER)?)?;
        let user = serde_json::from_str(&self.kv.get(keys::USER_INFO)?).ok()?;
        Some(Session {
            access_token: SecretString::from(access_token),
            expires_at,
            refresh_after,
            user,
        })
    }

    /// Only the bearer token, for request authorization.
    pub fn access_token(&self) -> Option<SecretString> {
        self.kv.get(keys::ACCESS_TOKEN).map(SecretString::from)
    }

    pub fn save(&self, session: &Session) -> Result<(), StorageError> {
        let user = serde_json::to_string(&session.user).map_err(|source| {
            StorageError::Corrupt {
                path: "user_info".into(),
                source,
            }
        })?;
        self.kv.set(
            keys::ACCESS_TOKEN,
            session.access_token.expose_secret().to_owned(),
        )?;
        self.kv
            .set(keys::TOKEN_EXPIRES_AT, session.expires_at.to_rfc3339())?;
        self.kv
            .set(keys::REFRESH_AFTER, session.refresh_after.to_rfc3339())?;
        self.kv.set(keys::USER_INFO, user)?;
        debug!(account = %session.user.account, "session stored");
        Ok(())
    }

    /// Remove every session key. Other keys are left alone.
    pub fn clear(&self) -> Result<(), StorageError> {
        for key in keys::SESSION {
            self.kv.remove(key)?;
        }
        debug!("session cleared");
        Ok(())
    }
}

fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;

    fn login(expires_in: i64, refresh_in: Option<i64>) -> LoginResponse {
        LoginResponse {
            access_token: "tok-1".into(),
            expires_in,
            refresh_in,
            user: Some(UserInfo {
                account: "ops".into(),
                name: "Ops".into(),
                role: "admin".into(),
            }),
        }
    }

    #[test]
    fn refresh_defaults_to_half_lifetime() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let session = Session::from_login(login(3600, None), now, None).unwrap();
        assert_eq!(session.expires_at, now + Duration::hours(1));
        assert_eq!(session.refresh_after, now + Duration::minutes(30));
        assert!(!session.needs_refresh(now));
        assert!(session.needs_refresh(now + Duration::minutes(31)));
        assert!(session.is_expired(now + Duration::hours(1)));
    }

    #[test]
    fn refresh_never_lands_after_expiry() {
        let now = Utc::now();
        let session = Session::from_login(login(60, Some(600)), now, None).unwrap();
        assert_eq!(session.refresh_after, session.expires_at);
    }

    #[test]
    fn missing_user_uses_fallback() {
        let mut resp = login(60, None);
        let user = resp.user.take().unwrap();
        assert!(Session::from_login(resp.clone(), Utc::now(), None).is_none());
        let session = Session::from_login(resp, Utc::now(), Some(user.clone())).unwrap();
        assert_eq!(session.user, user);
    }

    #[test]
    fn save_load_clear() {
        let kv: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        kv.set(keys::LAST_ALARM_CLEAR, "keep-me".into()).unwrap();
        let store = SessionStore::new(Arc::clone(&kv));
        assert!(store.load().is_none());

        let session = Session::from_login(login(3600, None), Utc::now(), None).unwrap();
        store.save(&session).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.access_token.expose_secret(), "tok-1");
        assert_eq!(loaded.user.account, "ops");
        assert_eq!(loaded.expires_at.timestamp(), session.expires_at.timestamp());

        store.clear().unwrap();
        assert!(store.load().is_none());
        assert!(store.access_token().is_none());
        assert_eq!(kv.get(keys::LAST_ALARM_CLEAR).as_deref(), Some("keep-me"));
    }
}
