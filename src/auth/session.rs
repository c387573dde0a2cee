// src/auth/session.rs
// Server-side sessions keyed by an opaque cookie token

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::types::User;

pub const SESSION_COOKIE: &str = "forge.sid";
const TOKEN_LEN: usize = 48;

/// Signed-in user plus the provider token, which never leaves the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub user: User,
    pub access_token: Option<String>,
}

#[derive(Debug, Clone)]
struct Session {
    user: SessionUser,
    expires_at: DateTime<Utc>,
}

pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Start a session and return its token
    pub async fn create(&self, user: SessionUser) -> String {
        let token: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect();

        let session = Session {
            user,
            expires_at: Utc::now() + self.ttl,
        };
        self.sessions.write().await.insert(token.clone(), session);
        token
    }

    pub async fn get(&self, token: &str) -> Option<SessionUser> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                Some(session) if session.expires_at > Utc::now() => {
                    return Some(session.user.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: drop it
        self.sessions.write().await.remove(token);
        None
    }

    /// Returns true if a session was removed
    pub async fn destroy(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    /// Remove every expired session, returning how many were dropped
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        let purged = before - sessions.len();
        if purged > 0 {
            debug!(purged, "Purged expired sessions");
        }
        purged
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// `Set-Cookie` value establishing the session
pub fn session_cookie(token: &str, max_age: Duration, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        token,
        max_age.num_seconds()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value expiring the session cookie
pub fn clear_cookie(secure: bool) -> String {
    session_cookie("", Duration::zero(), secure)
}

/// Session token from the request's Cookie headers
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AuthProvider;
    use axum::http::HeaderValue;

    fn session_user() -> SessionUser {
        SessionUser {
            user: User {
                id: "email_1".to_string(),
                name: "ada".to_string(),
                email: "ada@example.com".to_string(),
                avatar: None,
                provider: AuthProvider::Email,
            },
            access_token: None,
        }
    }

    #[tokio::test]
    async fn test_create_get_destroy() {
        let store = SessionStore::new(Duration::hours(24));
        let token = store.create(session_user()).await;
        assert_eq!(token.len(), TOKEN_LEN);

        assert_eq!(store.get(&token).await, Some(session_user()));
        assert!(store.get("not-a-token").await.is_none());

        assert!(store.destroy(&token).await);
        assert!(!store.destroy(&token).await);
        assert!(store.get(&token).await.is_none());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_dropped() {
        let store = SessionStore::new(Duration::seconds(-1));
        let token = store.create(session_user()).await;
        assert!(store.get(&token).await.is_none());
        assert_eq!(store.len().await, 0);

        store.create(session_user()).await;
        store.create(session_user()).await;
        assert_eq!(store.purge_expired().await, 2);
    }

    #[test]
    fn test_cookie_strings() {
        let cookie = session_cookie("abc", Duration::hours(24), false);
        assert_eq!(cookie, "forge.sid=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=86400");

        let secure = session_cookie("abc", Duration::hours(1), true);
        assert!(secure.ends_with("; Secure"));

        assert!(clear_cookie(false).contains("Max-Age=0"));
    }

    #[test]
    fn test_token_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; forge.sid=tok123; other=1"),
        );
        assert_eq!(token_from_headers(&headers).as_deref(), Some("tok123"));

        let mut empty = HeaderMap::new();
        empty.insert(header::COOKIE, HeaderValue::from_static("forge.sid="));
        assert!(token_from_headers(&empty).is_none());
        assert!(token_from_headers(&HeaderMap::new()).is_none());
    }
}
