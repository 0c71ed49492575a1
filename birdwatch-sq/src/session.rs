//! Server-side session storage
//!
//! A session is a small key/value map owned by one session token. The map
//! lives in process memory; tokens travel in the `birdwatch_session` cookie
//! (or the `X-Session-Id` header for non-browser clients).
//!
//! Sessions idle longer than the configured TTL are purged lazily whenever
//! the store is written. The number of live sessions is capped; at the cap
//! a new session evicts the one idle longest.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderValue},
    response::Response,
};
use serde_json::Value;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Cookie carrying the session token
pub const SESSION_COOKIE: &str = "birdwatch_session";

/// Header alternative to the cookie
pub const SESSION_HEADER: &str = "x-session-id";

/// Session key holding the last polygon drawn on the map
pub const DRAWN_COORDINATES_KEY: &str = "drawn_coordinates";

/// Default cap on live sessions
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

const MAX_TOKEN_LEN: usize = 128;

#[derive(Debug)]
struct SessionData {
    values: HashMap<String, Value>,
    last_seen: Instant,
}

/// Shared per-session key/value storage
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, SessionData>>>,
    ttl: Duration,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions.max(1);
        self
    }

    /// Store `value` under `key` for the session, creating the session if needed
    pub async fn insert(&self, token: &str, key: &str, value: Value) {
        let now = Instant::now();
        let mut sessions = self.inner.write().await;

        let before = sessions.len();
        sessions.retain(|t, data| t == token || now.duration_since(data.last_seen) <= self.ttl);
        let purged = before - sessions.len();
        if purged > 0 {
            debug!("Purged {} expired sessions", purged);
        }

        if !sessions.contains_key(token) && sessions.len() >= self.max_sessions {
            let idlest = sessions
                .iter()
                .min_by_key(|(_, data)| data.last_seen)
                .map(|(t, _)| t.clone());
            if let Some(idlest) = idlest {
                sessions.remove(&idlest);
                debug!("Session cap {} reached, evicted idlest session", self.max_sessions);
            }
        }

        let session = sessions.entry(token.to_string()).or_insert_with(|| SessionData {
            values: HashMap::new(),
            last_seen: now,
        });
        session.values.insert(key.to_string(), value);
        session.last_seen = now;
    }

    /// Read a value; expired sessions read as empty
    pub async fn get(&self, token: &str, key: &str) -> Option<Value> {
        let mut sessions = self.inner.write().await;
        let now = Instant::now();

        let expired = match sessions.get(token) {
            Some(data) => now.duration_since(data.last_seen) > self.ttl,
            None => return None,
        };
        if expired {
            sessions.remove(token);
            return None;
        }

        let session = sessions.get_mut(token)?;
        session.last_seen = now;
        session.values.get(key).cloned()
    }

    /// Number of live sessions (expired ones included until the next purge)
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

/// Session token of the current request
///
/// When the request carries no usable token a fresh one is minted; the
/// handler must then hand it back with [`SessionToken::attach`].
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub token: String,
    pub fresh: bool,
}

impl SessionToken {
    fn mint() -> Self {
        Self {
            token: Uuid::new_v4().to_string(),
            fresh: true,
        }
    }

    /// Add a `Set-Cookie` header for freshly minted tokens
    pub fn attach(&self, mut response: Response) -> Response {
        if !self.fresh {
            return response;
        }

        let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, self.token);
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        response
    }
}

fn valid_token(token: &str) -> bool {
    !token.is_empty()
        && token.len() <= MAX_TOKEN_LEN
        && token.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn token_from_cookies(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for SessionToken {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_token = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string());

        let token = token_from_cookies(parts)
            .or(header_token)
            .filter(|t| valid_token(t));

        Ok(match token {
            Some(token) => SessionToken { token, fresh: false },
            None => SessionToken::mint(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use serde_json::json;

    async fn extract(request: Request<()>) -> SessionToken {
        let (mut parts, _) = request.into_parts();
        SessionToken::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_then_get() {
        let store = SessionStore::new(Duration::from_secs(60));
        store.insert("abc", DRAWN_COORDINATES_KEY, json!([{"lat": 1.0, "lng": 2.0}])).await;

        let value = store.get("abc", DRAWN_COORDINATES_KEY).await;
        assert_eq!(value, Some(json!([{"lat": 1.0, "lng": 2.0}])));
        assert_eq!(store.get("other", DRAWN_COORDINATES_KEY).await, None);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SessionStore::new(Duration::from_secs(60));
        store.insert("a", "k", json!(1)).await;
        store.insert("b", "k", json!(2)).await;

        assert_eq!(store.get("a", "k").await, Some(json!(1)));
        assert_eq!(store.get("b", "k").await, Some(json!(2)));
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_expired_session_reads_empty() {
        let store = SessionStore::new(Duration::ZERO);
        store.insert("abc", "k", json!("v")).await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(store.get("abc", "k").await, None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_insert_purges_other_expired_sessions() {
        let store = SessionStore::new(Duration::ZERO);
        store.insert("old", "k", json!(1)).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.insert("new", "k", json!(2)).await;

        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_session_cap_evicts_idlest() {
        let store = SessionStore::new(Duration::from_secs(60)).with_max_sessions(2);
        store.insert("first", "k", json!(1)).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        store.insert("second", "k", json!(2)).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        store.insert("third", "k", json!(3)).await;

        assert_eq!(store.len().await, 2);
        assert_eq!(store.get("first", "k").await, None);
        assert_eq!(store.get("second", "k").await, Some(json!(2)));
        assert_eq!(store.get("third", "k").await, Some(json!(3)));
    }

    #[tokio::test]
    async fn test_session_cap_allows_existing_session_updates() {
        let store = SessionStore::new(Duration::from_secs(60)).with_max_sessions(1);
        store.insert("only", "k", json!(1)).await;
        store.insert("only", "k", json!(2)).await;

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("only", "k").await, Some(json!(2)));
    }

    #[tokio::test]
    async fn test_token_from_cookie() {
        let request = Request::builder()
            .header(header::COOKIE, format!("theme=dark; {}=tok-123", SESSION_COOKIE))
            .body(())
            .unwrap();
        let token = extract(request).await;

        assert_eq!(token.token, "tok-123");
        assert!(!token.fresh);
    }

    #[tokio::test]
    async fn test_token_from_header() {
        let request = Request::builder()
            .header(SESSION_HEADER, "tok_456")
            .body(())
            .unwrap();
        let token = extract(request).await;

        assert_eq!(token.token, "tok_456");
        assert!(!token.fresh);
    }

    #[tokio::test]
    async fn test_missing_or_malformed_token_is_minted() {
        let token = extract(Request::builder().body(()).unwrap()).await;
        assert!(token.fresh);
        assert!(Uuid::parse_str(&token.token).is_ok());

        let request = Request::builder()
            .header(SESSION_HEADER, "bad token; with spaces")
            .body(())
            .unwrap();
        assert!(extract(request).await.fresh);
    }

    #[test]
    fn test_attach_sets_cookie_only_when_fresh() {
        let fresh = SessionToken::mint();
        let response = fresh.attach(Response::new(axum::body::Body::empty()));
        let cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with(&format!("{}={}", SESSION_COOKIE, fresh.token)));

        let existing = SessionToken {
            token: "abc".to_string(),
            fresh: false,
        };
        let response = existing.attach(Response::new(axum::body::Body::empty()));
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }
}
