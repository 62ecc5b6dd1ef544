//! Keyed pool of reusable transport sessions.
//!
//! One physical connection per `scheme+host[:port]` key, with multiple idle
//! entries allowed per key so concurrent requests to the same host get
//! independent connections. The map is the only shared mutable state; its
//! lock is held for lookup/insert/remove only, never across connect I/O.

use crate::base::error::DavError;
use crate::session::connector::{DirectConnector, SessionConnector};
use crate::session::session::Session;
use crate::session::url::Scheme;
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Canonical routing key for poolable sessions.
///
/// The port is omitted when it equals the scheme default, so
/// `http://example.org` and `http://example.org:80` share a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    /// Key derived from the caller's requested endpoint, used on acquire.
    pub fn from_request(scheme: Scheme, host: &str, port: u16) -> SessionKey {
        if port == scheme.default_port() {
            SessionKey(format!("{}{}", scheme.as_str(), host))
        } else {
            SessionKey(format!("{}{}:{}", scheme.as_str(), host, port))
        }
    }

    /// Key derived from the session's own recorded endpoint, used on release.
    ///
    /// Kept separate from [`SessionKey::from_request`] on purpose: acquire
    /// keys come from the request string, release keys from the negotiated
    /// endpoint, and the two may differ.
    pub fn from_session(session: &Session) -> SessionKey {
        let scheme = session.scheme();
        if session.port() == scheme.default_port() {
            SessionKey(format!("{}{}", scheme.as_str(), session.host()))
        } else {
            SessionKey(format!("{}{}:{}", scheme.as_str(), session.host(), session.port()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Endpoint description handed to the authentication callback.
#[derive(Debug, Clone)]
pub struct AuthChallenge {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
}

/// Credentials produced by the authentication callback.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: String,
    pub password: String,
}

/// Callback invoked when a server demands authentication.
pub type AuthCallback = Arc<dyn Fn(&AuthChallenge) -> Option<UserCredentials> + Send + Sync>;

/// Owns the session pool and hands out/recycles sessions across concurrent
/// callers.
pub struct SessionFactory {
    sessions: DashMap<SessionKey, Vec<Session>>,
    connector: Arc<dyn SessionConnector>,
    auth: RwLock<Option<AuthCallback>>,
    ca_check: AtomicBool,
}

impl Default for SessionFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionFactory {
    pub fn new() -> Self {
        Self::with_connector(Arc::new(DirectConnector))
    }

    pub fn with_connector(connector: Arc<dyn SessionConnector>) -> Self {
        SessionFactory {
            sessions: DashMap::new(),
            connector,
            auth: RwLock::new(None),
            ca_check: AtomicBool::new(true),
        }
    }

    /// Takes a pooled session for the canonical key, or establishes a new one.
    ///
    /// Pooled entries whose connection went away while idle are dropped, not
    /// handed out. A popped entry belongs exclusively to the caller until
    /// released. The map guard is dropped before connecting so connection
    /// establishment never blocks unrelated pool operations; new sessions
    /// use the caller's scheme/host/port exactly as requested.
    pub async fn acquire_session(
        &self,
        scheme: Scheme,
        host: &str,
        port: u16,
    ) -> Result<Session, DavError> {
        let key = SessionKey::from_request(scheme, host, port);
        let mut cached = None;
        if let Some(mut entry) = self.sessions.get_mut(&key) {
            while let Some(session) = entry.value_mut().pop() {
                if session.is_open() {
                    cached = Some(session);
                    break;
                }
                tracing::debug!(id = session.id(), %key, "discarding stale pooled session");
            }
            let drained = entry.value().is_empty();
            drop(entry);
            if drained {
                self.sessions.remove_if(&key, |_, sessions| sessions.is_empty());
            }
        }
        if let Some(session) = cached {
            tracing::debug!(id = session.id(), %key, "cached session found, taken from pool");
            return Ok(session);
        }

        tracing::debug!(%key, "no cached session, creating a new one");
        self.connector.connect(scheme, host, port, self.ca_check.load(Ordering::Relaxed)).await
    }

    /// Files a session back into the pool under its negotiated endpoint.
    ///
    /// Sessions whose transport is no longer open are dropped instead.
    pub fn release_session(&self, session: Session) {
        if !session.is_open() {
            tracing::debug!(id = session.id(), "discarding closed session");
            return;
        }
        let key = SessionKey::from_session(&session);
        tracing::debug!(id = session.id(), %key, "returning session to pool");
        self.sessions.entry(key).or_default().push(session);
    }

    /// Registers the callback consulted when a request hits an
    /// authentication challenge. Requests capture the callback at creation
    /// time.
    pub fn set_auth_callback(&self, callback: AuthCallback) {
        if let Ok(mut slot) = self.auth.write() {
            *slot = Some(callback);
        }
    }

    pub fn auth_callback(&self) -> Option<AuthCallback> {
        self.auth.read().ok().and_then(|slot| slot.clone())
    }

    /// Enables or disables TLS peer-certificate validation for sessions
    /// created after the call.
    pub fn set_ssl_ca_check(&self, check: bool) {
        self.ca_check.store(check, Ordering::Relaxed);
    }

    /// Number of idle sessions currently pooled.
    pub fn pooled_session_count(&self) -> usize {
        self.sessions.iter().map(|entry| entry.value().len()).sum()
    }
}

impl Drop for SessionFactory {
    fn drop(&mut self) {
        let pooled = self.pooled_session_count();
        tracing::debug!(pooled, "destroying session factory, closing pooled sessions");
        self.sessions.clear();
    }
}

impl fmt::Debug for SessionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionFactory")
            .field("pooled", &self.pooled_session_count())
            .field("ca_check", &self.ca_check.load(Ordering::Relaxed))
            .finish()
    }
}
