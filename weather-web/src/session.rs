//! Cookie-keyed sessions.
//!
//! The browser only holds an opaque id in the `weather_session` cookie; the
//! session itself lives in a [`SessionStore`].

use std::{collections::HashMap, convert::Infallible, sync::Arc, time::Duration};

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
    response::Redirect,
};
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use weather_core::SearchHistory;

use crate::{response::ApiError, server::AppState};

pub const SESSION_COOKIE: &str = "weather_session";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub logged_in: bool,
    pub username: String,
    pub search_history: SearchHistory,
}

pub trait SessionStore: Send + Sync {
    fn get(&self, id: &str) -> Option<Session>;
    fn set(&self, id: &str, session: Session);
    fn clear(&self, id: &str);
}

/// Process-local store. Sessions vanish on restart.
///
/// Entries older than `max_age` (counted from login) read as absent and are
/// dropped on the next write.
#[derive(Debug)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, StoredSession>>,
    max_age: TimeDelta,
}

#[derive(Debug)]
struct StoredSession {
    session: Session,
    issued_at: DateTime<Utc>,
}

impl MemorySessionStore {
    pub fn new(max_age: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_age: TimeDelta::from_std(max_age).unwrap_or(TimeDelta::MAX),
        }
    }

    fn is_live(&self, entry: &StoredSession, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.issued_at) < self.max_age
    }

    fn get_at(&self, id: &str, now: DateTime<Utc>) -> Option<Session> {
        self.sessions
            .read()
            .get(id)
            .filter(|entry| self.is_live(entry, now))
            .map(|entry| entry.session.clone())
    }

    fn set_at(&self, id: &str, session: Session, now: DateTime<Utc>) {
        let mut sessions = self.sessions.write();
        sessions.retain(|_, entry| self.is_live(entry, now));

        let issued_at = sessions.get(id).map_or(now, |entry| entry.issued_at);
        sessions.insert(id.to_string(), StoredSession { session, issued_at });
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, id: &str) -> Option<Session> {
        self.get_at(id, Utc::now())
    }

    fn set(&self, id: &str, session: Session) {
        self.set_at(id, session, Utc::now());
    }

    fn clear(&self, id: &str) {
        self.sessions.write().remove(id);
    }
}

pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn session_cookie(id: &str, max_age: Duration) -> String {
    format!(
        "{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        max_age.as_secs()
    )
}

pub fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

fn cookie_session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// The session behind the request's cookie, or an empty one.
pub struct SessionContext {
    id: Option<String>,
    session: Session,
    store: Arc<dyn SessionStore>,
}

impl SessionContext {
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_logged_in(&self) -> bool {
        self.id.is_some() && self.session.logged_in
    }

    /// Mutate the session and write it back to the store.
    pub fn update(&mut self, f: impl FnOnce(&mut Session)) {
        f(&mut self.session);
        if let Some(id) = &self.id {
            self.store.set(id, self.session.clone());
        }
    }

    /// Start a logged-in session under a fresh id and return that id.
    ///
    /// Any previous session is dropped; its search history carries over.
    pub fn login(&mut self, username: &str) -> String {
        if let Some(old) = self.id.take() {
            self.store.clear(&old);
        }

        let id = new_session_id();
        self.session = Session {
            logged_in: true,
            username: username.to_string(),
            search_history: std::mem::take(&mut self.session.search_history),
        };
        self.store.set(&id, self.session.clone());
        self.id = Some(id.clone());
        id
    }

    pub fn logout(&mut self) {
        if let Some(id) = self.id.take() {
            self.store.clear(&id);
        }
        self.session = Session::default();
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SessionContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let store = state.sessions.clone();
        let found = cookie_session_id(&parts.headers)
            .and_then(|id| store.get(&id).map(|session| (id, session)));

        Ok(match found {
            Some((id, session)) => SessionContext { id: Some(id), session, store },
            None => SessionContext { id: None, session: Session::default(), store },
        })
    }
}

/// A logged-in session, required by every `/api/*` route.
pub struct Authenticated(pub SessionContext);

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let ctx = match SessionContext::from_request_parts(parts, state).await {
            Ok(ctx) => ctx,
            Err(never) => match never {},
        };
        if ctx.is_logged_in() {
            Ok(Authenticated(ctx))
        } else {
            Err(ApiError::Unauthorized)
        }
    }
}

/// A logged-in session for HTML pages; anonymous visitors go back to login.
pub struct PageSession(pub SessionContext);

#[async_trait]
impl FromRequestParts<AppState> for PageSession {
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let ctx = match SessionContext::from_request_parts(parts, state).await {
            Ok(ctx) => ctx,
            Err(never) => match never {},
        };
        if ctx.is_logged_in() {
            Ok(PageSession(ctx))
        } else {
            Err(Redirect::to("/"))
        }
    }
}
