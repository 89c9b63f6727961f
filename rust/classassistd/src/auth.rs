//! Client for the hosted identity service (`/auth/v1`).
//!
//! Holds at most one session, persists it in the workspace database so a
//! restarted sidecar resumes it, and reports every change to the registered
//! [`AuthListeners`].

use crate::config::BackendConfig;
use crate::db;
use crate::http;
use crate::session::{
    AuthEvent, AuthListener, AuthListeners, AuthService, AuthSession, AuthUser, Subscription,
};
use chrono::Utc;
use reqwest::blocking::Client;
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

pub const SESSION_KEY: &str = "classassist.authSession";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("network error: {0}")]
    Transport(String),

    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected auth response: {0}")]
    Decode(String),

    #[error("{0}")]
    Invalid(&'static str),
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Transport(_) => "auth_unreachable",
            AuthError::Rejected { .. } => "auth_failed",
            AuthError::Decode(_) => "auth_bad_response",
            AuthError::Invalid(_) => "bad_params",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    SignedIn(AuthSession),
    /// Account created; the service wants the e-mail confirmed before sign-in.
    ConfirmationRequired,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

// Used when the service omits both expiry fields.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

impl TokenResponse {
    fn into_session(self, now_unix: i64) -> AuthSession {
        let expires_at = self.expires_at.unwrap_or_else(|| {
            now_unix + self.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)
        });
        AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

fn now_unix() -> i64 {
    Utc::now().timestamp()
}

fn validate_credentials(email: &str, password: &str) -> Result<(), AuthError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AuthError::Invalid("Please fill in email and password."));
    }
    Ok(())
}

pub struct AuthClient {
    config: BackendConfig,
    http: Client,
    session: Mutex<Option<AuthSession>>,
    listeners: AuthListeners,
    storage: Mutex<Option<Connection>>,
}

impl AuthClient {
    pub fn new(config: BackendConfig, http: Client) -> Self {
        Self {
            config,
            http,
            session: Mutex::new(None),
            listeners: AuthListeners::new(),
            storage: Mutex::new(None),
        }
    }

    /// Persists the session in `conn` from now on. A live session moves
    /// there from the previously attached workspace; otherwise any session
    /// stored in `conn` is resumed. Unreadable stored sessions are dropped.
    pub fn attach_storage(&self, conn: Connection) {
        let stored = match db::settings_get_json(&conn, SESSION_KEY) {
            Ok(Some(v)) => match serde_json::from_value::<AuthSession>(v) {
                Ok(s) => Some(s),
                Err(e) => {
                    tracing::warn!(error = %e, "discarding unreadable stored session");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "stored session unavailable");
                None
            }
        };

        // The session lives in one workspace at a time: the one attached last.
        if let Some(previous) = self.lock_storage().replace(conn) {
            if let Err(e) = db::settings_delete(&previous, SESSION_KEY) {
                tracing::warn!(error = %e, "failed to clear session from previous workspace");
            }
        }

        let live = self.lock_session().clone();
        match (live, stored) {
            (Some(live), _) => self.persist(Some(&live)),
            (None, Some(session)) => {
                tracing::info!(user = %session.user.id, "resumed stored session");
                *self.lock_session() = Some(session.clone());
                self.listeners.notify(AuthEvent::SignedIn, Some(&session));
            }
            (None, None) => {}
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Access token for data requests, refreshed first when it has expired.
    /// `None` when signed out; callers then fall back to the anon key.
    pub fn access_token(&self) -> Result<Option<String>, AuthError> {
        Ok(self.current_session()?.map(|s| s.access_token))
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.lock_session().as_ref().map(|s| s.user.clone())
    }

    pub fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        validate_credentials(email, password)?;
        let body = self.post(
            "token?grant_type=password",
            None,
            &json!({ "email": email.trim(), "password": password }),
        )?;
        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| AuthError::Decode(e.to_string()))?;
        let session = token.into_session(now_unix());
        self.replace_session(Some(session.clone()), AuthEvent::SignedIn);
        Ok(session)
    }

    pub fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        validate_credentials(email, password)?;
        let body = self.post(
            "signup",
            None,
            &json!({ "email": email.trim(), "password": password }),
        )?;
        let value: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| AuthError::Decode(e.to_string()))?;
        if value.get("access_token").is_none() {
            return Ok(SignUpOutcome::ConfirmationRequired);
        }
        let token: TokenResponse =
            serde_json::from_value(value).map_err(|e| AuthError::Decode(e.to_string()))?;
        let session = token.into_session(now_unix());
        self.replace_session(Some(session.clone()), AuthEvent::SignedIn);
        Ok(SignUpOutcome::SignedIn(session))
    }

    fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        let body = self.post(
            "token?grant_type=refresh_token",
            None,
            &json!({ "refresh_token": refresh_token }),
        )?;
        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| AuthError::Decode(e.to_string()))?;
        Ok(token.into_session(now_unix()))
    }

    fn post(
        &self,
        path: &str,
        bearer: Option<&str>,
        payload: &serde_json::Value,
    ) -> Result<String, AuthError> {
        let url = self.config.auth_url(path);
        let bearer = bearer.unwrap_or(&self.config.anon_key);
        tracing::debug!(%url, "auth request");
        let resp = self
            .http
            .post(&url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(bearer)
            .json(payload)
            .send()
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        let (status, body) =
            http::read_response(resp).map_err(|e| AuthError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message: http::error_message(status, &body),
            });
        }
        Ok(body)
    }

    fn replace_session(&self, session: Option<AuthSession>, event: AuthEvent) {
        *self.lock_session() = session.clone();
        self.persist(session.as_ref());
        self.listeners.notify(event, session.as_ref());
    }

    fn persist(&self, session: Option<&AuthSession>) {
        let storage = self.lock_storage();
        let Some(conn) = storage.as_ref() else {
            return;
        };
        let result = match session {
            Some(s) => serde_json::to_value(s)
                .map_err(anyhow::Error::from)
                .and_then(|v| db::settings_set_json(conn, SESSION_KEY, &v)),
            None => db::settings_delete(conn, SESSION_KEY),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to persist auth session");
        }
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<AuthSession>> {
        self.session.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn lock_storage(&self) -> MutexGuard<'_, Option<Connection>> {
        self.storage.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl AuthService for AuthClient {
    fn current_session(&self) -> Result<Option<AuthSession>, AuthError> {
        let Some(session) = self.lock_session().clone() else {
            return Ok(None);
        };
        if !session.is_expired(now_unix()) {
            return Ok(Some(session));
        }

        match self.refresh(&session.refresh_token) {
            Ok(fresh) => {
                self.replace_session(Some(fresh.clone()), AuthEvent::TokenRefreshed);
                Ok(Some(fresh))
            }
            // Offline: keep the session so it can be refreshed later.
            Err(e @ AuthError::Transport(_)) => Err(e),
            Err(e) => {
                tracing::info!(error = %e, "session refresh rejected, signing out");
                self.replace_session(None, AuthEvent::SignedOut);
                Ok(None)
            }
        }
    }

    fn subscribe(&self, listener: AuthListener) -> Subscription {
        self.listeners.subscribe(listener)
    }

    fn sign_out(&self) -> Result<(), AuthError> {
        let token = self.lock_session().as_ref().map(|s| s.access_token.clone());
        if let Some(token) = token {
            if let Err(e) = self.post("logout", Some(&token), &json!({})) {
                tracing::warn!(error = %e, "logout call failed, clearing local session anyway");
            }
        }
        self.replace_session(None, AuthEvent::SignedOut);
        Ok(())
    }
}
