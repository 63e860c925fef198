//! Session manager: login, registration, logout and session checks.
//!
//! One owned instance per client process; the pipeline and the route guard
//! receive it (or its token store) by reference, never through a global.

use crate::api::{ApiClient, ApiRequest};
use crate::error::ApiError;
use crate::session::store::TokenStore;
use crate::session::types::{Role, Session, UserProfile};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Registration payload. Professional-only fields are skipped for customers.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
}

/// `PUT /auth/profile` payload; only set fields are sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
}

/// Shape shared by `/auth/login`, `/auth/admin/login` and `/auth/register`.
#[derive(Debug, Deserialize)]
struct AuthPayload {
    access_token: String,
    refresh_token: String,
    user: UserProfile,
}

pub struct SessionManager {
    store: Arc<TokenStore>,
    client: ApiClient,
}

impl SessionManager {
    /// Wrap an already-initialized token store; the persisted session (if
    /// any) was restored when the store was opened.
    pub fn new(store: Arc<TokenStore>, client: ApiClient) -> Self {
        Self { store, client }
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.store.get()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ApiError> {
        self.authenticate("/auth/login", &LoginRequest { email, password })
            .await
    }

    /// Admin sign-in uses a dedicated endpoint with extra server-side checks.
    pub async fn admin_login(&self, email: &str, password: &str) -> Result<UserProfile, ApiError> {
        self.authenticate("/auth/admin/login", &LoginRequest { email, password })
            .await
    }

    pub async fn register(&self, new_user: &NewUser) -> Result<UserProfile, ApiError> {
        self.authenticate("/auth/register", new_user).await
    }

    async fn authenticate<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<UserProfile, ApiError> {
        let body = serde_json::to_value(body)
            .map_err(|e| ApiError::Unknown(format!("failed to encode request: {}", e)))?;
        let payload: AuthPayload = self.client.post_json(path, body).await?;

        let session = Session {
            access_token: Some(payload.access_token),
            refresh_token: Some(payload.refresh_token),
            user: Some(payload.user.clone()),
        };
        self.store
            .set(session)
            .map_err(|e| ApiError::Unknown(format!("failed to persist session: {:#}", e)))?;

        tracing::info!("signed in as {} ({:?})", payload.user.email, payload.user.role);
        Ok(payload.user)
    }

    /// Validate the stored credential and refresh the stored profile.
    ///
    /// With a still-valid credential this is idempotent: the same snapshot
    /// comes back and no renewal is triggered. Without a stored token it
    /// short-circuits to a logged-out session without touching the network.
    /// Any failure to fetch the profile destroys the local session; a stored
    /// credential the server will not vouch for is not kept around.
    pub async fn check_session(&self) -> Result<Session, ApiError> {
        if self.store.get().access_token.is_none() {
            return Ok(Session::default());
        }

        match self.client.get_json::<UserProfile>("/auth/profile").await {
            Ok(user) => {
                let mut session = self.store.get();
                session.user = Some(user);
                if let Err(e) = self.store.set(session.clone()) {
                    tracing::warn!("failed to persist session: {:#}", e);
                }
                Ok(session)
            }
            // The coordinator already forced the logout; report logged-out.
            Err(ApiError::AuthInvalid) => Ok(Session::default()),
            Err(error) => {
                self.teardown();
                Err(error)
            }
        }
    }

    /// Update the signed-in user's profile, then re-sync the stored copy.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Session, ApiError> {
        let body = serde_json::to_value(update)
            .map_err(|e| ApiError::Unknown(format!("failed to encode request: {}", e)))?;
        self.client
            .execute(ApiRequest::put("/auth/profile", body))
            .await?;
        self.check_session().await
    }

    /// Sign out. The server call is best-effort; local state is destroyed
    /// either way.
    pub async fn logout(&self) {
        if self.store.get().access_token.is_some() {
            if let Err(e) = self.client.execute(ApiRequest::get("/auth/logout")).await {
                tracing::debug!("logout call failed: {}", e);
            }
        }
        self.teardown();
    }

    /// Destroy the local session without contacting the server.
    pub fn teardown(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!("failed to clear session storage: {:#}", e);
        }
    }
}
