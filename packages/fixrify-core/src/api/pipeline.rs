//! Request pipeline: every outbound call passes through two explicit stages.
//!
//! 1. Request stage `attach_bearer`: pure, attaches the current access
//!    credential; never suspends.
//! 2. Response stage `classify`: pure, maps the raw response to a success
//!    or one of the error taxonomy variants.
//!
//! A 401 (`AuthExpired`) is handed to the refresh coordinator; the original
//! caller sees one suspended operation that settles with the replayed
//! response or `AuthInvalid`. Each request is replayed at most once: a 401 on
//! the replay is terminal and never re-enters the coordinator.

use crate::api::refresh::{RefreshCoordinator, RefreshOutcome};
use crate::api::transport::{ApiRequest, ApiResponse, Transport};
use crate::error::{ApiError, EventSink, GENERIC_ERROR_MESSAGE};
use crate::session::{Session, TokenStore};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Request stage: attach the access credential as a bearer token, if present.
fn attach_bearer(mut request: ApiRequest, session: &Session) -> ApiRequest {
    if request.bearer.is_none() {
        request.bearer = session.access_token.clone();
    }
    request
}

/// Best-effort extraction of a user-facing message from an error body.
/// The backend emits `{"error": ...}`; older endpoints use `{"message": ...}`.
fn extract_message(response: &ApiResponse) -> String {
    if let Ok(value) = response.json::<serde_json::Value>() {
        for key in ["message", "error"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    GENERIC_ERROR_MESSAGE.to_string()
}

/// Response stage: classify the outcome. 2xx passes through; 401 becomes
/// `AuthExpired` (recovery candidate); other 4xx become `Validation`;
/// everything else is `Unknown`.
fn classify(response: ApiResponse) -> Result<ApiResponse, ApiError> {
    match response.status {
        status if (200..300).contains(&status) => Ok(response),
        401 => Err(ApiError::AuthExpired),
        status if (400..500).contains(&status) => Err(ApiError::Validation {
            status,
            message: extract_message(&response),
        }),
        _ => Err(ApiError::Unknown(extract_message(&response))),
    }
}

/// The client-side request pipeline.
///
/// Cheap to clone; all state is shared. The session is read here and written
/// only by the session manager and the refresh coordinator.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    store: Arc<TokenStore>,
    refresher: Arc<RefreshCoordinator>,
    events: Arc<dyn EventSink>,
}

impl ApiClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<TokenStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let refresher = Arc::new(RefreshCoordinator::new(store.clone(), events.clone()));
        Self {
            transport,
            store,
            refresher,
            events,
        }
    }

    /// Run a request through the pipeline.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let prepared = attach_bearer(request.clone(), &self.store.get());
        let response = self
            .transport
            .send(&prepared)
            .await
            .map_err(|e| self.surface(ApiError::Network(e.0)))?;

        match classify(response) {
            Ok(response) => Ok(response),
            Err(ApiError::AuthExpired) => self.recover_and_replay(request).await,
            Err(error) => Err(self.surface(error)),
        }
    }

    /// 401 path: share the single-flight renewal, then replay once.
    async fn recover_and_replay(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        match self.refresher.renew(self.transport.as_ref()).await {
            RefreshOutcome::Renewed { access_token } => {
                let replay = request.with_bearer(access_token);
                let response = self
                    .transport
                    .send(&replay)
                    .await
                    .map_err(|e| self.surface(ApiError::Network(e.0)))?;
                match classify(response) {
                    Ok(response) => Ok(response),
                    // A renewed credential that still yields 401 would loop
                    // forever through the coordinator; the session is beyond
                    // recovery, so destroy it and stop here.
                    Err(ApiError::AuthExpired) => {
                        self.refresher.force_logout();
                        Err(self.surface(ApiError::AuthInvalid))
                    }
                    Err(error) => Err(self.surface(error)),
                }
            }
            RefreshOutcome::Failed => Err(self.surface(ApiError::AuthInvalid)),
        }
    }

    /// Forward a surfaced failure to the error sink before propagating.
    fn surface(&self, error: ApiError) -> ApiError {
        self.events.error(&error.to_string());
        error
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.execute(ApiRequest::get(path)).await?;
        decode(response)
    }

    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, ApiError> {
        let response = self.execute(ApiRequest::post(path, body)).await?;
        decode(response)
    }

    pub async fn put_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, ApiError> {
        let response = self.execute(ApiRequest::put(path, body)).await?;
        decode(response)
    }
}

fn decode<T: DeserializeOwned>(response: ApiResponse) -> Result<T, ApiError> {
    response
        .json()
        .map_err(|e| ApiError::Unknown(format!("malformed response body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> ApiResponse {
        ApiResponse {
            status,
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_classify_success_passes_through() {
        let resp = classify(response(200, "{}")).unwrap();
        assert_eq!(resp.status, 200);
        assert!(classify(response(204, "")).is_ok());
    }

    #[test]
    fn test_classify_401_is_expired() {
        assert_eq!(classify(response(401, "{}")).unwrap_err(), ApiError::AuthExpired);
    }

    #[test]
    fn test_classify_4xx_is_validation_with_message() {
        let err = classify(response(400, r#"{"error":"Email already registered"}"#)).unwrap_err();
        assert_eq!(
            err,
            ApiError::Validation {
                status: 400,
                message: "Email already registered".into()
            }
        );
    }

    #[test]
    fn test_message_extraction_fallbacks() {
        // `message` preferred over `error`
        let resp = response(403, r#"{"message":"Nope","error":"other"}"#);
        assert_eq!(extract_message(&resp), "Nope");
        // `error` used when `message` absent
        let resp = response(403, r#"{"error":"Unauthorized"}"#);
        assert_eq!(extract_message(&resp), "Unauthorized");
        // generic fallback for unstructured bodies
        let resp = response(500, "<html>boom</html>");
        assert_eq!(extract_message(&resp), GENERIC_ERROR_MESSAGE);
        assert!(matches!(
            classify(resp).unwrap_err(),
            ApiError::Unknown(msg) if msg == GENERIC_ERROR_MESSAGE
        ));
    }

    #[test]
    fn test_attach_bearer_uses_session_token() {
        let session = Session {
            access_token: Some("tok-1".into()),
            ..Session::default()
        };
        let prepared = attach_bearer(ApiRequest::get("/x"), &session);
        assert_eq!(prepared.bearer.as_deref(), Some("tok-1"));

        // An explicit bearer (the refresh credential) is never overwritten.
        let prepared = attach_bearer(ApiRequest::get("/x").with_bearer("explicit"), &session);
        assert_eq!(prepared.bearer.as_deref(), Some("explicit"));

        // No token, no header.
        let prepared = attach_bearer(ApiRequest::get("/x"), &Session::default());
        assert!(prepared.bearer.is_none());
    }
}
