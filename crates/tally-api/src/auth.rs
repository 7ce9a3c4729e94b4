use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Duration;
use tracing::error;

use tally_auth::{
    AccessMediator, Clock, CredentialStore, PasswordScheme, SessionManager, SessionStatus,
};
use tally_db::Database;
use tally_types::api::{
    LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, SessionStatusResponse,
};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::BearerToken;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub credentials: Arc<CredentialStore>,
    pub sessions: Arc<SessionManager>,
    pub mediator: AccessMediator,
}

impl AppStateInner {
    /// Wire the auth layer over one database. The same store backs users and
    /// expenses; the mediator is the only holder of the expense side.
    pub fn new(
        db: Arc<Database>,
        clock: Arc<dyn Clock>,
        session_timeout: Duration,
        scheme: PasswordScheme,
    ) -> Self {
        let credentials = Arc::new(CredentialStore::new(db.clone(), clock.clone(), scheme));
        let sessions = Arc::new(SessionManager::new(
            db.clone(),
            credentials.clone(),
            clock.clone(),
            session_timeout,
        ));
        let mediator = AccessMediator::new(sessions.clone(), db, clock);

        Self { credentials, sessions, mediator }
    }
}

/// Run store-bound work off the async runtime.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal
    })?
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = blocking(move || {
        Ok(state.credentials.register(&req.username, &req.email, &req.password)?)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id })))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = blocking(move || Ok(state.sessions.login(&req.identifier, &req.password)?)).await?;

    Ok(Json(LoginResponse {
        user_id: session.user_id,
        token: session.token,
        expires_at: session.expires_at,
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(move || Ok(state.sessions.logout(&token)?)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn session_status(
    State(state): State<AppState>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> Result<impl IntoResponse, ApiError> {
    let status = blocking(move || Ok(state.sessions.check_status(&token)?)).await?;

    let remaining_seconds = match &status {
        SessionStatus::Active { remaining, .. } => Some(remaining.num_seconds()),
        _ => None,
    };

    Ok(Json(SessionStatusResponse {
        status: status.label(),
        message: status.to_string(),
        expires_at: status.expires_at(),
        remaining_seconds,
    }))
}
