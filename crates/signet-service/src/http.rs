use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::accounts::{
    AccountService, Outcome, ProfileUpdate, RegisterOutcome, ServiceError, TokenOutcome,
    UpdateOutcome, UserView,
};
use crate::identity::IdentityResolver;

#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub identity: IdentityResolver,
}

/// System faults only. Expected mutation failures are `success: false`
/// outcomes with HTTP 200; this is everything else.
pub struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "request failed");
        let body = serde_json::json!({
            "success": false,
            "error": {
                "code": "internal_error",
                "message": "Internal server error"
            }
        });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Raw Authorization header, captured without touching the store. Identity
/// resolution happens only in handlers that actually need it.
pub struct AuthHeader(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for AuthHeader
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(AuthHeader(
            parts
                .headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned),
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateRequest {
    pub activation_token: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetConfirmRequest {
    pub email: String,
    pub password: String,
    pub password_repeat: String,
    pub password_reset_token: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct ViewerResponse {
    viewer: Option<UserView>,
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "ok": true,
        "service": "signet",
    }))
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<RegisterOutcome>, ApiError> {
    let outcome = state
        .accounts
        .register(&body.email, &body.password, &body.name)
        .await?;
    Ok(Json(outcome))
}

async fn activate(
    State(state): State<AppState>,
    Json(body): Json<ActivateRequest>,
) -> Result<Json<Outcome>, ApiError> {
    Ok(Json(state.accounts.activate(&body.activation_token).await?))
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenOutcome>, ApiError> {
    Ok(Json(state.accounts.login(&body.email, &body.password).await?))
}

async fn logout(State(state): State<AppState>) -> Json<Outcome> {
    Json(state.accounts.logout())
}

async fn refresh_token(
    State(state): State<AppState>,
    Json(body): Json<RefreshTokenRequest>,
) -> Result<Json<TokenOutcome>, ApiError> {
    Ok(Json(state.accounts.refresh_token(&body.token).await?))
}

async fn password_reset(
    State(state): State<AppState>,
    Json(body): Json<PasswordResetRequest>,
) -> Result<Json<Outcome>, ApiError> {
    Ok(Json(state.accounts.password_reset(&body.email).await?))
}

async fn password_reset_confirm(
    State(state): State<AppState>,
    Json(body): Json<PasswordResetConfirmRequest>,
) -> Result<Json<Outcome>, ApiError> {
    let outcome = state
        .accounts
        .password_reset_confirm(
            &body.email,
            &body.password,
            &body.password_repeat,
            &body.password_reset_token,
        )
        .await?;
    Ok(Json(outcome))
}

async fn update(
    State(state): State<AppState>,
    AuthHeader(auth): AuthHeader,
    Json(body): Json<UpdateRequest>,
) -> Result<Json<UpdateOutcome>, ApiError> {
    let identity = state.identity.resolve(auth.as_deref()).await;
    let outcome = state
        .accounts
        .update(
            &identity,
            ProfileUpdate {
                first_name: body.first_name,
                last_name: body.last_name,
            },
        )
        .await?;
    Ok(Json(outcome))
}

async fn viewer(State(state): State<AppState>, AuthHeader(auth): AuthHeader) -> Json<ViewerResponse> {
    let identity = state.identity.resolve(auth.as_deref()).await;
    Json(ViewerResponse {
        viewer: identity.user().map(UserView::from),
    })
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/viewer", get(viewer))
        .route("/accounts/register", post(register))
        .route("/accounts/activate", post(activate))
        .route("/accounts/login", post(login))
        .route("/accounts/logout", post(logout))
        .route("/accounts/refresh-token", post(refresh_token))
        .route("/accounts/password-reset", post(password_reset))
        .route("/accounts/password-reset-confirm", post(password_reset_confirm))
        .route("/accounts/update", post(update))
        .with_state(state)
}
