// src/api.rs
//! HTTP surface: `/token`, the seven `/data/*` routes and `/health`.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::auth::{require_token, AuthUser, TokenIssuer, UserTable};
use crate::config::ApiConfig;
use crate::datasets::{Dataset, DatasetClient};
use crate::fetch::{FetchError, HttpFetcher, TextFetcher};

/// Shared, immutable state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<TokenIssuer>,
    pub users: Arc<UserTable>,
    pub datasets: DatasetClient,
}

impl AppState {
    /// Build state around an arbitrary fetcher (tests use stubs).
    pub fn new(cfg: &ApiConfig, fetcher: Arc<dyn TextFetcher>) -> Self {
        Self {
            issuer: Arc::new(TokenIssuer::new(cfg.jwt_secret.as_bytes(), cfg.token_ttl)),
            users: Arc::new(UserTable::from_pairs(cfg.users.iter().cloned())),
            datasets: DatasetClient::new(fetcher, cfg.base_url.clone()),
        }
    }

    /// Production state: real HTTP fetcher with the configured timeout.
    pub fn from_config(cfg: &ApiConfig) -> anyhow::Result<Self> {
        let fetcher = HttpFetcher::new(cfg.fetch_timeout)?;
        Ok(Self::new(cfg, Arc::new(fetcher)))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Upstream(#[from] FetchError),

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Upstream(FetchError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Upstream(FetchError::Unavailable(_) | FetchError::Status { .. }) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::Upstream(FetchError::Decode(_)) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Client-facing message; underlying error details stay in the logs.
    fn detail(&self) -> String {
        match self {
            ApiError::Validation(msg) => msg.clone(),
            ApiError::InvalidCredentials => self.to_string(),
            ApiError::Upstream(FetchError::Timeout(_)) => "Upstream site timed out".to_string(),
            ApiError::Upstream(FetchError::Unavailable(_)) => {
                "Upstream site unavailable".to_string()
            }
            ApiError::Upstream(FetchError::Status { status, .. }) => {
                format!("Upstream site returned HTTP {status}")
            }
            ApiError::Upstream(FetchError::Decode(_)) => {
                "Upstream page could not be decoded".to_string()
            }
            ApiError::Internal(_) => self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            match &self {
                ApiError::Internal(cause) => tracing::error!(%status, %cause, "request failed"),
                other => tracing::error!(%status, error = %other, "request failed"),
            }
        }
        let body = Json(ErrorBody {
            detail: self.detail(),
        });
        (status, body).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DataResponse {
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

pub fn create_router(state: AppState) -> Router {
    let mut data = Router::new();
    for ds in Dataset::ALL {
        data = data.route(
            &format!("/data/{}", ds.slug()),
            get(move |st: State<AppState>, user: AuthUser| serve_dataset(st, user, ds)),
        );
    }
    let data = data.route_layer(middleware::from_fn_with_state(
        state.issuer.clone(),
        require_token,
    ));

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/token", post(issue_token))
        .merge(data)
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn issue_token(
    State(state): State<AppState>,
    Form(form): Form<TokenForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let username = form.username.trim();
    if username.is_empty() {
        return Err(ApiError::Validation("username must not be empty".into()));
    }
    if !state.users.check(username, &form.password) {
        tracing::warn!(%username, "token request with bad credentials");
        counter!("auth_rejections_total", "reason" => "credentials").increment(1);
        return Err(ApiError::InvalidCredentials);
    }

    let token = state
        .issuer
        .issue(username, None)
        .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))?;

    counter!("tokens_issued_total").increment(1);
    tracing::info!(%username, ttl_secs = state.issuer.default_ttl().num_seconds(), "token issued");

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
    }))
}

async fn serve_dataset(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    dataset: Dataset,
) -> Result<Json<DataResponse>, ApiError> {
    tracing::info!(%dataset, sub = %claims.sub, "dataset requested");
    let data = state.datasets.fetch(dataset).await?;
    Ok(Json(DataResponse { data }))
}
