use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::header,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::{services::ServeDir, trace::TraceLayer};
use weather_core::{
    BackgroundImage, Config, CredentialVerifier, ForecastDay, HistoryEntry, ImageProvider, Locked,
    WeatherProvider, WeatherSnapshot,
    provider::{image_provider_from_config, weather_provider_from_config},
};

use crate::{
    pages,
    response::{ApiError, ApiResponse},
    session::{
        Authenticated, MemorySessionStore, PageSession, SessionContext, SessionStore,
        expired_session_cookie, session_cookie,
    },
};

/// Descriptor used when the browser asks for a background without a weather description.
const DEFAULT_BACKGROUND_DESCRIPTOR: &str = "cityscape";

#[derive(Clone)]
pub struct AppState {
    pub weather: Arc<dyn WeatherProvider>,
    pub images: Arc<dyn ImageProvider>,
    pub credentials: Arc<dyn CredentialVerifier>,
    pub sessions: Arc<dyn SessionStore>,
    pub history_limit: usize,
    pub session_max_age: Duration,
    pub pages_dir: PathBuf,
}

impl AppState {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        for id in config.missing_api_keys() {
            tracing::error!(
                provider = %id,
                env = id.api_key_env(),
                "API key is not configured; requests to this provider will fail"
            );
        }

        let credentials: Arc<dyn CredentialVerifier> = match config.credential() {
            Ok(Some(cred)) => {
                tracing::info!(username = cred.username(), "Login configured");
                Arc::new(cred)
            }
            Ok(None) => {
                tracing::error!("No login configured; every login attempt will be rejected");
                Arc::new(Locked)
            }
            Err(e) => {
                tracing::error!(error = %format!("{e:#}"), "Login configuration is invalid; every login attempt will be rejected");
                Arc::new(Locked)
            }
        };

        Ok(Self {
            weather: Arc::from(weather_provider_from_config(config)?),
            images: Arc::from(image_provider_from_config(config)?),
            credentials,
            sessions: Arc::new(MemorySessionStore::new(config.session_max_age())),
            history_limit: config.history_limit(),
            session_max_age: config.session_max_age(),
            pages_dir: config.server.pages_dir.clone(),
        })
    }
}

pub fn router(state: AppState, static_dir: PathBuf) -> Router {
    Router::new()
        .route("/", get(login_page))
        .route("/index", get(index_page))
        .route("/history", get(history_page))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/api/weather/:city", get(weather))
        .route("/api/forecast/:city", get(forecast))
        .route("/api/background/:city", get(background_for_city))
        .route("/api/background/:city/:description", get(background))
        .route("/api/search-history", get(list_history).post(save_history))
        .route("/api/clear-history", post(clear_history))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: &Config) -> anyhow::Result<()> {
    let state = AppState::from_config(config)?;
    let app = router(state, config.server.static_dir.clone());

    let address = config.server.address;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;

    tracing::info!(%address, "Weather app listening");
    axum::serve(listener, app).await.context("HTTP server failed")
}

async fn login_page(State(state): State<AppState>, ctx: SessionContext) -> Response {
    if ctx.is_logged_in() {
        return Redirect::to("/index").into_response();
    }
    pages::render(&state.pages_dir, "login").await.into_response()
}

async fn index_page(State(state): State<AppState>, _page: PageSession) -> Html<String> {
    pages::render(&state.pages_dir, "index").await
}

async fn history_page(State(state): State<AppState>, _page: PageSession) -> Html<String> {
    pages::render(&state.pages_dir, "history").await
}

#[derive(Debug, Default, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

async fn login(
    State(state): State<AppState>,
    mut ctx: SessionContext,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = body.unwrap_or_default();

    if !state.credentials.verify(&req.username, &req.password) {
        tracing::info!(username = %req.username, "Rejected login");
        return Err(ApiError::InvalidCredentials);
    }

    let id = ctx.login(&req.username);
    tracing::info!(username = %req.username, "Logged in");

    Ok(([(header::SET_COOKIE, session_cookie(&id, state.session_max_age))], ApiResponse::ok()).into_response())
}

async fn logout(mut ctx: SessionContext) -> Response {
    ctx.logout();
    ([(header::SET_COOKIE, expired_session_cookie())], Redirect::to("/")).into_response()
}

async fn weather(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(city): Path<String>,
) -> Result<ApiResponse<WeatherSnapshot>, ApiError> {
    let snapshot = state.weather.fetch_current(city.trim()).await?;
    Ok(ApiResponse::data(snapshot))
}

async fn forecast(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(city): Path<String>,
) -> Result<ApiResponse<Vec<ForecastDay>>, ApiError> {
    let days = state.weather.fetch_forecast(city.trim()).await?;
    Ok(ApiResponse::data(days))
}

async fn background(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path((city, description)): Path<(String, String)>,
) -> Result<ApiResponse<BackgroundImage>, ApiError> {
    let image = state
        .images
        .fetch_background(city.trim(), description.trim())
        .await?;
    Ok(ApiResponse::data(image))
}

async fn background_for_city(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(city): Path<String>,
) -> Result<ApiResponse<BackgroundImage>, ApiError> {
    let image = state
        .images
        .fetch_background(city.trim(), DEFAULT_BACKGROUND_DESCRIPTOR)
        .await?;
    Ok(ApiResponse::data(image))
}

async fn list_history(Authenticated(ctx): Authenticated) -> ApiResponse<Vec<HistoryEntry>> {
    ApiResponse::data(ctx.session().search_history.list().to_vec())
}

#[derive(Debug, Deserialize)]
struct SaveHistoryRequest {
    city: Option<String>,
}

async fn save_history(
    State(state): State<AppState>,
    Authenticated(mut ctx): Authenticated,
    body: Result<Json<SaveHistoryRequest>, JsonRejection>,
) -> Result<ApiResponse, ApiError> {
    let city = body
        .map_err(|e| ApiError::InvalidInput(e.body_text()))?
        .0
        .city
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::InvalidInput("missing city".to_string()))?;

    let now = chrono::Local::now().naive_local();
    ctx.update(|session| session.search_history.record(&city, now, state.history_limit));

    Ok(ApiResponse::message("Search saved"))
}

async fn clear_history(Authenticated(mut ctx): Authenticated) -> ApiResponse {
    ctx.update(|session| session.search_history.clear());
    ApiResponse::message("History cleared")
}
