use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{Form, Query, Request, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    serve, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use minijinja::{path_loader, Environment};
use minijinja_autoreload::AutoReloader;
use serde::Deserialize;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tokio::sync::Mutex;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::chart::{format_amount, BarChart};
use crate::constants::SESSION_COOKIE;
use crate::gemini::GeminiClient;
use crate::nutrient::Nutrient;
use crate::session::{Analysis, Session, SessionError, SessionStore};

/// Everything the web front end needs to start.
#[derive(Debug, Clone)]
pub struct WebConfig {
    pub port: u16,
    pub templates_dir: PathBuf,
    pub static_dir: PathBuf,
    /// Credential handed to every new browser session, if configured.
    pub api_key: Option<String>,
}

// Shared application state
#[derive(Clone)]
pub struct AppState {
    templates: Arc<AutoReloader>,
    sessions: Arc<SessionStore>,
    client: GeminiClient,
}

impl AppState {
    pub fn new(templates_dir: PathBuf, client: GeminiClient, api_key: Option<String>) -> Self {
        Self {
            templates: Arc::new(create_minijinja_env(templates_dir)),
            sessions: Arc::new(SessionStore::new(api_key)),
            client,
        }
    }
}

// Minijinja Environment setup
fn create_minijinja_env(templates_dir: PathBuf) -> AutoReloader {
    AutoReloader::new(move |notifier| {
        let mut env = Environment::new();
        env.set_loader(path_loader(&templates_dir));
        env.add_filter("amount", |value: f64| format_amount(value));
        notifier.watch_path(&templates_dir, true);
        Ok(env)
    })
}

#[derive(Debug, Deserialize)]
struct CredentialForm {
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct AnalyzeForm {
    dish: String,
}

#[derive(Debug, Default, Deserialize)]
struct PageQuery {
    added: Option<String>,
}

/// What the page shows besides the session's own state.
#[derive(Default)]
struct PageExtras<'a> {
    dish: Option<&'a str>,
    error: Option<String>,
    notice: Option<&'static str>,
}

struct PageError(String);

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(format!("Internal Server Error: {}", self.0)),
        )
            .into_response()
    }
}

fn session_id(jar: &CookieJar) -> Option<Uuid> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

async fn load_session(state: &AppState, jar: CookieJar) -> (CookieJar, Arc<Mutex<Session>>) {
    let (id, session) = state.sessions.get_or_create(session_id(&jar)).await;
    let cookie = Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true);
    (jar.add(cookie), session)
}

fn render_page(state: &AppState, session: &Session, extras: PageExtras<'_>) -> Result<Html<String>, PageError> {
    let summary = session.summary();
    let pending: Option<&Analysis> = session.pending();
    let nutrients: Vec<_> = Nutrient::ALL
        .iter()
        .map(|n| minijinja::context! { label => n.label(), unit => n.unit() })
        .collect();

    state
        .templates
        .acquire_env()
        .and_then(|env| {
            env.get_template("index.html").and_then(|tmpl| {
                let context = minijinja::context! {
                    title => "AI栄養解析＆献立提案アプリ",
                    has_credential => session.has_credential(),
                    dish => extras.dish.or(pending.map(|a| a.dish.as_str())),
                    analysis => pending,
                    can_add => pending.map(Analysis::can_be_added).unwrap_or(false),
                    error => extras.error,
                    notice => extras.notice,
                    nutrients => nutrients,
                    history => summary.history,
                    target => summary.target,
                    totals_chart => BarChart::totals(&summary.totals),
                    target_chart => BarChart::against_target(&summary.comparison),
                };
                tmpl.render(context)
            })
        })
        .map(Html)
        .map_err(|e| {
            error!("Failed to get or render template: {}", e);
            PageError(e.to_string())
        })
}

async fn index_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, PageError> {
    let (jar, session) = load_session(&state, jar).await;
    let session = session.lock().await;
    let extras = PageExtras {
        notice: query.added.map(|_| "食事履歴に追加しました！"),
        ..Default::default()
    };
    let page = render_page(&state, &session, extras)?;
    Ok((jar, page))
}

async fn credential_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CredentialForm>,
) -> impl IntoResponse {
    let (jar, session) = load_session(&state, jar).await;
    if !session.lock().await.set_credential(form.api_key) {
        warn!("Blank API key submitted");
    }
    (jar, Redirect::to("/"))
}

async fn analyze_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<AnalyzeForm>,
) -> Result<Response, PageError> {
    let (jar, session) = load_session(&state, jar).await;
    let mut session = session.lock().await;

    let (status, error) = match session.analyze(&state.client, &form.dish).await {
        Ok(analysis) => {
            info!(dish = %analysis.dish, values = analysis.reading.len(), "Dish analysed");
            (StatusCode::OK, None)
        }
        Err(SessionError::AnalysisUnavailable(e)) => {
            error!("Analysis failed: {}", e);
            (StatusCode::BAD_GATEWAY, Some(format!("AIによる解析に失敗しました: {}", e)))
        }
        Err(e) => (StatusCode::BAD_REQUEST, Some(e.to_string())),
    };

    let extras = PageExtras {
        dish: Some(form.dish.trim()),
        error,
        notice: None,
    };
    let page = render_page(&state, &session, extras)?;
    Ok((status, jar, page).into_response())
}

async fn add_history_handler(State(state): State<AppState>, jar: CookieJar) -> Result<Response, PageError> {
    let (jar, session) = load_session(&state, jar).await;
    let mut session = session.lock().await;

    match session.confirm_pending() {
        Ok(_) => Ok((jar, Redirect::to("/?added=1")).into_response()),
        Err(e) => {
            warn!("Could not add to history: {}", e);
            let extras = PageExtras {
                error: Some(e.to_string()),
                ..Default::default()
            };
            let page = render_page(&state, &session, extras)?;
            Ok((StatusCode::CONFLICT, jar, page).into_response())
        }
    }
}

async fn summary_handler(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let (jar, session) = load_session(&state, jar).await;
    let summary = session.lock().await.summary();
    (jar, Json(summary))
}

async fn not_found(_req: Request) -> Result<Response, std::convert::Infallible> {
    Ok((StatusCode::NOT_FOUND, Body::from("Not Found")).into_response())
}

/// Builds the application router. Static files are served from `static_dir`.
pub fn router(state: AppState, static_dir: PathBuf) -> Router {
    let static_files_service =
        ServeDir::new(static_dir).not_found_service(tower::service_fn(not_found));

    Router::new()
        .route("/", get(index_handler))
        .route("/credential", post(credential_handler))
        .route("/analyze", post(analyze_handler))
        .route("/history", post(add_history_handler))
        .route("/api/summary", get(summary_handler))
        .nest_service("/static", static_files_service)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn start_web_server(config: WebConfig, client: GeminiClient) -> Result<()> {
    if config.api_key.is_none() {
        info!("No API key configured; each session will be asked for one");
    }
    let state = AppState::new(config.templates_dir, client, config.api_key);
    let app = router(state, config.static_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Web server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to address {}", addr))?;

    serve(listener, app.into_make_service())
        .await
        .context("Web server failed")?;

    Ok(())
}
