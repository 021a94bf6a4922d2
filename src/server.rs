//!
//! reportnav HTTP server
//! ---------------------
//! Axum router and handlers for browsing safety reports by topic.
//!
//! Responsibilities:
//! - Login/logout backed by the static account table and the session registry.
//! - Topic upload, listing and step-by-step browsing of one topic at a time.
//! - Direct report lookup by id.
//!
//! Every page except `/login` goes through `gate::Authenticated`; handlers then
//! work on the caller's `SessionHandle` and decide where navigation failures
//! redirect to.

use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Form, Multipart, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use minijinja::context;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::identity::{gen_id, AuthProvider, SessionRegistry, StaticAuthProvider, TokenSigner};
use crate::navigation::{CursorView, NavError, NavResult, Topics};
use crate::storage::{sorted_fields, DirReportStore, ReportStore};

pub mod gate;
pub mod views;

use gate::Authenticated;
use views::{NavContext, Views};

type PageResult = Result<Response, Response>;

/// Shared server state injected into all handlers.
///
/// Built once at start; the registry is the only mutable part and carries its
/// own per-identity locking.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub registry: Arc<SessionRegistry>,
    pub auth: Arc<dyn AuthProvider>,
    pub tokens: TokenSigner,
    pub reports: Arc<dyn ReportStore>,
    pub views: Arc<Views>,
}

impl AppState {
    pub fn new(config: ServerConfig, reports: Arc<dyn ReportStore>) -> anyhow::Result<Self> {
        let secret = if config.secret.is_empty() {
            warn!("no secret configured; using a random signing key for this run");
            gen_id().context("Failed to generate a signing key")?
        } else {
            config.secret.clone()
        };
        let auth = Arc::new(StaticAuthProvider::new(config.users.clone()));
        let views = Views::new().context("Failed to load page templates")?;
        Ok(Self {
            config: Arc::new(config),
            registry: Arc::new(SessionRegistry::new()),
            auth,
            tokens: TokenSigner::new(secret),
            reports,
            views: Arc::new(views),
        })
    }

    /// Swap the account check, e.g. for an external directory.
    pub fn with_auth_provider(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = auth;
        self
    }

    fn page<S: Serialize>(&self, name: &str, ctx: S) -> PageResult {
        match self.views.render(name, ctx) {
            Ok(html) => Ok(html.into_response()),
            Err(e) => Err(self.error_page(e)),
        }
    }

    /// Render `err` as an error page. Details are only shown in debug mode.
    fn error_page(&self, err: AppError) -> Response {
        let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(code = err.code_str(), "{}", err.message());
        } else {
            warn!(code = err.code_str(), "{}", err.message());
        }
        let ctx = if self.config.debug {
            context! { code => err.code_str(), message => err.message() }
        } else {
            context! {}
        };
        match self.views.render("error.html", ctx) {
            Ok(html) => (status, html).into_response(),
            Err(_) => (status, "request failed").into_response(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/login", get(login_form).post(login))
        .route("/logout", get(logout))
        .route("/upload", post(upload))
        .route("/navigate", get(navigate))
        .route("/report", get(report_by_query))
        .route("/report/{id}", get(report_by_path))
        .route("/reset", get(reset))
        .route("/topic", get(resume_topic))
        .route("/topic/{name}", get(topic))
        .route("/next_report", post(next_report))
        .route("/prev_report", post(prev_report))
        .fallback(no_route)
        .with_state(state)
}

/// Start the HTTP server with reports served from `config.reports_dir`.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let addr = config.bind_addr()?;
    info!(
        target: "startup",
        "reportnav starting: addr={}, reports_dir={:?}, accounts={}, debug={}",
        addr, config.reports_dir, config.users.len(), config.debug
    );
    if !config.reports_dir.is_dir() {
        warn!(target: "startup", "reports folder {:?} does not exist; every lookup will be not found", config.reports_dir);
    }
    if config.users.is_empty() {
        warn!(target: "startup", "no accounts configured; nobody can log in");
    }
    let reports = Arc::new(DirReportStore::new(&config.reports_dir));
    let state = AppState::new(config, reports)?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Where each navigation failure sends the user.
fn nav_redirect(err: &NavError) -> Response {
    let target = match err {
        NavError::NoTopics => "/",
        NavError::UnknownTopic(_) | NavError::NoActiveTopic | NavError::EmptyTopic(_) => "/navigate",
    };
    debug!(reason = %err, to = target, "navigation redirect");
    Redirect::to(target).into_response()
}

async fn home(State(state): State<AppState>, auth: Authenticated) -> PageResult {
    let topic_count = auth.session.with(|s| s.topic_count());
    state.page(
        "home.html",
        context! {
            user => auth.identity(),
            topic_count => topic_count,
            extensions => &state.config.allowed_extensions,
        },
    )
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login_form(State(state): State<AppState>, headers: HeaderMap) -> PageResult {
    if gate::authenticate(&state, &headers).is_ok() {
        return Ok(Redirect::to("/").into_response());
    }
    state.page("login.html", context! {})
}

async fn login(State(state): State<AppState>, headers: HeaderMap, Form(form): Form<LoginForm>) -> PageResult {
    if state.auth.verify(&form.username, &form.password) {
        let session = state
            .registry
            .login(&form.username)
            .map_err(|e| state.error_page(e.into()))?;
        let token = state
            .tokens
            .issue(session.identity(), session.session_id())
            .map_err(|e| state.error_page(e.into()))?;
        let cookie = gate::session_cookie(&token, state.config.secure_cookie)
            .map_err(|e| state.error_page(AppError::internal("cookie_error", e.to_string())))?;
        info!(user = %form.username, live = state.registry.live_count(), "login");
        return Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response());
    }
    warn!(user = %form.username, "login rejected");
    if gate::authenticate(&state, &headers).is_ok() {
        return Ok(Redirect::to("/").into_response());
    }
    let page = state.page("login.html", context! { error => "Invalid username/password" })?;
    Ok((StatusCode::UNAUTHORIZED, page).into_response())
}

async fn logout(State(state): State<AppState>, auth: Authenticated) -> Response {
    state.registry.logout(auth.identity());
    info!(user = %auth.identity(), "logout");
    ([(header::SET_COOKIE, gate::clear_session_cookie())], Redirect::to("/login")).into_response()
}

async fn upload(State(state): State<AppState>, auth: Authenticated, mut multipart: Multipart) -> PageResult {
    let mut file: Option<(String, axum::body::Bytes)> = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| state.error_page(e.into()))? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(|e| state.error_page(e.into()))?;
        file = Some((filename, data));
        break;
    }
    let Some((filename, data)) = file.filter(|(_, d)| !d.is_empty()) else {
        return Ok(Redirect::to("/").into_response());
    };
    if !state.config.allowed_file(&filename) {
        return Err(state.error_page(AppError::user(
            "upload_rejected",
            format!("file type not allowed: {filename:?}"),
        )));
    }
    let topics: Topics = serde_json::from_slice(&data).map_err(|e| {
        state.error_page(AppError::user(
            "bad_upload",
            format!("expected a JSON object mapping topic names to lists of report ids: {e}"),
        ))
    })?;
    let count = topics.len();
    auth.session.with(|s| s.set_topics(topics));
    info!(user = %auth.identity(), topics = count, "topics uploaded");
    Ok(Redirect::to("/navigate").into_response())
}

async fn navigate(State(state): State<AppState>, auth: Authenticated) -> PageResult {
    let names = auth.session.with(|s| {
        s.reset_position();
        s.list_topic_names()
    });
    match names {
        Ok(names) => {
            let topics: Vec<(String, String)> = names
                .into_iter()
                .map(|n| {
                    let href = format!("/topic/{}", urlencoding::encode(&n));
                    (n, href)
                })
                .collect();
            state.page("navigate.html", context! { user => auth.identity(), topics => topics })
        }
        Err(e) => Ok(nav_redirect(&e)),
    }
}

#[derive(Debug, Deserialize)]
struct ReportQuery {
    #[serde(rename = "_id")]
    id: Option<String>,
}

async fn report_by_query(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(q): Query<ReportQuery>,
) -> PageResult {
    let id = q.id.unwrap_or_default();
    show_report(&state, &auth, &id, None).await
}

async fn report_by_path(State(state): State<AppState>, auth: Authenticated, Path(id): Path<String>) -> PageResult {
    show_report(&state, &auth, &id, None).await
}

/// Look the report up and render it; missing or unreadable reports get the
/// not-found page rather than an error status.
async fn show_report(state: &AppState, auth: &Authenticated, id: &str, nav: Option<CursorView>) -> PageResult {
    let store = state.reports.clone();
    let key = id.to_string();
    let found = match tokio::task::spawn_blocking(move || store.fetch_report(&key)).await {
        Ok(Ok(found)) => found,
        Ok(Err(e)) => {
            warn!(report_id = %id, error = %e, "report lookup failed");
            None
        }
        Err(e) => {
            error!(report_id = %id, error = %e, "report lookup task failed");
            None
        }
    };
    match found {
        Some(report) => state.page(
            "report.html",
            context! {
                user => auth.identity(),
                report_id => id,
                record => sorted_fields(&report),
                nav => nav.map(NavContext::from),
            },
        ),
        None => state.page("not_found.html", context! { user => auth.identity(), report_id => id }),
    }
}

async fn reset(auth: Authenticated) -> Response {
    auth.session.with(|s| s.reset());
    info!(user = %auth.identity(), "session reset");
    Redirect::to("/").into_response()
}

async fn resume_topic(auth: Authenticated) -> Response {
    match auth.session.with(|s| s.current_topic().map(str::to_string)) {
        Some(name) => Redirect::to(&format!("/topic/{}", urlencoding::encode(&name))).into_response(),
        None => nav_redirect(&NavError::NoActiveTopic),
    }
}

async fn topic(State(state): State<AppState>, auth: Authenticated, Path(name): Path<String>) -> PageResult {
    let step = auth.session.with(|s| -> NavResult<(String, CursorView)> {
        if s.topic_count() == 0 {
            return Err(NavError::NoTopics);
        }
        s.select_topic(&name)?;
        let id = match s.current_report_id().map(str::to_string) {
            Ok(id) => id,
            Err(e) => {
                // nothing to show; leave the topic unselected
                s.reset_position();
                return Err(e);
            }
        };
        let cursor = s.cursor().ok_or(NavError::NoActiveTopic)?;
        Ok((id, cursor))
    });
    match step {
        Ok((id, cursor)) => show_report(&state, &auth, &id, Some(cursor)).await,
        Err(e) => Ok(nav_redirect(&e)),
    }
}

#[derive(Debug, Serialize)]
struct StepAck {
    status: &'static str,
    position: usize,
}

async fn next_report(auth: Authenticated) -> Response {
    match auth.session.with(|s| s.advance()) {
        Ok(position) => Json(StepAck { status: "ok", position }).into_response(),
        Err(e) => nav_redirect(&e),
    }
}

async fn prev_report(auth: Authenticated) -> Response {
    match auth.session.with(|s| s.retreat()) {
        Ok(position) => Json(StepAck { status: "ok", position }).into_response(),
        Err(e) => nav_redirect(&e),
    }
}

async fn no_route(State(state): State<AppState>, uri: Uri) -> Response {
    state.error_page(AppError::not_found("no_route", format!("no page at {}", uri.path())))
}
