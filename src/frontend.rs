//! Gateway in front of the prebuilt dashboard bundle.
//!
//! Dashboard pages need a session, login pages bounce signed-in users to the
//! dashboard, and unknown paths answer with the bundle's own 404 page.

use crate::extractors::SessionCookie;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use std::path::{Component, Path, PathBuf};
use tower_http::services::ServeDir;

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_HOME: &str = "/dashboard/students";

#[derive(Clone)]
struct Gateway {
    app: AppState,
    dir: PathBuf,
}

impl Gateway {
    async fn has_session(&self, cookie: &SessionCookie) -> bool {
        let Some(token) = cookie.0.as_deref() else {
            return false;
        };
        match self.app.sessions.find_session(token).await {
            Ok(session) => session.is_some(),
            Err(e) => {
                tracing::error!(error = %e, "session lookup failed");
                false
            }
        }
    }

    /// Location of the percent-decoded `path` inside the bundle; `None` for paths escaping it.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let decoded = urlencoding::decode(path).ok()?;
        let relative = Path::new(decoded.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return None;
        }
        Some(self.dir.join(relative))
    }
}

/// Router serving `dir` behind the gateway rules. Meant as the fallback of the API router.
pub fn frontend_router(state: AppState, dir: PathBuf) -> Router {
    let gateway = Gateway {
        app: state,
        dir: dir.clone(),
    };
    Router::new()
        .fallback_service(ServeDir::new(dir))
        .layer(middleware::from_fn_with_state(gateway, gate))
}

async fn gate(State(gateway): State<Gateway>, cookie: SessionCookie, mut req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);

    if path.starts_with("/dashboard") || path == "/" {
        if !gateway.has_session(&cookie).await {
            return redirect(StatusCode::FOUND, LOGIN_PATH);
        }
    } else if path.starts_with(LOGIN_PATH) && gateway.has_session(&cookie).await {
        return redirect(StatusCode::FOUND, DASHBOARD_HOME);
    }

    if path == "/dashboard" || path == "/dashboard/" || path == "/dashboard/home" {
        return redirect(StatusCode::FOUND, DASHBOARD_HOME);
    }

    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        let location = match query {
            Some(q) if !q.is_empty() => format!("{}?{}", trimmed, q),
            _ => trimmed.to_string(),
        };
        return redirect(StatusCode::MOVED_PERMANENTLY, &location);
    }

    let target = gateway.resolve(&path);
    let exists = match &target {
        Some(p) => tokio::fs::metadata(p).await.ok(),
        None => None,
    };
    match exists {
        // Directories are served as their index.html without a redirect.
        Some(meta) if meta.is_dir() && path != "/" => {
            let rewritten = match &query {
                Some(q) => format!("{}/?{}", path, q),
                None => format!("{}/", path),
            };
            if let Ok(uri) = rewritten.parse::<Uri>() {
                *req.uri_mut() = uri;
            }
            next.run(req).await
        }
        Some(_) => next.run(req).await,
        None => {
            if !gateway.has_session(&cookie).await {
                return redirect(StatusCode::FOUND, LOGIN_PATH);
            }
            not_found_page(&gateway.dir).await
        }
    }
}

fn redirect(status: StatusCode, location: &str) -> Response {
    (status, [(header::LOCATION, location.to_string())]).into_response()
}

async fn not_found_page(dir: &Path) -> Response {
    let body = tokio::fs::read(dir.join("404").join("index.html"))
        .await
        .unwrap_or_default();
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        Body::from(body),
    )
        .into_response()
}
