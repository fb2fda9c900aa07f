use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::time::Instant;
use tracing::{error, info};

use crate::storage::{StorageError, VaultStore};

pub const PASSWORD_ROUTE: &str = "/api/password";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("could not bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server stopped: {source}")]
    Serve {
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Clone, Debug)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub content_root: PathBuf,
    pub vault_path: PathBuf,
}

#[derive(Clone)]
struct AppState {
    vault: Arc<VaultStore>,
    content_root: Arc<PathBuf>,
}

pub fn router(vault: VaultStore, content_root: PathBuf) -> Router {
    let state = AppState {
        vault: Arc::new(vault),
        content_root: Arc::new(content_root),
    };
    Router::new()
        .route(PASSWORD_ROUTE, get(list_passwords))
        .fallback(serve_static)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

pub async fn start(settings: ServerSettings) -> Result<(), ServerError> {
    let address = format!("{}:{}", settings.host, settings.port);
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| ServerError::Bind {
            address: address.clone(),
            source,
        })?;
    let vault = VaultStore::open(&settings.vault_path).await?;
    serve_on(listener, vault, settings.content_root).await
}

/// Serves on an already bound listener until the process stops.
pub async fn serve_on(
    listener: TcpListener,
    vault: VaultStore,
    content_root: PathBuf,
) -> Result<(), ServerError> {
    let local: Option<SocketAddr> = listener.local_addr().ok();
    info!(
        address = ?local,
        content_root = %content_root.display(),
        vault = %vault.path().display(),
        "started server"
    );
    axum::serve(listener, router(vault, content_root))
        .await
        .map_err(|source| ServerError::Serve { source })
}

async fn log_request(request: Request, next: Next) -> Response {
    let now = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    info!(
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed = ?now.elapsed(),
        "request handled"
    );
    response
}

async fn list_passwords(State(state): State<AppState>) -> Response {
    match state.vault.read_all().await {
        Ok(records) => Json(records).into_response(),
        Err(error) => {
            error!(%error, "failed to read vault");
            (StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error").into_response()
        }
    }
}

async fn serve_static(State(state): State<AppState>, uri: Uri) -> Response {
    let Some(path) = resolve_static_path(&state.content_root, uri.path()) else {
        return not_found();
    };
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let mut response = bytes.into_response();
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(content_type_for(&path)),
            );
            response
        }
        Err(_) => not_found(),
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404 Not found").into_response()
}

/// Maps a request path onto the content root. `/` and directory paths map
/// to `index.html`; anything that would climb out of the root is refused.
pub fn resolve_static_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let relative = request_path.trim_start_matches('/');
    let mut resolved = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if relative.is_empty() || relative.ends_with('/') {
        resolved.push("index.html");
    }
    Some(resolved)
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "js" => "text/javascript; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "ico" => "image/x-icon",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
