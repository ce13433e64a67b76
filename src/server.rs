//! Development server with live reload.
//!
//! Serves the destination root over HTTP. Every HTML response carries a
//! small script that subscribes to [`RELOAD_PATH`]; a debounced watcher on
//! the destination root broadcasts a `reload` event whenever an output
//! changes.

use crate::build::BuildContext;
use axum::extract::{Path as UrlPath, State};
use axum::http::{header, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::Stream;
use mime_guess::mime;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast::{self, error::RecvError};

/// Server-Sent Events endpoint for reload notifications.
pub const RELOAD_PATH: &str = "/__assetflow/reload";

const RELOAD_SCRIPT: &str = concat!(
    "<script>new EventSource(\"/__assetflow/reload\")",
    ".addEventListener(\"reload\",function(){location.reload()});</script>"
);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to watch {}: {source}", path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone)]
struct ServerState {
    root: PathBuf,
    reload: broadcast::Sender<String>,
}

/// Map a URL path onto `root`. `None` when a segment climbs out with `..`.
pub fn resolve(root: &Path, url_path: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for segment in url_path.split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            s if s.contains('\\') => return None,
            s => path.push(s),
        }
    }
    Some(path)
}

/// Insert the reload script before the last `</body>`, or append it.
pub fn inject_reload_script(html: &str) -> String {
    let lower = html.to_ascii_lowercase();
    match lower.rfind("</body>") {
        Some(at) => format!("{}{}{}", &html[..at], RELOAD_SCRIPT, &html[at..]),
        None => format!("{}{}", html, RELOAD_SCRIPT),
    }
}

async fn serve(state: &ServerState, url_path: &str) -> Response {
    let Some(mut path) = resolve(&state.root, url_path) else {
        return (StatusCode::BAD_REQUEST, "invalid path").into_response();
    };
    if tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_dir()) {
        path.push("index.html");
    }
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(_) => return (StatusCode::NOT_FOUND, "not found").into_response(),
    };

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let is_html = mime.type_() == mime::TEXT && mime.subtype() == mime::HTML;
    let body = if is_html {
        inject_reload_script(&String::from_utf8_lossy(&bytes)).into_bytes()
    } else {
        bytes
    };
    let headers = [
        (header::CONTENT_TYPE, mime.to_string()),
        (header::CACHE_CONTROL, "no-cache".to_string()),
    ];
    (headers, body).into_response()
}

async fn serve_root(State(state): State<ServerState>) -> Response {
    serve(&state, "").await
}

async fn serve_path(State(state): State<ServerState>, UrlPath(path): UrlPath<String>) -> Response {
    serve(&state, &path).await
}

async fn reload_events(
    State(state): State<ServerState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.reload.subscribe();
    let stream = futures::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(changed) => return Some((Ok(Event::default().event("reload").data(changed)), rx)),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return None,
            }
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Routes for serving `root`, with reload events taken from `reload`.
pub fn router(root: PathBuf, reload: broadcast::Sender<String>) -> Router {
    Router::new()
        .route(RELOAD_PATH, get(reload_events))
        .route("/", get(serve_root))
        .route("/{*path}", get(serve_path))
        .with_state(ServerState { root, reload })
}

/// Broadcast one event per debounced batch of changes under `root`.
fn watch_outputs(
    root: &Path,
    debounce: Duration,
    reload: broadcast::Sender<String>,
) -> Result<Debouncer<notify::RecommendedWatcher>, ServerError> {
    let base = root.to_path_buf();
    let mut debouncer = new_debouncer(debounce, move |result: DebounceEventResult| match result {
        Ok(events) => {
            if let Some(event) = events.first() {
                let changed = event.path.strip_prefix(&base).unwrap_or(&event.path);
                let changed = changed.to_string_lossy().replace('\\', "/");
                tracing::debug!("output changed: {}, reloading clients", changed);
                // No subscribers is fine.
                let _ = reload.send(changed);
            }
        }
        Err(e) => tracing::warn!("output watch error: {}", e),
    })
    .map_err(|source| ServerError::Watch { path: root.to_path_buf(), source })?;

    debouncer
        .watcher()
        .watch(root, RecursiveMode::Recursive)
        .map_err(|source| ServerError::Watch { path: root.to_path_buf(), source })?;
    Ok(debouncer)
}

pub struct DevServer {
    host: String,
    port: u16,
    root: PathBuf,
    debounce: Duration,
}

impl DevServer {
    pub fn new(ctx: &BuildContext) -> Self {
        let server = &ctx.config().server;
        Self {
            host: server.host.clone(),
            port: server.port,
            root: ctx.dest_root().to_path_buf(),
            debounce: Duration::from_millis(u64::from(ctx.config().watch.debounce_ms)),
        }
    }

    /// Serve until the listener fails.
    pub async fn run(self) -> Result<(), ServerError> {
        std::fs::create_dir_all(&self.root)?;
        let (reload, _) = broadcast::channel(16);
        let _outputs = watch_outputs(&self.root, self.debounce, reload.clone())?;

        let addr = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr: addr.clone(), source })?;
        tracing::info!("serving {} at http://{}", self.root.display(), listener.local_addr()?);

        axum::serve(listener, router(self.root, reload)).await?;
        Ok(())
    }
}
