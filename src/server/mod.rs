//! Development server with live reload and progress controls

use anyhow::Result;
use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket},
        Path as UrlPath, State, WebSocketUpgrade,
    },
    http::{Request, StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use notify_debouncer_mini::new_debouncer;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::commands::generate;
use crate::error::GuideError;
use crate::helpers::url_for;
use crate::Guide;

/// Live reload script injected into HTML pages
const LIVE_RELOAD_SCRIPT: &str = r#"
<script>
(function() {
    var ws = new WebSocket('ws://' + location.host + '/__livereload');
    ws.onmessage = function(msg) {
        if (msg.data === 'reload') {
            location.reload();
        }
    };
    ws.onclose = function() {
        console.log('Live reload disconnected. Attempting to reconnect...');
        setTimeout(function() { location.reload(); }, 1000);
    };
})();
</script>
</body>
"#;

/// Server state
struct ServerState {
    base_dir: PathBuf,
    public_dir: PathBuf,
    root: String,
    reload_tx: broadcast::Sender<()>,
    live_reload: bool,
    // Serializes regeneration between the watcher and progress requests
    build_lock: Mutex<()>,
}

/// Start the development server
pub async fn start(guide: &Guide, ip: &str, port: u16, watch: bool, open: bool) -> Result<()> {
    {
        let guide = guide.clone();
        tokio::task::spawn_blocking(move || generate::run_with_options(&guide, true)).await??;
    }

    let (reload_tx, _) = broadcast::channel::<()>(16);
    let root = normalize_root(&guide.config.root);

    let state = Arc::new(ServerState {
        base_dir: guide.base_dir.clone(),
        public_dir: guide.public_dir.clone(),
        root: root.clone(),
        reload_tx: reload_tx.clone(),
        live_reload: watch,
        build_lock: Mutex::new(()),
    });

    let app = Router::new()
        .route("/__livereload", get(livereload_handler))
        .route(&format!("{}__progress/:slug", root), post(progress_handler))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}{}", ip, port, root);
    tracing::info!("Server running at {}", url);
    if watch {
        tracing::info!("Live reload enabled. Watching for changes...");
    }
    tracing::info!("Press Ctrl+C to stop.");

    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    if watch {
        let guide = guide.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = watch_and_reload(&guide, state) {
                tracing::error!("File watcher error: {}", e);
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Rebuild on content, static, config or progress changes and notify clients
fn watch_and_reload(guide: &Guide, state: Arc<ServerState>) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();
    let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;

    for (path, mode) in generate::watched_paths(guide) {
        debouncer.watcher().watch(&path, mode)?;
        tracing::debug!("Watching: {:?}", path);
    }

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let relevant: Vec<_> = events
                    .iter()
                    .filter(|e| is_relevant_change(&e.path))
                    .collect();
                if relevant.is_empty() {
                    continue;
                }
                for event in &relevant {
                    tracing::info!("File changed: {}", event.path.display());
                }

                let _guard = state.build_lock.blocking_lock();
                match rebuild(&state.base_dir) {
                    Ok(()) => {
                        tracing::info!("Regenerated");
                        let _ = state.reload_tx.send(());
                    }
                    Err(e) => tracing::error!("Generation failed: {}", e),
                }
            }
            Ok(Err(e)) => tracing::error!("Watch error: {:?}", e),
            Err(e) => {
                tracing::error!("Channel error: {:?}", e);
                break;
            }
        }
    }

    Ok(())
}

/// Editor and VCS noise that should not trigger a rebuild
fn is_relevant_change(path: &Path) -> bool {
    let path_str = path.to_string_lossy();
    !path_str.contains(".git")
        && !path_str.contains(".DS_Store")
        && !path_str.ends_with('~')
        && !path_str.ends_with(".swp")
}

/// Re-read config and content, then render interactive pages
fn rebuild(base_dir: &Path) -> Result<()> {
    generate::regenerate(base_dir, true)
}

/// Toggle a topic's completion, save, regenerate and return the topic URL
pub fn toggle_progress(base_dir: &Path, slug: &str) -> Result<String> {
    let guide = Guide::new(base_dir)?;
    let curriculum = guide.load_curriculum()?;
    let mut store = guide.load_progress();

    let completed = store.toggle(slug, &curriculum)?;
    store.save()?;
    tracing::info!(
        "Marked '{}' as {}",
        slug,
        if completed { "completed" } else { "not completed" }
    );

    generate::run_with_options(&guide, true)?;

    let path = curriculum
        .get(slug)
        .map(|t| t.path.clone())
        .unwrap_or_default();
    Ok(url_for(&guide.config, &path))
}

/// POST handler behind the "mark as completed" forms
async fn progress_handler(
    State(state): State<Arc<ServerState>>,
    UrlPath(slug): UrlPath<String>,
) -> Response {
    let _guard = state.build_lock.lock().await;
    let base_dir = state.base_dir.clone();
    let result = tokio::task::spawn_blocking(move || toggle_progress(&base_dir, &slug)).await;

    match result {
        Ok(Ok(location)) => {
            let _ = state.reload_tx.send(());
            Redirect::to(&location).into_response()
        }
        Ok(Err(e)) => match e.downcast_ref::<GuideError>() {
            Some(GuideError::UnknownTopic(_)) => (StatusCode::NOT_FOUND, e.to_string()).into_response(),
            _ => {
                tracing::error!("Progress update failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
            }
        },
        Err(e) => {
            tracing::error!("Progress task failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}

/// WebSocket handler for live reload
async fn livereload_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    let reload_rx = state.reload_tx.subscribe();
    ws.on_upgrade(move |socket| handle_livereload_socket(socket, reload_rx))
}

async fn handle_livereload_socket(mut socket: WebSocket, mut reload_rx: broadcast::Receiver<()>) {
    tracing::debug!("Live reload client connected");

    loop {
        tokio::select! {
            result = reload_rx.recv() => {
                match result {
                    Ok(_) => {
                        if socket.send(Message::Text("reload".to_string())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    tracing::debug!("Live reload client disconnected");
}

/// Serve files below the site root, injecting the live reload script into HTML
async fn fallback_handler(
    State(state): State<Arc<ServerState>>,
    mut request: Request<Body>,
) -> Response {
    let Some(relative) = strip_root(request.uri().path(), &state.root).map(str::to_string) else {
        return (StatusCode::NOT_FOUND, "Not found").into_response();
    };
    let Some(file_path) = resolve_file(&state.public_dir, &relative) else {
        return (StatusCode::NOT_FOUND, "Not found").into_response();
    };

    let is_html = file_path
        .extension()
        .map(|ext| ext == "html" || ext == "htm")
        .unwrap_or(false);

    if is_html && state.live_reload {
        return match tokio::fs::read_to_string(&file_path).await {
            Ok(content) => Html(inject_live_reload(&content)).into_response(),
            Err(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
        };
    }

    match format!("/{}", relative).parse::<Uri>() {
        Ok(uri) => *request.uri_mut() = uri,
        Err(_) => return (StatusCode::BAD_REQUEST, "Bad request").into_response(),
    }
    let mut service = ServeDir::new(&state.public_dir).append_index_html_on_directories(true);
    match service.try_call(request).await {
        Ok(response) => response.into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
    }
}

/// Root always starts and ends with a slash
fn normalize_root(root: &str) -> String {
    let trimmed = root.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}

/// Request path relative to the site root; `None` when outside it
fn strip_root<'a>(path: &'a str, root: &str) -> Option<&'a str> {
    if let Some(rest) = path.strip_prefix(root) {
        return Some(rest);
    }
    // "/guide" for root "/guide/"
    (path == root.trim_end_matches('/')).then_some("")
}

/// Map a root-relative request path to a file in the public dir
fn resolve_file(public_dir: &Path, relative: &str) -> Option<PathBuf> {
    let decoded = percent_encoding::percent_decode_str(relative)
        .decode_utf8()
        .ok()?;
    let clean = Path::new(decoded.trim_start_matches('/'));
    if clean
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }

    let candidate = public_dir.join(clean);
    if candidate.is_dir() {
        return Some(candidate.join("index.html"));
    }
    if candidate.exists() {
        return Some(candidate);
    }
    let with_html = public_dir.join(format!("{}.html", clean.display()));
    if with_html.exists() {
        return Some(with_html);
    }
    Some(candidate)
}

/// Inject live reload script into HTML content
fn inject_live_reload(html: &str) -> String {
    if html.contains("</body>") {
        html.replacen("</body>", LIVE_RELOAD_SCRIPT, 1)
    } else {
        format!("{}{}", html, LIVE_RELOAD_SCRIPT)
    }
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressStore;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_strip_root() {
        assert_eq!(strip_root("/basics/soql/", "/"), Some("basics/soql/"));
        assert_eq!(strip_root("/guide/basics/", "/guide/"), Some("basics/"));
        assert_eq!(strip_root("/guide", "/guide/"), Some(""));
        assert_eq!(strip_root("/other/", "/guide/"), None);
        assert_eq!(normalize_root("guide"), "/guide/");
        assert_eq!(normalize_root(""), "/");
    }

    #[test]
    fn test_resolve_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("basics/soql")).unwrap();
        fs::write(dir.path().join("basics/soql/index.html"), "soql").unwrap();
        fs::write(dir.path().join("search.json"), "[]").unwrap();

        assert_eq!(
            resolve_file(dir.path(), "basics/soql/"),
            Some(dir.path().join("basics/soql/index.html"))
        );
        assert_eq!(
            resolve_file(dir.path(), ""),
            Some(dir.path().join("index.html"))
        );
        assert_eq!(
            resolve_file(dir.path(), "search.json"),
            Some(dir.path().join("search.json"))
        );
        assert_eq!(resolve_file(dir.path(), "../secret"), None);
        assert_eq!(resolve_file(dir.path(), "%2e%2e/secret"), None);
    }

    #[test]
    fn test_inject_live_reload() {
        let html = inject_live_reload("<html><body><p>Hi</p></body></html>");
        assert!(html.contains("__livereload"));
        assert!(html.ends_with("</body>\n</html>"));
        assert_eq!(html.matches("</body>").count(), 1);

        assert!(inject_live_reload("<p>bare</p>").starts_with("<p>bare</p>"));
    }

    #[test]
    fn test_relevant_change() {
        assert!(is_relevant_change(Path::new("/site/content/basics/soql.md")));
        assert!(!is_relevant_change(Path::new("/site/.git/index")));
        assert!(!is_relevant_change(Path::new("/site/content/soql.md~")));
    }

    #[test]
    fn test_toggle_progress_round_trip() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("_config.yml"), "root: /guide/\n").unwrap();
        let topic = dir.path().join("content/basics/01-soql.md");
        fs::create_dir_all(topic.parent().unwrap()).unwrap();
        fs::write(&topic, "SOQL queries\n").unwrap();

        let location = toggle_progress(dir.path(), "soql").unwrap();
        assert_eq!(location, "/guide/basics/soql/");

        let progress = dir.path().join(".progress.json");
        assert!(ProgressStore::load(&progress).is_completed("soql"));

        let page = fs::read_to_string(dir.path().join("public/basics/soql/index.html")).unwrap();
        assert!(page.contains("/guide/__progress/soql"));
        assert!(page.contains("Mark as not completed"));

        toggle_progress(dir.path(), "soql").unwrap();
        assert!(!ProgressStore::load(&progress).is_completed("soql"));
    }

    #[test]
    fn test_toggle_unknown_topic() {
        let dir = TempDir::new().unwrap();
        let err = toggle_progress(dir.path(), "flows").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GuideError>(),
            Some(GuideError::UnknownTopic(_))
        ));
    }

    #[test]
    fn test_toggle_removed_topic_is_unknown() {
        let dir = TempDir::new().unwrap();
        let topic = dir.path().join("content/basics/apex.md");
        fs::create_dir_all(topic.parent().unwrap()).unwrap();
        fs::write(&topic, "Apex classes\n").unwrap();
        let progress = dir.path().join(".progress.json");
        fs::write(&progress, r#"{"completed":["removed-topic"],"updated":null}"#).unwrap();

        let err = toggle_progress(dir.path(), "removed-topic").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GuideError>(),
            Some(GuideError::UnknownTopic(_))
        ));
        assert!(ProgressStore::load(&progress).is_completed("removed-topic"));
    }
}
