//! Static file server with live reload
//!
//! Every HTML page is served with a small client that listens on
//! `/__livereload` for server-sent events. Stylesheet changes are applied in
//! place; any other asset change reloads the page.

pub mod http;

use crate::config::ServerConfig;
use crate::error::Result;
use self::http::{
    content_type, event_stream_head, inject_reload_script, is_html, parse_request_line,
    resolve_path, Response, LIVERELOAD_PATH, MAX_HEAD_BYTES,
};
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Repeated notifications for one path inside this window are dropped
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(100);

const EVENT_CAPACITY: usize = 16;

/// Receives asset changes from the watcher
pub trait ReloadNotifier: Send + Sync {
    fn on_asset_changed(&self, path: &Path);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadEvent {
    /// A stylesheet changed; clients swap it without reloading
    Css(PathBuf),
    Page(PathBuf),
}

impl ReloadEvent {
    pub fn for_path(path: &Path) -> Self {
        let is_css = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("css"))
            .unwrap_or(false);
        if is_css {
            ReloadEvent::Css(path.to_path_buf())
        } else {
            ReloadEvent::Page(path.to_path_buf())
        }
    }

    /// Wire form for the event stream
    pub fn to_sse(&self) -> String {
        let (name, path) = match self {
            ReloadEvent::Css(path) => ("css", path),
            ReloadEvent::Page(path) => ("reload", path),
        };
        format!("event: {}\ndata: {}\n\n", name, path.display())
    }
}

#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub root: PathBuf,
    /// Globs whose changes are pushed to browsers
    pub watched_assets: Vec<String>,
    pub port: u16,
    pub open_browser: bool,
    /// Browser application to open instead of the system default
    pub browser: Option<String>,
}

impl ServeOptions {
    pub fn from_config<S: AsRef<str>>(root: PathBuf, server: &ServerConfig, assets: &[S]) -> Self {
        ServeOptions {
            root,
            watched_assets: assets.iter().map(|a| a.as_ref().to_string()).collect(),
            port: server.port,
            open_browser: server.open,
            browser: server.browser.clone(),
        }
    }
}

pub struct DevServer {
    root: PathBuf,
    events: broadcast::Sender<ReloadEvent>,
    recent: Mutex<HashMap<PathBuf, Instant>>,
}

impl DevServer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        DevServer {
            root: root.into(),
            events,
            recent: Mutex::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.events.subscribe()
    }

    /// Bind to `port` on localhost and accept connections in the background
    pub async fn listen(self: &Arc<Self>, port: u16) -> io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind(("127.0.0.1", port)).await?;
        let addr = listener.local_addr()?;

        let server = Arc::clone(self);
        let task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        let server = Arc::clone(&server);
                        tokio::spawn(async move {
                            if let Err(e) = server.handle_connection(stream).await {
                                debug!("connection from {} ended: {}", peer, e);
                            }
                        });
                    }
                    Err(e) => warn!("accept error: {}", e),
                }
            }
        });

        Ok((addr, task))
    }

    async fn handle_connection(&self, stream: TcpStream) -> io::Result<()> {
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader.take(MAX_HEAD_BYTES as u64));

        let mut request_line = String::new();
        if reader.read_line(&mut request_line).await? == 0 {
            return Ok(());
        }
        // Headers are read and ignored
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).await? == 0 || line.trim_end().is_empty() {
                break;
            }
        }

        let Some(request) = parse_request_line(request_line.trim_end()) else {
            writer
                .write_all(&Response::status_page(400).into_bytes(false))
                .await?;
            return writer.shutdown().await;
        };
        debug!("{} {}", request.method, request.path);

        if request.method != "GET" && request.method != "HEAD" {
            let response = Response::status_page(405).header("Allow", "GET, HEAD");
            writer.write_all(&response.into_bytes(false)).await?;
            return writer.shutdown().await;
        }

        if request.path == LIVERELOAD_PATH {
            return self.stream_events(writer, request.is_head()).await;
        }

        let response = self.static_response(&request.path).await;
        writer.write_all(&response.into_bytes(request.is_head())).await?;
        writer.shutdown().await
    }

    async fn static_response(&self, url_path: &str) -> Response {
        let Some(mut path) = resolve_path(&self.root, url_path) else {
            return Response::status_page(403);
        };

        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_dir() => {
                if !url_path.ends_with('/') {
                    let location: Vec<String> = url_path
                        .split('/')
                        .map(|segment| urlencoding::encode(segment).into_owned())
                        .collect();
                    return Response::new(301).header("Location", format!("{}/", location.join("/")));
                }
                path.push("index.html");
            }
            Ok(_) => {}
            Err(_) => return Response::status_page(404),
        }

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let bytes = if is_html(&path) {
                    inject_reload_script(&bytes)
                } else {
                    bytes
                };
                Response::new(200).body(content_type(&path), bytes)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Response::status_page(404),
            Err(e) => {
                warn!("failed to read {}: {}", path.display(), e);
                Response::status_page(500)
            }
        }
    }

    async fn stream_events<W>(&self, mut writer: W, head_only: bool) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let mut events = self.subscribe();
        writer.write_all(event_stream_head()).await?;
        if head_only {
            return writer.shutdown().await;
        }
        writer.write_all(b": connected\n\n").await?;
        writer.flush().await?;

        loop {
            match events.recv().await {
                Ok(event) => {
                    writer.write_all(event.to_sse().as_bytes()).await?;
                    writer.flush().await?;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("live-reload client skipped {} event(s)", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            }
        }
    }
}

impl ReloadNotifier for DevServer {
    fn on_asset_changed(&self, path: &Path) {
        let now = Instant::now();
        {
            let mut recent = self.recent.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(last) = recent.get(path) {
                if now.duration_since(*last) < RELOAD_DEBOUNCE {
                    return;
                }
            }
            recent.insert(path.to_path_buf(), now);
        }

        let event = ReloadEvent::for_path(path);
        match &event {
            ReloadEvent::Css(_) => info!("Injecting {}", path.display()),
            ReloadEvent::Page(_) => info!("Reloading browsers ({} changed)", path.display()),
        }
        match self.events.send(event) {
            Ok(clients) => debug!("notified {} live-reload client(s)", clients),
            Err(_) => debug!("no live-reload clients connected"),
        }
    }
}

/// A running dev server
pub struct ServeHandle {
    pub server: Arc<DevServer>,
    pub addr: SocketAddr,
    task: JoinHandle<()>,
}

impl ServeHandle {
    pub fn url(&self) -> String {
        format!("http://localhost:{}/", self.addr.port())
    }

    pub fn shutdown(self) {
        self.task.abort();
    }
}

/// Start serving `options.root` and open a browser if asked to
pub async fn serve(options: &ServeOptions) -> Result<ServeHandle> {
    let server = Arc::new(DevServer::new(options.root.clone()));
    let (addr, task) = server.listen(options.port).await?;
    let handle = ServeHandle { server, addr, task };

    info!("Serving {} at {}", options.root.display(), handle.url());

    if options.open_browser {
        open_browser(&handle.url(), options.browser.as_deref());
    }

    Ok(handle)
}

fn open_browser(url: &str, browser: Option<&str>) {
    let result = match browser {
        Some(app) => open::with_detached(url, app),
        None => open::that_detached(url),
    };
    if let Err(e) = result {
        warn!("could not open a browser at {}: {}", url, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn site() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("index.html"),
            "<html><body><h1>hi</h1></body></html>",
        )
        .unwrap();
        fs::create_dir_all(temp_dir.path().join("styles")).unwrap();
        fs::write(temp_dir.path().join("styles/main.min.css"), "a{}").unwrap();
        fs::create_dir_all(temp_dir.path().join("docs")).unwrap();
        fs::write(temp_dir.path().join("docs/index.html"), "<p>docs</p>").unwrap();
        temp_dir
    }

    async fn start(root: &Path) -> ServeHandle {
        let options = ServeOptions {
            root: root.to_path_buf(),
            watched_assets: vec![],
            port: 0,
            open_browser: false,
            browser: None,
        };
        serve(&options).await.unwrap()
    }

    async fn request(addr: SocketAddr, raw: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw.as_bytes()).await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        String::from_utf8_lossy(&response).into_owned()
    }

    #[test]
    fn test_reload_event_kinds() {
        let css = ReloadEvent::for_path(Path::new("styles/main.min.css"));
        assert_eq!(css.to_sse(), "event: css\ndata: styles/main.min.css\n\n");
        let page = ReloadEvent::for_path(Path::new("scripts/main.min.js"));
        assert!(page.to_sse().starts_with("event: reload\n"));
    }

    #[tokio::test]
    async fn test_index_gets_reload_script() {
        let temp_dir = site();
        let handle = start(temp_dir.path()).await;

        let response = request(handle.addr, "GET / HTTP/1.1\r\nHost: x\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("Content-Type: text/html"));
        assert!(response.contains("/__livereload"));
        assert!(response.contains("<h1>hi</h1>"));
        handle.shutdown();
    }

    #[tokio::test]
    async fn test_static_files_and_errors() {
        let temp_dir = site();
        let handle = start(temp_dir.path()).await;

        let css = request(handle.addr, "GET /styles/main.min.css HTTP/1.1\r\n\r\n").await;
        assert!(css.contains("Content-Type: text/css"));
        assert!(css.ends_with("a{}"));

        let missing = request(handle.addr, "GET /nope.js HTTP/1.1\r\n\r\n").await;
        assert!(missing.starts_with("HTTP/1.1 404"));

        let traversal = request(handle.addr, "GET /../secret HTTP/1.1\r\n\r\n").await;
        assert!(traversal.starts_with("HTTP/1.1 403"));

        let post = request(handle.addr, "POST / HTTP/1.1\r\n\r\n").await;
        assert!(post.starts_with("HTTP/1.1 405"));
        assert!(post.contains("Allow: GET, HEAD"));

        let head = request(handle.addr, "HEAD /styles/main.min.css HTTP/1.1\r\n\r\n").await;
        assert!(head.contains("Content-Length: 3"));
        assert!(head.ends_with("\r\n\r\n"));

        let redirect = request(handle.addr, "GET /docs HTTP/1.1\r\n\r\n").await;
        assert!(redirect.starts_with("HTTP/1.1 301"));
        assert!(redirect.contains("Location: /docs/"));

        let docs = request(handle.addr, "GET /docs/ HTTP/1.1\r\n\r\n").await;
        assert!(docs.contains("<p>docs</p>"));
        handle.shutdown();
    }

    #[tokio::test]
    async fn test_event_stream_delivers_changes() {
        let temp_dir = site();
        let handle = start(temp_dir.path()).await;

        let mut stream = TcpStream::connect(handle.addr).await.unwrap();
        stream
            .write_all(b"GET /__livereload HTTP/1.1\r\n\r\n")
            .await
            .unwrap();

        let mut received = String::new();
        let mut buf = [0u8; 1024];
        while !received.contains(": connected") {
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0);
            received.push_str(&String::from_utf8_lossy(&buf[..n]));
        }
        assert!(received.contains("Content-Type: text/event-stream"));

        handle
            .server
            .on_asset_changed(Path::new("styles/main.min.css"));
        // Debounced duplicate
        handle
            .server
            .on_asset_changed(Path::new("styles/main.min.css"));
        handle.server.on_asset_changed(Path::new("index.html"));

        while !received.contains("event: reload") {
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0);
            received.push_str(&String::from_utf8_lossy(&buf[..n]));
        }
        assert_eq!(received.matches("event: css").count(), 1);
        assert!(received.contains("data: index.html"));
        handle.shutdown();
    }
}
