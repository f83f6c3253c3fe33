//! Just enough HTTP/1.1 for a static dev server

use std::path::{Path, PathBuf};

/// Path of the server-sent events endpoint
pub const LIVERELOAD_PATH: &str = "/__livereload";

/// Upper bound on a request head
pub const MAX_HEAD_BYTES: usize = 16 * 1024;

const RELOAD_SCRIPT: &str = r#"<script>
(function () {
  var source = new EventSource("/__livereload");
  source.addEventListener("css", function () {
    document.querySelectorAll('link[rel="stylesheet"]').forEach(function (link) {
      var url = new URL(link.href);
      url.searchParams.set("livereload", Date.now());
      link.href = url.toString();
    });
  });
  source.addEventListener("reload", function () {
    location.reload();
  });
})();
</script>
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Percent-decoded path, without query or fragment
    pub path: String,
}

impl Request {
    pub fn is_head(&self) -> bool {
        self.method == "HEAD"
    }
}

/// Parse `GET /path?query HTTP/1.1`
pub fn parse_request_line(line: &str) -> Option<Request> {
    let mut parts = line.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?;
    let version = parts.next()?;
    if !version.starts_with("HTTP/") {
        return None;
    }

    let raw_path = target.split(['?', '#']).next().unwrap_or("/");
    let path = urlencoding::decode(raw_path).ok()?.into_owned();
    if !path.starts_with('/') {
        return None;
    }

    Some(Request { method, path })
}

/// Map a request path onto the root; `None` means the path tries to escape it
pub fn resolve_path(root: &Path, url_path: &str) -> Option<PathBuf> {
    let mut resolved = root.to_path_buf();
    for segment in url_path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            s if s.contains('\\') || s.contains('\0') || s.contains(':') => return None,
            s => resolved.push(s),
        }
    }
    Some(resolved)
}

pub fn content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") | Some("mjs") => "application/javascript; charset=utf-8",
        Some("json") | Some("map") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

pub fn is_html(path: &Path) -> bool {
    content_type(path).starts_with("text/html")
}

/// Insert the reload client before the last `</body>`, or append it
pub fn inject_reload_script(html: &[u8]) -> Vec<u8> {
    let lowered = html.to_ascii_lowercase();
    let needle = b"</body>";
    let position = lowered
        .windows(needle.len())
        .rposition(|window| window == needle);

    let mut out = Vec::with_capacity(html.len() + RELOAD_SCRIPT.len());
    match position {
        Some(index) => {
            out.extend_from_slice(&html[..index]);
            out.extend_from_slice(RELOAD_SCRIPT.as_bytes());
            out.extend_from_slice(&html[index..]);
        }
        None => {
            out.extend_from_slice(html);
            out.extend_from_slice(RELOAD_SCRIPT.as_bytes());
        }
    }
    out
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        301 => "Moved Permanently",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        _ => "Internal Server Error",
    }
}

#[derive(Debug)]
pub struct Response {
    pub status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Response {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn body(mut self, content_type: &str, body: Vec<u8>) -> Self {
        self.headers
            .push(("Content-Type".to_string(), content_type.to_string()));
        self.body = body;
        self
    }

    /// A plain-text response carrying the status reason
    pub fn status_page(status: u16) -> Self {
        Response::new(status).body(
            "text/plain; charset=utf-8",
            format!("{} {}\n", status, reason(status)).into_bytes(),
        )
    }

    /// Serialize; `head_only` keeps the headers (including the length) but drops the body
    pub fn into_bytes(self, head_only: bool) -> Vec<u8> {
        let mut out = format!("HTTP/1.1 {} {}\r\n", self.status, reason(self.status));
        for (name, value) in &self.headers {
            out.push_str(&format!("{}: {}\r\n", name, value));
        }
        out.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        out.push_str("Cache-Control: no-cache\r\n");
        out.push_str("Connection: close\r\n\r\n");

        let mut bytes = out.into_bytes();
        if !head_only {
            bytes.extend_from_slice(&self.body);
        }
        bytes
    }
}

/// Head of the never-ending event stream response
pub fn event_stream_head() -> &'static [u8] {
    b"HTTP/1.1 200 OK\r\n\
      Content-Type: text/event-stream\r\n\
      Cache-Control: no-cache\r\n\
      Connection: keep-alive\r\n\r\n"
}
