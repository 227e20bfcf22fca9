//! Minimal HTTP/1.1 client.
//!
//! Supports GET and POST with JSON bodies over `std::net::TcpStream`,
//! upgraded to TLS through a [`TlsProvider`] for `https` URLs. Requests
//! are sent with `Connection: close` and the response is read to EOF.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use piterm_types::{PitermError, Result};

use crate::tls::TlsProvider;

/// Maximum response body size (8 MB).
const MAX_BODY_SIZE: usize = 8 * 1024 * 1024;

/// TCP connect timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// TCP read timeout.
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// A parsed absolute URL (no userinfo or fragment support).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    /// Path plus any query string, always starting with `/`.
    pub path: String,
}

impl Url {
    /// Parse `http://` / `https://` URLs.
    pub fn parse(input: &str) -> Result<Self> {
        let (scheme, rest) = input
            .split_once("://")
            .ok_or_else(|| PitermError::WebApi(format!("not an absolute URL: {input}")))?;
        let scheme = scheme.to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(PitermError::WebApi(format!("unsupported scheme: {scheme}")));
        }

        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };
        if authority.is_empty() {
            return Err(PitermError::WebApi(format!("missing host in URL: {input}")));
        }

        let (host, port) = match authority.rsplit_once(':') {
            Some((h, p)) => {
                let port: u16 = p
                    .parse()
                    .map_err(|_| PitermError::WebApi(format!("bad port in URL: {input}")))?;
                (h.to_string(), Some(port))
            },
            None => (authority.to_string(), None),
        };

        Ok(Self {
            scheme,
            host,
            port,
            path: path.to_string(),
        })
    }

    /// Join a path-and-query string onto this URL's base.
    pub fn join(&self, path_and_query: &str) -> Self {
        let mut joined = self.clone();
        let base = self.path.trim_end_matches('/');
        joined.path = format!("{base}{path_and_query}");
        joined
    }

    /// The effective TCP port.
    pub fn effective_port(&self) -> u16 {
        self.port
            .unwrap_or(if self.scheme == "https" { 443 } else { 80 })
    }

    fn host_header(&self) -> String {
        let default = if self.scheme == "https" { 443 } else { 80 };
        match self.port {
            Some(p) if p != default => format!("{}:{p}", self.host),
            _ => self.host.clone(),
        }
    }
}

impl std::fmt::Display for Url {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if let Some(p) = self.port {
            write!(f, ":{p}")?;
        }
        write!(f, "{}", self.path)
    }
}

/// Percent-encode a query component (RFC 3986 unreserved set kept).
pub fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            },
            other => {
                out.push_str(&format!("%{other:02X}"));
            },
        }
    }
    out
}

/// One outgoing request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: &'static str,
    pub url: Url,
    /// Extra headers beyond the ones the transport always sends.
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: "GET",
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post_json(url: Url, body: &serde_json::Value) -> Self {
        Self {
            method: "POST",
            url,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Some(body.to_string().into_bytes()),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// A raw parsed HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code (e.g. 200, 207, 404).
    pub status: u16,
    /// Response headers as lowercased (name, value) pairs.
    pub headers: Vec<(String, String)>,
    /// Response body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Parse the body as JSON.
    pub fn json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Sends requests. The real implementation opens sockets; tests swap in
/// canned responses.
pub trait HttpTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Transport over `TcpStream`, with TLS for `https` URLs when a provider
/// is configured.
pub struct TcpTransport {
    tls: Option<Box<dyn TlsProvider>>,
}

impl TcpTransport {
    pub fn new(tls: Option<Box<dyn TlsProvider>>) -> Self {
        Self { tls }
    }
}

impl HttpTransport for TcpTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let url = &request.url;
        log::debug!("{} {url}", request.method);

        let stream = tcp_connect(&url.host, url.effective_port())?;

        let raw = if url.scheme == "https" {
            let tls = self.tls.as_deref().ok_or_else(|| {
                PitermError::WebApi("https URL but no TLS provider configured".to_string())
            })?;
            let mut stream = tls.connect(stream, &url.host)?;
            write_request(&mut stream, request)?;
            read_response(&mut stream)?
        } else {
            let mut stream = stream;
            write_request(&mut stream, request)?;
            read_response(&mut stream)?
        };

        let response = parse_response(&raw)?;
        log::debug!("status {} ({} body bytes)", response.status, response.body.len());
        Ok(response)
    }
}

/// Open a TCP connection with a connect timeout.
fn tcp_connect(host: &str, port: u16) -> Result<TcpStream> {
    use std::net::ToSocketAddrs;

    let addr = format!("{host}:{port}")
        .to_socket_addrs()
        .map_err(|e| PitermError::WebApi(format!("DNS resolution failed for {host}: {e}")))?
        .next()
        .ok_or_else(|| PitermError::WebApi(format!("no addresses for {host}:{port}")))?;

    let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
        .map_err(|e| PitermError::WebApi(format!("connect to {host}:{port} failed: {e}")))?;

    stream
        .set_read_timeout(Some(READ_TIMEOUT))
        .map_err(|e| PitermError::WebApi(format!("set read timeout: {e}")))?;

    Ok(stream)
}

/// Format the request head (request line + headers + blank line).
fn format_head(request: &HttpRequest) -> String {
    let url = &request.url;
    let mut head = format!(
        "{} {} HTTP/1.1\r\n\
         Host: {}\r\n\
         User-Agent: piterm/0.1\r\n\
         Accept: application/json\r\n\
         Connection: close\r\n",
        request.method,
        url.path,
        url.host_header(),
    );
    for (name, value) in &request.headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    if let Some(body) = &request.body {
        head.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    head.push_str("\r\n");
    head
}

/// Send the request over an established stream.
fn write_request(stream: &mut impl Write, request: &HttpRequest) -> Result<()> {
    stream
        .write_all(format_head(request).as_bytes())
        .and_then(|()| match &request.body {
            Some(body) => stream.write_all(body),
            None => Ok(()),
        })
        .map_err(|e| PitermError::WebApi(format!("send request: {e}")))
}

/// Read the entire response until EOF or until the read timeout fires.
fn read_response(stream: &mut impl Read) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(8192);
    let mut chunk = [0u8; 8192];
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                if buf.len() + n > MAX_BODY_SIZE + 4096 {
                    return Err(PitermError::WebApi("response too large".to_string()));
                }
                buf.extend_from_slice(&chunk[..n]);
            },
            Err(e)
                if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut =>
            {
                break;
            },
            Err(e) => {
                return Err(PitermError::WebApi(format!("read response: {e}")));
            },
        }
    }
    Ok(buf)
}

/// Parse raw bytes into status code, headers, and body.
pub fn parse_response(data: &[u8]) -> Result<HttpResponse> {
    let header_end = find_subsequence(data, b"\r\n\r\n").ok_or_else(|| {
        PitermError::WebApi("malformed HTTP response: no header terminator".to_string())
    })?;

    let header_bytes = &data[..header_end];
    let body_start = header_end + 4;

    let header_str = std::str::from_utf8(header_bytes)
        .map_err(|_| PitermError::WebApi("non-UTF-8 headers".to_string()))?;

    let mut lines = header_str.split("\r\n");

    let status_line = lines
        .next()
        .ok_or_else(|| PitermError::WebApi("empty response".to_string()))?;
    let status = parse_status_line(status_line)?;

    let mut headers = Vec::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_lowercase(), value.trim().to_string()));
        }
    }

    let raw_body = &data[body_start..];
    let body = if find_header(&headers, "transfer-encoding").is_some_and(|v| v.contains("chunked"))
    {
        decode_chunked(raw_body)?
    } else if let Some(cl) = find_header(&headers, "content-length") {
        let len: usize = cl
            .parse()
            .map_err(|_| PitermError::WebApi("bad Content-Length".to_string()))?;
        if len > MAX_BODY_SIZE {
            return Err(PitermError::WebApi("response body exceeds 8 MB limit".to_string()));
        }
        raw_body[..raw_body.len().min(len)].to_vec()
    } else {
        raw_body.to_vec()
    };

    if body.len() > MAX_BODY_SIZE {
        return Err(PitermError::WebApi("response body exceeds 8 MB limit".to_string()));
    }

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}

/// Parse the HTTP status code from the status line.
fn parse_status_line(line: &str) -> Result<u16> {
    // Expected: "HTTP/1.x NNN ..."
    let parts: Vec<&str> = line.splitn(3, ' ').collect();
    if parts.len() < 2 {
        return Err(PitermError::WebApi(format!("bad status line: {line}")));
    }
    parts[1]
        .parse()
        .map_err(|_| PitermError::WebApi(format!("bad status code in: {line}")))
}

/// Case-insensitive header lookup.
pub fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    let name_lower = name.to_lowercase();
    headers
        .iter()
        .find(|(k, _)| k == &name_lower)
        .map(|(_, v)| v.as_str())
}

/// Decode a chunked transfer-encoded body.
fn decode_chunked(data: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::new();
    let mut pos = 0;

    while let Some(i) = find_subsequence(&data[pos..], b"\r\n") {
        let line_end = pos + i;

        let size_str = std::str::from_utf8(&data[pos..line_end])
            .map_err(|_| PitermError::WebApi("bad chunk size".to_string()))?
            .trim();
        // Strip optional chunk extensions (after `;`).
        let size_str = size_str.split(';').next().unwrap_or("").trim();
        let size = usize::from_str_radix(size_str, 16)
            .map_err(|_| PitermError::WebApi(format!("bad chunk size: {size_str}")))?;

        if size == 0 {
            break;
        }

        let chunk_start = line_end + 2;
        let chunk_end = chunk_start + size;
        if chunk_end > data.len() {
            return Err(PitermError::WebApi("truncated chunk".to_string()));
        }
        result.extend_from_slice(&data[chunk_start..chunk_end]);
        if result.len() > MAX_BODY_SIZE {
            return Err(PitermError::WebApi("response body exceeds 8 MB limit".to_string()));
        }

        // Skip chunk data and its trailing CRLF.
        pos = chunk_end + 2;
        if pos > data.len() {
            break;
        }
    }

    Ok(result)
}

/// Find the first occurrence of `needle` in `haystack`.
fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
