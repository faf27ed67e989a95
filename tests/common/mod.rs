//! In-process HTTP fixture server for integration tests
//!
//! Serves canned replies over plain HTTP/1.1 on a loopback port. Every
//! connection is answered once and closed, which is all reqwest needs here.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use grib_fetcher::app::{
    ArchiveWindow, ClientConfig, Endpoints, FetchConfig, OutputLayout, RunClock,
};

/// Where a reply goes quiet
#[derive(Debug, Clone, Copy)]
pub enum Stall {
    /// Sleep after reading the request, before the status line
    BeforeHead(Duration),
    /// Send the head and half the body, then sleep
    MidBody(Duration),
}

/// Canned response
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: Vec<u8>,
    /// Advertised length when it differs from the body (truncated transfers)
    pub content_length: Option<u64>,
    pub stall: Option<Stall>,
}

impl Reply {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            content_length: None,
            stall: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: format!("status {}", status).into_bytes(),
            content_length: None,
            stall: None,
        }
    }

    /// Advertise `claimed` bytes but close after sending `body`
    pub fn truncated(body: impl Into<Vec<u8>>, claimed: u64) -> Self {
        Self {
            status: 200,
            body: body.into(),
            content_length: Some(claimed),
            stall: None,
        }
    }

    /// Answer `body` only after going quiet for a while
    pub fn stalled(body: impl Into<Vec<u8>>, stall: Stall) -> Self {
        Self {
            stall: Some(stall),
            ..Self::ok(body)
        }
    }
}

/// Reply for a path, optionally only when a query value contains a needle
///
/// A route holding several replies serves them in turn and then repeats the
/// last one.
#[derive(Debug, Clone)]
pub struct Route {
    path: String,
    query_contains: Option<String>,
    replies: Vec<Reply>,
    served: Arc<AtomicUsize>,
}

impl Route {
    pub fn new(path: &str, reply: Reply) -> Self {
        Self::sequence(path, vec![reply])
    }

    pub fn with_query(path: &str, needle: &str, reply: Reply) -> Self {
        Self {
            query_contains: Some(needle.to_string()),
            ..Self::new(path, reply)
        }
    }

    pub fn sequence(path: &str, replies: Vec<Reply>) -> Self {
        assert!(!replies.is_empty(), "a route needs at least one reply");
        Self {
            path: path.to_string(),
            query_contains: None,
            replies,
            served: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn next_reply(&self) -> Reply {
        let turn = self.served.fetch_add(1, Ordering::SeqCst);
        self.replies[turn.min(self.replies.len() - 1)].clone()
    }

    fn matches(&self, target: &str) -> bool {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        if path != self.path {
            return false;
        }
        match &self.query_contains {
            None => true,
            Some(needle) => url::form_urlencoded::parse(query.as_bytes())
                .any(|(_, value)| value.contains(needle.as_str())),
        }
    }
}

/// Running fixture server
pub struct FixtureServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl FixtureServer {
    pub async fn start(routes: Vec<Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes = Arc::new(routes);
        let requests = Arc::new(Mutex::new(Vec::new()));

        let handle = tokio::spawn({
            let requests = requests.clone();
            async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let routes = routes.clone();
                    let requests = requests.clone();
                    tokio::spawn(async move {
                        let _ = serve(stream, &routes, &requests).await;
                    });
                }
            }
        });

        Self {
            addr,
            requests,
            handle,
        }
    }

    /// Absolute URL of `path` on this server
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Request targets (path and query) received so far
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Decoded request targets, for readable assertions
    pub fn decoded_requests(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|target| {
                let (path, query) = target.split_once('?').unwrap_or((target, ""));
                let pairs: Vec<String> = url::form_urlencoded::parse(query.as_bytes())
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect();
                if pairs.is_empty() {
                    path.to_string()
                } else {
                    format!("{}?{}", path, pairs.join("&"))
                }
            })
            .collect()
    }
}

impl Drop for FixtureServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(
    mut stream: TcpStream,
    routes: &[Route],
    requests: &Mutex<Vec<String>>,
) -> std::io::Result<()> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
        if buffer.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }

    let head = String::from_utf8_lossy(&buffer);
    let target = head.split_whitespace().nth(1).unwrap_or("/").to_string();
    requests.lock().unwrap().push(target.clone());

    let reply = routes
        .iter()
        .find(|route| route.matches(&target))
        .map(Route::next_reply)
        .unwrap_or_else(|| Reply::status(404));

    if let Some(Stall::BeforeHead(delay)) = reply.stall {
        tokio::time::sleep(delay).await;
    }

    let length = reply.content_length.unwrap_or(reply.body.len() as u64);
    let header = format!(
        "HTTP/1.1 {} Fixture\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n",
        reply.status, length
    );
    stream.write_all(header.as_bytes()).await?;

    if let Some(Stall::MidBody(delay)) = reply.stall {
        let (head, tail) = reply.body.split_at(reply.body.len() / 2);
        stream.write_all(head).await?;
        stream.flush().await?;
        tokio::time::sleep(delay).await;
        stream.write_all(tail).await?;
    } else {
        stream.write_all(&reply.body).await?;
    }
    stream.flush().await?;
    stream.shutdown().await
}

/// Fetch configuration pointing every endpoint at `server`
pub fn fixture_config(server: &FixtureServer, data_dir: &Path) -> FetchConfig {
    FetchConfig {
        client: ClientConfig {
            rate_limit_rps: 100,
            max_retries: 0,
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            ..Default::default()
        },
        endpoints: Endpoints {
            nomads_rap_dir_template: server.url("/rap.{date}/"),
            rap_s3_template: server.url("/rap.{date}/rap.t{hour}z.awip32f00.grib2"),
            mrms_bucket_url: server.url(""),
            mrms_latest_base_url: server.url("/data/2D"),
            ..Default::default()
        },
        output: OutputLayout::new(data_dir),
        archive: ArchiveWindow::default(),
    }
}

/// 16:10 UTC on 3 December 2024, same local date
pub fn afternoon_clock() -> RunClock {
    RunClock::fixed(
        Utc.with_ymd_and_hms(2024, 12, 3, 16, 10, 0).unwrap(),
        NaiveDate::from_ymd_opt(2024, 12, 3).unwrap(),
    )
}

/// Gzip `bytes` the way MRMS publishes its products
pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

/// NOMADS-style index page listing the given hrefs
pub fn index_page(hrefs: &[&str]) -> String {
    let mut page = String::from(
        "<html><head><title>Index of /rap.20241203</title></head><body><pre><a href=\"../\">Parent Directory</a>\n",
    );
    for href in hrefs {
        page.push_str(&format!(
            "<a href=\"{href}\">{href}</a>  03-Dec-2024 15:52  13M\n"
        ));
    }
    page.push_str("</pre></body></html>");
    page
}

/// S3 ListObjectsV2 body with the given keys
pub fn bucket_listing(prefix: &str, keys: &[&str]) -> String {
    let mut body = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ListBucketResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\"><Name>noaa-mrms-pds</Name><Prefix>{prefix}</Prefix><KeyCount>{}</KeyCount><MaxKeys>1000</MaxKeys><IsTruncated>false</IsTruncated>",
        keys.len()
    );
    for key in keys {
        body.push_str(&format!(
            "<Contents><Key>{key}</Key><LastModified>2024-12-03T15:01:02.000Z</LastModified><Size>1024</Size><StorageClass>STANDARD</StorageClass></Contents>"
        ));
    }
    body.push_str("</ListBucketResult>");
    body
}
