//! Reachability probes.
//!
//! Each probe opens a fresh connection, performs at most a minimal
//! protocol handshake, and closes it again. The whole attempt, including
//! DNS resolution, is bounded by a single timeout.

use std::future::Future;
use std::io;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Empty;
use hyper_util::rt::TokioIo;
use sqlx::mysql::{MySqlConnectOptions, MySqlSslMode};
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use sqlx::{ConnectOptions, Connection};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

use devilbox_core::config::DEFAULT_PROBE_TIMEOUT;
use devilbox_core::{Credentials, ProbeKind, ProbeResult};

const USER_AGENT: &str = concat!("devilbox-health/", env!("CARGO_PKG_VERSION"));

/// Seam between the aggregator and the network.
pub trait Prober: Sync {
    /// Probe one address. Must never panic; failures are results.
    fn probe(
        &self,
        kind: ProbeKind,
        host: &str,
        port: u16,
        credentials: Option<&Credentials>,
    ) -> impl Future<Output = ProbeResult> + Send;
}

/// Probes real endpoints with a fixed per-probe timeout.
#[derive(Debug, Clone, Copy)]
pub struct NetworkProber {
    timeout: Duration,
}

impl NetworkProber {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for NetworkProber {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

impl Prober for NetworkProber {
    async fn probe(
        &self,
        kind: ProbeKind,
        host: &str,
        port: u16,
        credentials: Option<&Credentials>,
    ) -> ProbeResult {
        probe(kind, host, port, self.timeout, credentials).await
    }
}

/// Probe `(host, port)` with the handshake for `kind`, giving up after
/// `timeout`.
pub async fn probe(
    kind: ProbeKind,
    host: &str,
    port: u16,
    timeout: Duration,
    credentials: Option<&Credentials>,
) -> ProbeResult {
    if host.trim().is_empty() {
        return ProbeResult::unreachable(host, "no address to connect to");
    }

    let attempt = async {
        match kind {
            ProbeKind::Tcp => tcp_probe(host, port).await,
            ProbeKind::Http => http_probe(host, port).await,
            ProbeKind::Mysql => mysql_probe(host, port, credentials).await,
            ProbeKind::Postgres => postgres_probe(host, port, credentials).await,
            ProbeKind::Redis => redis_probe(host, port, credentials).await,
            ProbeKind::Memcached => memcached_probe(host, port).await,
        }
    };

    match tokio::time::timeout(timeout, attempt).await {
        Ok(result) => result,
        Err(_) => {
            debug!(%host, port, ?kind, "probe timed out");
            ProbeResult::unreachable(host, format!("timed out after {timeout:?}"))
        }
    }
}

async fn connect(host: &str, port: u16) -> Result<TcpStream, ProbeResult> {
    TcpStream::connect((host, port)).await.map_err(|e| {
        debug!(error = %e, %host, port, "probe connection failed");
        ProbeResult::unreachable(host, e)
    })
}

fn authority(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

// ── TCP ────────────────────────────────────────────────────────────

async fn tcp_probe(host: &str, port: u16) -> ProbeResult {
    match connect(host, port).await {
        Ok(_stream) => ProbeResult::success(host),
        Err(result) => result,
    }
}

// ── HTTP ───────────────────────────────────────────────────────────

/// Any response below 500 means the web server is up and serving.
async fn http_probe(host: &str, port: u16) -> ProbeResult {
    let stream = match connect(host, port).await {
        Ok(s) => s,
        Err(result) => return result,
    };

    let io = TokioIo::new(stream);
    let (mut sender, conn) = match hyper::client::conn::http1::handshake(io).await {
        Ok(pair) => pair,
        Err(e) => {
            debug!(error = %e, %host, port, "http probe handshake failed");
            return ProbeResult::rejected(host, format!("http handshake failed: {e}"));
        }
    };

    // Drive the connection in the background.
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let req = match http::Request::builder()
        .method("GET")
        .uri("/")
        .header("host", authority(host, port))
        .header("user-agent", USER_AGENT)
        .body(Empty::<Bytes>::new())
    {
        Ok(req) => req,
        Err(e) => return ProbeResult::rejected(host, format!("invalid request: {e}")),
    };

    match sender.send_request(req).await {
        Ok(resp) if resp.status().is_server_error() => {
            debug!(status = %resp.status(), %host, port, "http probe server error");
            ProbeResult::rejected(host, format!("HTTP {}", resp.status()))
        }
        Ok(_) => ProbeResult::success(host),
        Err(e) => {
            debug!(error = %e, %host, port, "http probe request failed");
            ProbeResult::rejected(host, format!("http request failed: {e}"))
        }
    }
}

// ── SQL ────────────────────────────────────────────────────────────

/// Resolve before handing the host to sqlx, whose lookup errors are
/// indistinguishable from other I/O failures.
async fn resolve(host: &str, port: u16) -> Result<(), ProbeResult> {
    match tokio::net::lookup_host((host, port)).await {
        Ok(mut addrs) => {
            if addrs.next().is_some() {
                Ok(())
            } else {
                Err(ProbeResult::unreachable(host, "no addresses found"))
            }
        }
        Err(e) => {
            debug!(error = %e, %host, port, "sql probe lookup failed");
            Err(ProbeResult::unreachable(host, e))
        }
    }
}

/// Only connect-time I/O errors mean the server was never reached. EOF or a
/// reset mid-handshake means something answered and then gave up.
fn classify_sqlx(host: &str, err: sqlx::Error) -> ProbeResult {
    debug!(error = %err, %host, "sql probe failed");
    match err {
        sqlx::Error::Io(e) if is_connect_failure(&e) => ProbeResult::unreachable(host, e),
        sqlx::Error::Io(e) => ProbeResult::rejected(host, format!("handshake failed: {e}")),
        sqlx::Error::Database(e) => ProbeResult::rejected(host, e),
        other => ProbeResult::rejected(host, other),
    }
}

fn is_connect_failure(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::TimedOut
            | io::ErrorKind::NotFound
            | io::ErrorKind::HostUnreachable
            | io::ErrorKind::NetworkUnreachable
            | io::ErrorKind::AddrNotAvailable
    )
}

async fn mysql_probe(host: &str, port: u16, credentials: Option<&Credentials>) -> ProbeResult {
    if let Err(result) = resolve(host, port).await {
        return result;
    }

    let mut options = MySqlConnectOptions::new()
        .host(host)
        .port(port)
        .ssl_mode(MySqlSslMode::Disabled);
    if let Some(creds) = credentials {
        options = options.username(&creds.user);
        if !creds.pass.is_empty() {
            options = options.password(&creds.pass);
        }
    }

    match options.connect().await {
        Ok(conn) => {
            let _ = conn.close().await;
            ProbeResult::success(host)
        }
        Err(e) => classify_sqlx(host, e),
    }
}

async fn postgres_probe(host: &str, port: u16, credentials: Option<&Credentials>) -> ProbeResult {
    if let Err(result) = resolve(host, port).await {
        return result;
    }

    let mut options = PgConnectOptions::new_without_pgpass()
        .host(host)
        .port(port)
        .ssl_mode(PgSslMode::Disable);
    if let Some(creds) = credentials {
        options = options.username(&creds.user).database(&creds.user);
        if !creds.pass.is_empty() {
            options = options.password(&creds.pass);
        }
    }

    match options.connect().await {
        Ok(conn) => {
            let _ = conn.close().await;
            ProbeResult::success(host)
        }
        Err(e) => classify_sqlx(host, e),
    }
}

// ── Line protocols ─────────────────────────────────────────────────

/// Encode a RESP array of bulk strings.
fn resp_command(args: &[&str]) -> Vec<u8> {
    let mut out = format!("*{}\r\n", args.len()).into_bytes();
    for arg in args {
        out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        out.extend_from_slice(arg.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Send `request` and read one reply line.
async fn exchange(stream: &mut BufReader<TcpStream>, request: &[u8]) -> io::Result<String> {
    stream.get_mut().write_all(request).await?;
    let mut line = String::new();
    if stream.read_line(&mut line).await? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed by server",
        ));
    }
    Ok(line.trim_end().to_string())
}

async fn redis_probe(host: &str, port: u16, credentials: Option<&Credentials>) -> ProbeResult {
    let mut stream = match connect(host, port).await {
        Ok(s) => BufReader::new(s),
        Err(result) => return result,
    };

    if let Some(creds) = credentials.filter(|c| !c.pass.is_empty()) {
        let auth = if creds.user.is_empty() {
            resp_command(&["AUTH", &creds.pass])
        } else {
            resp_command(&["AUTH", &creds.user, &creds.pass])
        };
        match exchange(&mut stream, &auth).await {
            Ok(reply) if reply.starts_with("+OK") => {}
            Ok(reply) => return ProbeResult::rejected(host, reply.trim_start_matches('-')),
            Err(e) => return ProbeResult::rejected(host, format!("redis handshake failed: {e}")),
        }
    }

    match exchange(&mut stream, &resp_command(&["PING"])).await {
        Ok(reply) if reply.starts_with("+PONG") => ProbeResult::success(host),
        Ok(reply) if reply.starts_with('-') => {
            ProbeResult::rejected(host, reply.trim_start_matches('-'))
        }
        Ok(reply) => ProbeResult::rejected(host, format!("unexpected reply to PING: {reply:?}")),
        Err(e) => ProbeResult::rejected(host, format!("redis handshake failed: {e}")),
    }
}

async fn memcached_probe(host: &str, port: u16) -> ProbeResult {
    let mut stream = match connect(host, port).await {
        Ok(s) => BufReader::new(s),
        Err(result) => return result,
    };

    match exchange(&mut stream, b"version\r\n").await {
        Ok(reply) if reply.starts_with("VERSION") => ProbeResult::success(host),
        Ok(reply) => ProbeResult::rejected(host, format!("unexpected reply to version: {reply:?}")),
        Err(e) => ProbeResult::rejected(host, format!("memcached handshake failed: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Instant;

    use devilbox_core::FailureKind;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    const SHORT: Duration = Duration::from_millis(500);

    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        port
    }

    /// Accept connections and answer each read with the next scripted reply.
    async fn scripted_server(replies: &[&'static str]) -> u16 {
        let replies = replies.to_vec();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((mut sock, _)) = listener.accept().await {
                let replies = replies.clone();
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    for reply in replies {
                        match sock.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(_) => {}
                        }
                        if sock.write_all(reply.as_bytes()).await.is_err() {
                            return;
                        }
                    }
                    // Swallow input until the client hangs up.
                    while let Ok(n) = sock.read(&mut buf).await {
                        if n == 0 {
                            break;
                        }
                    }
                });
            }
        });
        port
    }

    #[tokio::test]
    async fn tcp_open_listener_succeeds() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let result = probe(ProbeKind::Tcp, "127.0.0.1", port, SHORT, None).await;
        assert!(result.succeeded);
        assert!(result.error_detail.is_none());
        assert_eq!(result.host, "127.0.0.1");
    }

    #[tokio::test]
    async fn tcp_closed_port_fails_with_detail() {
        let port = closed_port().await;
        let result = probe(ProbeKind::Tcp, "127.0.0.1", port, SHORT, None).await;
        assert!(!result.succeeded);
        assert_eq!(result.failure, Some(FailureKind::Unreachable));
        assert!(!result.error_detail.unwrap().is_empty());
    }

    #[tokio::test]
    async fn port_one_fails_within_timeout() {
        let start = Instant::now();
        let result = probe(ProbeKind::Tcp, "127.0.0.1", 1, Duration::from_secs(1), None).await;
        assert!(!result.succeeded);
        assert!(result.error_detail.is_some());
        assert!(start.elapsed() <= Duration::from_millis(1200));
    }

    #[tokio::test]
    async fn empty_host_is_unreachable() {
        let result = probe(ProbeKind::Mysql, "", 3306, SHORT, None).await;
        assert!(!result.succeeded);
        assert_eq!(result.failure, Some(FailureKind::Unreachable));
    }

    #[tokio::test]
    async fn http_any_client_error_still_counts_as_up() {
        let port = scripted_server(&["HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\n\r\n"]).await;
        let result = probe(ProbeKind::Http, "127.0.0.1", port, SHORT, None).await;
        assert!(result.succeeded, "{result:?}");
    }

    #[tokio::test]
    async fn http_server_error_is_rejected() {
        let port = scripted_server(&[
            "HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\n\r\n",
        ])
        .await;
        let result = probe(ProbeKind::Http, "127.0.0.1", port, SHORT, None).await;
        assert!(!result.succeeded);
        assert_eq!(result.failure, Some(FailureKind::Rejected));
        assert!(result.error_detail.unwrap().contains("503"));
    }

    #[tokio::test]
    async fn redis_pong_succeeds() {
        let port = scripted_server(&["+PONG\r\n"]).await;
        let result = probe(ProbeKind::Redis, "127.0.0.1", port, SHORT, None).await;
        assert!(result.succeeded, "{result:?}");
    }

    #[tokio::test]
    async fn redis_noauth_is_rejected() {
        let port = scripted_server(&["-NOAUTH Authentication required.\r\n"]).await;
        let result = probe(ProbeKind::Redis, "127.0.0.1", port, SHORT, None).await;
        assert_eq!(result.failure, Some(FailureKind::Rejected));
        assert!(result.error_detail.unwrap().contains("NOAUTH"));
    }

    #[tokio::test]
    async fn redis_auth_then_ping() {
        let port = scripted_server(&["+OK\r\n", "+PONG\r\n"]).await;
        let creds = Credentials::new("", "secret");
        let result = probe(ProbeKind::Redis, "127.0.0.1", port, SHORT, Some(&creds)).await;
        assert!(result.succeeded, "{result:?}");
    }

    #[tokio::test]
    async fn redis_wrong_password_is_rejected() {
        let port =
            scripted_server(&["-WRONGPASS invalid username-password pair\r\n"]).await;
        let creds = Credentials::new("", "nope");
        let result = probe(ProbeKind::Redis, "127.0.0.1", port, SHORT, Some(&creds)).await;
        assert_eq!(result.failure, Some(FailureKind::Rejected));
        assert!(result.error_detail.unwrap().contains("WRONGPASS"));
    }

    #[tokio::test]
    async fn silent_server_times_out_as_unreachable() {
        let port = scripted_server(&[]).await;
        let start = Instant::now();
        let result = probe(ProbeKind::Memcached, "127.0.0.1", port, Duration::from_millis(200), None).await;
        assert_eq!(result.failure, Some(FailureKind::Unreachable));
        assert!(result.error_detail.unwrap().contains("timed out"));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn memcached_version_succeeds() {
        let port = scripted_server(&["VERSION 1.6.21\r\n"]).await;
        let result = probe(ProbeKind::Memcached, "127.0.0.1", port, SHORT, None).await;
        assert!(result.succeeded, "{result:?}");
    }

    #[tokio::test]
    async fn memcached_garbage_is_rejected() {
        let port = scripted_server(&["ERROR\r\n"]).await;
        let result = probe(ProbeKind::Memcached, "127.0.0.1", port, SHORT, None).await;
        assert_eq!(result.failure, Some(FailureKind::Rejected));
    }

    #[tokio::test]
    async fn mysql_closed_port_is_unreachable() {
        let port = closed_port().await;
        let creds = Credentials::new("root", "");
        let result = probe(ProbeKind::Mysql, "127.0.0.1", port, SHORT, Some(&creds)).await;
        assert!(!result.succeeded);
        assert_eq!(result.failure, Some(FailureKind::Unreachable));
    }

    #[tokio::test]
    async fn postgres_closed_port_is_unreachable() {
        let port = closed_port().await;
        let creds = Credentials::new("postgres", "pw");
        let result = probe(ProbeKind::Postgres, "127.0.0.1", port, SHORT, Some(&creds)).await;
        assert!(!result.succeeded);
        assert_eq!(result.failure, Some(FailureKind::Unreachable));
    }

    /// Write `greeting` as soon as a client connects, then hang up.
    async fn blurt_and_close(greeting: &'static [u8]) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((mut sock, _)) = listener.accept().await {
                let _ = sock.write_all(greeting).await;
            }
        });
        port
    }

    const NOT_SQL: &[u8] = b"HTTP/1.1 400 Bad Request\r\ncontent-length: 0\r\n\r\n";

    #[tokio::test]
    async fn mysql_non_sql_listener_is_rejected() {
        let port = blurt_and_close(NOT_SQL).await;
        let creds = Credentials::new("root", "");
        let result = probe(ProbeKind::Mysql, "127.0.0.1", port, SHORT, Some(&creds)).await;
        assert_eq!(result.failure, Some(FailureKind::Rejected), "{result:?}");
    }

    #[tokio::test]
    async fn postgres_non_sql_listener_is_rejected() {
        let port = blurt_and_close(NOT_SQL).await;
        let creds = Credentials::new("postgres", "pw");
        let result = probe(ProbeKind::Postgres, "127.0.0.1", port, SHORT, Some(&creds)).await;
        assert_eq!(result.failure, Some(FailureKind::Rejected), "{result:?}");
    }

    #[tokio::test]
    async fn sql_unresolvable_host_is_unreachable() {
        let result = probe(ProbeKind::Postgres, "pgsql.invalid", 5432, SHORT, None).await;
        assert_eq!(result.failure, Some(FailureKind::Unreachable), "{result:?}");
    }

    #[test]
    fn only_connect_errors_count_as_unreachable() {
        let eof = sqlx::Error::Io(io::Error::from(io::ErrorKind::UnexpectedEof));
        let reset = sqlx::Error::Io(io::Error::from(io::ErrorKind::ConnectionReset));
        let refused = sqlx::Error::Io(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert_eq!(classify_sqlx("db", eof).failure, Some(FailureKind::Rejected));
        assert_eq!(classify_sqlx("db", reset).failure, Some(FailureKind::Rejected));
        assert_eq!(classify_sqlx("db", refused).failure, Some(FailureKind::Unreachable));
    }

    #[tokio::test]
    async fn network_prober_uses_its_timeout() {
        let prober = NetworkProber::new(Duration::from_millis(150));
        assert_eq!(prober.timeout(), Duration::from_millis(150));
        let port = scripted_server(&[]).await;
        let result = prober.probe(ProbeKind::Redis, "127.0.0.1", port, None).await;
        assert!(result.error_detail.unwrap().contains("timed out"));
    }

    #[test]
    fn resp_encoding() {
        assert_eq!(resp_command(&["PING"]), b"*1\r\n$4\r\nPING\r\n");
        assert_eq!(
            resp_command(&["AUTH", "pw"]),
            b"*2\r\n$4\r\nAUTH\r\n$2\r\npw\r\n"
        );
    }

    #[test]
    fn ipv6_authority_is_bracketed() {
        assert_eq!(authority("::1", 80), "[::1]:80");
        assert_eq!(authority("httpd", 80), "httpd:80");
    }
}
