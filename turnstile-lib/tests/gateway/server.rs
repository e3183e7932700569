use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use turnstile_lib::config::{Config, Route};
use turnstile_lib::gateway::{serve, GatewayState};
use turnstile_lib::Category;

type TestResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

const BROWSER: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Upstream that answers 200 and echoes the X-Forwarded-For it received
async fn spawn_upstream() -> Result<SocketAddr, std::io::Error> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let svc = hyper::service::service_fn(|req: Request<Incoming>| async move {
                    let seen = req.headers().get("x-forwarded-for").cloned();
                    let mut resp = Response::new(Full::new(Bytes::from_static(b"upstream ok")));
                    if let Some(v) = seen {
                        resp.headers_mut().insert("x-seen-forwarded-for", v);
                    }
                    Ok::<_, hyper::Error>(resp)
                });
                let _ = hyper::server::conn::http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), svc)
                    .await;
            });
        }
    });
    Ok(addr)
}

/// Upstream that accepts connections and never answers
async fn spawn_silent_upstream() -> Result<SocketAddr, std::io::Error> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    Ok(addr)
}

fn config(upstream: SocketAddr) -> Config {
    let mut cfg = Config::new(SocketAddr::from(([127, 0, 0, 1], 0)), upstream.to_string());
    cfg.routes = vec![
        Route { prefix: "/api/auth".to_string(), category: Category::Auth, identity_header: None },
        Route {
            prefix: "/api/checkout".to_string(),
            category: Category::Payment,
            identity_header: Some("x-authenticated-user".to_string()),
        },
    ];
    cfg.timeout.upstream_ms = 300;
    cfg.timeout.shutdown_secs = 1;
    cfg
}

async fn start_gateway(cfg: &Config) -> Result<(String, CancellationToken), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = Arc::new(GatewayState::from_config(cfg, None)?);
    let token = CancellationToken::new();
    tokio::spawn(serve(listener, state, token.clone()));
    Ok((format!("http://{addr}"), token))
}

fn client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
}

fn header(resp: &reqwest::Response, name: &str) -> Option<String> {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[tokio::test]
async fn auth_route_is_limited_after_five_requests() -> TestResult {
    let upstream = spawn_upstream().await?;
    let (base, token) = start_gateway(&config(upstream)).await?;
    let client = client()?;

    for expected in ["4", "3", "2", "1", "0"] {
        let resp = client
            .post(format!("{base}/api/auth/login"))
            .header("user-agent", BROWSER)
            .header("x-real-ip", "1.2.3.4")
            .send()
            .await?;
        assert_eq!(resp.status(), 200);
        assert_eq!(header(&resp, "x-ratelimit-limit").as_deref(), Some("5"));
        assert_eq!(header(&resp, "x-ratelimit-remaining").as_deref(), Some(expected));
        assert!(header(&resp, "x-ratelimit-reset").is_some());
        assert!(header(&resp, "retry-after").is_none());
        assert_eq!(resp.text().await?, "upstream ok");
    }

    let resp = client
        .post(format!("{base}/api/auth/login"))
        .header("user-agent", BROWSER)
        .header("x-real-ip", "1.2.3.4")
        .send()
        .await?;
    assert_eq!(resp.status(), 429);
    assert_eq!(header(&resp, "x-turnstile-reason").as_deref(), Some("rate limit exceeded"));
    assert_eq!(header(&resp, "x-ratelimit-remaining").as_deref(), Some("0"));
    let retry_after: u64 = header(&resp, "retry-after")
        .and_then(|v| v.parse().ok())
        .unwrap_or_default();
    assert!(retry_after > 0);

    // other categories for the same client are untouched
    let resp = client
        .get(format!("{base}/courses"))
        .header("user-agent", BROWSER)
        .header("x-real-ip", "1.2.3.4")
        .send()
        .await?;
    assert_eq!(resp.status(), 200);
    assert_eq!(header(&resp, "x-ratelimit-remaining").as_deref(), Some("99"));

    token.cancel();
    Ok(())
}

#[tokio::test]
async fn bot_user_agent_is_rejected() -> TestResult {
    let upstream = spawn_upstream().await?;
    let (base, token) = start_gateway(&config(upstream)).await?;

    let resp = client()?
        .get(format!("{base}/courses"))
        .header("user-agent", "curl/7.68.0")
        .send()
        .await?;
    assert_eq!(resp.status(), 429);
    assert_eq!(header(&resp, "x-turnstile-reason").as_deref(), Some("bot user-agent detected"));
    assert!(resp.text().await?.contains("bot user-agent detected"));

    token.cancel();
    Ok(())
}

#[tokio::test]
async fn identity_header_shares_quota_across_addresses() -> TestResult {
    let upstream = spawn_upstream().await?;
    let (base, token) = start_gateway(&config(upstream)).await?;
    let client = client()?;

    let mut statuses = Vec::new();
    for ip in ["1.1.1.1", "2.2.2.2", "3.3.3.3", "4.4.4.4"] {
        let resp = client
            .post(format!("{base}/api/checkout"))
            .header("user-agent", BROWSER)
            .header("x-real-ip", ip)
            .header("x-authenticated-user", "student-42")
            .send()
            .await?;
        statuses.push(resp.status().as_u16());
    }
    assert_eq!(statuses, vec![200, 200, 200, 429]);

    token.cancel();
    Ok(())
}

#[tokio::test]
async fn forwards_client_address_upstream() -> TestResult {
    let upstream = spawn_upstream().await?;
    let (base, token) = start_gateway(&config(upstream)).await?;

    let resp = client()?
        .get(format!("{base}/courses"))
        .header("user-agent", BROWSER)
        .header("x-forwarded-for", "203.0.113.5")
        .send()
        .await?;
    assert_eq!(resp.status(), 200);
    assert_eq!(
        header(&resp, "x-seen-forwarded-for").as_deref(),
        Some("203.0.113.5, 127.0.0.1")
    );

    token.cancel();
    Ok(())
}

#[tokio::test]
async fn unreachable_upstream_is_bad_gateway() -> TestResult {
    // bind and drop to get a port nobody listens on
    let unused = TcpListener::bind("127.0.0.1:0").await?.local_addr()?;
    let (base, token) = start_gateway(&config(unused)).await?;

    let resp = client()?
        .get(format!("{base}/courses"))
        .header("user-agent", BROWSER)
        .send()
        .await?;
    assert_eq!(resp.status(), 502);
    // the request was still counted
    assert_eq!(header(&resp, "x-ratelimit-remaining").as_deref(), Some("99"));

    token.cancel();
    Ok(())
}

#[tokio::test]
async fn slow_upstream_is_gateway_timeout() -> TestResult {
    let upstream = spawn_silent_upstream().await?;
    let (base, token) = start_gateway(&config(upstream)).await?;

    let resp = client()?
        .get(format!("{base}/courses"))
        .header("user-agent", BROWSER)
        .send()
        .await?;
    assert_eq!(resp.status(), 504);

    token.cancel();
    Ok(())
}

#[tokio::test]
async fn serve_returns_after_cancel() -> TestResult {
    let upstream = spawn_upstream().await?;
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let state = Arc::new(GatewayState::from_config(&config(upstream), None)?);
    let token = CancellationToken::new();
    let handle = tokio::spawn(serve(listener, state, token.clone()));

    token.cancel();
    let result = tokio::time::timeout(Duration::from_secs(3), handle).await??;
    assert!(result.is_ok());
    Ok(())
}
