//! Edge proxy integration tests over plain HTTP.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use shipgate::config::{RouteConfig, ShipConfig};
use shipgate::http::EdgeServer;
use shipgate::lifecycle::{shutdown, Shutdown};
use shipgate::net::load_tls_config;
use shipgate::routing::RouteTable;

mod common;

fn route(name: &str, host: Option<&str>, prefix: Option<&str>, target: SocketAddr) -> RouteConfig {
    RouteConfig {
        name: name.to_string(),
        host: host.map(str::to_string),
        path_prefix: prefix.map(str::to_string),
        target: target.to_string(),
        priority: 0,
    }
}

/// Start the edge on an ephemeral port; the returned coordinator stops it.
async fn start_edge(routes: Vec<RouteConfig>) -> (SocketAddr, Shutdown) {
    let mut config = ShipConfig::default();
    config.routes = routes;
    config.timeouts.upstream_secs = 2;

    let table = Arc::new(RouteTable::compile(&config.routes).unwrap());
    let server = EdgeServer::new(&config, table);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let coordinator = Shutdown::new();
    let rx = coordinator.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, shutdown::wait(rx)).await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    (addr, coordinator)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

#[tokio::test]
async fn matched_request_streams_the_backend_response_verbatim() {
    let (backend, hits) = common::start_mock_backend("loan portfolio").await;
    let (edge, shutdown) = start_edge(vec![route("api", None, Some("/"), backend)]).await;

    let res = client()
        .get(format!("http://{edge}/api/loans"))
        .send()
        .await
        .expect("edge unreachable");

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers().get("x-backend").unwrap(), "loans");
    assert_eq!(res.text().await.unwrap(), "loan portfolio");
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn unmatched_request_is_404_without_touching_any_backend() {
    let (backend, hits) = common::start_mock_backend("should never answer").await;
    let (edge, shutdown) = start_edge(vec![route(
        "api",
        Some("loans.example.com"),
        Some("/api"),
        backend,
    )])
    .await;

    // Wrong host and wrong path.
    let res = client()
        .get(format!("http://{edge}/other"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    // Right host, wrong path.
    let res = client()
        .get(format!("http://{edge}/other"))
        .header("host", "loans.example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    assert_eq!(hits.load(Ordering::SeqCst), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn host_match_is_case_insensitive_and_ignores_port() {
    let (backend, _) = common::start_mock_backend("matched").await;
    let (edge, shutdown) = start_edge(vec![route(
        "api",
        Some("loans.example.com"),
        None,
        backend,
    )])
    .await;

    let res = client()
        .get(format!("http://{edge}/anything"))
        .header("host", "LOANS.Example.COM:8443")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "matched");

    shutdown.trigger();
}

#[tokio::test]
async fn dead_backend_is_a_502_and_health_still_answers() {
    let dead = common::unreachable_addr().await;
    let (edge, shutdown) = start_edge(vec![route("api", None, Some("/api"), dead)]).await;

    let res = client()
        .get(format!("http://{edge}/api/loans"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 502);

    // The edge's own liveness probe is independent of backend health.
    let res = client()
        .get(format!("http://{edge}/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "ok");

    shutdown.trigger();
}

#[tokio::test]
async fn higher_priority_route_wins_on_overlap() {
    let (general, general_hits) = common::start_mock_backend("general").await;
    let (specific, specific_hits) = common::start_mock_backend("specific").await;

    let mut catch_all = route("catch-all", None, Some("/"), general);
    catch_all.priority = 0;
    let mut api = route("api", None, Some("/api"), specific);
    api.priority = 10;

    let (edge, shutdown) = start_edge(vec![catch_all, api]).await;

    let res = client()
        .get(format!("http://{edge}/api/loans"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "specific");
    assert_eq!(specific_hits.load(Ordering::SeqCst), 1);
    assert_eq!(general_hits.load(Ordering::SeqCst), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn request_exceeding_the_total_timeout_answers_408() {
    let (backend, _) = common::start_slow_backend("late", Duration::from_secs(3)).await;

    let mut config = ShipConfig::default();
    config.routes = vec![route("api", None, Some("/"), backend)];
    config.timeouts.request_secs = 1;
    config.timeouts.upstream_secs = 5;

    let table = Arc::new(RouteTable::compile(&config.routes).unwrap());
    let server = EdgeServer::new(&config, table);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let coordinator = Shutdown::new();
    let rx = coordinator.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, shutdown::wait(rx)).await;
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let res = client()
        .get(format!("http://{addr}/loans"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 408);

    coordinator.trigger();
}

#[tokio::test]
async fn plaintext_on_the_secure_port_is_rejected_never_proxied() {
    let (backend, hits) = common::start_mock_backend("secure loans").await;
    let proxy_addr: SocketAddr = "127.0.0.1:28481".parse().unwrap();

    let mut config = ShipConfig::default();
    config.routes = vec![route("api", None, Some("/"), backend)];
    config.timeouts.upstream_secs = 2;

    let table = Arc::new(RouteTable::compile(&config.routes).unwrap());
    let server = EdgeServer::new(&config, table);

    let tls = load_tls_config(
        Path::new("tests/fixtures/cert.pem"),
        Path::new("tests/fixtures/key.pem"),
    )
    .await
    .unwrap();

    let coordinator = Shutdown::new();
    let rx = coordinator.subscribe();
    tokio::spawn(async move {
        let _ = server.run_tls(proxy_addr, tls, shutdown::wait(rx)).await;
    });
    tokio::time::sleep(Duration::from_millis(300)).await;

    // Plaintext on the secure port fails the rustls handshake; the
    // connection dies at the edge and the backend is never contacted.
    let plaintext = client()
        .get(format!("http://{proxy_addr}/loans"))
        .send()
        .await;
    assert!(
        plaintext.is_err(),
        "plaintext on the TLS port must be rejected"
    );
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    // A TLS-terminated request on the same port is proxied normally.
    let https = reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap();
    let res = https
        .get(format!("https://{proxy_addr}/loans"))
        .send()
        .await
        .expect("edge unreachable over TLS");
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "secure loans");
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    coordinator.trigger();
}
