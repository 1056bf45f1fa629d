use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use petclinic_e2e::readiness::wait_for_http_ok_with;
use petclinic_e2e::E2eError;

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(1))
        .build()
        .unwrap()
}

/// An app that is already up passes the gate on the first probe
#[tokio::test]
async fn ready_app_passes_immediately() {
    let url = serve(Router::new().route("/", get(|| async { "Welcome" }))).await;

    let start = Instant::now();
    wait_for_http_ok_with(&client(), &url, Duration::from_secs(5), Duration::from_millis(50))
        .await
        .unwrap();
    assert!(start.elapsed() < Duration::from_secs(2));
}

/// A second gate on a healthy app is just one more probe, with no waiting
#[tokio::test]
async fn repeated_gate_on_healthy_app_is_one_probe_each() {
    let probes = Arc::new(AtomicU32::new(0));
    let counter = probes.clone();
    let router = Router::new().route(
        "/",
        get(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                "Welcome"
            }
        }),
    );
    let url = serve(router).await;
    let client = client();
    let interval = Duration::from_secs(2);

    for call in 1..=2 {
        let start = Instant::now();
        wait_for_http_ok_with(&client, &url, Duration::from_secs(10), interval)
            .await
            .unwrap();
        assert!(start.elapsed() < interval / 2, "call {} took {:?}", call, start.elapsed());
        assert_eq!(probes.load(Ordering::SeqCst), call);
    }
}

/// An app that answers 503 while booting passes once it turns healthy
#[tokio::test]
async fn booting_app_passes_after_it_turns_healthy() {
    let probes = Arc::new(AtomicU32::new(0));
    let counter = probes.clone();
    let router = Router::new().route(
        "/",
        get(move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 3 {
                    StatusCode::SERVICE_UNAVAILABLE
                } else {
                    StatusCode::OK
                }
            }
        }),
    );
    let url = serve(router).await;

    wait_for_http_ok_with(&client(), &url, Duration::from_secs(5), Duration::from_millis(20))
        .await
        .unwrap();
    assert_eq!(probes.load(Ordering::SeqCst), 4);
}

/// A permanently unhealthy app fails the gate with the last status seen
#[tokio::test]
async fn unhealthy_app_times_out_with_status() {
    let url = serve(Router::new().route("/", get(|| async { StatusCode::SERVICE_UNAVAILABLE }))).await;

    let err = wait_for_http_ok_with(&client(), &url, Duration::from_millis(300), Duration::from_millis(50))
        .await
        .unwrap_err();

    match err {
        E2eError::EnvironmentNotReady { url: failed, last_error } => {
            assert_eq!(failed, url);
            assert_eq!(last_error, "Non-OK response: 503");
        }
        other => panic!("expected EnvironmentNotReady, got {:?}", other),
    }
}

/// Nothing listening: the gate reports the connection error, not a status
#[tokio::test]
async fn unreachable_app_reports_connection_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = wait_for_http_ok_with(&client(), &url, Duration::from_millis(300), Duration::from_millis(50))
        .await
        .unwrap_err();

    match err {
        E2eError::EnvironmentNotReady { last_error, .. } => {
            assert!(!last_error.starts_with("Non-OK"), "got: {}", last_error);
        }
        other => panic!("expected EnvironmentNotReady, got {:?}", other),
    }
}
