use axum::routing::get;
use axum::Router;
use petclinic_e2e::server::{WebServer, WebServerConfig};
use petclinic_e2e::E2eError;

async fn running_app() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let app = Router::new().route("/", get(|| async { "Welcome" }));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    url
}

#[tokio::test]
async fn running_app_is_reused_without_spawning() {
    let url = running_app().await;
    let config = WebServerConfig {
        command: Some("exit 1".into()),
        ..Default::default()
    };

    let server = WebServer::ensure(&config, &url).await.unwrap();
    assert!(server.is_none());
}

#[tokio::test]
async fn running_app_is_an_error_when_reuse_is_off() {
    let url = running_app().await;
    let config = WebServerConfig {
        reuse_existing: false,
        ..Default::default()
    };

    let err = WebServer::ensure(&config, &url).await.err().unwrap();
    match err {
        E2eError::ServerStartup(message) => assert!(message.contains(&url)),
        other => panic!("expected ServerStartup, got {:?}", other),
    }
}
