mod common;

use std::time::Duration;

use axum::routing::get;
use axum::Router;
use reqwest::StatusCode;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use tributary::app::AppContext;
use tributary::config::Config;
use tributary::daemon;

use common::{rss_feed, spawn_upstream};

async fn get_updates(client: &reqwest::Client, base: &str, hash: Option<&str>) -> (StatusCode, serde_json::Value) {
    let mut request = client.get(format!("{base}/api/updates"));
    if let Some(hash) = hash {
        request = request.header("X-Dashboard-Hash", hash);
    }
    let response = request.send().await.unwrap();
    let status = response.status();
    let body = response.bytes().await.unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn serve_publishes_results_and_shuts_down() {
    let upstream = spawn_upstream(Router::new().route("/feed.xml", get(|| async { rss_feed(3) }))).await;

    let config: Config = toml::from_str(&format!(
        r#"
[server]
update_interval = "1m"

[[sections]]
id = "news"
type = "rss"
region = "top-right"
[sections.rss]
url = "{upstream}/feed.xml"

[[sections]]
id = "weather"
type = "weather"
region = "top-left"
[sections.weather]
api_key = ""
city = "Oslo"

[[sections]]
id = "broken"
type = "rss"
[sections.rss]
url = "{upstream}/missing.xml"
"#
    ))
    .unwrap();

    let ctx = AppContext::new(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let cancel = CancellationToken::new();
    let service = tokio::spawn(daemon::run_with(ctx, listener, cancel.clone()));

    let client = reqwest::Client::new();
    let json = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let (status, json) = get_updates(&client, &base, None).await;
            assert_eq!(status, StatusCode::OK);
            let updates = &json["updates"];
            if !updates["news"].is_null() && !updates["weather"].is_null() && !updates["broken"].is_null() {
                break json;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("every section should report");

    let updates = &json["updates"];
    assert_eq!(updates["news"]["status"]["is_healthy"], true);
    assert_eq!(updates["news"]["data"]["items"].as_array().unwrap().len(), 3);
    assert_eq!(updates["weather"]["data"]["setup_required"], true);
    assert_eq!(updates["broken"]["status"]["is_healthy"], false);
    assert_eq!(updates["broken"]["status"]["error"], "unexpected status code: 404");

    let hash = json["hash"].as_str().unwrap();
    let (status, body) = get_updates(&client, &base, Some(hash)).await;
    assert_eq!(status, StatusCode::NOT_MODIFIED);
    assert!(body.is_null());

    let health = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(health.text().await.unwrap(), "OK");

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), service)
        .await
        .expect("service should stop after cancellation")
        .unwrap()
        .unwrap();
}
