//! End-to-end: start the whole service, use both APIs, shut it down.

use std::time::Duration;

use serde_json::Value;
use tokio::sync::oneshot;

use appraisal_server::catalog::ItemMeta;
use appraisal_server::config::Transport;
use appraisal_server::lifecycle::{run_service, StartupError};
use appraisal_server::store::AppraisalStore;

mod common;

#[tokio::test]
async fn serves_appraisals_and_flushes_on_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let public = "127.0.0.1:38471";
    let management = "127.0.0.1:38472";
    let mut config = common::service_config(dir.path(), public, management);
    config.admin.api_key = "secret".to_string();
    let db_path = config.db_file("appraisals.json");

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let service = tokio::spawn(run_service(config, async move {
        let _ = stop_rx.await;
    }));

    common::wait_until_ready(&format!("http://{}/health", public)).await;
    let client = common::client();

    // Public API
    let created: Value = client
        .post(format!("http://{}/appraisal", public))
        .body("Tritanium\t1,000\nPyerite\t250")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(created["recognizer"], "assets");
    assert_eq!(created["generation"], 1);
    assert_eq!(created["items"][0]["quantity"], 1000);
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["url"], format!("http://{}/appraisal/{}", public, id));

    let fetched: Value = client
        .get(format!("http://{}/appraisal/{}", public, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["id"], id.as_str());

    // Management API
    let unauthorized = client
        .get(format!("http://{}/admin/status", management))
        .send()
        .await
        .unwrap();
    assert_eq!(unauthorized.status(), 401);

    let status: Value = client
        .get(format!("http://{}/admin/status", management))
        .bearer_auth("secret")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["generation"], 1);
    assert_eq!(status["items"], common::base_items().len());

    let listeners: Value = client
        .get(format!("http://{}/admin/listeners", management))
        .bearer_auth("secret")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listeners.as_array().unwrap().len(), 2);
    assert_eq!(listeners[1]["transport"], Transport::Management.to_string());

    // A manual refresh after a catalog change installs the next generation.
    let mut items = common::base_items();
    items.push(ItemMeta::new(36, "Mexallon"));
    common::write_catalog(dir.path(), &items);
    let refresh = client
        .post(format!("http://{}/admin/catalog/refresh", management))
        .bearer_auth("secret")
        .send()
        .await
        .unwrap();
    assert_eq!(refresh.status(), 202);

    let mut generation = 1;
    for _ in 0..100 {
        let status: Value = client
            .get(format!("http://{}/admin/status", management))
            .bearer_auth("secret")
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        generation = status["generation"].as_u64().unwrap();
        if generation == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(generation, 2);

    // Shutdown releases everything and flushes the appraisal store.
    stop_tx.send(()).unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(10), service)
        .await
        .unwrap()
        .unwrap();
    assert!(outcome.is_ok(), "service failed: {:?}", outcome);

    let reopened = AppraisalStore::open(&db_path).unwrap();
    assert_eq!(reopened.len(), 1);
    assert!(client
        .get(format!("http://{}/health", public))
        .send()
        .await
        .is_err());
}

#[tokio::test]
async fn required_listener_failure_unwinds_startup() {
    let dir = tempfile::tempdir().unwrap();
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let taken_addr = taken.local_addr().unwrap().to_string();
    let config = common::service_config(dir.path(), "127.0.0.1:0", &taken_addr);
    let db_path = config.db_file("appraisals.json");

    let outcome = tokio::time::timeout(
        Duration::from_secs(10),
        run_service(config, std::future::pending()),
    )
    .await
    .unwrap();

    assert!(matches!(outcome, Err(StartupError::Listener(_))));
    // Stores acquired before the failure were still released (flushed).
    assert!(db_path.exists());
}
