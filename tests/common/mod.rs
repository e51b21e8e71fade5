//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::{extract::Path as UrlPath, routing::get, Router};

use appraisal_server::catalog::{ItemMeta, ReferenceSnapshot};
use appraisal_server::config::{AppConfig, CatalogSourceConfig, ListenerConfig, Transport};
use appraisal_server::lifecycle::Routers;

/// Items every test catalog starts with.
pub fn base_items() -> Vec<ItemMeta> {
    vec![
        ItemMeta::new(34, "Tritanium"),
        ItemMeta::new(35, "Pyerite"),
        ItemMeta::new(587, "Rifter"),
        ItemMeta::new(17478, "Retriever"),
    ]
}

pub fn snapshot(generation: u64) -> ReferenceSnapshot {
    ReferenceSnapshot::build(generation, base_items()).unwrap()
}

/// Write `items` as a JSON catalog file and return its path.
pub fn write_catalog(dir: &Path, items: &[ItemMeta]) -> PathBuf {
    let path = dir.join("catalog.json");
    std::fs::write(&path, serde_json::to_string(items).unwrap()).unwrap();
    path
}

pub fn listener(transport: Transport, address: &str, required: bool) -> ListenerConfig {
    ListenerConfig {
        transport,
        address: address.to_string(),
        required,
        tls: None,
    }
}

/// A full service config rooted in `dir` with a file catalog.
pub fn service_config(dir: &Path, public: &str, management: &str) -> AppConfig {
    let catalog = write_catalog(dir, &base_items());
    let mut config = AppConfig::default();
    config.db_path = dir.join("db").display().to_string();
    config.base_url = format!("http://{}/", public);
    config.catalog.source = CatalogSourceConfig::File(catalog.display().to_string());
    config.catalog.watch = false;
    config.shutdown.grace_secs = 1;
    config.listeners = vec![
        listener(Transport::Plain, public, true),
        listener(Transport::Management, management, true),
    ];
    config
}

async fn sleep_for(UrlPath(ms): UrlPath<u64>) -> &'static str {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    "done"
}

/// Routers whose `/sleep/{ms}` handler holds the request open.
pub fn slow_routers() -> Routers {
    let router = Router::new().route("/sleep/{ms}", get(sleep_for));
    Routers {
        public: router.clone(),
        management: router,
    }
}

/// A client that does not pool connections or use system proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Poll `url` until it answers with a success status.
pub async fn wait_until_ready(url: &str) {
    let client = client();
    for _ in 0..100 {
        if let Ok(res) = client.get(url).send().await {
            if res.status().is_success() {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("{} never became ready", url);
}
