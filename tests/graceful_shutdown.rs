//! Listener startup failures and the bounded drain on shutdown.

use std::time::{Duration, Instant};

use appraisal_server::config::Transport;
use appraisal_server::lifecycle::ListenerSet;
use appraisal_server::net::ListenerError;

mod common;

async fn start_plain(count: usize) -> (ListenerSet, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let configs: Vec<_> = (0..count)
        .map(|_| common::listener(Transport::Plain, "127.0.0.1:0", true))
        .collect();
    let set = ListenerSet::start(&configs, &common::slow_routers(), dir.path())
        .await
        .unwrap();
    (set, dir)
}

#[tokio::test]
async fn in_flight_request_shorter_than_grace_completes() {
    let (set, _dir) = start_plain(1).await;
    let addr = set.address_of(Transport::Plain).unwrap();

    let request = tokio::spawn(async move {
        common::client()
            .get(format!("http://{}/sleep/300", addr))
            .send()
            .await
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    let report = set.shutdown(Duration::from_secs(2)).await;
    let elapsed = started.elapsed();

    assert!(report.forced.is_empty(), "unexpected forced close: {:?}", report.forced);
    assert_eq!(report.drained, vec![addr]);
    assert!(elapsed < Duration::from_secs(2), "drain took {:?}", elapsed);

    let response = request.await.unwrap().unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "done");
}

#[tokio::test]
async fn in_flight_request_longer_than_grace_is_cut_off() {
    let (set, _dir) = start_plain(1).await;
    let addr = set.address_of(Transport::Plain).unwrap();

    let request = tokio::spawn(async move {
        common::client()
            .get(format!("http://{}/sleep/10000", addr))
            .send()
            .await
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let grace = Duration::from_millis(400);
    let started = Instant::now();
    let report = set.shutdown(grace).await;
    let elapsed = started.elapsed();

    // Not before the deadline, and not much after it.
    assert!(elapsed >= grace, "closed early after {:?}", elapsed);
    assert!(elapsed < grace + Duration::from_secs(3), "closed late after {:?}", elapsed);

    assert_eq!(report.forced.len(), 1);
    let timeout = &report.forced[0];
    assert_eq!(timeout.address, addr);
    assert_eq!(timeout.transport, Transport::Plain);
    assert_eq!(timeout.grace, grace);
    assert!(timeout.open >= 1);

    assert!(request.await.unwrap().is_err());
}

#[tokio::test]
async fn listeners_drain_concurrently() {
    let (set, _dir) = start_plain(3).await;
    let addrs: Vec<_> = set.infos().into_iter().map(|i| i.address).collect();
    assert_eq!(addrs.len(), 3);

    let mut requests = Vec::new();
    for addr in &addrs {
        let url = format!("http://{}/sleep/10000", addr);
        requests.push(tokio::spawn(async move { common::client().get(url).send().await }));
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    let grace = Duration::from_millis(500);
    let started = Instant::now();
    let report = set.shutdown(grace).await;
    let elapsed = started.elapsed();

    assert_eq!(report.forced.len(), 3);
    // One after another would need at least three grace periods.
    assert!(elapsed < grace * 3, "drain took {:?}", elapsed);

    for request in requests {
        assert!(request.await.unwrap().is_err());
    }
}

#[tokio::test]
async fn idle_listener_drains_immediately() {
    let (set, _dir) = start_plain(1).await;
    let started = Instant::now();
    let report = set.shutdown(Duration::from_secs(5)).await;
    assert!(report.into_result().is_ok());
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn required_bind_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = taken.local_addr().unwrap().to_string();

    let configs = vec![
        common::listener(Transport::Plain, "127.0.0.1:0", true),
        common::listener(Transport::Management, &address, true),
    ];
    let err = ListenerSet::start(&configs, &common::slow_routers(), dir.path())
        .await
        .err()
        .unwrap();
    match err {
        ListenerError::Bind { transport, address: failed, .. } => {
            assert_eq!(transport, Transport::Management);
            assert_eq!(failed, address);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn optional_bind_failure_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = taken.local_addr().unwrap().to_string();

    let configs = vec![
        common::listener(Transport::Plain, "127.0.0.1:0", true),
        common::listener(Transport::Management, &address, false),
    ];
    let set = ListenerSet::start(&configs, &common::slow_routers(), dir.path())
        .await
        .unwrap();

    assert_eq!(set.descriptors().len(), 1);
    assert!(set.address_of(Transport::Management).is_none());
    let addr = set.address_of(Transport::Plain).unwrap();

    let response = common::client()
        .get(format!("http://{}/sleep/1", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    set.shutdown(Duration::from_secs(1)).await;
}
