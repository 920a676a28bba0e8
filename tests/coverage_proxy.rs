//! End-to-end tests: client → proxy → mock backend, coverage read back from the report endpoint.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use api_coverage_proxy::config::ProxyConfig;
use api_coverage_proxy::coverage::{CoverageEngine, CoverageSnapshot};
use api_coverage_proxy::lifecycle::run_until;
use api_coverage_proxy::StartupError;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

mod common;

struct RunningProxy {
    proxy: SocketAddr,
    report: SocketAddr,
    stop: oneshot::Sender<()>,
    task: JoinHandle<Result<std::sync::Arc<CoverageEngine>, StartupError>>,
}

async fn start_proxy(name: &str, backend: SocketAddr, proxy: SocketAddr, report: SocketAddr) -> RunningProxy {
    let mut config = ProxyConfig::default();
    config.openapi.file = common::write_spec(name, common::PETS_SPEC)
        .to_string_lossy()
        .into_owned();
    config.forward.url = format!("http://{}", backend);
    config.listener.bind_address = proxy.to_string();
    config.report.bind_address = Some(report.to_string());
    config.timeouts.request_secs = 5;

    start_with_config(config, proxy, report).await
}

async fn start_with_config(config: ProxyConfig, proxy: SocketAddr, report: SocketAddr) -> RunningProxy {
    let (stop, stop_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(run_until(config, async move {
        let _ = stop_rx.await;
    }));

    common::wait_for_listener(proxy).await;
    common::wait_for_listener(report).await;
    RunningProxy { proxy, report, stop, task }
}

async fn fetch_report(report: SocketAddr) -> CoverageSnapshot {
    common::http_client()
        .get(format!("http://{}/report", report))
        .send()
        .await
        .expect("Report endpoint unreachable")
        .json()
        .await
        .expect("Report is not valid JSON")
}

/// Poll the report until `done` holds; ingestion is asynchronous.
async fn wait_for_report(report: SocketAddr, done: impl Fn(&CoverageSnapshot) -> bool) -> CoverageSnapshot {
    for _ in 0..100 {
        let snapshot = fetch_report(report).await;
        if done(&snapshot) {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("coverage report never reached the expected state");
}

#[tokio::test]
async fn test_documented_traffic_is_covered() {
    let backend: SocketAddr = "127.0.0.1:28281".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:28282".parse().unwrap();
    let report: SocketAddr = "127.0.0.1:28283".parse().unwrap();

    common::start_programmable_backend(backend, |target| async move {
        if target.starts_with("/pets/42/owner") {
            (404, "no owner".to_string())
        } else {
            (200, format!("served {}", target))
        }
    })
    .await;
    let running = start_proxy("documented", backend, proxy, report).await;
    let client = common::http_client();

    // Client sees the backend response unchanged.
    let res = client
        .get(format!("http://{}/pets?limit=5", proxy))
        .send()
        .await
        .expect("Proxy unreachable");
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), "served /pets?limit=5");

    let res = client.get(format!("http://{}/pets/42", proxy)).send().await.unwrap();
    assert_eq!(res.status(), 200);

    // Outside the declared surface: forwarded, never counted.
    let res = client.get(format!("http://{}/healthz", proxy)).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let res = client
        .get(format!("http://{}/pets/42/owner", proxy))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    let snapshot = wait_for_report(report, |s| {
        s.endpoint("GET", "/pets/{id}")
            .map(|e| e.status_codes == vec![200])
            .unwrap_or(false)
            && s.endpoint("GET", "/pets")
                .map(|e| e.status_codes == vec![200])
                .unwrap_or(false)
    })
    .await;

    assert_eq!(snapshot.endpoints.len(), 2);
    let pets = snapshot.endpoint("GET", "/pets").unwrap();
    assert!(pets.undocumented_status_codes.is_empty());
    assert_eq!(pets.params.params.len(), 1);
    assert_eq!(pets.params.params[0].name, "limit");
    assert_eq!(pets.params.params[0].covered_values, vec!["5"]);

    let by_id = snapshot.endpoint("GET", "/pets/{id}").unwrap();
    assert!(by_id.undocumented_status_codes.is_empty());
    assert_eq!(by_id.uncovered_status_codes(), vec![404]);

    running.stop.send(()).unwrap();
    running.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_undeclared_status_is_reported() {
    let backend: SocketAddr = "127.0.0.1:28291".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:28292".parse().unwrap();
    let report: SocketAddr = "127.0.0.1:28293".parse().unwrap();

    common::start_programmable_backend(backend, |_| async { (404, "gone".to_string()) }).await;
    let running = start_proxy("undeclared", backend, proxy, report).await;

    let res = common::http_client()
        .get(format!("http://{}/pets", proxy))
        .send()
        .await
        .expect("Proxy unreachable");
    assert_eq!(res.status(), 404);
    assert_eq!(res.text().await.unwrap(), "gone");

    let snapshot = wait_for_report(report, |s| {
        s.endpoint("GET", "/pets")
            .map(|e| !e.undocumented_status_codes.is_empty())
            .unwrap_or(false)
    })
    .await;
    let pets = snapshot.endpoint("GET", "/pets").unwrap();
    assert!(pets.status_codes.is_empty());
    assert_eq!(pets.undocumented_status_codes, vec![404]);

    running.stop.send(()).unwrap();
    running.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_unreachable_backend_is_bad_gateway() {
    // Nothing listens on the backend port.
    let backend: SocketAddr = "127.0.0.1:28301".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:28302".parse().unwrap();
    let report: SocketAddr = "127.0.0.1:28303".parse().unwrap();

    let running = start_proxy("unreachable", backend, proxy, report).await;

    let res = common::http_client()
        .get(format!("http://{}/pets", proxy))
        .send()
        .await
        .expect("Proxy unreachable");
    assert_eq!(res.status(), 502);

    let snapshot = wait_for_report(report, |s| {
        s.endpoint("GET", "/pets")
            .map(|e| e.undocumented_status_codes == vec![502])
            .unwrap_or(false)
    })
    .await;
    assert!(snapshot.endpoint("GET", "/pets").unwrap().status_codes.is_empty());

    running.stop.send(()).unwrap();
    running.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_report_file_written_at_shutdown() {
    let backend: SocketAddr = "127.0.0.1:28311".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:28312".parse().unwrap();
    let report: SocketAddr = "127.0.0.1:28313".parse().unwrap();

    common::start_programmable_backend(backend, |_| async { (200, "ok".to_string()) }).await;

    let output = std::env::temp_dir().join(format!("coverage-proxy-dump-{}.json", std::process::id()));
    let mut config = ProxyConfig::default();
    config.openapi.file = common::write_spec("dump", common::PETS_SPEC)
        .to_string_lossy()
        .into_owned();
    config.forward.url = format!("http://{}", backend);
    config.listener.bind_address = proxy.to_string();
    config.report.bind_address = Some(report.to_string());
    config.report.output_file = Some(output.to_string_lossy().into_owned());

    let running = start_with_config(config, proxy, report).await;
    let client = common::http_client();
    for limit in ["1", "2"] {
        let res = client
            .get(format!("http://{}/pets?limit={}", proxy, limit))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
        res.text().await.unwrap();
    }

    // Stop right away: draining must still ingest both exchanges.
    running.stop.send(()).unwrap();
    let engine = running.task.await.unwrap().unwrap();

    let written: CoverageSnapshot =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    std::fs::remove_file(&output).unwrap();
    assert_eq!(written, engine.snapshot());

    let pets = written.endpoint("GET", "/pets").unwrap();
    assert_eq!(pets.status_codes, vec![200]);
    assert_eq!(pets.params.params[0].covered_values, vec!["1", "2"]);
    assert!(pets.params.params[0].fully_covered);
}

#[tokio::test]
async fn test_missing_spec_file_fails_startup() {
    let mut config = ProxyConfig::default();
    config.openapi.file = "/nonexistent/openapi.json".to_string();
    config.forward.url = "http://127.0.0.1:28321".to_string();
    config.listener.bind_address = "127.0.0.1:28322".to_string();

    let err = run_until(config, async {}).await.err().unwrap();
    assert!(matches!(err, StartupError::Spec(_)));
    assert!(!Path::new("/nonexistent/openapi.json").exists());
}
