mod common;

use std::sync::Arc;

use harbor_scrape::families::{Replications, Scans};
use harbor_scrape::server::{create_router, AppState};
use harbor_scrape::{CollectConfig, Exporter};
use serde_json::{json, Value};

use common::{replication_upstream, FakeUpstream};

fn config() -> CollectConfig {
    CollectConfig {
        threads: 2,
        cache_enabled: true,
        cache_duration_secs: 60,
    }
}

fn exporter(scans_ok: bool) -> Exporter {
    let replications = Arc::new(replication_upstream());
    let scans = if scans_ok {
        FakeUpstream::new().with(
            "/scans/all/metrics",
            json!({"total": 2, "completed": 2, "requester": "1"}),
        )
    } else {
        FakeUpstream::new().failing("/scans/all/metrics")
    };

    let mut exporter = Exporter::new("");
    exporter
        .add_family(Replications::new(replications, ""), &config())
        .add_family(Scans::new(Arc::new(scans), ""), &config());
    exporter
}

fn value_of(report: &harbor_scrape::ScrapeReport, name: &str) -> Option<f64> {
    report
        .samples
        .iter()
        .find(|s| s.metric_name == name)
        .map(|s| s.value)
}

#[tokio::test]
async fn healthy_scrape_merges_families_and_reports_up() {
    let exporter = exporter(true);
    assert_eq!(exporter.families(), vec!["replications", "scans"]);

    let report = exporter.scrape().await;

    assert!(report.up);
    assert_eq!(value_of(&report, "harbor_up"), Some(1.0));
    assert_eq!(value_of(&report, "harbor_replication_up"), Some(1.0));
    assert_eq!(value_of(&report, "harbor_scans_up"), Some(1.0));
    // 15 replication + 3 scan samples, two family gauges, one overall gauge
    assert_eq!(report.samples.len(), 21);
    assert!(report.families.iter().all(|f| f.up));

    let readiness = exporter.readiness().poll();
    assert!(readiness.ready);
    assert!(readiness.families.iter().all(|f| f.fresh));
}

#[tokio::test]
async fn failing_family_degrades_overall_up_only_for_that_scrape() {
    let exporter = exporter(false);

    let report = exporter.scrape().await;

    assert!(!report.up);
    assert_eq!(value_of(&report, "harbor_up"), Some(0.0));
    assert_eq!(value_of(&report, "harbor_scans_up"), Some(0.0));
    assert_eq!(value_of(&report, "harbor_replication_up"), Some(1.0));

    let readiness = exporter.readiness().poll();
    assert!(!readiness.ready);
    let scans = readiness.families.iter().find(|f| f.family == "scans").unwrap();
    assert_eq!(scans.up, Some(false));

    let stats = exporter.stats();
    assert_eq!(stats.total_scrapes, 1);
    assert_eq!(stats.failed_scrapes, 1);
    assert_eq!(stats.last_scrape_up, Some(false));
}

#[tokio::test]
async fn http_surface_serves_scrape_health_and_stats() {
    let app = create_router(Arc::new(AppState {
        exporter: exporter(true),
    }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let http = reqwest::Client::new();
    let base = format!("http://{addr}");

    // Nothing scraped yet
    let health = http.get(format!("{base}/api/health")).send().await.unwrap();
    assert_eq!(health.status().as_u16(), 503);

    let scrape = http.get(format!("{base}/api/scrape")).send().await.unwrap();
    assert_eq!(scrape.status().as_u16(), 200);
    assert!(scrape.headers().contains_key("x-response-time-us"));
    let body: Value = scrape.json().await.unwrap();
    assert_eq!(body["up"], true);
    assert_eq!(body["samples"].as_array().map(Vec::len), Some(21));

    let health = http.get(format!("{base}/api/health")).send().await.unwrap();
    assert_eq!(health.status().as_u16(), 200);
    let body: Value = health.json().await.unwrap();
    assert_eq!(body["ready"], true);

    let stats: Value = http
        .get(format!("{base}/api/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total_scrapes"], 1);
    assert_eq!(stats["duration_us"]["count"], 1);
}
