//! Integration tests for streetgauge acquisition
//!
//! These tests exercise the coordinator end-to-end against mock Overpass
//! endpoints: ordered failover, short-circuiting, rate-limit handling,
//! response caching, snapshots and the synthetic fallback. No real network
//! access is required.

use std::time::Duration;

use streetgauge::{
    AcquireConfig, AnalysisOptions, Coordinator, Error, GraphSource, Mode, StaticGeocoder,
    StreetGraph,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A small Overpass answer: two crossing residential ways
fn overpass_body() -> serde_json::Value {
    serde_json::json!({
        "version": 0.6,
        "elements": [
            {
                "type": "way", "id": 1,
                "nodes": [10, 20, 30],
                "geometry": [
                    {"lat": 45.000, "lon": 4.000},
                    {"lat": 45.001, "lon": 4.000},
                    {"lat": 45.002, "lon": 4.000}
                ],
                "tags": {"highway": "residential", "name": "Rue des Tests"}
            },
            {
                "type": "way", "id": 2,
                "nodes": [40, 20, 50],
                "geometry": [
                    {"lat": 45.001, "lon": 3.999},
                    {"lat": 45.001, "lon": 4.000},
                    {"lat": 45.001, "lon": 4.001}
                ],
                "tags": {"highway": "residential"}
            }
        ]
    })
}

fn interpreter_url(server: &MockServer) -> String {
    format!("{}/api/interpreter", server.uri())
}

fn config_for(endpoints: &[String]) -> AcquireConfig {
    AcquireConfig {
        primary_endpoint: endpoints.first().cloned(),
        extra_endpoints: endpoints.iter().skip(1).cloned().collect(),
        timeout: Duration::from_secs(5),
        include_default_endpoints: false,
        ..Default::default()
    }
}

fn coordinator_for(config: AcquireConfig) -> Coordinator<StaticGeocoder> {
    Coordinator::with_geocoder(
        config,
        StaticGeocoder {
            lat: 45.001,
            lon: 4.0,
        },
    )
    .unwrap()
}

async fn mock_interpreter(server: &MockServer, template: ResponseTemplate, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/api/interpreter"))
        .respond_with(template)
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn failover_returns_first_healthy_endpoint_in_order() {
    let broken = MockServer::start().await;
    let healthy = MockServer::start().await;
    let never_reached = MockServer::start().await;

    mock_interpreter(&broken, ResponseTemplate::new(504), 1).await;
    mock_interpreter(
        &healthy,
        ResponseTemplate::new(200).set_body_json(overpass_body()),
        1,
    )
    .await;
    // endpoints after the first success must never be contacted
    mock_interpreter(&never_reached, ResponseTemplate::new(200), 0).await;

    let coordinator = coordinator_for(config_for(&[
        interpreter_url(&broken),
        interpreter_url(&healthy),
        interpreter_url(&never_reached),
    ]));

    let acquired = coordinator
        .acquire("testville", Mode::Walk, 800, None)
        .await
        .unwrap();

    assert_eq!(
        acquired.source,
        GraphSource::Endpoint(interpreter_url(&healthy))
    );
    assert_eq!(acquired.graph.node_count(), 5);
    assert_eq!(acquired.graph.edge_count(), 8);

    // expectations (including the zero-contact guarantee) are verified
    // when the mock servers drop
}

#[tokio::test]
async fn first_endpoint_success_contacts_nothing_else() {
    let healthy = MockServer::start().await;
    let spare = MockServer::start().await;

    mock_interpreter(
        &healthy,
        ResponseTemplate::new(200).set_body_json(overpass_body()),
        1,
    )
    .await;
    mock_interpreter(&spare, ResponseTemplate::new(200), 0).await;

    let coordinator = coordinator_for(config_for(&[
        interpreter_url(&healthy),
        interpreter_url(&spare),
    ]));

    let acquired = coordinator
        .acquire("testville", Mode::Walk, 800, None)
        .await
        .unwrap();
    assert!(matches!(acquired.source, GraphSource::Endpoint(_)));

}

#[tokio::test]
async fn rate_limited_endpoint_counts_as_failure() {
    let limited = MockServer::start().await;
    let healthy = MockServer::start().await;

    mock_interpreter(&limited, ResponseTemplate::new(429), 1).await;
    mock_interpreter(
        &healthy,
        ResponseTemplate::new(200).set_body_json(overpass_body()),
        1,
    )
    .await;

    let coordinator = coordinator_for(config_for(&[
        interpreter_url(&limited),
        interpreter_url(&healthy),
    ]));

    let acquired = coordinator
        .acquire("testville", Mode::Bike, 800, None)
        .await
        .unwrap();
    assert_eq!(
        acquired.source,
        GraphSource::Endpoint(interpreter_url(&healthy))
    );
}

#[tokio::test]
async fn malformed_and_empty_responses_fail_over() {
    let garbled = MockServer::start().await;
    let empty = MockServer::start().await;
    let healthy = MockServer::start().await;

    mock_interpreter(
        &garbled,
        ResponseTemplate::new(200).set_body_string("<html>busy</html>"),
        1,
    )
    .await;
    mock_interpreter(
        &empty,
        ResponseTemplate::new(200).set_body_json(serde_json::json!({"elements": []})),
        1,
    )
    .await;
    mock_interpreter(
        &healthy,
        ResponseTemplate::new(200).set_body_json(overpass_body()),
        1,
    )
    .await;

    let coordinator = coordinator_for(config_for(&[
        interpreter_url(&garbled),
        interpreter_url(&empty),
        interpreter_url(&healthy),
    ]));

    let acquired = coordinator
        .acquire("testville", Mode::Walk, 800, None)
        .await
        .unwrap();
    assert_eq!(
        acquired.source,
        GraphSource::Endpoint(interpreter_url(&healthy))
    );
}

#[tokio::test]
async fn exhausted_endpoints_surface_every_attempt() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;

    mock_interpreter(&first, ResponseTemplate::new(500), 1).await;
    mock_interpreter(&second, ResponseTemplate::new(429), 1).await;

    let endpoints = [interpreter_url(&first), interpreter_url(&second)];
    let coordinator = coordinator_for(config_for(&endpoints));

    let err = coordinator
        .acquire("testville", Mode::Drive, 1200, Some(false))
        .await
        .unwrap_err();

    match err {
        Error::SourceUnavailable {
            place,
            mode,
            radius_m,
            attempts,
        } => {
            assert_eq!(place, "testville");
            assert_eq!(mode, "drive");
            assert_eq!(radius_m, 1200);
            assert_eq!(attempts.len(), 2);
            assert_eq!(attempts[0].endpoint, endpoints[0]);
            assert!(attempts[0].error.contains("500"), "{}", attempts[0].error);
            assert_eq!(attempts[1].endpoint, endpoints[1]);
            assert!(
                attempts[1].error.contains("rate limited"),
                "{}",
                attempts[1].error
            );
        }
        other => panic!("expected SourceUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn synthetic_fallback_replaces_exhausted_endpoints_when_allowed() {
    let broken = MockServer::start().await;
    mock_interpreter(&broken, ResponseTemplate::new(503), 1).await;

    let coordinator = coordinator_for(config_for(&[interpreter_url(&broken)]));

    let acquired = coordinator
        .acquire("testville", Mode::Walk, 500, Some(true))
        .await
        .unwrap();

    assert_eq!(acquired.source, GraphSource::Synthetic);
    assert!(!acquired.graph.is_empty());
    // 500 m radius at a 100 m step: 6 nodes per axis
    assert_eq!(acquired.graph.node_count(), 36);
}

#[tokio::test]
async fn response_cache_short_circuits_the_second_request() {
    let server = MockServer::start().await;
    // exactly one network hit across two acquisitions
    mock_interpreter(
        &server,
        ResponseTemplate::new(200).set_body_json(overpass_body()),
        1,
    )
    .await;

    let cache_dir = tempfile::tempdir().unwrap();
    let mut config = config_for(&[interpreter_url(&server)]);
    config.cache_dir = Some(cache_dir.path().to_path_buf());
    let coordinator = coordinator_for(config);

    let first = coordinator
        .acquire("testville", Mode::Walk, 800, None)
        .await
        .unwrap();
    assert!(matches!(first.source, GraphSource::Endpoint(_)));

    let second = coordinator
        .acquire("testville", Mode::Walk, 800, None)
        .await
        .unwrap();
    assert_eq!(second.source, GraphSource::CachedResponse);
    assert_eq!(second.graph.node_count(), first.graph.node_count());

}

#[tokio::test]
async fn different_parameters_miss_the_cache() {
    let server = MockServer::start().await;
    mock_interpreter(
        &server,
        ResponseTemplate::new(200).set_body_json(overpass_body()),
        2,
    )
    .await;

    let cache_dir = tempfile::tempdir().unwrap();
    let mut config = config_for(&[interpreter_url(&server)]);
    config.cache_dir = Some(cache_dir.path().to_path_buf());
    let coordinator = coordinator_for(config);

    coordinator
        .acquire("testville", Mode::Walk, 800, None)
        .await
        .unwrap();
    // a different radius is a different query, so the cache must miss
    let other = coordinator
        .acquire("testville", Mode::Walk, 900, None)
        .await
        .unwrap();
    assert!(matches!(other.source, GraphSource::Endpoint(_)));

}

#[tokio::test]
async fn snapshot_bypasses_the_network_entirely() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("graph.bin");

    // first run fetches from the endpoint and writes the snapshot
    let server = MockServer::start().await;
    mock_interpreter(
        &server,
        ResponseTemplate::new(200).set_body_json(overpass_body()),
        1,
    )
    .await;

    let mut config = config_for(&[interpreter_url(&server)]);
    config.local_graph_path = Some(snapshot.clone());
    let coordinator = coordinator_for(config);

    let fetched = coordinator
        .acquire("testville", Mode::Walk, 800, None)
        .await
        .unwrap();
    assert!(matches!(fetched.source, GraphSource::Endpoint(_)));
    assert!(snapshot.exists());

    // second run must not touch the endpoint at all
    let quiet = MockServer::start().await;
    mock_interpreter(&quiet, ResponseTemplate::new(200), 0).await;

    let mut offline = config_for(&[interpreter_url(&quiet)]);
    offline.local_graph_path = Some(snapshot.clone());
    let coordinator = coordinator_for(offline);

    let restored = coordinator
        .acquire("testville", Mode::Walk, 800, None)
        .await
        .unwrap();
    assert_eq!(restored.source, GraphSource::LocalSnapshot);
    assert_eq!(restored.graph.node_count(), fetched.graph.node_count());

}

#[tokio::test]
async fn corrupt_snapshot_falls_through_to_the_network() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("graph.bin");
    std::fs::write(&snapshot, b"not a graph").unwrap();

    let server = MockServer::start().await;
    mock_interpreter(
        &server,
        ResponseTemplate::new(200).set_body_json(overpass_body()),
        1,
    )
    .await;

    let mut config = config_for(&[interpreter_url(&server)]);
    config.local_graph_path = Some(snapshot);
    let coordinator = coordinator_for(config);

    let acquired = coordinator
        .acquire("testville", Mode::Walk, 800, None)
        .await
        .unwrap();
    assert!(matches!(acquired.source, GraphSource::Endpoint(_)));
}

#[tokio::test]
async fn full_analysis_runs_against_a_mock_endpoint() {
    let server = MockServer::start().await;
    mock_interpreter(
        &server,
        ResponseTemplate::new(200).set_body_json(overpass_body()),
        1,
    )
    .await;

    let coordinator = coordinator_for(config_for(&[interpreter_url(&server)]));
    let options = AnalysisOptions {
        degree: true,
        straightness: true,
        hex_resolution: 9,
        ..Default::default()
    };

    let result = streetgauge::analyze(&coordinator, "testville", &options)
        .await
        .unwrap();

    assert_eq!(result.metrics.nodes, 5);
    assert_eq!(result.metrics.edges, 8);
    assert!(result.metrics.total_km > 0.0);
    assert_eq!(result.metrics.components, 1);

    let table = result.centralities.as_ref().unwrap();
    assert!(table.betweenness.is_some());
    assert!(table.degree.is_some());
    assert!(table.straightness.is_some());
    for column in [
        table.betweenness.as_ref().unwrap(),
        table.degree.as_ref().unwrap(),
        table.straightness.as_ref().unwrap(),
    ] {
        for value in column.iter() {
            assert!(value.is_finite() && *value >= 0.0);
        }
    }

    let hex = result.hex.as_ref().unwrap();
    let binned = hex.total_length_m();
    let input: f64 = result.edges.iter().map(|e| e.length_m).sum();
    assert!((binned - input).abs() < 1e-6 * input);
}

#[tokio::test]
async fn snapshot_round_trip_preserves_the_graph() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lattice.bin");

    let graph = streetgauge::synthetic((45.0, 4.0), 600, 100).unwrap();
    graph.save_snapshot(&path).unwrap();
    let restored = StreetGraph::load_snapshot(&path).unwrap();

    assert_eq!(restored.node_count(), graph.node_count());
    assert_eq!(restored.edge_count(), graph.edge_count());
    assert!((restored.total_length_m() - graph.total_length_m()).abs() < 1e-9);
}
