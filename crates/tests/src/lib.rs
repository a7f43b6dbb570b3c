//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试（TelemetryRecord 的 JSON 形状）
//! - 配置 → Dispatcher → 真实 sinks 的端到端流程
//! - 读数源 → Dispatcher 的端到端流程

#[cfg(test)]
mod contract_tests {
    use chrono::{TimeZone, Utc};
    use contracts::{
        MetricKind, NormalizedReading, Publication, PublishContext, TagMetadata, TagValue,
        ValueKind,
    };

    #[test]
    fn test_record_json_shape() {
        let meta = TagMetadata::new("ns=2;s=Temperature", "Temperature", MetricKind::Gauge);
        let value = TagValue::Float64(23.5);
        let ctx = PublishContext::new("Plant Floor", "opc.tcp://localhost:4840");
        let publication = Publication {
            metadata: &meta,
            value: &value,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            normalized: NormalizedReading {
                kind: ValueKind::Float64,
                numeric: Some(23.5),
            },
            context: &ctx,
        };

        let json = serde_json::to_value(publication.to_record()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "tagId": "ns=2;s=Temperature",
                "displayName": "Temperature",
                "value": 23.5,
                "timestamp": "2024-05-01T12:00:00.000Z",
                "sourceName": "Plant Floor",
                "sourceUrl": "opc.tcp://localhost:4840",
                "kind": "float64"
            })
        );
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use chrono::{TimeZone, Utc};
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{LoggerBlueprint, ReadingSource, TagValue};
    use dispatcher::sinks::collection_path;
    use dispatcher::DispatcherBuilder;
    use ingestion::{ReplaySource, SimulatedSource, SimulationConfig};
    use metrics_exporter_prometheus::PrometheusBuilder;

    type Collected = Arc<Mutex<Vec<serde_json::Value>>>;

    async fn collect(State(c): State<Collected>, Json(body): Json<serde_json::Value>) -> StatusCode {
        c.lock().unwrap().push(body);
        StatusCode::OK
    }

    /// HTTP collector on an ephemeral port; returns its ingest URL
    async fn start_collector() -> (String, Collected) {
        let collected: Collected = Arc::default();
        let app = Router::new()
            .route("/ingest", post(collect))
            .with_state(Arc::clone(&collected));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/ingest"), collected)
    }

    fn blueprint(store: &Path, http_url: Option<&str>, metrics: bool, broadcast: bool) -> LoggerBlueprint {
        let http = match http_url {
            Some(url) => format!(
                "[exporters.http]\nenabled = true\nurl = {url:?}\nauth = {{ type = \"basic\", username = \"ops\", password = \"secret\" }}\n"
            ),
            None => String::new(),
        };

        let toml = format!(
            r#"
[logger]
name = "Plant Floor"

[source]
url = "opc.tcp://localhost:4840"

[[tags]]
tag_id = "T1"
display_name = "Temp"
metric_kind = "gauge"

[[tags]]
tag_id = "T2"
display_name = "Running"

[[tags]]
tag_id = "C1"
display_name = "Parts"
metric_kind = "counter"

[exporters.metrics]
enabled = {metrics}

[exporters.broadcast]
enabled = {broadcast}

[exporters.document_store]
enabled = true
base_path = {store:?}

{http}
"#,
            store = store.to_str().unwrap(),
        );
        ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap()
    }

    fn documents(store: &Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(collection_path(store, "PlantFloor"))
            .unwrap_or_default()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    /// A Float64 reading reaches all four exporters with the same projection
    #[tokio::test]
    async fn test_e2e_float_reaches_every_exporter() {
        let dir = tempfile::tempdir().unwrap();
        let (url, collected) = start_collector().await;
        let bp = blueprint(dir.path(), Some(&url), true, true);

        let exporters = DispatcherBuilder::new(&bp).build().await.unwrap();
        assert_eq!(
            exporters.dispatcher.sink_names(),
            vec!["metrics", "http", "broadcast", "document_store"]
        );
        let mut subscriber = exporters.broadcast_hub.as_ref().unwrap().subscribe();

        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let summary = metrics::with_local_recorder(&recorder, || {
            exporters
                .dispatcher
                .try_publish("T1", &TagValue::Float64(23.5), ts)
                .unwrap()
        });
        assert_eq!(summary.delivered, 4);

        let live: serde_json::Value =
            serde_json::from_str(&subscriber.recv().await.unwrap()).unwrap();
        exporters.shutdown().await;

        let rendered = handle.render();
        assert!(rendered.contains("plantfloor_tag_value{tag_id=\"T1\",display_name=\"Temp\"} 23.5"));
        assert!(rendered.contains("tag_logger_readings_total{status=\"dispatched\"} 1"));

        let posted = collected.lock().unwrap().clone();
        let stored = documents(dir.path());
        assert_eq!(posted.len(), 1);
        assert_eq!(stored.len(), 1);

        for record in [&posted[0], &live, &stored[0]] {
            assert_eq!(record["tagId"], "T1");
            assert_eq!(record["displayName"], "Temp");
            assert_eq!(record["value"], 23.5);
            assert_eq!(record["timestamp"], "2024-05-01T12:00:00.000Z");
            assert_eq!(record["sourceName"], "Plant Floor");
            assert_eq!(record["sourceUrl"], "opc.tcp://localhost:4840");
            assert_eq!(record["kind"], "float64");
        }
        assert_eq!(stored[0]["namespace"], "PlantFloor");
    }

    /// A Bool reading with metrics + http enabled never touches metrics
    #[tokio::test]
    async fn test_e2e_bool_skips_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let (url, collected) = start_collector().await;
        let bp = blueprint(dir.path(), Some(&url), true, false);

        let exporters = DispatcherBuilder::new(&bp).build().await.unwrap();
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let summary = metrics::with_local_recorder(&recorder, || {
            exporters
                .dispatcher
                .try_publish("T2", &TagValue::Bool(true), Utc::now())
                .unwrap()
        });
        exporters.shutdown().await;

        assert_eq!(summary.skipped, 1);
        assert!(!handle.render().contains("plantfloor_tag_value"));

        let posted = collected.lock().unwrap().clone();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0]["value"], true);
        assert_eq!(posted[0]["kind"], "bool");
    }

    /// Unregistered tags produce nothing anywhere
    #[tokio::test]
    async fn test_e2e_unregistered_tag_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let (url, collected) = start_collector().await;
        let bp = blueprint(dir.path(), Some(&url), true, true);

        let exporters = DispatcherBuilder::new(&bp).build().await.unwrap();
        let mut subscriber = exporters.broadcast_hub.as_ref().unwrap().subscribe();

        exporters
            .dispatcher
            .publish("T3", &TagValue::Int(7), Utc::now());
        exporters.shutdown().await;

        assert!(collected.lock().unwrap().is_empty());
        assert!(documents(dir.path()).is_empty());
        assert!(subscriber.try_recv().is_err());
    }

    /// A dead HTTP collector does not stop the other exporters
    #[tokio::test]
    async fn test_e2e_http_failure_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let bp = blueprint(dir.path(), Some("http://127.0.0.1:9/ingest"), false, false);

        let exporters = DispatcherBuilder::new(&bp).build().await.unwrap();
        for v in 0..3u64 {
            exporters
                .dispatcher
                .publish("C1", &TagValue::UInt64(v), Utc::now());
        }
        exporters.shutdown().await;

        let stored = documents(dir.path());
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[2]["value"], 2);
        assert_eq!(stored[2]["kind"], "uint64");
    }

    /// SimulatedSource -> Dispatcher -> document store
    #[tokio::test]
    async fn test_e2e_simulated_source() {
        let dir = tempfile::tempdir().unwrap();
        let bp = blueprint(dir.path(), None, false, false);
        let exporters = DispatcherBuilder::new(&bp).build().await.unwrap();

        let source = SimulatedSource::new(
            bp.tags.clone(),
            SimulationConfig {
                interval: Duration::from_millis(1),
                max_rounds: Some(4),
            },
        )
        .unwrap();
        let mut rx = source.start(32);
        while let Some(reading) = rx.recv().await {
            exporters.dispatcher.publish_reading(&reading);
        }
        exporters.shutdown().await;

        let stored = documents(dir.path());
        assert_eq!(stored.len(), 12);
        let counters: Vec<_> = stored.iter().filter(|d| d["tagId"] == "C1").collect();
        assert_eq!(counters.len(), 4);
        assert_eq!(counters[3]["value"], 3);
    }

    /// ReplaySource -> Dispatcher, unsupported and unknown entries dropped
    #[tokio::test]
    async fn test_e2e_replay_source() {
        let dir = tempfile::tempdir().unwrap();
        let replay = dir.path().join("replay.jsonl");
        std::fs::write(
            &replay,
            concat!(
                r#"{"tagId":"T1","value":20.25,"timestamp":"2024-05-01T12:00:00Z"}"#, "\n",
                r#"{"tagId":"T2","value":"open"}"#, "\n",
                r#"{"tagId":"T1","value":null}"#, "\n",
                r#"{"tagId":"T9","value":1}"#, "\n",
            ),
        )
        .unwrap();

        let store = dir.path().join("store");
        let bp = blueprint(&store, None, false, false);
        let exporters = DispatcherBuilder::new(&bp).build().await.unwrap();

        let source = ReplaySource::new(&replay, None).unwrap();
        let mut rx = source.start(8);
        while let Some(reading) = rx.recv().await {
            exporters.dispatcher.publish_reading(&reading);
        }
        exporters.shutdown().await;

        let stored = documents(&store);
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0]["timestamp"], "2024-05-01T12:00:00.000Z");
        assert_eq!(stored[1]["value"], "open");
        assert_eq!(stored[1]["kind"], "string");
    }
}
