//! Integration tests for the mood-engine HTTP server

#[cfg(feature = "server")]
mod server_tests {
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use std::time::Duration;
    use synheart_mood_engine::config::{Config, ModelConfig};
    use synheart_mood_engine::server::{run, ServerConfig};

    fn test_config() -> Config {
        Config {
            model: ModelConfig {
                window_length: 6,
                clusters: 2,
                ..Default::default()
            },
            data_path: std::env::temp_dir()
                .join(format!("synheart-mood-server-test-{}", uuid::Uuid::new_v4())),
            ..Default::default()
        }
    }

    async fn start() -> (std::net::SocketAddr, tokio::sync::oneshot::Sender<()>) {
        let config = ServerConfig::new(0, test_config());
        let started = run(config).await.expect("Failed to start server");

        // Give server time to start
        tokio::time::sleep(Duration::from_millis(100)).await;
        started
    }

    fn raw_day() -> serde_json::Value {
        let start = Utc.with_ymd_and_hms(2025, 11, 30, 0, 0, 0).unwrap();
        let rows: Vec<serde_json::Value> = (0..48)
            .map(|i| {
                let stress = if i < 24 { 15.0 } else { 85.0 };
                serde_json::json!({
                    "timestamp": (start + ChronoDuration::minutes(10 * i)).to_rfc3339(),
                    "average_stress_index": stress,
                    "recent_stress_index": stress,
                    "latest_sleep_score": 70,
                    "latest_sleep_duration": 420,
                    "temperature": 21.0,
                    "humidity": 50.0,
                    "rainType": 0,
                    "sky": 1,
                    "laughter": 1.0,
                    "sigh": 0
                })
            })
            .collect();
        serde_json::Value::Array(rows)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (addr, shutdown_tx) = start().await;

        let client = reqwest::Client::new();
        let response = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .expect("Failed to send request");

        assert!(response.status().is_success());

        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["status"], "ok");
        assert!(body["version"].as_str().is_some());

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_build_then_inference() {
        let (addr, shutdown_tx) = start().await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("http://{}/build", addr))
            .json(&serde_json::json!({
                "user_id": "user_001",
                "date": "2025-11-30",
                "readings": raw_day()
            }))
            .send()
            .await
            .expect("Failed to send request");
        let status = response.status();
        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert!(status.is_success(), "build failed: {status} - {body:?}");
        assert_eq!(body["status"], "success");
        assert_eq!(body["user_id"], "user_001");
        assert_eq!(body["target_date"], "2025-11-30");
        assert_eq!(body["windows"], 43);
        assert_eq!(body["rejected_readings"], 0);

        let response = client
            .post(format!("http://{}/inference", addr))
            .json(&serde_json::json!({
                "user_id": "user_001",
                "model_date": "2025-11-30",
                "forecast_minutes": 30,
                "average_stress_index": 85,
                "recent_stress_index": 85,
                "latest_sleep_score": 70,
                "latest_sleep_duration": 420,
                "weather": {"temperature": 21.0, "humidity": 50.0, "rainType": 0, "sky": 1},
                "emotion": {"laugh_count": 1.5, "sigh_count": 0}
            }))
            .send()
            .await
            .expect("Failed to send request");
        let status = response.status();
        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert!(status.is_success(), "inference failed: {status} - {body:?}");
        assert_eq!(body["user_id"], "user_001");
        assert_eq!(body["model_date"], "2025-11-30");
        assert_eq!(body["forecast_steps"], 3);
        assert!(body["current_id"].as_u64().is_some());
        assert!(body["future_id"].as_u64().is_some());
        assert!(body["current_title"].as_str().is_some());
        assert!(body["inference_time"].as_str().unwrap().ends_with('Z'));

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_inference_without_model_is_not_found() {
        let (addr, shutdown_tx) = start().await;

        let response = reqwest::Client::new()
            .post(format!("http://{}/inference", addr))
            .json(&serde_json::json!({
                "user_id": "nobody",
                "model_date": "2025-11-30",
                "average_stress_index": 40,
                "recent_stress_index": 40,
                "latest_sleep_score": 70,
                "latest_sleep_duration": 420
            }))
            .send()
            .await
            .expect("Failed to send request");

        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["code"], "MODEL_NOT_FOUND");

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_bad_requests() {
        let (addr, shutdown_tx) = start().await;
        let client = reqwest::Client::new();

        // missing user_id
        let response = client
            .post(format!("http://{}/inference", addr))
            .json(&serde_json::json!({"average_stress_index": 40}))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["code"], "INVALID_INPUT");

        // missing required reading field
        let response = client
            .post(format!("http://{}/inference", addr))
            .json(&serde_json::json!({"user_id": "user_001", "average_stress_index": 40}))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        // body is not JSON
        let response = client
            .post(format!("http://{}/build", addr))
            .header("Content-Type", "application/json")
            .body("{not json")
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["code"], "INVALID_JSON");

        // too few readings for one window
        let response = client
            .post(format!("http://{}/build", addr))
            .json(&serde_json::json!({
                "user_id": "user_001",
                "date": "2025-11-30",
                "readings": [{"timestamp": "2025-11-30T00:00:00Z", "average_stress_index": 20}]
            }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["code"], "INSUFFICIENT_DATA");

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_cors_headers() {
        let (addr, shutdown_tx) = start().await;

        let response = reqwest::Client::new()
            .request(reqwest::Method::OPTIONS, format!("http://{}/inference", addr))
            .header("Origin", "http://localhost")
            .header("Access-Control-Request-Method", "POST")
            .send()
            .await
            .expect("Failed to send request");

        assert!(
            response.status().is_success() || response.status() == reqwest::StatusCode::NO_CONTENT,
            "CORS preflight failed: {}",
            response.status()
        );

        let _ = shutdown_tx.send(());
    }
}
