//! Integration tests for the coach HTTP server and the HTTP coach client

#[cfg(feature = "server")]
mod server_tests {
    use cpr_pacer::coach::{Coach, CoachError, HttpCoach};
    use cpr_pacer::server::{run, ServerConfig};
    use std::time::Duration;

    #[tokio::test]
    async fn test_health_endpoint() {
        // Random port
        let (addr, shutdown_tx) = run(ServerConfig::new(0))
            .await
            .expect("Failed to start server");

        tokio::time::sleep(Duration::from_millis(100)).await;

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
    async fn test_feedback_endpoint_wire_format() {
        let (addr, shutdown_tx) = run(ServerConfig::new(0))
            .await
            .expect("Failed to start server");

        tokio::time::sleep(Duration::from_millis(100)).await;

        let client = reqwest::Client::new();
        let response = client
            .post(format!("http://{}/feedback", addr))
            .json(&serde_json::json!({ "compressionRate": 90 }))
            .send()
            .await
            .expect("Failed to send request");

        assert!(response.status().is_success());
        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["feedback"], "Press faster");

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_malformed_request_is_rejected() {
        let (addr, shutdown_tx) = run(ServerConfig::new(0))
            .await
            .expect("Failed to start server");

        tokio::time::sleep(Duration::from_millis(100)).await;

        let client = reqwest::Client::new();
        let response = client
            .post(format!("http://{}/feedback", addr))
            .json(&serde_json::json!({ "compressionRate": -5 }))
            .send()
            .await
            .expect("Failed to send request");

        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["code"], "INVALID_REQUEST");
        assert!(body["error"].as_str().is_some());

        let response = client
            .post(format!("http://{}/feedback", addr))
            .json(&serde_json::json!({ "compressionRate": 5000 }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_http_coach_against_local_server() {
        let (addr, shutdown_tx) = run(ServerConfig::new(0))
            .await
            .expect("Failed to start server");

        tokio::time::sleep(Duration::from_millis(100)).await;

        let coach = HttpCoach::new(format!("http://{}", addr), Duration::from_secs(2))
            .expect("Failed to build client");
        assert!(coach.test_connection().await.unwrap());
        assert_eq!(coach.feedback(110).await.unwrap(), "Good pace");
        assert_eq!(coach.feedback(140).await.unwrap(), "Press slower");

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_http_coach_reports_unreachable_service() {
        // Nothing listens on the discard port
        let coach = HttpCoach::new("http://127.0.0.1:9", Duration::from_secs(2))
            .expect("Failed to build client");
        match coach.feedback(100).await {
            Err(CoachError::Network(_)) | Err(CoachError::Timeout) => {}
            other => panic!("expected a network error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cors_headers() {
        let (addr, shutdown_tx) = run(ServerConfig::new(0))
            .await
            .expect("Failed to start server");

        tokio::time::sleep(Duration::from_millis(100)).await;

        let client = reqwest::Client::new();
        let response = client
            .request(reqwest::Method::OPTIONS, format!("http://{}/feedback", addr))
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
