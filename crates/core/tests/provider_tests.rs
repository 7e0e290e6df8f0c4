// ═══════════════════════════════════════════════════════════════════
// Provider Tests — Gemini backend over a local canned HTTP server
// ═══════════════════════════════════════════════════════════════════

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use receipt_scanner_core::errors::{CoreError, ErrorCategory};
use receipt_scanner_core::models::config::ScannerConfig;
use receipt_scanner_core::providers::gemini::GeminiConnector;
use receipt_scanner_core::providers::traits::{InlineImage, ModelConnector};

// ═══════════════════════════════════════════════════════════════════
// Test Helpers — one-shot HTTP server
// ═══════════════════════════════════════════════════════════════════

/// Raw request as received: head (request line + headers) and body.
struct Captured {
    head: String,
    body: String,
}

fn content_length(head: &str) -> usize {
    head.lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.trim()
                .eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse().ok())
                .flatten()
        })
        .unwrap_or(0)
}

/// Serve exactly one request with `status` and `body`, returning what was sent.
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}/v1beta", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let (head, req_body) = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending a full request");
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).into_owned();
            if let Some(idx) = text.find("\r\n\r\n") {
                let head = text[..idx].to_string();
                let req_body = text[idx + 4..].to_string();
                if req_body.len() >= content_length(&head) {
                    break (head, req_body);
                }
            }
        };

        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        Captured { head, body: req_body }
    });

    (base, handle)
}

fn connector(base: &str) -> GeminiConnector {
    GeminiConnector::new("gemini-test", base, Duration::from_secs(5))
}

// ── Requests ────────────────────────────────────────────────────────

mod requests {
    use super::*;

    #[tokio::test]
    async fn sends_prompt_image_and_header_key() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"candidates":[{"content":{"parts":[{"text":"VALID_RECEIPT"}]}}]}"#,
        )
        .await;
        let model = connector(&base).connect("secret-key").unwrap();
        let image = InlineImage::from_bytes("image/png", &[1, 2, 3]);

        let reply = model.generate("Is this a receipt?", Some(&image)).await.unwrap();
        assert_eq!(reply, "VALID_RECEIPT");

        let captured = server.await.unwrap();
        let request_line = captured.head.lines().next().unwrap();
        assert_eq!(request_line, "POST /v1beta/models/gemini-test:generateContent HTTP/1.1");
        assert!(captured.head.to_ascii_lowercase().contains("x-goog-api-key: secret-key"));
        assert!(!request_line.contains("secret-key"));

        let body: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "Is this a receipt?");
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/png");
        assert_eq!(parts[1]["inline_data"]["data"], "AQID");
    }

    #[tokio::test]
    async fn text_only_request_has_one_part() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"candidates":[{"content":{"parts":[{"text":"OK"}]}}]}"#,
        )
        .await;
        let model = connector(&base).connect("k").unwrap();

        assert_eq!(model.generate("Respond with OK", None).await.unwrap(), "OK");

        let captured = server.await.unwrap();
        let body: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
        assert_eq!(body["contents"][0]["parts"].as_array().unwrap().len(), 1);
    }
}

// ── Responses ───────────────────────────────────────────────────────

mod responses {
    use super::*;

    #[tokio::test]
    async fn no_candidates_is_empty_text() {
        let (base, _server) = serve_once("200 OK", "{}").await;
        let model = connector(&base).connect("k").unwrap();
        assert_eq!(model.generate("p", None).await.unwrap(), "");
    }

    #[tokio::test]
    async fn error_envelope_becomes_api_error() {
        let (base, _server) = serve_once(
            "400 Bad Request",
            r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#,
        )
        .await;
        let model = connector(&base).connect("bad").unwrap();

        let err = model.generate("p", None).await.unwrap_err();
        match &err {
            CoreError::Api { provider, message } => {
                assert_eq!(provider, "Gemini");
                assert!(message.starts_with("INVALID_ARGUMENT: API key not valid"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
        assert_eq!(err.category(), ErrorCategory::Transport);
    }

    #[tokio::test]
    async fn plain_error_body_is_kept() {
        let (base, _server) = serve_once("503 Service Unavailable", "overloaded").await;
        let model = connector(&base).connect("k").unwrap();

        let err = model.generate("p", None).await.unwrap_err();
        assert!(matches!(err, CoreError::Api { ref message, .. } if message.contains("overloaded")));
    }

    #[tokio::test]
    async fn malformed_success_body_is_api_error() {
        let (base, _server) = serve_once("200 OK", "not json").await;
        let model = connector(&base).connect("k").unwrap();

        let err = model.generate("p", None).await.unwrap_err();
        assert!(matches!(err, CoreError::Api { .. }));
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        // Bind then drop to get a port nothing listens on.
        let port = {
            let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
            l.local_addr().unwrap().port()
        };
        let model = connector(&format!("http://127.0.0.1:{port}/v1beta"))
            .connect("k")
            .unwrap();

        let err = model.generate("p", None).await.unwrap_err();
        assert!(matches!(err, CoreError::Network(_)));
    }
}

// ── Connector ───────────────────────────────────────────────────────

mod connect {
    use super::*;

    #[test]
    fn blank_key_is_missing() {
        let c = GeminiConnector::from_config(&ScannerConfig::default());
        assert!(matches!(c.connect(""), Err(CoreError::MissingApiKey)));
    }

    #[test]
    fn model_is_named() {
        let model = GeminiConnector::default().connect("k").unwrap();
        assert_eq!(model.name(), "Gemini");
    }
}
