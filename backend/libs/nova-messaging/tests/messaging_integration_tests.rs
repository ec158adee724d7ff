/// Integration tests for the messaging client against a mock backend
mod common;

use common::{client_for, single_request_body, split_batch_body, ACCESS_TOKEN, SEND_PATH};
use nova_messaging::{
    CloudMessage, ErrorKind, Message, MessagingClient, MessagingConfig, MessagingError,
    Notification, ReqwestTransport, StaticTokenProvider, TransportError, MAX_BATCH_SIZE,
};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{any, bearer_token, body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ==================== Single Send ====================

#[tokio::test]
async fn test_send_single_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(bearer_token(ACCESS_TOKEN))
        .and(body_json(json!({
            "message": {"token": "device-1", "notification": {"title": "Hi", "body": "there"}}
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"name": "projects/test-project/messages/0:123"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let message = CloudMessage::new()
        .with_changed_target(nova_messaging::TargetKind::Token, "device-1")
        .unwrap()
        .with_notification(Notification::new("Hi", "there"));

    let result = client.send(message).await.unwrap();

    assert_eq!(result["name"], "projects/test-project/messages/0:123");
}

#[tokio::test]
async fn test_send_server_error_is_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.send(json!({"topic": "news"})).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    match err {
        MessagingError::Transport(TransportError::Status { status, response }) => {
            assert_eq!(status, 500);
            assert_eq!(response.body, "internal");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    let config = MessagingConfig::new("test-project").with_base_uri("http://127.0.0.1:1");
    let transport = ReqwestTransport::new(Arc::new(StaticTokenProvider::new(ACCESS_TOKEN)));
    let client = MessagingClient::new(config, transport);

    let err = client.send(json!({"topic": "news"})).await.unwrap_err();

    assert!(matches!(
        err,
        MessagingError::Transport(TransportError::Network(_))
    ));
}

// ==================== Multicast / Batch ====================

#[tokio::test]
async fn test_multicast_sends_one_batch_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/batch"))
        .and(header(
            "content-type",
            "multipart/mixed; boundary=__END_OF_PART__",
        ))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"kind": "batch", "parts": 3})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client
        .send_multicast(json!({
            "tokens": ["A", "B", "C"],
            "notification": {"title": "T"},
            "data": {"k": "v"}
        }))
        .await
        .unwrap();

    assert_eq!(result, json!({"kind": "batch", "parts": 3}));

    let body = single_request_body(&server).await;
    let parts = split_batch_body(&body);
    assert_eq!(parts.len(), 3);
    for (part, token) in parts.iter().zip(["A", "B", "C"]) {
        assert_eq!(
            part,
            &json!({"token": token, "notification": {"title": "T"}, "data": {"k": "v"}})
        );
    }
    assert!(body.contains(&format!(
        "POST {}/v1/projects/test-project/messages:send HTTP/1.1\r\n",
        server.uri()
    )));
}

#[tokio::test]
async fn test_multicast_over_limit_never_reaches_backend() {
    let server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let tokens: Vec<String> = (0..=MAX_BATCH_SIZE).map(|i| format!("token-{}", i)).collect();

    let err = client
        .send_multicast(json!({ "tokens": tokens }))
        .await
        .unwrap_err();

    assert!(matches!(err, MessagingError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_send_all_full_batch() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/batch"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "--batch_x\r\nContent-Type: application/http\r\n\r\nHTTP/1.1 200 OK\r\n\r\n{}\r\n--batch_x--",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let messages: Vec<Message> = (1..=MAX_BATCH_SIZE)
        .map(|i| Message::from_json(json!({"token": format!("token-{}", i)})).unwrap())
        .collect();

    let result = client.send_all(messages).await.unwrap();

    // multipart response bodies are passed through untouched
    assert!(result.as_str().unwrap().starts_with("--batch_x"));

    let body = single_request_body(&server).await;
    let parts = split_batch_body(&body);
    assert_eq!(parts.len(), MAX_BATCH_SIZE);
    assert_eq!(parts[0]["token"], "token-1");
    assert_eq!(parts[MAX_BATCH_SIZE - 1]["token"], "token-100");

    let ids: Vec<usize> = body
        .lines()
        .filter_map(|line| line.strip_prefix("content-id: "))
        .map(|id| id.parse().unwrap())
        .collect();
    assert_eq!(ids, (1..=MAX_BATCH_SIZE).collect::<Vec<_>>());
    assert_eq!(body.matches("--__END_OF_PART__--").count(), 1);
}

#[tokio::test]
async fn test_batch_http_failure_aborts_whole_batch() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/batch"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let messages = vec![
        Message::from_json(json!({"token": "a"})).unwrap(),
        Message::from_json(json!({"token": "b"})).unwrap(),
    ];

    let err = client.send_all(messages).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
}

// ==================== Validation ====================

#[tokio::test]
async fn test_validate_success_uses_dry_run() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(body_json(json!({
            "message": {"topic": "news"},
            "validate_only": true
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"name": "projects/test-project/messages/fake_message_id"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client.validate(json!({"topic": "news"})).await.unwrap();

    assert_eq!(result["name"], "projects/test-project/messages/fake_message_id");
}

#[tokio::test]
async fn test_validate_not_found_is_invalid_message() {
    let server = MockServer::start().await;
    let error_body = json!({
        "error": {
            "code": 404,
            "message": "Requested entity was not found.",
            "status": "NOT_FOUND"
        }
    });

    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_json(error_body.clone()))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.validate(json!({"token": "unknown-device"})).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidMessage);
    let response = err.response().expect("original response attached");
    assert_eq!(response.status, 404);
    let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(body, error_body);
    assert_eq!(
        err.to_string(),
        "Invalid message: Requested entity was not found."
    );
}

#[tokio::test]
async fn test_validate_unavailable_stays_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.validate(json!({"token": "device"})).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
}

// ==================== Topic Management ====================

#[tokio::test]
async fn test_subscribe_to_topic() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/iid/v1:batchAdd"))
        .and(header("access_token_auth", "true"))
        .and(bearer_token(ACCESS_TOKEN))
        .and(body_json(json!({
            "to": "/topics/news",
            "registration_tokens": ["t1", "t2", "t1"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": [{}, {}, {}]})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client
        .subscribe_to_topic("news", vec!["t1", "t2", "t1"])
        .await
        .unwrap();

    assert_eq!(result["results"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_unsubscribe_single_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/iid/v1:batchRemove"))
        .and(body_json(json!({
            "to": "/topics/weather",
            "registration_tokens": ["only-token"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": [{}]})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let topic = nova_messaging::Topic::from_value("/topics/weather").unwrap();

    client
        .unsubscribe_from_topic(topic, "only-token")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_topic_management_rejects_bad_input_before_io() {
    let server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);

    let err = client.subscribe_to_topic("bad topic!", "t1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = client
        .subscribe_to_topic("news", json!([1, 2]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = client
        .unsubscribe_from_topic("news", Vec::<String>::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}
