/// Shared fixtures for messaging integration tests
use std::sync::Arc;

use nova_messaging::{MessagingClient, MessagingConfig, ReqwestTransport, StaticTokenProvider};
use wiremock::MockServer;

pub const PROJECT_ID: &str = "test-project";
pub const ACCESS_TOKEN: &str = "ya29.test-token";
pub const SEND_PATH: &str = "/v1/projects/test-project/messages:send";

/// Route library logs to the test harness; safe to call from every test
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("nova_messaging=debug")
        .with_test_writer()
        .try_init();
}

/// Client pointed at the mock server for every endpoint
pub fn client_for(server: &MockServer) -> MessagingClient {
    init_tracing();

    let config = MessagingConfig::new(PROJECT_ID)
        .with_base_uri(server.uri())
        .with_topic_management_uri(server.uri());

    let transport = ReqwestTransport::new(Arc::new(StaticTokenProvider::new(ACCESS_TOKEN)));
    MessagingClient::new(config, transport)
}

/// Body of the only request the server received
pub async fn single_request_body(server: &MockServer) -> String {
    let requests = server
        .received_requests()
        .await
        .expect("request recording enabled");
    assert_eq!(requests.len(), 1, "expected exactly one HTTP request");
    String::from_utf8(requests[0].body.clone()).expect("utf-8 body")
}

/// JSON bodies of the sub-requests in a batch, in part order
pub fn split_batch_body(body: &str) -> Vec<serde_json::Value> {
    let body = body
        .strip_suffix("--__END_OF_PART__--\r\n")
        .expect("batch terminator");

    body.split("--__END_OF_PART__\r\n")
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (_, sub_request) = part.split_once("\r\n\r\n").expect("part headers");
            let (_, json) = sub_request
                .trim_end()
                .split_once("\r\n\r\n")
                .expect("sub-request headers");
            serde_json::from_str(json).expect("sub-request json")
        })
        .collect()
}
