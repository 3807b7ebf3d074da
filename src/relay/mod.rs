/// Polling client for the relay server that ferries results back from the
/// mobile signing app.
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::RelayConfig;
use crate::error::{BridgeError, Result};

mod topic;

pub use topic::{Topic, TopicCategory};

/// Body posted to a topic by the mobile app
#[derive(Debug, Deserialize)]
struct RelayResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Outcome of a single poll
#[derive(Debug, PartialEq)]
enum PollState {
    Pending,
    Ready(String),
    Failed(String),
}

#[derive(Clone)]
pub struct RelayClient {
    client: Client,
    base_url: String,
    poll_interval: Duration,
    timeout: Duration,
    max_poll_errors: u32,
}

impl RelayClient {
    pub fn new(config: &RelayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
            poll_interval: config.poll_interval(),
            timeout: config.timeout(),
            max_poll_errors: config.max_poll_errors.max(1),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Allocate a new topic. No network traffic.
    pub fn create_topic(&self, category: TopicCategory) -> Topic {
        let topic = Topic::new(&self.base_url, category);
        log::debug!("Created {} topic {}", topic.category, topic.id);
        topic
    }

    /// Poll the relay until the topic resolves, fails, or the deadline passes.
    ///
    /// Dropping the returned future stops polling.
    /// Clearing the topic afterwards happens outside the deadline and never
    /// changes the result.
    pub async fn wait_for_result(&self, topic: &Topic) -> Result<String> {
        match tokio::time::timeout(self.timeout, self.poll_until_terminal(topic)).await {
            Ok(result) => {
                if matches!(result, Ok(_) | Err(BridgeError::Relay(_))) {
                    self.spawn_clear(topic);
                }
                result
            }
            Err(_) => {
                log::warn!("Topic {} timed out after {:?}", topic.id, self.timeout);
                Err(BridgeError::Timeout {
                    topic: topic.id.clone(),
                    waited: self.timeout,
                })
            }
        }
    }

    /// Callback flavour of [`wait_for_result`](Self::wait_for_result): the poll
    /// loop runs as a task and `callback` is invoked exactly once.
    pub fn spawn_wait<F>(&self, topic: Topic, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<String>) + Send + 'static,
    {
        let relay = self.clone();
        tokio::spawn(async move {
            let result = relay.wait_for_result(&topic).await;
            callback(result);
        })
    }

    async fn poll_until_terminal(&self, topic: &Topic) -> Result<String> {
        let mut consecutive_errors = 0u32;

        loop {
            match self.poll_once(topic).await {
                Ok(PollState::Pending) => {
                    consecutive_errors = 0;
                }
                Ok(PollState::Ready(value)) => {
                    log::info!("Topic {} resolved", topic.id);
                    return Ok(value);
                }
                Ok(PollState::Failed(message)) => {
                    log::warn!("Topic {} failed: {}", topic.id, message);
                    return Err(BridgeError::Relay(message));
                }
                Err(e) if e.is_transient() => {
                    consecutive_errors += 1;
                    log::warn!(
                        "Polling topic {} failed ({}/{}): {}",
                        topic.id,
                        consecutive_errors,
                        self.max_poll_errors,
                        e
                    );
                    if consecutive_errors >= self.max_poll_errors {
                        return Err(e);
                    }
                }
                Err(e) => return Err(e),
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn poll_once(&self, topic: &Topic) -> Result<PollState> {
        let response = self.client.get(&topic.url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT {
            return Ok(PollState::Pending);
        }
        if !status.is_success() {
            return Err(BridgeError::RelayStatus {
                topic: topic.id.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        parse_poll_body(&body)
    }

    /// Best-effort removal of a consumed topic from the relay, in the background.
    fn spawn_clear(&self, topic: &Topic) {
        let client = self.client.clone();
        let topic = topic.clone();
        tokio::spawn(async move {
            match client.delete(&topic.url).send().await {
                Ok(response) if !response.status().is_success() => {
                    log::debug!("Relay refused to clear topic {}: {}", topic.id, response.status());
                }
                Ok(_) => {}
                Err(e) => log::debug!("Failed to clear topic {}: {}", topic.id, e),
            }
        });
    }
}

fn parse_poll_body(body: &str) -> Result<PollState> {
    if body.trim().is_empty() {
        return Ok(PollState::Pending);
    }

    let response: RelayResponse = serde_json::from_str(body)?;

    if let Some(error) = response.error {
        return Ok(PollState::Failed(error));
    }

    match response.data {
        None | Some(Value::Null) => Ok(PollState::Pending),
        Some(Value::String(value)) => Ok(PollState::Ready(value)),
        Some(other) => Err(BridgeError::Parse(format!(
            "expected a string result, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::{Arc, Mutex};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(url: &str) -> RelayConfig {
        RelayConfig {
            url: url.to_string(),
            poll_interval_ms: 20,
            timeout_secs: 2,
            max_poll_errors: 3,
            request_timeout_secs: 1,
        }
    }

    #[test]
    fn test_parse_poll_body() {
        assert_eq!(parse_poll_body("").unwrap(), PollState::Pending);
        assert_eq!(parse_poll_body("{}").unwrap(), PollState::Pending);
        assert_eq!(parse_poll_body(r#"{"data":null}"#).unwrap(), PollState::Pending);
        assert_eq!(
            parse_poll_body(r#"{"data":"0xabc"}"#).unwrap(),
            PollState::Ready("0xabc".to_string())
        );
        assert_eq!(
            parse_poll_body(r#"{"error":"rejected"}"#).unwrap(),
            PollState::Failed("rejected".to_string())
        );

        let err = parse_poll_body(r#"{"data":42}"#).unwrap_err();
        assert!(matches!(err, BridgeError::Parse(_)));
        let err = parse_poll_body("<html>").unwrap_err();
        assert!(matches!(err, BridgeError::Parse(_)));
    }

    #[test]
    fn test_create_topic_uses_base_url() {
        let relay = RelayClient::new(&test_config("https://relay.example/")).unwrap();
        let topic = relay.create_topic(TopicCategory::Tx);
        assert_eq!(topic.category, TopicCategory::Tx);
        assert_eq!(topic.url, format!("https://relay.example/{}", topic.id));
    }

    #[tokio::test]
    async fn test_polls_until_data() {
        let server = MockServer::start().await;
        let relay = RelayClient::new(&test_config(&server.uri())).unwrap();
        let topic = relay.create_topic(TopicCategory::Address);
        let topic_path = format!("/{}", topic.id);

        Mock::given(method("GET"))
            .and(path(topic_path.clone()))
            .respond_with(ResponseTemplate::new(404))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(topic_path.clone()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": "0xabc" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path(topic_path))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let result = relay.wait_for_result(&topic).await.unwrap();
        assert_eq!(result, "0xabc");

        // Clear runs in the background
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    #[tokio::test]
    async fn test_slow_clear_does_not_discard_result() {
        let server = MockServer::start().await;
        let mut config = test_config(&server.uri());
        config.timeout_secs = 1;
        config.request_timeout_secs = 5;
        let relay = RelayClient::new(&config).unwrap();
        let topic = relay.create_topic(TopicCategory::Tx);

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": "0xhash" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let started = std::time::Instant::now();
        let result = relay.wait_for_result(&topic).await.unwrap();
        assert_eq!(result, "0xhash");
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_error_payload_stops_polling() {
        let server = MockServer::start().await;
        let relay = RelayClient::new(&test_config(&server.uri())).unwrap();
        let topic = relay.create_topic(TopicCategory::Tx);

        Mock::given(method("GET"))
            .and(path(format!("/{}", topic.id)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "error": "X" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = relay.wait_for_result(&topic).await.unwrap_err();
        assert!(matches!(err, BridgeError::Relay(ref m) if m == "X"));
        assert_eq!(err.kind(), ErrorKind::Remote);
    }

    #[tokio::test]
    async fn test_silent_relay_times_out() {
        let server = MockServer::start().await;
        let mut config = test_config(&server.uri());
        config.timeout_secs = 1;
        let relay = RelayClient::new(&config).unwrap();
        let topic = relay.create_topic(TopicCategory::Tx);

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let started = std::time::Instant::now();
        let err = relay.wait_for_result(&topic).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_server_errors_are_bounded() {
        let server = MockServer::start().await;
        let relay = RelayClient::new(&test_config(&server.uri())).unwrap();
        let topic = relay.create_topic(TopicCategory::Tx);

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let err = relay.wait_for_result(&topic).await.unwrap_err();
        assert!(matches!(err, BridgeError::RelayStatus { status: 500, .. }));
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn test_spawn_wait_invokes_callback_once() {
        let server = MockServer::start().await;
        let relay = RelayClient::new(&test_config(&server.uri())).unwrap();
        let topic = relay.create_topic(TopicCategory::Tx);

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": "0xhash" })),
            )
            .mount(&server)
            .await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        relay
            .spawn_wait(topic, move |result| {
                sink.lock().unwrap().push(result.unwrap());
            })
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["0xhash".to_string()]);
    }
}
