//! Transport adapter.
//!
//! A [`Transport`] posts one user message to the chat endpoint and returns the
//! decoded JSON body. [`interpret`] turns that result into what the widget
//! renders: a reply, an "unrecognized shape" outcome, or a failure.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::{Error, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Longest slice of an error body kept in an error message.
const ERROR_BODY_LIMIT: usize = 256;

/// Body of the outbound request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub chat_input: String,
    pub session_id: String,
    pub lang: String,
}

/// Carries one user message to the endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the decoded response body.
    async fn exchange(&self, request: &ChatRequest) -> Result<Value>;
}

/// What the widget renders once a request completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A reply was found in the body.
    Reply(String),
    /// The body decoded but carried no reply.
    Unrecognized(Value),
    /// Network, status, or decoding failure. `kind` is one of `timeout`,
    /// `connection`, `status`, `decode` or `request`.
    Failed { kind: &'static str, reason: String },
}

/// Finds the reply in a response body: `reply`, then `output`, then a bare
/// string. Empty strings do not count.
pub fn extract_reply(body: &Value) -> Option<String> {
    let candidates = [
        body.get("reply"),
        body.get("output"),
        Some(body),
    ];
    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

/// Classifies the result of an exchange.
pub fn interpret(result: Result<Value>) -> Outcome {
    match result {
        Ok(body) => match extract_reply(&body) {
            Some(reply) => Outcome::Reply(reply),
            None => Outcome::Unrecognized(body),
        },
        Err(err) => Outcome::Failed {
            kind: failure_kind(&err),
            reason: err.to_string(),
        },
    }
}

fn failure_kind(err: &Error) -> &'static str {
    if err.is_timeout() {
        "timeout"
    } else if err.is_connection() {
        "connection"
    } else if err.status_code().is_some() {
        "status"
    } else if err.is_serialization() {
        "decode"
    } else {
        "request"
    }
}

/// JSON-over-HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: ReqwestClient,
    endpoint: Url,
    timeout: Duration,
}

impl HttpTransport {
    /// Creates a transport for `endpoint` with the default 60s timeout.
    pub fn new(endpoint: Url) -> Result<Self> {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    /// Creates a transport with a custom request timeout.
    pub fn with_timeout(endpoint: Url, timeout: Duration) -> Result<Self> {
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;
        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    /// The endpoint requests are posted to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn exchange(&self, request: &ChatRequest) -> Result<Value> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(Self::default_headers())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(
                        format!("Request timed out: {}", e),
                        Some(self.timeout.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message: String = body.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(Error::api(status.as_u16(), message));
        }

        response.json::<Value>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request() -> ChatRequest {
        ChatRequest {
            chat_input: "hi".to_string(),
            session_id: "fcw-test".to_string(),
            lang: "en".to_string(),
        }
    }

    #[test]
    fn request_uses_wire_names() {
        let body = serde_json::to_value(request()).unwrap();
        assert_eq!(
            body,
            json!({"chatInput": "hi", "sessionId": "fcw-test", "lang": "en"})
        );
    }

    #[test]
    fn reply_field_priority() {
        assert_eq!(
            extract_reply(&json!({"reply": "a", "output": "b"})).as_deref(),
            Some("a")
        );
        assert_eq!(
            extract_reply(&json!({"reply": "", "output": "b"})).as_deref(),
            Some("b")
        );
        assert_eq!(extract_reply(&json!("bare")).as_deref(), Some("bare"));
        assert_eq!(extract_reply(&json!({"reply": 42})), None);
        assert_eq!(extract_reply(&json!({"message": "x"})), None);
        assert_eq!(extract_reply(&json!([{"output": "x"}])), None);
    }

    #[test]
    fn interpret_classifies() {
        assert_eq!(
            interpret(Ok(json!({"output": "ok"}))),
            Outcome::Reply("ok".to_string())
        );
        assert!(matches!(
            interpret(Ok(json!({"status": "queued"}))),
            Outcome::Unrecognized(_)
        ));
        assert!(matches!(
            interpret(Err(Error::connection("refused", None))),
            Outcome::Failed { kind: "connection", .. }
        ));
    }

    #[test]
    fn failures_carry_their_kind() {
        let kind = |err: Error| match interpret(Err(err)) {
            Outcome::Failed { kind, .. } => kind,
            other => panic!("expected a failure, got {other:?}"),
        };
        assert_eq!(kind(Error::timeout("slow", Some(60.0))), "timeout");
        assert_eq!(kind(Error::api(502, "bad gateway")), "status");
        assert_eq!(kind(Error::serialization("not json", None)), "decode");
        assert_eq!(kind(Error::http_client("builder", None)), "request");
    }

    #[test]
    fn transport_creation() {
        let url = Url::parse("https://bot.example.com/chat").unwrap();
        let transport = HttpTransport::new(url.clone()).unwrap();
        assert_eq!(transport.endpoint(), &url);
        assert_eq!(transport.timeout, DEFAULT_TIMEOUT);
        let transport = HttpTransport::with_timeout(url, Duration::from_secs(5)).unwrap();
        assert_eq!(transport.timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn posts_json_and_decodes_reply() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::Json(
                json!({"chatInput": "hi", "sessionId": "fcw-test", "lang": "en"}),
            ))
            .with_header("content-type", "application/json")
            .with_body(r#"{"reply": "hello **there**"}"#)
            .create_async()
            .await;
        let url = Url::parse(&format!("{}/chat", server.url())).unwrap();
        let transport = HttpTransport::new(url).unwrap();
        let body = transport.exchange(&request()).await.unwrap();
        assert_eq!(extract_reply(&body).as_deref(), Some("hello **there**"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_json_body_is_serialization_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat")
            .with_body("<html>oops</html>")
            .create_async()
            .await;
        let url = Url::parse(&format!("{}/chat", server.url())).unwrap();
        let err = HttpTransport::new(url)
            .unwrap()
            .exchange(&request())
            .await
            .unwrap_err();
        assert!(err.is_serialization());
    }

    #[tokio::test]
    async fn error_status_is_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat")
            .with_status(500)
            .with_body(r#"{"reply": "not this"}"#)
            .create_async()
            .await;
        let url = Url::parse(&format!("{}/chat", server.url())).unwrap();
        let err = HttpTransport::new(url)
            .unwrap()
            .exchange(&request())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(500));
    }
}
