//! Timeout-aware request execution
//!
//! Every backend call goes through [`send_with_timeout`], which races the
//! whole exchange (connect, status, body) against a deadline and a
//! caller-supplied [`CancellationToken`]. Losing the race drops the request
//! future, which aborts the underlying connection; the deadline timer is
//! owned by the same `select!` and is released however the call settles.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::error::{AssistantError, Result};

/// Send `request` and decode its JSON body as `T`
///
/// # Arguments
///
/// * `request` - Fully built request (URL, query, body, headers)
/// * `operation` - Label used in logs and error messages, e.g. `POST /chat/`
/// * `timeout` - Deadline for the entire exchange
/// * `cancel` - Token the caller may trigger to abandon the request
///
/// # Errors
///
/// - [`AssistantError::Timeout`] when `timeout` elapses first
/// - [`AssistantError::Cancelled`] when `cancel` fires first
/// - [`AssistantError::Http`] on a non-success status
/// - [`AssistantError::Network`] on transport failure
/// - [`AssistantError::Decode`] when the success body is not the expected JSON
pub async fn send_with_timeout<T: DeserializeOwned>(
    request: RequestBuilder,
    operation: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<T> {
    tracing::debug!("{} (timeout {:?})", operation, timeout);

    let outcome = tokio::select! {
        biased;

        _ = cancel.cancelled() => {
            tracing::debug!("{} cancelled by caller", operation);
            Err(AssistantError::Cancelled(operation.to_string()))
        }

        settled = tokio::time::timeout(timeout, exchange::<T>(request, operation)) => {
            match settled {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!("{} timed out after {:?}", operation, timeout);
                    Err(AssistantError::Timeout {
                        operation: operation.to_string(),
                        after: timeout,
                    })
                }
            }
        }
    };

    outcome.map_err(Into::into)
}

async fn exchange<T: DeserializeOwned>(
    request: RequestBuilder,
    operation: &str,
) -> std::result::Result<T, AssistantError> {
    let response = request
        .send()
        .await
        .map_err(|e| transport_error(operation, e))?;

    let response = ensure_success(response, operation).await?;

    let body = response
        .text()
        .await
        .map_err(|e| transport_error(operation, e))?;

    serde_json::from_str(&body).map_err(|e| {
        tracing::error!("Failed to parse {} response: {}", operation, e);
        AssistantError::Decode(format!("{}: {}", operation, e))
    })
}

/// Turn a non-success response into [`AssistantError::Http`]
///
/// The message is the body text when there is one, otherwise `HTTP <code>`.
async fn ensure_success(
    response: Response,
    operation: &str,
) -> std::result::Result<Response, AssistantError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::warn!("{} returned {}: {}", operation, status, body);
    Err(status_error(status, body))
}

pub(crate) fn status_error(status: StatusCode, body: String) -> AssistantError {
    let message = if body.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        body
    };
    AssistantError::Http {
        status: status.as_u16(),
        message,
    }
}

fn transport_error(operation: &str, error: reqwest::Error) -> AssistantError {
    tracing::error!("{} failed: {}", operation, error);
    AssistantError::Network(format!("{}: {}", operation, error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pong {
        ok: bool,
    }

    fn downcast(err: &anyhow::Error) -> &AssistantError {
        err.downcast_ref::<AssistantError>()
            .expect("error must be an AssistantError")
    }

    #[test]
    fn test_status_error_prefers_body_text() {
        let err = status_error(StatusCode::BAD_REQUEST, "Email already registered".into());
        assert_eq!(err.to_string(), "Email already registered");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_status_error_falls_back_to_status_code() {
        let err = status_error(StatusCode::INTERNAL_SERVER_ERROR, String::new());
        assert_eq!(err.to_string(), "HTTP 500");
    }

    #[tokio::test]
    async fn test_success_decodes_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&server)
            .await;

        let request = reqwest::Client::new().get(format!("{}/ping", server.uri()));
        let pong: Pong = send_with_timeout(
            request,
            "GET /ping",
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(pong, Pong { ok: true });
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"ok": true}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let request = reqwest::Client::new().get(format!("{}/slow", server.uri()));
        let err = send_with_timeout::<Pong>(
            request,
            "GET /slow",
            Duration::from_millis(100),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(downcast(&err).is_timeout());
    }

    #[tokio::test]
    async fn test_cancelled_token_wins() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let request = reqwest::Client::new().get(server.uri());
        let err = send_with_timeout::<Pong>(request, "GET /", Duration::from_secs(5), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(downcast(&err), AssistantError::Cancelled(_)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let request = reqwest::Client::new().get(server.uri());
        let err = send_with_timeout::<Pong>(
            request,
            "GET /",
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(downcast(&err), AssistantError::Decode(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Bind then drop a listener so the port is very likely closed.
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let request = reqwest::Client::new().get(format!("http://{}/", addr));
        let err = send_with_timeout::<Pong>(
            request,
            "GET /",
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(downcast(&err), AssistantError::Network(_)));
    }
}
