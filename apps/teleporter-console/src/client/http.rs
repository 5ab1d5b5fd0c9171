//! # HTTP Transport
//!
//! `reqwest` client for the console service REST API.

use super::{ClientError, KvTransport};
use crate::api::types::{
    AtomicPutRequest, ErrorResponse, PutRequest, RangeResponse, RefreshRequest, RemoveResponse,
    SequenceResponse,
};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use teleporter_core::{ConsoleError, KeyedValue, Space};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client that wraps calls to the console service.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpTransport {
    /// Client for the service at `base_url` (e.g. `http://127.0.0.1:8080`).
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, ConsoleError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ConsoleError::RemoteFailure(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a request with optional Bearer auth.
    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.request(method, &url);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }

    /// Send a request and decode the success body, or map the error status.
    async fn call<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T, ClientError> {
        let resp = req
            .send()
            .await
            .map_err(|e| ClientError::ConnectionFailed(format!("{}: {e}", self.base_url)))?;

        let status = resp.status();
        if status.is_success() {
            return resp
                .json::<T>()
                .await
                .map_err(|e| ClientError::ParseError(e.to_string()));
        }

        let text = resp.text().await.unwrap_or_default();
        let body = serde_json::from_str::<ErrorResponse>(&text)
            .unwrap_or_else(|_| ErrorResponse::message(text));
        Err(error_for_status(status, body))
    }
}

fn error_for_status(status: StatusCode, body: ErrorResponse) -> ClientError {
    match status {
        StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimited,
        // Only a missing entry names its key. A bare 404 is a route the
        // service does not have, e.g. a base URL with a wrong path.
        StatusCode::NOT_FOUND => match body.key {
            Some(key) => ClientError::NotFound(key),
            None => ClientError::Rejected {
                status: status.as_u16(),
                message: body.error,
            },
        },
        StatusCode::CONFLICT => ClientError::Conflict {
            key: body.key.unwrap_or_default(),
            expected: body.expected_version,
            actual: body.actual_version,
        },
        s if s.is_server_error() => ClientError::ServerError(s.as_u16(), body.error),
        s => ClientError::Rejected {
            status: s.as_u16(),
            message: body.error,
        },
    }
}

fn space_path(space: Space, endpoint: &str) -> String {
    format!("/{}/{}", space.as_str(), endpoint)
}

impl KvTransport for HttpTransport {
    async fn get(&self, space: Space, key: &str) -> Result<Option<KeyedValue<Value>>, ConsoleError> {
        let req = self
            .request(Method::GET, &space_path(space, "entry"))
            .query(&[("key", key)]);
        match self.call::<KeyedValue<Value>>(req).await {
            Ok(entry) => Ok(Some(entry)),
            Err(ClientError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn range(
        &self,
        space: Space,
        prefix: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<KeyedValue<Value>>, ConsoleError> {
        let req = self.request(Method::GET, &space_path(space, "range")).query(&[
            ("prefix", prefix.to_string()),
            ("offset", offset.to_string()),
            ("limit", limit.to_string()),
        ]);
        let resp: RangeResponse = self.call(req).await?;
        Ok(resp.entries)
    }

    async fn put(
        &self,
        space: Space,
        key: &str,
        value: Value,
    ) -> Result<KeyedValue<Value>, ConsoleError> {
        let body = PutRequest {
            key: key.to_string(),
            value,
        };
        let req = self
            .request(Method::POST, &space_path(space, "entry"))
            .json(&body);
        Ok(self.call(req).await?)
    }

    async fn put_if_version(
        &self,
        space: Space,
        key: &str,
        value: Value,
        expected: Option<u64>,
    ) -> Result<KeyedValue<Value>, ConsoleError> {
        let body = AtomicPutRequest {
            key: key.to_string(),
            value,
            expected_version: expected,
        };
        let req = self
            .request(Method::POST, &space_path(space, "entry/atomic"))
            .json(&body);
        Ok(self.call(req).await?)
    }

    async fn remove(&self, space: Space, key: &str) -> Result<bool, ConsoleError> {
        let req = self
            .request(Method::DELETE, &space_path(space, "entry"))
            .query(&[("key", key)]);
        let resp: RemoveResponse = self.call(req).await?;
        Ok(resp.removed)
    }

    async fn refresh(&self, key: &str) -> Result<(), ConsoleError> {
        let body = RefreshRequest {
            key: key.to_string(),
        };
        let req = self.request(Method::POST, "/config/refresh").json(&body);
        let _: Value = self.call(req).await?;
        Ok(())
    }

    async fn next_id(&self) -> Result<u64, ConsoleError> {
        let req = self.request(Method::POST, "/config/sequence");
        let resp: SequenceResponse = self.call(req).await?;
        Ok(resp.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let transport = HttpTransport::new("http://127.0.0.1:8080/", None).expect("client");
        assert_eq!(transport.base_url(), "http://127.0.0.1:8080");
    }

    #[test]
    fn status_mapping_uses_error_body() {
        let body = ErrorResponse {
            error: "Version conflict".into(),
            key: Some("/task/ns1/t1".into()),
            expected_version: Some(1),
            actual_version: Some(2),
        };
        assert_eq!(
            error_for_status(StatusCode::CONFLICT, body),
            ClientError::Conflict {
                key: "/task/ns1/t1".into(),
                expected: Some(1),
                actual: Some(2),
            }
        );
        assert_eq!(
            error_for_status(StatusCode::BAD_REQUEST, ErrorResponse::message("Invalid key")),
            ClientError::Rejected {
                status: 400,
                message: "Invalid key".into(),
            }
        );
    }

    #[test]
    fn bare_not_found_is_not_a_missing_entry() {
        let keyed = ErrorResponse {
            key: Some("/task/ns1/t1".into()),
            ..ErrorResponse::message("Not found: /task/ns1/t1")
        };
        assert_eq!(
            error_for_status(StatusCode::NOT_FOUND, keyed),
            ClientError::NotFound("/task/ns1/t1".into())
        );
        assert_eq!(
            error_for_status(StatusCode::NOT_FOUND, ErrorResponse::message("")),
            ClientError::Rejected {
                status: 404,
                message: String::new(),
            }
        );
    }
}
