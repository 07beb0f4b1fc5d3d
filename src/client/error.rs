//! Errors encountered during API requests or reported by the remote server.
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

/// Errors returned by the identity platform API client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request could not be sent or the response could not be received.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform refused the configured credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The object is not available, or access to it is restricted.
    #[error("status: 404, body: {0}")]
    NotFound(String),

    /// The object already exists.
    #[error("status: 409, body: {0}")]
    Conflict(String),

    /// The server rejected or failed to process the request.
    #[error("status: {status}, body: {body}")]
    Status {
        /// HTTP status code of the response.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The response body could not be decoded.
    #[error("invalid API response received: {reason}: {body}")]
    InvalidResponse {
        /// Why decoding failed.
        reason: String,
        /// Raw response body.
        body: String,
    },

    /// The server returned an empty response where an object was expected.
    #[error("the server returned an empty API response")]
    EmptyResponse,

    /// A request URL could not be built from the configured hosts.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Whether the remote object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether the remote object already exists.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Map an HTTP status onto the client error it represents, if any.
pub fn check_status(status: StatusCode, body: String) -> Result<String, ClientError> {
    if status.is_success() {
        return Ok(body);
    }
    let error = match status {
        StatusCode::NOT_FOUND => ClientError::NotFound(body),
        StatusCode::CONFLICT => ClientError::Conflict(body),
        StatusCode::UNAUTHORIZED => ClientError::Authentication(body),
        status => ClientError::Status {
            status: status.as_u16(),
            body,
        },
    };
    Err(error)
}

/// Decode a successful response body, `None` when the body is empty.
pub fn decode<T>(body: &str) -> Result<Option<T>, ClientError>
where
    T: DeserializeOwned,
{
    if body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str::<T>(body)
        .map(Some)
        .map_err(|error| ClientError::InvalidResponse {
            reason: error.to_string(),
            body: body.to_string(),
        })
}

/// Decode the body of an HTTP response and correctly handle errors in the process.
pub async fn inspect<T>(response: Response) -> Result<Option<T>, ClientError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let text = response.text().await?;
    let text = check_status(status, text)?;
    decode(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn success_passes_body_through() {
        let body = check_status(StatusCode::CREATED, "{}".into()).unwrap();
        assert_eq!(body, "{}");
    }

    #[test]
    fn not_found_and_conflict() {
        let error = check_status(StatusCode::NOT_FOUND, "gone".into()).unwrap_err();
        assert!(error.is_not_found());
        assert_eq!(error.to_string(), "status: 404, body: gone");

        let error = check_status(StatusCode::CONFLICT, "exists".into()).unwrap_err();
        assert!(error.is_conflict());
        assert!(!error.is_not_found());
    }

    #[test]
    fn other_status_keeps_code_and_body() {
        let body = r#"{"code":400}"#.to_string();
        let error = check_status(StatusCode::BAD_REQUEST, body).unwrap_err();
        assert_eq!(error.to_string(), r#"status: 400, body: {"code":400}"#);
        assert!(matches!(error, ClientError::Status { status: 400, .. }));
    }

    #[test]
    fn unauthorized_is_authentication() {
        let error = check_status(StatusCode::UNAUTHORIZED, "denied".into()).unwrap_err();
        assert!(matches!(error, ClientError::Authentication(_)));
    }

    #[test]
    fn decode_empty_body() {
        let value: Option<Value> = decode("  ").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn decode_invalid_body() {
        let error = decode::<Value>("<html>").unwrap_err();
        match error {
            ClientError::InvalidResponse { body, .. } => assert_eq!(body, "<html>"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
