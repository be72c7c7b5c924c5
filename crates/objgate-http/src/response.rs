//! JSON response construction.

use http::StatusCode;
use serde::Serialize;
use tracing::error;

use crate::body::GatewayBody;
use crate::error::HttpError;

/// Shorthand for the response type every route produces.
pub type GatewayResponse = http::Response<GatewayBody>;

/// Serialize `value` as a JSON response with the given status.
///
/// # Errors
///
/// [`HttpError::Internal`] if serialization fails.
pub fn json_response<T: Serialize>(
    status: StatusCode,
    value: &T,
) -> Result<GatewayResponse, HttpError> {
    let body = serde_json::to_vec(value)
        .map_err(|e| HttpError::Internal(format!("failed to serialize response: {e}")))?;
    http::Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(GatewayBody::from_bytes(body))
        .map_err(|e| HttpError::Internal(format!("failed to build response: {e}")))
}

/// A `200 OK` JSON response.
///
/// # Errors
///
/// [`HttpError::Internal`] if serialization fails.
pub fn ok_json<T: Serialize>(value: &T) -> Result<GatewayResponse, HttpError> {
    json_response(StatusCode::OK, value)
}

/// A `204 No Content` response.
#[must_use]
pub fn no_content() -> GatewayResponse {
    let mut response = http::Response::new(GatewayBody::empty());
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
}

/// Render an error as `{"error": "<message>"}`.
#[must_use]
pub fn error_to_response(err: &HttpError, request_id: &str) -> GatewayResponse {
    let status = err.status();
    if status.is_server_error() {
        error!(error = %err, request_id, "request failed");
    }

    let body = serde_json::json!({ "error": err.to_string() }).to_string();
    let mut response = http::Response::new(GatewayBody::from_string(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    response
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    async fn body_json(response: GatewayResponse) -> serde_json::Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .unwrap_or_else(|e| panic!("body: {e}"))
            .to_bytes();
        serde_json::from_slice(&bytes).unwrap_or_else(|e| panic!("json: {e}"))
    }

    #[tokio::test]
    async fn test_should_render_json_body() {
        let response = ok_json(&serde_json::json!({ "message": "ok" })).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(http::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
        assert_eq!(body_json(response).await["message"], "ok");
    }

    #[tokio::test]
    async fn test_should_render_error_body() {
        let err = HttpError::bad_request("No fileUrl provided");
        let response = error_to_response(&err, "req-1");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "No fileUrl provided");
    }

    #[test]
    fn test_should_build_no_content() {
        assert_eq!(no_content().status(), StatusCode::NO_CONTENT);
    }
}
