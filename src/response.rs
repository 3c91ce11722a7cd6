use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// JSON responder that pretty-prints with a two space indent.
///
/// `serde_json` never escapes non-ASCII characters, so accented text from the
/// upstream reaches the client verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrettyJson<T>(pub T);

impl<T> IntoResponse for PrettyJson<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        match serde_json::to_vec_pretty(&self.0) {
            Ok(bytes) => (
                [(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))],
                bytes,
            )
                .into_response(),
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize response body");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    [(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))],
                    format!(
                        "{{\n  \"error\": {},\n  \"success\": false\n}}",
                        serde_json::Value::String(err.to_string())
                    ),
                )
                    .into_response()
            }
        }
    }
}
