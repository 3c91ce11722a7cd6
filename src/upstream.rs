use crate::config::UpstreamConfig;
use axum::http::StatusCode;
use reqwest::header::{CONTENT_TYPE, COOKIE, ORIGIN, REFERER, USER_AGENT};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorKind {
    Network,
    Timeout,
    Http,
    Decode,
}

#[derive(Debug, Clone)]
pub struct UpstreamCallError {
    pub kind: UpstreamErrorKind,
    pub status: Option<StatusCode>,
    pub message: String,
}

impl UpstreamCallError {
    pub fn new(kind: UpstreamErrorKind, status: Option<StatusCode>, message: String) -> Self {
        Self {
            kind,
            status,
            message,
        }
    }

    fn from_reqwest(err: reqwest::Error, status: Option<StatusCode>) -> Self {
        let kind = if err.is_timeout() {
            UpstreamErrorKind::Timeout
        } else {
            UpstreamErrorKind::Network
        };
        Self::new(kind, status, err.to_string())
    }
}

/// Body posted to the NoteGPT chat endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ChatPayload {
    pub message: String,
    pub model: String,
    pub tone: String,
    pub length: String,
    pub conversation_id: String,
}

impl ChatPayload {
    /// Every call starts a fresh conversation on the upstream side.
    pub fn new(cfg: &UpstreamConfig, message: &str, model: &str) -> Self {
        Self {
            message: message.to_string(),
            model: model.to_string(),
            tone: cfg.tone.clone(),
            length: cfg.length.clone(),
            conversation_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Sends one chat request and returns the fully buffered body as UTF-8 text.
///
/// Any status other than 200 comes back as `UpstreamErrorKind::Http` with the
/// upstream status attached. The timeout bounds the whole exchange, body
/// included.
pub async fn call_chat_stream(
    client: &reqwest::Client,
    cfg: &UpstreamConfig,
    payload: &ChatPayload,
) -> Result<String, UpstreamCallError> {
    let resp = call_chat_stream_raw(client, cfg, payload).await?;
    let status = resp.status();
    let bytes = resp
        .bytes()
        .await
        .map_err(|err| UpstreamCallError::from_reqwest(err, Some(status)))?;
    String::from_utf8(bytes.to_vec()).map_err(|err| {
        UpstreamCallError::new(UpstreamErrorKind::Decode, Some(status), err.to_string())
    })
}

pub async fn call_chat_stream_raw(
    client: &reqwest::Client,
    cfg: &UpstreamConfig,
    payload: &ChatPayload,
) -> Result<reqwest::Response, UpstreamCallError> {
    let resp = client
        .post(&cfg.url)
        .timeout(std::time::Duration::from_millis(cfg.timeout_ms))
        .header(CONTENT_TYPE, "application/json")
        .header(USER_AGENT, cfg.user_agent.as_str())
        .header(REFERER, cfg.referer.as_str())
        .header(ORIGIN, cfg.origin.as_str())
        .header(COOKIE, cfg.cookie())
        .json(payload)
        .send()
        .await
        .map_err(|err| UpstreamCallError::from_reqwest(err, None))?;
    let status = resp.status();
    // NoteGPT answers a usable stream with 200 only; any other code is passed on.
    if status != StatusCode::OK {
        let text = resp.text().await.unwrap_or_default();
        tracing::debug!(
            status = status.as_u16(),
            body = %truncate(&text, 512),
            "upstream returned unexpected status"
        );
        return Err(UpstreamCallError::new(
            UpstreamErrorKind::Http,
            Some(status),
            format!("upstream status {}", status),
        ));
    }
    Ok(resp)
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
