use crate::app::AppState;
use crate::error::{AppError, AppResult};
use crate::response::PrettyJson;
use crate::stream_decoder::{self, DecodedStream};
use crate::upstream::{self, ChatPayload, UpstreamCallError, UpstreamErrorKind};
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Value, json};

/// Query keys accepted for the prompt, highest priority first.
pub const MESSAGE_ALIASES: [&str; 3] = ["mensaje", "prompt", "texto"];
pub const MODEL_PARAM: &str = "modelo";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub model: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChatResult {
    pub success: bool,
    #[serde(rename = "respuesta")]
    pub answer: String,
    #[serde(rename = "modelo")]
    pub model: String,
    #[serde(rename = "pregunta")]
    pub prompt: String,
    #[serde(rename = "razonamiento", skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl ChatResult {
    fn from_decoded(request: ChatRequest, decoded: DecodedStream) -> Self {
        let reasoning = decoded.reasoning().map(str::to_string);
        Self {
            success: true,
            answer: decoded.text,
            model: request.model,
            prompt: request.message,
            reasoning,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Falta el parámetro \"mensaje\", \"prompt\" o \"texto\"")]
    MissingMessage,
    #[error("Error {}", .0.as_u16())]
    UpstreamStatus(StatusCode),
    #[error("Empty response from NoteGPT")]
    EmptyBody,
    #[error("No text content extracted from NoteGPT")]
    NoText,
    #[error("{0}")]
    Unexpected(String),
}

impl ChatError {
    pub fn status(&self) -> StatusCode {
        match self {
            ChatError::MissingMessage => StatusCode::BAD_REQUEST,
            ChatError::UpstreamStatus(status) => *status,
            ChatError::EmptyBody | ChatError::NoText | ChatError::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ChatError::MissingMessage => "missing_message",
            ChatError::UpstreamStatus(_) => "upstream_status",
            ChatError::EmptyBody => "empty_upstream_body",
            ChatError::NoText => "no_extractable_text",
            ChatError::Unexpected(_) => "unexpected_failure",
        }
    }
}

impl From<UpstreamCallError> for ChatError {
    fn from(err: UpstreamCallError) -> Self {
        match (err.kind, err.status) {
            (UpstreamErrorKind::Http, Some(status)) => ChatError::UpstreamStatus(status),
            _ => ChatError::Unexpected(err.message),
        }
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        AppError::new(err.status(), err.code(), err.to_string())
    }
}

/// First value of `key` in query order; later repeats are ignored.
pub fn first_param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Picks the first alias whose first occurrence is non-blank.
pub fn resolve_message(params: &[(String, String)]) -> Option<String> {
    MESSAGE_ALIASES
        .iter()
        .filter_map(|key| first_param(params, key))
        .find(|value| !value.trim().is_empty())
        .map(str::to_string)
}

pub fn parse_chat_request(
    state: &AppState,
    params: &[(String, String)],
) -> Result<ChatRequest, ChatError> {
    let message = resolve_message(params).ok_or(ChatError::MissingMessage)?;
    let model = state.catalog.resolve_model(first_param(params, MODEL_PARAM));
    Ok(ChatRequest { model, message })
}

pub async fn chat(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> AppResult<Response> {
    match run_chat(&state, &params).await {
        Ok(result) => Ok(PrettyJson(result).into_response()),
        Err(err) => {
            tracing::warn!(
                code = err.code(),
                status = err.status().as_u16(),
                error = %err,
                "chat request failed"
            );
            Err(err.into())
        }
    }
}

async fn run_chat(
    state: &AppState,
    params: &[(String, String)],
) -> Result<ChatResult, ChatError> {
    let request = parse_chat_request(state, params)?;
    let payload = ChatPayload::new(&state.runtime.upstream, &request.message, &request.model);
    tracing::debug!(
        model = %request.model,
        conversation_id = %payload.conversation_id,
        "forwarding chat to upstream"
    );

    let body = upstream::call_chat_stream(&state.http, &state.runtime.upstream, &payload).await?;
    if body.trim().is_empty() {
        return Err(ChatError::EmptyBody);
    }

    let decoded = stream_decoder::decode_event_stream(&body);
    if !decoded.has_text() {
        return Err(ChatError::NoText);
    }

    Ok(ChatResult::from_decoded(request, decoded))
}

pub async fn list_models(State(state): State<AppState>) -> impl IntoResponse {
    PrettyJson(state.catalog.as_ref().clone())
}

pub async fn service_info(State(state): State<AppState>) -> impl IntoResponse {
    PrettyJson(service_info_document(&state.catalog.default_model))
}

pub async fn not_found(uri: Uri) -> AppError {
    AppError::new(
        StatusCode::NOT_FOUND,
        "not_found",
        format!("Not found: {}", uri.path()),
    )
}

pub async fn method_not_allowed(method: Method, uri: Uri) -> AppError {
    AppError::new(
        StatusCode::METHOD_NOT_ALLOWED,
        "method_not_allowed",
        format!("Method {} not allowed on {}", method, uri.path()),
    )
}

fn service_info_document(default_model: &str) -> Value {
    json!({
        "servicio": "NoteGPT API Proxy",
        "version": "2.0",
        "tipo_respuesta": "JSON completo (no streaming)",
        "endpoints": {
            "/api/chat": {
                "metodo": "GET",
                "parametros": {
                    "modelo": format!("Modelo a usar (opcional, default: {default_model})"),
                    "mensaje": "Texto del mensaje (requerido)"
                },
                "nota": "El idioma se detecta automáticamente basándose en el mensaje",
                "ejemplo": "/api/chat?mensaje=Hello",
                "respuesta": {
                    "success": true,
                    "respuesta": "Texto de la respuesta completa",
                    "modelo": default_model,
                    "pregunta": "Tu pregunta original"
                }
            },
            "/api/modelos": {
                "metodo": "GET",
                "descripcion": "Lista los modelos disponibles"
            }
        }
    })
}
