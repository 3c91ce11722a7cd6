use serde::Serialize;

pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_UPSTREAM_URL: &str = "https://notegpt.io/api/v2/chat/stream";
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_ANONYMOUS_USER_ID: &str = "05522698-d985-48a3-b8de-179c66683b3b";

/// Models advertised by `GET /api/modelos`. Not derived from the upstream.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ModelCatalog {
    #[serde(rename = "modelos")]
    pub models: Vec<String>,
    #[serde(rename = "default")]
    pub default_model: String,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            models: default_models(),
            default_model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl ModelCatalog {
    /// Falls back to the default model when the caller left `modelo` blank.
    pub fn resolve_model(&self, requested: Option<&str>) -> String {
        requested
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.default_model.clone())
    }
}

/// Fixed shape of the outbound NoteGPT call.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub url: String,
    pub timeout_ms: u64,
    pub user_agent: String,
    pub referer: String,
    pub origin: String,
    pub anonymous_user_id: String,
    pub tone: String,
    pub length: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_UPSTREAM_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: default_user_agent(),
            referer: "https://notegpt.io/ai-chat".to_string(),
            origin: "https://notegpt.io".to_string(),
            anonymous_user_id: DEFAULT_ANONYMOUS_USER_ID.to_string(),
            tone: "default".to_string(),
            length: "moderate".to_string(),
        }
    }
}

impl UpstreamConfig {
    pub fn cookie(&self) -> String {
        format!("anonymous_user_id={}", self.anonymous_user_id)
    }
}

fn default_models() -> Vec<String> {
    vec![
        "TA/deepseek-ai/DeepSeek-V3".to_string(),
        "TA/deepseek-ai/DeepSeek-R1".to_string(),
        DEFAULT_MODEL.to_string(),
        "gemini-3-flash-preview".to_string(),
    ]
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lists_default_model() {
        let catalog = ModelCatalog::default();
        assert_eq!(catalog.default_model, "gpt-4.1-mini");
        assert!(catalog.models.contains(&catalog.default_model));
        assert_eq!(catalog.models.len(), 4);
    }

    #[test]
    fn resolve_model_falls_back_when_blank() {
        let catalog = ModelCatalog::default();
        assert_eq!(catalog.resolve_model(None), "gpt-4.1-mini");
        assert_eq!(catalog.resolve_model(Some("   ")), "gpt-4.1-mini");
        assert_eq!(
            catalog.resolve_model(Some("TA/deepseek-ai/DeepSeek-R1")),
            "TA/deepseek-ai/DeepSeek-R1"
        );
    }

    #[test]
    fn catalog_serializes_with_wire_names() {
        let value = serde_json::to_value(ModelCatalog::default()).unwrap();
        assert_eq!(value["default"], "gpt-4.1-mini");
        assert_eq!(value["modelos"][0], "TA/deepseek-ai/DeepSeek-V3");
    }

    #[test]
    fn cookie_carries_anonymous_user_id() {
        let cfg = UpstreamConfig {
            anonymous_user_id: "abc".to_string(),
            ..UpstreamConfig::default()
        };
        assert_eq!(cfg.cookie(), "anonymous_user_id=abc");
    }
}
