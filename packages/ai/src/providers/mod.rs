//! LLM provider abstraction and implementations.
//!
//! Supports Google Gemini, Anthropic Claude, and `OpenAI` via a common
//! trait. Every provider accepts mixed text and inline image parts and
//! returns the model's reply as plain text.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::AiError;

/// Default Gemini model, matching the one the frontend was built against.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

/// One piece of a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// Plain text.
    Text(String),
    /// Raw image bytes sent inline.
    Image {
        /// MIME type of the image, e.g. `image/jpeg`.
        mime_type: String,
        /// The image bytes.
        data: Vec<u8>,
    },
}

impl Part {
    /// Creates a text part.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Creates an inline image part.
    #[must_use]
    pub fn image(mime_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::Image {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }
}

/// Base64-encodes image bytes for inline transport.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Sampling parameters sent with every request.
///
/// Providers ignore parameters their API doesn't support.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    /// Upper bound on generated tokens.
    pub max_output_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Top-K sampling cutoff.
    pub top_k: u32,
    /// Nucleus sampling cutoff.
    pub top_p: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: 2048,
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
        }
    }
}

impl GenerationConfig {
    /// Reads `AI_MAX_OUTPUT_TOKENS`, `AI_TEMPERATURE`, `AI_TOP_K`, and
    /// `AI_TOP_P`, keeping the default for anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_output_tokens: env_or("AI_MAX_OUTPUT_TOKENS", defaults.max_output_tokens),
            temperature: env_or("AI_TEMPERATURE", defaults.temperature),
            top_k: env_or("AI_TOP_K", defaults.top_k),
            top_p: env_or("AI_TOP_P", defaults.top_p),
        }
    }
}

fn env_or<T: std::str::FromStr + Copy + std::fmt::Display>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Ignoring unparseable {name}={raw:?}; using {default}");
            default
        }),
        Err(_) => default,
    }
}

/// Trait for LLM providers.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// The model name requests are sent to.
    fn model(&self) -> &str;

    /// Sends a single-turn request and returns the reply text.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails, the provider answers with
    /// an error, or the reply contains no text.
    async fn generate(&self, parts: &[Part]) -> Result<String, AiError>;
}

/// Everything needed to construct a provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    /// Explicit provider name (`gemini`, `anthropic`, `openai`).
    pub provider: Option<String>,
    /// Model override.
    pub model: Option<String>,
    /// Endpoint override for compatible self-hosted servers.
    pub base_url: Option<String>,
    /// Google AI Studio key.
    pub google_api_key: Option<String>,
    /// Anthropic key.
    pub anthropic_api_key: Option<String>,
    /// `OpenAI` key.
    pub openai_api_key: Option<String>,
    /// Sampling parameters.
    pub generation: GenerationConfig,
}

impl ProviderSettings {
    /// Reads provider settings from the environment.
    ///
    /// `GOOGLE_AI_API_KEY` takes precedence over `GEMINI_API_KEY`.
    #[must_use]
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            provider: var("AI_PROVIDER"),
            model: var("AI_MODEL"),
            base_url: var("AI_BASE_URL"),
            google_api_key: var("GOOGLE_AI_API_KEY").or_else(|| var("GEMINI_API_KEY")),
            anthropic_api_key: var("ANTHROPIC_API_KEY"),
            openai_api_key: var("OPENAI_API_KEY"),
            generation: GenerationConfig::from_env(),
        }
    }
}

/// Creates an LLM provider from explicit settings.
///
/// If `provider` is set, uses that provider. Otherwise auto-detects from
/// the available keys in the order Gemini, Anthropic, `OpenAI`.
///
/// # Errors
///
/// Returns [`AiError::Config`] if no key is available for the chosen
/// provider or the provider name is unknown.
pub fn create_provider(settings: &ProviderSettings) -> Result<Box<dyn LlmProvider>, AiError> {
    let provider = settings
        .provider
        .clone()
        .unwrap_or_else(|| detect_provider(settings).to_string());

    let missing_key = |var: &str| AiError::Config {
        message: format!("{var} environment variable not set"),
    };

    match provider.to_lowercase().as_str() {
        "gemini" | "google" => {
            let api_key = settings
                .google_api_key
                .clone()
                .ok_or_else(|| missing_key("GOOGLE_AI_API_KEY"))?;
            let model = settings
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
            let mut p = gemini::GeminiProvider::new(api_key, model, settings.generation);
            if let Some(base_url) = &settings.base_url {
                p = p.with_base_url(base_url);
            }
            Ok(Box::new(p))
        }
        "anthropic" | "claude" => {
            let api_key = settings
                .anthropic_api_key
                .clone()
                .ok_or_else(|| missing_key("ANTHROPIC_API_KEY"))?;
            let model = settings
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string());
            let mut p = anthropic::AnthropicProvider::new(api_key, model, settings.generation);
            if let Some(base_url) = &settings.base_url {
                p = p.with_base_url(base_url);
            }
            Ok(Box::new(p))
        }
        "openai" | "gpt" => {
            let api_key = settings
                .openai_api_key
                .clone()
                .ok_or_else(|| missing_key("OPENAI_API_KEY"))?;
            let model = settings
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
            let mut p = openai::OpenAiProvider::new(api_key, model, settings.generation);
            if let Some(base_url) = &settings.base_url {
                p = p.with_base_url(base_url);
            }
            Ok(Box::new(p))
        }
        other => Err(AiError::Config {
            message: format!("Unknown AI provider: {other}. Use 'gemini', 'anthropic', or 'openai'."),
        }),
    }
}

/// Creates an LLM provider based on environment variables.
///
/// # Errors
///
/// Returns [`AiError::Config`] if no credentials are found or the
/// explicitly requested provider is not configured.
pub fn create_provider_from_env() -> Result<Box<dyn LlmProvider>, AiError> {
    create_provider(&ProviderSettings::from_env())
}

/// Picks a provider name from whichever key is present.
fn detect_provider(settings: &ProviderSettings) -> &'static str {
    if settings.google_api_key.is_some() {
        log::info!("Auto-detected AI provider: Gemini (GOOGLE_AI_API_KEY found)");
        return "gemini";
    }

    if settings.anthropic_api_key.is_some() {
        log::info!("Auto-detected AI provider: Anthropic (ANTHROPIC_API_KEY found)");
        return "anthropic";
    }

    if settings.openai_api_key.is_some() {
        log::info!("Auto-detected AI provider: OpenAI (OPENAI_API_KEY found)");
        return "openai";
    }

    // Fall back to gemini, which produces a clear error about the missing key
    "gemini"
}

/// Builds an [`AiError::Provider`] from a non-success HTTP reply, preferring
/// the `error.message` field most providers put in their error bodies.
pub(crate) fn provider_error(status: reqwest::StatusCode, body: &str) -> AiError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {status}: {body}"));

    AiError::Provider { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ProviderSettings {
        ProviderSettings::default()
    }

    #[test]
    fn detects_gemini_first() {
        let s = ProviderSettings {
            google_api_key: Some("g".to_string()),
            openai_api_key: Some("o".to_string()),
            ..settings()
        };
        let provider = create_provider(&s).unwrap();
        assert_eq!(provider.model(), DEFAULT_GEMINI_MODEL);
    }

    #[test]
    fn explicit_provider_and_model_win() {
        let s = ProviderSettings {
            provider: Some("OpenAI".to_string()),
            model: Some("gpt-4o-mini".to_string()),
            google_api_key: Some("g".to_string()),
            openai_api_key: Some("o".to_string()),
            ..settings()
        };
        let provider = create_provider(&s).unwrap();
        assert_eq!(provider.model(), "gpt-4o-mini");
    }

    #[test]
    fn missing_key_is_config_error() {
        let err = create_provider(&settings()).err().unwrap();
        assert!(matches!(err, AiError::Config { .. }));
        assert!(err.to_string().contains("GOOGLE_AI_API_KEY"));

        let s = ProviderSettings {
            provider: Some("anthropic".to_string()),
            ..settings()
        };
        let err = create_provider(&s).err().unwrap();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn unknown_provider_is_config_error() {
        let s = ProviderSettings {
            provider: Some("bard".to_string()),
            google_api_key: Some("g".to_string()),
            ..settings()
        };
        assert!(matches!(
            create_provider(&s).err().unwrap(),
            AiError::Config { .. }
        ));
    }

    #[test]
    fn provider_error_prefers_error_message() {
        let err = provider_error(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#,
        );
        assert_eq!(err.to_string(), "API key not valid");

        let err = provider_error(reqwest::StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(err.to_string(), "HTTP 502 Bad Gateway: upstream down");
    }
}
