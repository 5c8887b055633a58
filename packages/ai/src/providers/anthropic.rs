//! Anthropic Claude provider implementation.

use serde::{Deserialize, Serialize};

use super::{GenerationConfig, LlmProvider, Part, encode_base64, provider_error};
use crate::AiError;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Anthropic Claude API provider.
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    base_url: String,
    generation: GenerationConfig,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Creates a new Anthropic provider.
    #[must_use]
    pub fn new(api_key: String, model: String, generation: GenerationConfig) -> Self {
        Self {
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            generation,
            client: reqwest::Client::new(),
        }
    }

    /// Sends requests to `base_url` instead of the public endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

/// Anthropic API request body.
#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    top_k: u32,
    messages: Vec<AnthropicMessage>,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: Vec<AnthropicContent>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContent {
    Text { text: String },
    Image { source: AnthropicImageSource },
}

#[derive(Serialize)]
struct AnthropicImageSource {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: String,
    data: String,
}

/// Anthropic API response body.
#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

fn build_request<'a>(
    model: &'a str,
    parts: &[Part],
    generation: GenerationConfig,
) -> AnthropicRequest<'a> {
    let content = parts
        .iter()
        .map(|part| match part {
            Part::Text(text) => AnthropicContent::Text { text: text.clone() },
            Part::Image { mime_type, data } => AnthropicContent::Image {
                source: AnthropicImageSource {
                    source_type: "base64",
                    media_type: mime_type.clone(),
                    data: encode_base64(data),
                },
            },
        })
        .collect();

    AnthropicRequest {
        model,
        max_tokens: generation.max_output_tokens,
        temperature: generation.temperature,
        top_k: generation.top_k,
        messages: vec![AnthropicMessage {
            role: "user",
            content,
        }],
    }
}

fn extract_text(response: AnthropicResponse) -> Result<String, AiError> {
    let text = response
        .content
        .into_iter()
        .filter_map(|block| match block {
            AnthropicContentBlock::Text { text } => Some(text),
            AnthropicContentBlock::Other => None,
        })
        .collect::<Vec<_>>()
        .join("\n");

    if text.is_empty() {
        return Err(AiError::Provider {
            message: format!(
                "Anthropic returned an empty response (stop reason: {})",
                response.stop_reason.as_deref().unwrap_or("unknown")
            ),
        });
    }

    Ok(text)
}

#[async_trait::async_trait]
impl LlmProvider for AnthropicProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, parts: &[Part]) -> Result<String, AiError> {
        let request = build_request(&self.model, parts, self.generation);

        let resp = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(provider_error(status, &body));
        }

        extract_text(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn images_become_base64_sources() {
        let request = build_request(
            "claude",
            &[Part::image("image/webp", vec![0xff]), Part::text("describe")],
            GenerationConfig::default(),
        );
        let json = serde_json::to_value(&request).unwrap();

        let content = &json["messages"][0]["content"];
        assert_eq!(content[0]["type"], "image");
        assert_eq!(content[0]["source"]["type"], "base64");
        assert_eq!(content[0]["source"]["media_type"], "image/webp");
        assert_eq!(content[0]["source"]["data"], "/w==");
        assert_eq!(content[1]["text"], "describe");
        assert_eq!(json["top_k"], 40);
        assert!(json.get("top_p").is_none());
    }

    #[test]
    fn joins_text_blocks() {
        let response: AnthropicResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":"Description: broken window"},{"type":"text","text":"Report Type: vandalism"}],"stop_reason":"end_turn"}"#,
        )
        .unwrap();

        assert_eq!(
            extract_text(response).unwrap(),
            "Description: broken window\nReport Type: vandalism"
        );
    }

    #[test]
    fn empty_content_is_provider_error() {
        let response: AnthropicResponse =
            serde_json::from_str(r#"{"content":[],"stop_reason":"max_tokens"}"#).unwrap();

        let err = extract_text(response).unwrap_err();
        assert!(err.to_string().contains("max_tokens"));
    }
}
