//! `OpenAI` GPT provider implementation.

use serde::{Deserialize, Serialize};

use super::{GenerationConfig, LlmProvider, Part, encode_base64, provider_error};
use crate::AiError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// `OpenAI` chat completions API provider.
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    base_url: String,
    generation: GenerationConfig,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Creates a new `OpenAI` provider.
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

    /// Sends requests to an `OpenAI`-compatible server at `base_url`.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: Vec<OpenAiContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenAiContentPart {
    Text { text: String },
    ImageUrl { image_url: OpenAiImageUrl },
}

#[derive(Serialize)]
struct OpenAiImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

fn build_request<'a>(
    model: &'a str,
    parts: &[Part],
    generation: GenerationConfig,
) -> OpenAiRequest<'a> {
    let content = parts
        .iter()
        .map(|part| match part {
            Part::Text(text) => OpenAiContentPart::Text { text: text.clone() },
            Part::Image { mime_type, data } => OpenAiContentPart::ImageUrl {
                image_url: OpenAiImageUrl {
                    url: format!("data:{mime_type};base64,{}", encode_base64(data)),
                },
            },
        })
        .collect();

    OpenAiRequest {
        model,
        messages: vec![OpenAiMessage {
            role: "user",
            content,
        }],
        max_tokens: generation.max_output_tokens,
        temperature: generation.temperature,
        top_p: generation.top_p,
    }
}

fn extract_text(response: OpenAiResponse) -> Result<String, AiError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AiError::Provider {
            message: "No choices in OpenAI response".to_string(),
        })?;

    match choice.message.content {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(AiError::Provider {
            message: format!(
                "OpenAI returned an empty response (finish reason: {})",
                choice.finish_reason.as_deref().unwrap_or("unknown")
            ),
        }),
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, parts: &[Part]) -> Result<String, AiError> {
        let request = build_request(&self.model, parts, self.generation);

        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
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
    fn images_become_data_urls() {
        let request = build_request(
            "gpt-4o",
            &[Part::text("what is this?"), Part::image("image/jpeg", b"hi".to_vec())],
            GenerationConfig::default(),
        );
        let json = serde_json::to_value(&request).unwrap();

        let content = &json["messages"][0]["content"];
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[1]["type"], "image_url");
        assert_eq!(content[1]["image_url"]["url"], "data:image/jpeg;base64,aGk=");
        assert_eq!(json["max_tokens"], 2048);
        assert!(json.get("top_k").is_none());
    }

    #[test]
    fn extracts_first_choice() {
        let response: OpenAiResponse = serde_json::from_str(
            r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"Stay calm."},"finish_reason":"stop"}]}"#,
        )
        .unwrap();

        assert_eq!(extract_text(response).unwrap(), "Stay calm.");
    }

    #[test]
    fn no_choices_is_provider_error() {
        let response: OpenAiResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();

        assert!(matches!(
            extract_text(response).unwrap_err(),
            AiError::Provider { .. }
        ));
    }
}
