//! Safety advice for a free-text description of an emergency.

use crate::AiError;
use crate::providers::{LlmProvider, Part};

/// Wraps the user's message in the fixed advice instruction.
#[must_use]
pub fn safety_tip_prompt(message: &str) -> String {
    format!(
        "A user has described the following emergency or medical need: \"{message}\"\n\nProvide clear, practical, and compassionate safety tips or first aid advice for this situation. If it is a medical emergency, remind them to call emergency services. Format your response in short, easy-to-read sentences."
    )
}

/// Rejects a message that is empty or only whitespace.
///
/// # Errors
///
/// * [`AiError::InvalidInput`] if `message` is blank
pub fn validate_message(message: &str) -> Result<(), AiError> {
    if message.trim().is_empty() {
        return Err(AiError::InvalidInput {
            message: "Message is required".to_string(),
        });
    }

    Ok(())
}

/// Asks the model for safety advice and returns its reply unchanged.
///
/// # Errors
///
/// * [`AiError::InvalidInput`] if `message` is empty or only whitespace
/// * Any provider error if the upstream call fails
pub async fn get_safety_tip(provider: &dyn LlmProvider, message: &str) -> Result<String, AiError> {
    validate_message(message)?;

    log::debug!("Requesting safety tip from model {}", provider.model());

    provider
        .generate(&[Part::text(safety_tip_prompt(message))])
        .await
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct EchoProvider {
        prompts: Mutex<Vec<Part>>,
    }

    #[async_trait::async_trait]
    impl LlmProvider for EchoProvider {
        fn model(&self) -> &str {
            "echo"
        }

        async fn generate(&self, parts: &[Part]) -> Result<String, AiError> {
            self.prompts.lock().unwrap().extend_from_slice(parts);
            Ok("  Call emergency services.\nApply pressure to the wound.  ".to_string())
        }
    }

    fn provider() -> EchoProvider {
        EchoProvider {
            prompts: Mutex::new(vec![]),
        }
    }

    #[test]
    fn prompt_quotes_the_message() {
        let prompt = safety_tip_prompt("my friend fainted");

        assert!(prompt.starts_with(
            "A user has described the following emergency or medical need: \"my friend fainted\"\n\n"
        ));
        assert!(prompt.contains("remind them to call emergency services"));
    }

    #[tokio::test]
    async fn reply_is_returned_verbatim() {
        let provider = provider();

        let tip = get_safety_tip(&provider, "deep cut on my hand").await.unwrap();

        assert_eq!(tip, "  Call emergency services.\nApply pressure to the wound.  ");
        let prompts = provider.prompts.lock().unwrap();
        assert_eq!(
            prompts.as_slice(),
            [Part::text(safety_tip_prompt("deep cut on my hand"))]
        );
    }

    #[tokio::test]
    async fn blank_message_is_rejected_without_calling_provider() {
        let provider = provider();

        for message in ["", "   ", "\n\t"] {
            let err = get_safety_tip(&provider, message).await.unwrap_err();
            assert!(err.is_invalid_input());
        }

        assert!(provider.prompts.lock().unwrap().is_empty());
    }
}
