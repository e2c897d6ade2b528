use crate::error::ServiceError;
use crate::hub::{HubClient, HubConfig};
use crate::traits::LanguageModel;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

pub const DEFAULT_LLM_REPO: &str = "google/flan-t5-xxl";
pub const DEFAULT_TEMPERATURE: f32 = 0.5;
pub const DEFAULT_MAX_LENGTH: u32 = 512;

#[derive(Debug, Clone, Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
    options: GenerationOptions,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct GenerationParameters {
    temperature: f32,
    max_length: u32,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct GenerationOptions {
    wait_for_model: bool,
}

/// Text-generation model served by a hosted inference API.
#[derive(Debug, Clone)]
pub struct HuggingFaceHubModel {
    client: HubClient,
    repo_id: String,
    temperature: f32,
    max_length: u32,
}

impl HuggingFaceHubModel {
    pub fn new(config: &HubConfig, repo_id: impl Into<String>) -> Result<Self, ServiceError> {
        Ok(Self {
            client: HubClient::new(config)?,
            repo_id: repo_id.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_length: DEFAULT_MAX_LENGTH,
        })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn repo_id(&self) -> &str {
        &self.repo_id
    }
}

#[async_trait]
impl LanguageModel for HuggingFaceHubModel {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        let request = GenerationRequest {
            inputs: prompt,
            parameters: GenerationParameters {
                temperature: self.temperature,
                max_length: self.max_length,
            },
            options: GenerationOptions {
                wait_for_model: true,
            },
        };

        let payload = self
            .client
            .post_json(&format!("models/{}", self.repo_id), &request)
            .await?;

        generated_text(&payload)
    }
}

fn generated_text(payload: &Value) -> Result<String, ServiceError> {
    let text = payload
        .pointer("/0/generated_text")
        .or_else(|| payload.pointer("/generated_text"))
        .and_then(Value::as_str);

    match text {
        Some(text) => Ok(text.trim().to_string()),
        None => Err(ServiceError::BackendResponse {
            backend: "text-generation".to_string(),
            details: payload
                .pointer("/error")
                .and_then(Value::as_str)
                .unwrap_or("response has no generated_text")
                .to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn generated_text_is_read_from_list_payload() {
        let payload = json!([{ "generated_text": " Cats are mammals. " }]);
        assert_eq!(
            generated_text(&payload).expect("payload is well formed"),
            "Cats are mammals."
        );
    }

    #[test]
    fn generated_text_is_read_from_object_payload() {
        let payload = json!({ "generated_text": "yes" });
        assert_eq!(generated_text(&payload).expect("payload is well formed"), "yes");
    }

    #[test]
    fn error_payload_is_reported() {
        let payload = json!({ "error": "Model is overloaded" });
        match generated_text(&payload) {
            Err(ServiceError::BackendResponse { details, .. }) => {
                assert_eq!(details, "Model is overloaded")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn request_carries_generation_parameters() {
        let request = GenerationRequest {
            inputs: "prompt",
            parameters: GenerationParameters {
                temperature: DEFAULT_TEMPERATURE,
                max_length: DEFAULT_MAX_LENGTH,
            },
            options: GenerationOptions {
                wait_for_model: true,
            },
        };

        let value = serde_json::to_value(&request).expect("request serializes");
        assert_eq!(value["parameters"]["temperature"], json!(0.5));
        assert_eq!(value["parameters"]["max_length"], json!(512));
    }
}
