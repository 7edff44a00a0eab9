use async_trait::async_trait;
use tracing::{debug, warn};

use super::connection::ApiConnectionError;
use super::endpoints::{
    ChatCompletionRequest, ChatMessage, JsonSchemaDefinition, Provider, ProviderRouting,
    ResponseFormat,
};

/// One structured-output call: prompts plus the schema the answer must follow.
#[derive(Debug, Clone)]
pub struct ModelPrompt {
    pub system: String,
    pub user: String,
    pub schema: Option<JsonSchemaDefinition>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A generative model treated as a black box.
///
/// `Ok(None)` means the call went through but produced nothing usable.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &ModelPrompt) -> Result<Option<String>, ApiConnectionError>;
}

pub struct OpenRouterModel {
    provider: Provider,
    model: String,
}

impl OpenRouterModel {
    pub fn new(provider: Provider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, prompt: &ModelPrompt) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(prompt.system.clone()),
                ChatMessage::user(prompt.user.clone()),
            ],
            response_format: prompt.schema.clone().map(ResponseFormat::json_schema),
            temperature: Some(prompt.temperature),
            max_tokens: Some(prompt.max_tokens),
            provider: self
                .provider
                .routing_for(&self.model)
                .map(|source| ProviderRouting { only: vec![source] }),
        }
    }
}

#[async_trait]
impl LanguageModel for OpenRouterModel {
    async fn complete(&self, prompt: &ModelPrompt) -> Result<Option<String>, ApiConnectionError> {
        let request = self.build_request(prompt);
        let response = self.provider.call_chat_completion(request).await?;

        match response.first_content() {
            Some(content) => {
                debug!(chars = content.len(), "model returned content");
                Ok(Some(content.to_string()))
            }
            None => {
                warn!(model = %self.model, "model returned no content");
                Ok(None)
            }
        }
    }
}
