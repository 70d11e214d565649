use crate::llm::client::{GenerationOptions, LLMClient};
use crate::types::{AppError, Result};
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestUserMessage, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;

pub struct OpenAIClient {
    client: Client<OpenAIConfig>,
    model: String,
    options: GenerationOptions,
}

impl OpenAIClient {
    pub fn new(api_key: String, api_base: String, model: String, options: GenerationOptions) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);

        Self {
            client: Client::with_config(config),
            model,
            options,
        }
    }

    fn build_request(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
    ) -> Result<CreateChatCompletionRequest> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model).messages(messages);
        if let Some(temperature) = self.options.temperature {
            args.temperature(temperature);
        }
        if let Some(max_tokens) = self.options.max_tokens {
            args.max_completion_tokens(max_tokens);
        }

        args.build()
            .map_err(|e| AppError::LLM(format!("Failed to build request: {}", e)))
    }

    async fn complete(&self, request: CreateChatCompletionRequest) -> Result<String> {
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| AppError::LLM("No response from model".to_string()))
    }
}

/// Network-level failures are worth retrying, API rejections are not.
fn map_openai_error(e: OpenAIError) -> AppError {
    match e {
        OpenAIError::Reqwest(err) => AppError::Unavailable(format!("LLM request failed: {}", err)),
        OpenAIError::StreamError(err) => AppError::Unavailable(format!("LLM stream failed: {}", err)),
        other => AppError::LLM(format!("LLM API error: {}", other)),
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = self.build_request(vec![ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessage::from(prompt.to_string()),
        )])?;

        self.complete(request).await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        let request = self.build_request(vec![
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage::from(
                system.to_string(),
            )),
            ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage::from(
                prompt.to_string(),
            )),
        ])?;

        self.complete(request).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
