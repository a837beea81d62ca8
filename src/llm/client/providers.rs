//! LLM Provider支持模块

use anyhow::Result;
use async_trait::async_trait;
use rig::{client::CompletionClient, completion::Prompt, extractor::ExtractionError};
use schemars::JsonSchema;
use serde::{Serialize, de::DeserializeOwned};

use crate::config::{LLMConfig, LLMProvider};
use crate::llm::client::types::{ChatBackend, LlmError};

/// 统一的Provider客户端枚举
#[derive(Clone)]
pub enum ProviderClient {
    OpenAI(rig::providers::openai::Client),
    DeepSeek(rig::providers::deepseek::Client),
    Mistral(rig::providers::mistral::Client),
    Anthropic(rig::providers::anthropic::Client),
    Ollama(rig::providers::ollama::Client),
}

impl ProviderClient {
    /// 根据配置创建相应的provider客户端
    pub fn new(config: &LLMConfig) -> Result<Self> {
        match config.provider {
            LLMProvider::OpenAI => {
                let client = rig::providers::openai::Client::builder(&config.api_key)
                    .base_url(&config.api_base_url)
                    .build();
                Ok(ProviderClient::OpenAI(client))
            }
            LLMProvider::DeepSeek => {
                let client = rig::providers::deepseek::Client::builder(&config.api_key)
                    .base_url(&config.api_base_url)
                    .build();
                Ok(ProviderClient::DeepSeek(client))
            }
            LLMProvider::Mistral => {
                let client = rig::providers::mistral::Client::builder(&config.api_key).build();
                Ok(ProviderClient::Mistral(client))
            }
            LLMProvider::Anthropic => {
                let client =
                    rig::providers::anthropic::ClientBuilder::new(&config.api_key).build()?;
                Ok(ProviderClient::Anthropic(client))
            }
            LLMProvider::Ollama => {
                let client = rig::providers::ollama::Client::builder().build();
                Ok(ProviderClient::Ollama(client))
            }
        }
    }
}

/// 基于rig的对话后端
///
/// 温度由调用方按次指定，因此Agent在每次调用时构建。
#[derive(Clone)]
pub struct RigChatBackend {
    client: ProviderClient,
    model: String,
    max_tokens: u64,
}

impl RigChatBackend {
    pub fn new(config: &LLMConfig) -> Result<Self> {
        Ok(Self {
            client: ProviderClient::new(config)?,
            model: config.model.clone(),
            max_tokens: config.max_tokens.into(),
        })
    }
}

#[async_trait]
impl ChatBackend for RigChatBackend {
    async fn chat(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f64,
    ) -> Result<String, LlmError> {
        let model = self.model.as_str();
        let result = match &self.client {
            ProviderClient::OpenAI(client) => {
                let agent = client
                    .completion_model(model)
                    .completions_api()
                    .into_agent_builder()
                    .preamble(system_prompt)
                    .max_tokens(self.max_tokens)
                    .temperature(temperature)
                    .build();
                agent.prompt(user_prompt).await
            }
            ProviderClient::DeepSeek(client) => {
                let agent = client
                    .agent(model)
                    .preamble(system_prompt)
                    .max_tokens(self.max_tokens)
                    .temperature(temperature)
                    .build();
                agent.prompt(user_prompt).await
            }
            ProviderClient::Mistral(client) => {
                let agent = client
                    .agent(model)
                    .preamble(system_prompt)
                    .temperature(temperature)
                    .build();
                agent.prompt(user_prompt).await
            }
            ProviderClient::Anthropic(client) => {
                let agent = client
                    .agent(model)
                    .preamble(system_prompt)
                    .max_tokens(self.max_tokens)
                    .temperature(temperature)
                    .build();
                agent.prompt(user_prompt).await
            }
            ProviderClient::Ollama(client) => {
                let agent = client
                    .agent(model)
                    .preamble(system_prompt)
                    .max_tokens(self.max_tokens)
                    .temperature(temperature)
                    .build();
                agent.prompt(user_prompt).await
            }
        };

        result.map_err(|e| LlmError::classify(e.to_string()))
    }
}

impl RigChatBackend {
    /// 通过rig的Extractor获取结构化输出，单次尝试，不做重试
    ///
    /// Extractor不提供温度设置，温度经由附加请求参数传递。
    pub async fn extract<T>(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f64,
    ) -> Result<T, LlmError>
    where
        T: JsonSchema + DeserializeOwned + Serialize + Send + Sync + 'static,
    {
        let model = self.model.as_str();
        let params = serde_json::json!({ "temperature": temperature });
        let result = match &self.client {
            ProviderClient::OpenAI(client) => {
                let extractor = client
                    .extractor_completions_api::<T>(model)
                    .preamble(system_prompt)
                    .max_tokens(self.max_tokens)
                    .additional_params(params)
                    .build();
                extractor.extract(user_prompt).await
            }
            ProviderClient::DeepSeek(client) => {
                let extractor = client
                    .extractor::<T>(model)
                    .preamble(system_prompt)
                    .max_tokens(self.max_tokens)
                    .additional_params(params)
                    .build();
                extractor.extract(user_prompt).await
            }
            ProviderClient::Mistral(client) => {
                let extractor = client
                    .extractor::<T>(model)
                    .preamble(system_prompt)
                    .additional_params(params)
                    .build();
                extractor.extract(user_prompt).await
            }
            ProviderClient::Anthropic(client) => {
                let extractor = client
                    .extractor::<T>(model)
                    .preamble(system_prompt)
                    .max_tokens(self.max_tokens)
                    .additional_params(params)
                    .build();
                extractor.extract(user_prompt).await
            }
            ProviderClient::Ollama(client) => {
                let extractor = client
                    .extractor::<T>(model)
                    .preamble(system_prompt)
                    .max_tokens(self.max_tokens)
                    .additional_params(params)
                    .build();
                extractor.extract(user_prompt).await
            }
        };

        result.map_err(classify_extraction_error)
    }
}

/// 模型未调用提交工具或参数不合法时视为格式错误，其余按Provider错误分类
fn classify_extraction_error(err: ExtractionError) -> LlmError {
    match err {
        ExtractionError::NoData | ExtractionError::DeserializationError(_) => {
            LlmError::MalformedResponse(err.to_string())
        }
        ExtractionError::CompletionError(inner) => LlmError::classify(inner.to_string()),
    }
}
