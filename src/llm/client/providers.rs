//! LLM Provider支持模块

use anyhow::Result;
use rig::{
    agent::Agent,
    client::{CompletionClient, EmbeddingsClient},
    completion::Prompt,
    embeddings::EmbeddingModel,
};

use crate::config::{LLMConfig, LLMProvider};
use crate::llm::client::types::SamplingOptions;

/// 统一的Provider客户端枚举
#[derive(Clone)]
pub enum ProviderClient {
    OpenAI(rig::providers::openai::Client),
    DeepSeek(rig::providers::deepseek::Client),
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

    /// 创建Agent，采样参数未设置时回落到全局配置
    pub fn create_agent(
        &self,
        model: &str,
        system_prompt: &str,
        config: &LLMConfig,
        options: &SamplingOptions,
    ) -> ProviderAgent {
        let temperature = options.temperature.unwrap_or(config.temperature);
        let max_tokens: u64 = options.max_tokens.unwrap_or(config.max_tokens).into();

        match self {
            ProviderClient::OpenAI(client) => {
                let mut builder = client
                    .completion_model(model)
                    .completions_api()
                    .into_agent_builder()
                    .preamble(system_prompt)
                    .max_tokens(max_tokens)
                    .temperature(temperature);
                if let Some(params) = options.additional_params() {
                    builder = builder.additional_params(params);
                }
                ProviderAgent::OpenAI(builder.build())
            }
            ProviderClient::DeepSeek(client) => {
                let mut builder = client
                    .agent(model)
                    .preamble(system_prompt)
                    .max_tokens(max_tokens)
                    .temperature(temperature);
                if let Some(params) = options.additional_params() {
                    builder = builder.additional_params(params);
                }
                ProviderAgent::DeepSeek(builder.build())
            }
            ProviderClient::Anthropic(client) => {
                let mut builder = client
                    .agent(model)
                    .preamble(system_prompt)
                    .max_tokens(max_tokens)
                    .temperature(temperature);
                if let Some(params) = options.additional_params() {
                    builder = builder.additional_params(params);
                }
                ProviderAgent::Anthropic(builder.build())
            }
            ProviderClient::Ollama(client) => {
                let mut builder = client
                    .agent(model)
                    .preamble(system_prompt)
                    .max_tokens(max_tokens)
                    .temperature(temperature);
                if let Some(params) = options.additional_params() {
                    builder = builder.additional_params(params);
                }
                ProviderAgent::Ollama(builder.build())
            }
        }
    }

    /// 创建向量化模型，仅OpenAI与Ollama支持
    pub fn create_embedding(&self, model: &str) -> Result<ProviderEmbedding> {
        match self {
            ProviderClient::OpenAI(client) => {
                Ok(ProviderEmbedding::OpenAI(client.embedding_model(model)))
            }
            ProviderClient::Ollama(client) => {
                Ok(ProviderEmbedding::Ollama(client.embedding_model(model)))
            }
            ProviderClient::DeepSeek(_) => {
                Err(anyhow::anyhow!("DeepSeek provider不支持向量化模型"))
            }
            ProviderClient::Anthropic(_) => {
                Err(anyhow::anyhow!("Anthropic provider不支持向量化模型"))
            }
        }
    }
}

/// 统一的Agent枚举
pub enum ProviderAgent {
    OpenAI(Agent<rig::providers::openai::CompletionModel>),
    DeepSeek(Agent<rig::providers::deepseek::CompletionModel>),
    Anthropic(Agent<rig::providers::anthropic::completion::CompletionModel>),
    Ollama(Agent<rig::providers::ollama::CompletionModel<reqwest::Client>>),
}

impl ProviderAgent {
    /// 执行prompt
    pub async fn prompt(&self, prompt: &str) -> Result<String> {
        match self {
            ProviderAgent::OpenAI(agent) => agent.prompt(prompt).await.map_err(|e| e.into()),
            ProviderAgent::DeepSeek(agent) => agent.prompt(prompt).await.map_err(|e| e.into()),
            ProviderAgent::Anthropic(agent) => agent.prompt(prompt).await.map_err(|e| e.into()),
            ProviderAgent::Ollama(agent) => agent.prompt(prompt).await.map_err(|e| e.into()),
        }
    }
}

/// 统一的向量化模型枚举
pub enum ProviderEmbedding {
    OpenAI(rig::providers::openai::EmbeddingModel),
    Ollama(rig::providers::ollama::EmbeddingModel<reqwest::Client>),
}

impl ProviderEmbedding {
    /// 对单段文本生成向量
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = match self {
            ProviderEmbedding::OpenAI(model) => model.embed_text(text).await?,
            ProviderEmbedding::Ollama(model) => model.embed_text(text).await?,
        };
        Ok(embedding.vec.into_iter().map(|v| v as f32).collect())
    }
}
