//! LLM客户端 - 提供统一的模型网关接口

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheManager;
use crate::config::Config;

mod providers;
pub mod types;

use providers::ProviderClient;
use types::{ModelTier, SamplingOptions};

/// 模型网关
///
/// 编排引擎唯一的模型出口。单次调用、不做重试，
/// 重试语义由上层的结构化输出解析器统一承担。
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// 单次文本生成
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &SamplingOptions,
    ) -> Result<String>;

    /// 对单段文本生成向量
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// 检查模型连接和功能是否正常
    async fn check_connection(&self) -> Result<()> {
        println!("🔄 正在检查模型连接...");
        let options = SamplingOptions {
            tier: ModelTier::Efficient,
            temperature: Some(0.0),
            max_tokens: Some(16),
            ..SamplingOptions::default()
        };
        match self
            .generate("You are a helpful assistant.", "Hello", &options)
            .await
        {
            Ok(_) => {
                println!("✅ 模型连接正常");
                Ok(())
            }
            Err(e) => {
                eprintln!("❌ 模型连接失败: {}", e);
                Err(e)
            }
        }
    }
}

/// 基于rig的模型网关实现
#[derive(Clone)]
pub struct LLMClient {
    config: Config,
    client: ProviderClient,
    cache: Arc<CacheManager>,
}

impl LLMClient {
    /// 创建新的LLM客户端
    pub fn new(config: Config) -> Result<Self> {
        let client = ProviderClient::new(&config.llm)?;
        let cache = Arc::new(CacheManager::new(config.cache.clone()));
        Ok(Self {
            client,
            cache,
            config,
        })
    }

    fn resolve_model(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Efficient => &self.config.llm.model_efficient,
            ModelTier::Powerful => &self.config.llm.model_powerful,
        }
    }
}

#[async_trait]
impl ModelGateway for LLMClient {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &SamplingOptions,
    ) -> Result<String> {
        let model = self.resolve_model(options.tier);
        let cache_key = format!("{}\n=====\n{}\n=====\n{}", model, system_prompt, user_prompt);

        if let Some(cached) = self.cache.get::<String>("generate", &cache_key).await? {
            if self.config.verbose {
                println!("📦 命中生成缓存: {}", self.cache.hash_prompt(&cache_key));
            }
            return Ok(cached);
        }

        let agent = self
            .client
            .create_agent(model, system_prompt, &self.config.llm, options);

        let timeout = Duration::from_secs(self.config.llm.timeout_seconds);
        let response = tokio::time::timeout(timeout, agent.prompt(user_prompt))
            .await
            .map_err(|_| {
                anyhow::anyhow!("模型调用超时（{}秒）", self.config.llm.timeout_seconds)
            })??;

        self.cache
            .set("generate", &cache_key, response.clone())
            .await?;
        Ok(response)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = self
            .client
            .create_embedding(&self.config.llm.embedding_model)?;

        let timeout = Duration::from_secs(self.config.llm.timeout_seconds);
        tokio::time::timeout(timeout, embedding.embed_text(text))
            .await
            .map_err(|_| {
                anyhow::anyhow!("向量化调用超时（{}秒）", self.config.llm.timeout_seconds)
            })?
    }
}
