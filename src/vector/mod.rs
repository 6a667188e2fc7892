//! 向量库 - 完成的TIL文档写入Qdrant，供后续检索

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::config::VectorStoreConfig;

/// 检索命中的载荷
#[derive(Debug, Clone, Deserialize)]
pub struct ScoredPayload {
    pub score: f32,
    #[serde(default)]
    pub payload: Value,
}

/// 向量库接口
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// 写入或覆盖一条向量
    async fn upsert(&self, id: &str, vector: Vec<f32>, payload: Value) -> Result<()>;

    /// 相似度检索
    async fn search(&self, vector: Vec<f32>, limit: usize) -> Result<Vec<ScoredPayload>>;
}

/// Qdrant HTTP客户端
pub struct QdrantStore {
    config: VectorStoreConfig,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct QdrantSearchResponse {
    #[serde(default)]
    result: Vec<ScoredPayload>,
}

impl QdrantStore {
    pub fn new(config: VectorStoreConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build vector store HTTP client")?;
        Ok(Self { config, http })
    }

    fn points_url(&self, suffix: &str) -> String {
        format!(
            "{}/collections/{}/points{}",
            self.config.url.trim_end_matches('/'),
            self.config.collection,
            suffix
        )
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn upsert(&self, id: &str, vector: Vec<f32>, payload: Value) -> Result<()> {
        let body = serde_json::json!({
            "points": [{
                "id": id,
                "vector": vector,
                "payload": payload,
            }]
        });

        let response = self
            .http
            .put(self.points_url(""))
            .json(&body)
            .send()
            .await
            .context("向量库写入请求发送失败")?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "向量库写入失败: {}",
                response.status()
            ));
        }
        Ok(())
    }

    async fn search(&self, vector: Vec<f32>, limit: usize) -> Result<Vec<ScoredPayload>> {
        let body = serde_json::json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
        });

        let response = self
            .http
            .post(self.points_url("/search"))
            .json(&body)
            .send()
            .await
            .context("向量库检索请求发送失败")?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "向量库检索失败: {}",
                response.status()
            ));
        }

        let parsed: QdrantSearchResponse = response.json().await.context("向量库响应解析失败")?;
        Ok(parsed.result)
    }
}
