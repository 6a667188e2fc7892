//! 网络检索 - 研究子代理的WebSearch工具后端

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

use crate::config::SearchConfig;

/// 单条查询结果摘要的最大长度（字符数）
const SNIPPET_LIMIT: usize = 1000;

/// 一轮检索的产出
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome {
    /// 拼回转录的格式化检索结果
    pub formatted: String,
    /// 本轮出现的参考资料行（markdown列表行），用于章节的出处追踪
    pub source_lines: Vec<String>,
}

/// 检索服务接口
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// 批量执行查询，内部对URL去重
    async fn search(&self, queries: &[String]) -> Result<SearchOutcome>;
}

/// Tavily检索客户端
pub struct TavilySearch {
    config: SearchConfig,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

impl TavilySearch {
    pub fn new(config: SearchConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build search HTTP client")?;
        Ok(Self { config, http })
    }

    async fn search_single(&self, query: &str) -> Result<TavilyResponse> {
        let url = format!("{}/search", self.config.api_base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "query": query,
            "max_results": self.config.max_results,
            "search_depth": "basic",
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .context("检索请求发送失败")?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("检索服务返回错误状态: {}", response.status()));
        }

        response.json().await.context("检索响应解析失败")
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    async fn search(&self, queries: &[String]) -> Result<SearchOutcome> {
        let mut outcome = SearchOutcome::default();
        let mut seen_urls: HashSet<String> = HashSet::new();

        for query in queries {
            println!("🔍 正在检索: {}", query);
            let response = match self.search_single(query).await {
                Ok(r) => r,
                Err(e) => {
                    // 单条查询失败不终止整轮检索
                    eprintln!("⚠️ 检索失败，跳过该查询: {}: {}", query, e);
                    continue;
                }
            };

            outcome
                .formatted
                .push_str(&format!("### 검색어: {}\n", query));
            for result in response.results {
                if result.url.is_empty() || !seen_urls.insert(result.url.clone()) {
                    continue;
                }
                let snippet: String = result.content.chars().take(SNIPPET_LIMIT).collect();
                outcome.formatted.push_str(&format!(
                    "- **{}**\n  {}\n  {}...\n",
                    result.title, result.url, snippet
                ));
                outcome
                    .source_lines
                    .push(format!("- [{}]({})", result.title, result.url));
            }
            outcome.formatted.push('\n');
        }

        if outcome.source_lines.is_empty() {
            outcome.formatted = "검색 결과가 없습니다.".to_string();
        }
        Ok(outcome)
    }
}

/// 检索被禁用时的空实现
pub struct DisabledSearch;

#[async_trait]
impl SearchProvider for DisabledSearch {
    async fn search(&self, _queries: &[String]) -> Result<SearchOutcome> {
        Ok(SearchOutcome {
            formatted: "검색 기능이 비활성화되어 있습니다.".to_string(),
            source_lines: Vec::new(),
        })
    }
}
