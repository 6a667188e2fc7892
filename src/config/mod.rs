use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use crate::i18n::TargetLanguage;

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    #[default]
    OpenAI,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "ollama")]
    Ollama,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::DeepSeek => write!(f, "deepseek"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            "anthropic" => Ok(LLMProvider::Anthropic),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// 提交集合描述文件路径（JSON）
    pub input_path: PathBuf,

    /// TIL文档输出路径
    pub output_path: PathBuf,

    /// 目标语言
    pub target_language: TargetLanguage,

    /// LLM模型配置
    pub llm: LLMConfig,

    /// 网络检索配置
    pub search: SearchConfig,

    /// 向量库配置
    pub vector_store: VectorStoreConfig,

    /// 通知与评估配置
    pub notify: NotifyConfig,

    /// 缓存配置
    pub cache: CacheConfig,

    /// 是否启用详细日志
    pub verbose: bool,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址
    pub api_base_url: String,

    /// 高能效模型，优先用于逐文件分析与研究子代理的常规推理任务
    pub model_efficient: String,

    /// 高质量模型，优先用于Supervisor的决策与综合任务
    pub model_powerful: String,

    /// 向量化模型
    pub embedding_model: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,

    /// 结构化输出的生成级重试次数
    pub retry_attempts: usize,

    /// 重试间隔（毫秒）
    pub retry_delay_ms: u64,

    /// 单次调用超时时间（秒）
    pub timeout_seconds: u64,

    /// fan-out与研究分发的最大并发数
    pub max_parallels: usize,
}

/// 网络检索配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SearchConfig {
    /// 是否启用网络检索
    pub enabled: bool,

    /// 检索API KEY
    pub api_key: String,

    /// 检索API基地址
    pub api_base_url: String,

    /// 每条查询返回的最大结果数
    pub max_results: usize,
}

/// 向量库配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VectorStoreConfig {
    /// 是否启用向量库写入
    pub enabled: bool,

    /// 向量库HTTP地址
    pub url: String,

    /// TIL文档集合名
    pub collection: String,
}

/// 通知与评估配置，均为尽力而为，失败不影响主流程
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct NotifyConfig {
    /// 聊天机器人webhook地址
    pub webhook_url: Option<String>,

    /// 评估结果上报地址
    pub evaluation_url: Option<String>,
}

/// 缓存配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    /// 是否启用缓存
    pub enabled: bool,

    /// 缓存目录
    pub cache_dir: PathBuf,

    /// 缓存过期时间（小时）
    pub expire_hours: u64,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("./commits.json"),
            output_path: PathBuf::from("./til.docs"),
            target_language: TargetLanguage::default(),
            llm: LLMConfig::default(),
            search: SearchConfig::default(),
            vector_store: VectorStoreConfig::default(),
            notify: NotifyConfig::default(),
            cache: CacheConfig::default(),
            verbose: false,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            api_key: std::env::var("TIL_LLM_API_KEY").unwrap_or_default(),
            api_base_url: String::from("https://api.openai.com/v1"),
            model_efficient: String::from("gpt-4o-mini"),
            model_powerful: String::from("gpt-4o"),
            embedding_model: String::from("text-embedding-3-small"),
            max_tokens: 8192,
            temperature: 0.1,
            retry_attempts: 3,
            retry_delay_ms: 2000,
            timeout_seconds: 30,
            max_parallels: 5,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: std::env::var("TAVILY_API_KEY").unwrap_or_default(),
            api_base_url: String::from("https://api.tavily.com"),
            max_results: 2,
        }
    }
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::from("http://localhost:6333"),
            collection: String::from("til_documents"),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_dir: PathBuf::from(".til-agent/cache"),
            expire_hours: 8760,
        }
    }
}
