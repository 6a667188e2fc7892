//! 完成通知与质量评估上报，均为尽力而为

use anyhow::{Context, Result};
use serde_json::Value;
use std::time::Duration;

use crate::config::NotifyConfig;

/// Discord等webhook单条消息的长度上限
const MESSAGE_LIMIT: usize = 1900;

/// 文档完成后的webhook通知
pub struct NotificationSink {
    webhook_url: Option<String>,
    http: reqwest::Client,
}

impl NotificationSink {
    pub fn new(config: &NotifyConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("Failed to build notification HTTP client")?;
        Ok(Self {
            webhook_url: config.webhook_url.clone(),
            http,
        })
    }

    /// 发送完成通知，失败只记录日志
    pub async fn post(&self, summary: &str) {
        let Some(url) = &self.webhook_url else {
            return;
        };

        let content: String = summary.chars().take(MESSAGE_LIMIT).collect();
        let body = serde_json::json!({ "content": content });

        match self.http.post(url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                println!("📨 完成通知已发送");
            }
            Ok(response) => {
                eprintln!("⚠️ 完成通知发送失败: {}", response.status());
            }
            Err(e) => {
                eprintln!("⚠️ 完成通知发送失败: {}", e);
            }
        }
    }
}

/// 文档质量评估上报
///
/// 在后台任务中执行，不阻塞主流程，失败只记录日志。
pub struct EvaluationSink {
    evaluation_url: Option<String>,
    http: reqwest::Client,
}

impl EvaluationSink {
    pub fn new(config: &NotifyConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build evaluation HTTP client")?;
        Ok(Self {
            evaluation_url: config.evaluation_url.clone(),
            http,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.evaluation_url.is_some()
    }

    /// 上报一次评估记录
    pub async fn record(&self, payload: Value) {
        let Some(url) = &self.evaluation_url else {
            return;
        };

        match self.http.post(url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                println!("📊 评估记录已上报");
            }
            Ok(response) => {
                eprintln!("⚠️ 评估记录上报失败: {}", response.status());
            }
            Err(e) => {
                eprintln!("⚠️ 评估记录上报失败: {}", e);
            }
        }
    }

    /// 在后台任务中上报，立即返回任务句柄
    ///
    /// 调用方在主产物落盘后await该句柄，保证进程退出前上报已完成。
    pub fn record_in_background(
        self: std::sync::Arc<Self>,
        payload: Value,
    ) -> Option<tokio::task::JoinHandle<()>> {
        if !self.is_enabled() {
            return None;
        }
        Some(tokio::spawn(async move {
            self.record(payload).await;
        }))
    }
}
