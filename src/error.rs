use thiserror::Error;

/// 编排引擎错误分类
///
/// 只有`FatalOrchestration`会中止整个请求，其余类别都在调用点就地恢复：
/// 生成失败用占位内容兜底，解析失败降级为原始文本，单个章节失败不阻塞全文。
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// LLM后端不可达、响应格式异常或调用超时
    #[error("模型生成失败: {0}")]
    GenerationFailure(String),

    /// 结构化输出在所有重试后仍不符合预期形状
    #[error("结构化输出解析失败: {0}")]
    ParseFailure(String),

    /// 单个fan-out任务或单个研究子代理整体失败
    #[error("章节任务失败 [{filename}]: {reason}")]
    PartialSectionFailure { filename: String, reason: String },

    /// 无可分析文件、或Supervisor循环超出安全迭代上限等不可恢复错误
    #[error("编排流程失败: {0}")]
    FatalOrchestration(String),
}

impl OrchestrationError {
    pub fn generation(err: impl std::fmt::Display) -> Self {
        Self::GenerationFailure(err.to_string())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::FatalOrchestration(msg.into())
    }
}
