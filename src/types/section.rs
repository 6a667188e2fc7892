use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::commit::Patch;

/// 单个文件分析任务的产出
///
/// 每个文件恰好产出一份，作为恰好一个研究子代理的输入。
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SectionAnalysis {
    /// 文件名
    pub filename: String,
    /// 提交变更的代码评审摘要
    pub code_review_text: String,
    /// 提交后的最新代码
    pub code: String,
    /// 提交的补丁列表
    #[schemars(skip)]
    pub patches: Vec<Patch>,
    /// fan-out阶段分配的节点ID，决定最终文档中的章节顺序
    pub node_id: usize,
}

/// 研究子代理完成后的章节报告
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SectionReport {
    /// 对应的提交文件名
    pub filename: String,
    /// 研究中使用的关键词，最多保留3个
    pub research_keywords: Vec<String>,
    /// 基于网络检索撰写的章节正文
    pub report_body: String,
    /// 参考资料链接（markdown列表行）
    #[serde(default)]
    pub sources: Vec<String>,
    /// 章节顺序，继承自SectionAnalysis
    #[serde(default)]
    pub node_id: usize,
}

/// 最终TIL文档，所有部分齐备后一次性组装，组装后不可变
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinalDocument {
    /// 文档标题（含日期）
    pub title: String,
    /// 核心概念概述
    pub concept: String,
    /// 引言
    pub introduction: String,
    /// 按node_id排序的章节正文
    pub body_sections: Vec<SectionReport>,
    /// 回顾总结
    pub conclusion: String,
    /// 文档关键词，最多3个
    pub keywords: Vec<String>,
}
