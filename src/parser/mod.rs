//! 结构化输出解析器
//!
//! 模型输出常被markdown围栏、前导说明等噪声包裹，
//! 本模块负责清洗文本、解析JSON，并统一承担生成级重试：
//! 网关本身单次调用，所有"生成+校验+重试"的循环都收敛到`generate_validated`。

use anyhow::{Result, anyhow};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

use crate::error::OrchestrationError;

/// 匹配整行的markdown标题与水平分割线
static HEADER_OR_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(#{1,6}\s.*|-{3,}|\*{3,}|_{3,})\s*$").unwrap());

/// 文档关键词的最大数量
pub const MAX_KEYWORDS: usize = 3;

/// 校验后的解析结果
///
/// 解析失败不等于流程失败：所有尝试都无法解析时，
/// 带着清洗后的原始文本降级返回，由调用方决定如何使用。
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedOutcome<T> {
    /// 成功解析出结构化数据
    Parsed(T),
    /// 解析均失败，返回最后一次清洗后的原始文本
    Degraded { raw: String },
}

impl<T> ValidatedOutcome<T> {
    pub fn is_parsed(&self) -> bool {
        matches!(self, ValidatedOutcome::Parsed(_))
    }
}

/// 模型请求的工具调用（未经白名单校验的原始形态）
#[derive(Debug, Clone, PartialEq)]
pub struct RawToolCall {
    pub name: String,
    pub arguments: Value,
}

/// 清洗模型输出中的markdown噪声
///
/// 依次处理：提取围栏代码块内容、去掉残留围栏标记、
/// 去掉整行的标题与水平分割线、剥离前导"标签:"前缀、压缩连续空行。
pub fn clean_llm_output(raw: &str) -> String {
    let mut text = raw.trim().to_string();

    // 优先提取第一个围栏代码块的内容
    if let Some(start) = text.find("```") {
        let after_fence = &text[start + 3..];
        if let Some(end) = after_fence.find("```") {
            let mut inner = &after_fence[..end];
            // 去掉语言标注行（json、markdown等）
            if let Some(newline) = inner.find('\n') {
                let lang = inner[..newline].trim();
                if !lang.is_empty() && lang.chars().all(|c| c.is_ascii_alphanumeric()) {
                    inner = &inner[newline + 1..];
                }
            }
            let inner = inner.trim();
            if !inner.is_empty() {
                text = inner.to_string();
            }
        }
    }
    // 残留的围栏标记直接去掉
    text = text.replace("```json", "").replace("```", "");

    // 去掉整行的markdown标题与水平分割线
    text = HEADER_OR_RULE.replace_all(&text, "").to_string();

    // 剥离前导"标签:"前缀，前缀本身不含JSON起始字符时才剥离
    let trimmed = text.trim_start();
    if let Some(colon) = trimmed.find(':') {
        let prefix = &trimmed[..colon];
        if prefix.len() <= 32
            && !prefix.contains('{')
            && !prefix.contains('[')
            && !primary_payload_starts_before(trimmed, colon)
        {
            let rest = trimmed[colon + 1..].trim_start();
            if !rest.is_empty() {
                text = rest.to_string();
            }
        }
    }

    // 压缩3个以上连续换行为2个
    while text.contains("\n\n\n") {
        text = text.replace("\n\n\n", "\n\n");
    }

    text.trim().to_string()
}

fn primary_payload_starts_before(text: &str, pos: usize) -> bool {
    text[..pos]
        .chars()
        .any(|c| c == '{' || c == '[' || c == '"')
}

/// 从清洗后的文本中提取JSON并反序列化
///
/// 截取第一个`{`/`[`到最后一个`}`/`]`之间的内容，容忍前后缀噪声。
pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let text = clean_llm_output(raw);

    let obj_start = text.find('{');
    let arr_start = text.find('[');
    let (start, end) = match (obj_start, arr_start) {
        (Some(o), Some(a)) if a < o => (a, text.rfind(']')),
        (None, Some(a)) => (a, text.rfind(']')),
        (Some(o), _) => (o, text.rfind('}')),
        (None, None) => return Err(anyhow!("输出中不包含JSON: {}", truncate_for_log(&text))),
    };
    let end = end.ok_or_else(|| anyhow!("JSON未闭合: {}", truncate_for_log(&text)))?;
    if end < start {
        return Err(anyhow!("JSON未闭合: {}", truncate_for_log(&text)));
    }

    serde_json::from_str(&text[start..=end])
        .map_err(|e| anyhow!("JSON反序列化失败: {}: {}", e, truncate_for_log(&text)))
}

/// 解析关键词列表，最多保留3个
///
/// 严格要求JSON字符串数组，仅容忍Python风格的单引号数组。
/// 普通散文不在此处兜底：解析失败换一轮重新生成，
/// 重试耗尽后由调用方把清洗后的原文整段作为单个关键词降级使用。
pub fn parse_keywords(raw: &str) -> Result<Vec<String>> {
    if let Ok(keywords) = parse_json::<Vec<String>>(raw) {
        return Ok(normalize_keywords(keywords));
    }

    // 模型偶尔会输出Python风格的单引号数组
    let swapped = clean_llm_output(raw).replace('\'', "\"");
    if let Ok(keywords) = parse_json::<Vec<String>>(&swapped) {
        return Ok(normalize_keywords(keywords));
    }

    Err(OrchestrationError::ParseFailure(format!(
        "关键词输出不是JSON字符串数组: {}",
        truncate_for_log(raw)
    ))
    .into())
}

fn normalize_keywords(mut keywords: Vec<String>) -> Vec<String> {
    keywords.retain(|k| !k.trim().is_empty());
    keywords.truncate(MAX_KEYWORDS);
    keywords
}

/// 解析模型请求的工具调用
///
/// 预期格式：`{"tool": "名称", "arguments": {...}}`。
/// 工具名是否在白名单内由各agent的闭合枚举在下一步校验。
pub fn parse_tool_call(raw: &str) -> Result<RawToolCall> {
    let value: Value = parse_json(raw)?;
    let name = value
        .get("tool")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("工具调用缺少tool字段: {}", truncate_for_log(raw)))?
        .to_string();
    let arguments = value.get("arguments").cloned().unwrap_or(Value::Null);
    Ok(RawToolCall { name, arguments })
}

/// 生成并校验的统一重试组合子
///
/// 每轮重新调用`operation`生成，再用`parse`校验。
/// 解析失败换一轮重新生成；生成本身失败也计入尝试次数，
/// 相邻两次尝试之间按`retry_delay`等待。
/// 只有所有尝试的生成都失败时才返回Err，
/// 生成成功但始终解析不出结构时降级返回原始文本。
pub async fn generate_validated<T, F, Fut, P>(
    operation: F,
    parse: P,
    max_attempts: usize,
    retry_delay: Duration,
    log_tag: &str,
) -> Result<ValidatedOutcome<T>>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<String>>,
    P: Fn(&str) -> Result<T>,
{
    let max_attempts = max_attempts.max(1);
    let mut last_raw: Option<String> = None;
    let mut last_err: Option<anyhow::Error> = None;

    for attempt in 1..=max_attempts {
        match operation().await {
            Ok(raw) => match parse(&raw) {
                Ok(parsed) => return Ok(ValidatedOutcome::Parsed(parsed)),
                Err(e) => {
                    eprintln!(
                        "⚠️ [{}] 第 {}/{} 次输出解析失败: {}",
                        log_tag, attempt, max_attempts, e
                    );
                    last_raw = Some(raw);
                }
            },
            Err(e) => {
                eprintln!(
                    "❌ [{}] 第 {}/{} 次生成失败: {}",
                    log_tag, attempt, max_attempts, e
                );
                last_err = Some(e);
            }
        }

        if attempt < max_attempts && !retry_delay.is_zero() {
            tokio::time::sleep(retry_delay).await;
        }
    }

    match last_raw {
        Some(raw) => Ok(ValidatedOutcome::Degraded {
            raw: clean_llm_output(&raw),
        }),
        None => Err(last_err.unwrap_or_else(|| anyhow!("[{}] 生成失败", log_tag))),
    }
}

fn truncate_for_log(text: &str) -> String {
    const LIMIT: usize = 200;
    if text.chars().count() <= LIMIT {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(LIMIT).collect();
        format!("{}...", truncated)
    }
}
