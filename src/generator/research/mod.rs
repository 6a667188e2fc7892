//! 研究子代理
//!
//! 每个文件的分析结果交给一个独立的研究子代理，
//! 在有界的工具循环中检索、撰写并提交一份章节报告。
//! 子代理永不让整体流程失败：任何异常路径都落到占位章节。

use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;

use crate::generator::context::GeneratorContext;
use crate::generator::prompts::research_instructions;
use crate::llm::client::types::SamplingOptions;
use crate::parser::{
    MAX_KEYWORDS, RawToolCall, ValidatedOutcome, generate_validated, parse_tool_call,
};
use crate::types::message::{ToolCall, Transcript};
use crate::types::section::{SectionAnalysis, SectionReport};

/// 研究循环的最大轮数，防止模型反复检索不收敛
pub const MAX_RESEARCH_TURNS: usize = 6;

/// 研究失败时的章节占位文本
const REPORT_PLACEHOLDER: &str = "이 섹션의 조사에 실패하여 보고서를 작성하지 못했습니다.";

/// 研究子代理的闭合工具集
///
/// 工具名不在集合内视为解析失败，由重试组合子换一轮重新生成。
#[derive(Debug, Clone, PartialEq)]
pub enum ResearchToolCall {
    WebSearch { queries: Vec<String> },
    WriteSectionReport { keywords: Vec<String>, report: String },
    FinishResearch,
}

impl ResearchToolCall {
    /// 将原始工具调用映射到闭合枚举
    pub fn decode(raw: &RawToolCall) -> anyhow::Result<Self> {
        match raw.name.as_str() {
            "WebSearch" => {
                let queries: Vec<String> =
                    serde_json::from_value(raw.arguments.get("queries").cloned().unwrap_or_default())
                        .unwrap_or_default();
                if queries.is_empty() {
                    return Err(anyhow::anyhow!("WebSearch缺少queries参数"));
                }
                Ok(ResearchToolCall::WebSearch { queries })
            }
            "WriteSectionReport" => {
                let keywords: Vec<String> = serde_json::from_value(
                    raw.arguments.get("keywords").cloned().unwrap_or_default(),
                )
                .unwrap_or_default();
                let report = raw
                    .arguments
                    .get("report")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                if report.trim().is_empty() {
                    return Err(anyhow::anyhow!("WriteSectionReport缺少report参数"));
                }
                Ok(ResearchToolCall::WriteSectionReport { keywords, report })
            }
            "FinishResearch" => Ok(ResearchToolCall::FinishResearch),
            other => Err(anyhow::anyhow!("未知的研究工具: {}", other)),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ResearchToolCall::WebSearch { .. } => "WebSearch",
            ResearchToolCall::WriteSectionReport { .. } => "WriteSectionReport",
            ResearchToolCall::FinishResearch => "FinishResearch",
        }
    }

    fn arguments(&self) -> serde_json::Value {
        match self {
            ResearchToolCall::WebSearch { queries } => json!({ "queries": queries }),
            ResearchToolCall::WriteSectionReport { keywords, report } => {
                json!({ "keywords": keywords, "report": report })
            }
            ResearchToolCall::FinishResearch => json!({}),
        }
    }
}

/// 对单个文件的分析结果执行研究循环
///
/// 返回的SectionReport继承分析的node_id，保证章节顺序稳定。
pub async fn run(context: &GeneratorContext, analysis: &SectionAnalysis) -> SectionReport {
    let system_prompt = research_instructions(
        &analysis.filename,
        context.config.target_language.prompt_instruction(),
    );
    let mut transcript = Transcript::new(&system_prompt);
    transcript.push_user(format!(
        "File: {}\n\nCode review of today's changes:\n{}",
        analysis.filename, analysis.code_review_text
    ));

    let mut keywords: Vec<String> = Vec::new();
    let mut report_body: Option<String> = None;
    let mut source_lines: Vec<String> = Vec::new();
    let mut seen_sources: HashSet<String> = HashSet::new();

    for turn in 1..=MAX_RESEARCH_TURNS {
        let outcome = next_tool_call(context, &transcript, &analysis.filename).await;

        let tool_call = match outcome {
            Ok(ValidatedOutcome::Parsed(call)) => call,
            Ok(ValidatedOutcome::Degraded { raw }) => {
                // 模型放弃了工具协议，把输出当作报告正文兜底
                eprintln!(
                    "⚠️ [research:{}] 第 {} 轮输出无法解析为工具调用，降级采用原文",
                    analysis.filename, turn
                );
                if report_body.is_none() && !raw.trim().is_empty() {
                    report_body = Some(raw);
                }
                break;
            }
            Err(e) => {
                eprintln!(
                    "❌ [research:{}] 第 {} 轮生成失败，终止研究: {}",
                    analysis.filename, turn, e
                );
                break;
            }
        };

        let recorded = ToolCall::new(tool_call.name(), tool_call.arguments());
        let call_id = recorded.call_id.clone();
        transcript.push_assistant_tool_call(recorded);

        match tool_call {
            ResearchToolCall::WebSearch { queries } => {
                let result_text = match context.search.search(&queries).await {
                    Ok(outcome) => {
                        for line in outcome.source_lines {
                            if seen_sources.insert(line.clone()) {
                                source_lines.push(line);
                            }
                        }
                        outcome.formatted
                    }
                    // 检索失败告知模型，让它决定重试还是直接撰写
                    Err(e) => format!("검색에 실패했습니다: {}", e),
                };
                if let Err(e) = transcript.push_tool_result(&call_id, "WebSearch", result_text) {
                    eprintln!(
                        "❌ [research:{}] 转录状态异常，终止研究: {}",
                        analysis.filename, e
                    );
                    break;
                }
            }
            ResearchToolCall::WriteSectionReport {
                keywords: new_keywords,
                report,
            } => {
                keywords = new_keywords;
                keywords.truncate(MAX_KEYWORDS);
                report_body = Some(report);
                if let Err(e) = transcript.push_tool_result(
                    &call_id,
                    "WriteSectionReport",
                    "섹션 보고서가 저장되었습니다. 작업을 마치려면 FinishResearch를 호출하세요.",
                ) {
                    eprintln!(
                        "❌ [research:{}] 转录状态异常，终止研究: {}",
                        analysis.filename, e
                    );
                    break;
                }
            }
            ResearchToolCall::FinishResearch => break,
        }
    }

    let report_body = report_body.unwrap_or_else(|| {
        eprintln!(
            "⚠️ [research:{}] 研究结束时没有章节报告，使用占位内容",
            analysis.filename
        );
        REPORT_PLACEHOLDER.to_string()
    });

    SectionReport {
        filename: analysis.filename.clone(),
        research_keywords: keywords,
        report_body,
        sources: source_lines,
        node_id: analysis.node_id,
    }
}

/// 生成并解析下一个工具调用，解析失败在组合子内重试
async fn next_tool_call(
    context: &GeneratorContext,
    transcript: &Transcript,
    filename: &str,
) -> anyhow::Result<ValidatedOutcome<ResearchToolCall>> {
    let gateway = context.gateway.clone();
    let system_prompt = transcript.system_prompt().to_string();
    let user_prompt = transcript.render();
    let options = SamplingOptions::default();
    let attempts = context.config.llm.retry_attempts;
    let retry_delay = Duration::from_millis(context.config.llm.retry_delay_ms);

    generate_validated(
        || {
            let gateway = gateway.clone();
            let system_prompt = system_prompt.clone();
            let user_prompt = user_prompt.clone();
            let options = options.clone();
            async move { gateway.generate(&system_prompt, &user_prompt, &options).await }
        },
        |raw| {
            let raw_call = parse_tool_call(raw)?;
            ResearchToolCall::decode(&raw_call)
        },
        attempts,
        retry_delay,
        &format!("research:{}", filename),
    )
    .await
}
