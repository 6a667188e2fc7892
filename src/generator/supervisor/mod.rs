//! Supervisor agent
//!
//! 所有章节研究完成后，Supervisor在有界的工具循环中
//! 依次产出核心概念、引言与回顾，最后宣告文档完成。
//! 章节分发是引擎侧的确定性步骤，不交给模型决策。

use futures::stream::{self, StreamExt};
use serde_json::json;
use std::time::Duration;

use crate::error::OrchestrationError;
use crate::generator::context::GeneratorContext;
use crate::generator::prompts::{KEYWORD_INSTRUCTIONS, supervisor_instructions};
use crate::generator::research;
use crate::llm::client::types::SamplingOptions;
use crate::parser::{RawToolCall, ValidatedOutcome, generate_validated, parse_keywords};
use crate::types::commit::CommitSet;
use crate::types::message::{ToolCall, Transcript};
use crate::types::section::{FinalDocument, SectionAnalysis, SectionReport};

/// Supervisor循环的最大轮数，超过视为编排失控
pub const MAX_SUPERVISOR_TURNS: usize = 12;

const CONCEPT_PLACEHOLDER: &str = "핵심 개념이 작성되지 않았습니다.";
const INTRODUCTION_PLACEHOLDER: &str = "소개가 작성되지 않았습니다.";
const CONCLUSION_PLACEHOLDER: &str = "회고가 작성되지 않았습니다.";

/// Supervisor的闭合工具集
#[derive(Debug, Clone, PartialEq)]
pub enum SupervisorToolCall {
    DefineSections { sections: Vec<String> },
    WriteConcept { concept: String },
    WriteIntroduction { introduction: String },
    WriteConclusion { conclusion: String },
    FinishReport,
}

impl SupervisorToolCall {
    /// 将原始工具调用映射到闭合枚举
    pub fn decode(raw: &RawToolCall) -> anyhow::Result<Self> {
        let text_arg = |key: &str| -> anyhow::Result<String> {
            let value = raw
                .arguments
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            if value.trim().is_empty() {
                Err(anyhow::anyhow!("{}缺少{}参数", raw.name, key))
            } else {
                Ok(value)
            }
        };

        match raw.name.as_str() {
            "DefineSections" => {
                let sections: Vec<String> = serde_json::from_value(
                    raw.arguments.get("sections").cloned().unwrap_or_default(),
                )
                .unwrap_or_default();
                Ok(SupervisorToolCall::DefineSections { sections })
            }
            "WriteConcept" => Ok(SupervisorToolCall::WriteConcept {
                concept: text_arg("concept")?,
            }),
            "WriteIntroduction" => Ok(SupervisorToolCall::WriteIntroduction {
                introduction: text_arg("introduction")?,
            }),
            "WriteConclusion" => Ok(SupervisorToolCall::WriteConclusion {
                conclusion: text_arg("conclusion")?,
            }),
            "FinishReport" => Ok(SupervisorToolCall::FinishReport),
            other => Err(anyhow::anyhow!("未知的Supervisor工具: {}", other)),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            SupervisorToolCall::DefineSections { .. } => "DefineSections",
            SupervisorToolCall::WriteConcept { .. } => "WriteConcept",
            SupervisorToolCall::WriteIntroduction { .. } => "WriteIntroduction",
            SupervisorToolCall::WriteConclusion { .. } => "WriteConclusion",
            SupervisorToolCall::FinishReport => "FinishReport",
        }
    }

    fn arguments(&self) -> serde_json::Value {
        match self {
            SupervisorToolCall::DefineSections { sections } => json!({ "sections": sections }),
            SupervisorToolCall::WriteConcept { concept } => json!({ "concept": concept }),
            SupervisorToolCall::WriteIntroduction { introduction } => {
                json!({ "introduction": introduction })
            }
            SupervisorToolCall::WriteConclusion { conclusion } => {
                json!({ "conclusion": conclusion })
            }
            SupervisorToolCall::FinishReport => json!({}),
        }
    }
}

/// 执行Supervisor阶段，产出组装前的完整文档
pub async fn run(
    context: &GeneratorContext,
    commit_set: &CommitSet,
    analyses: &[SectionAnalysis],
) -> Result<FinalDocument, OrchestrationError> {
    // 确定性分发：所有章节研究完成之前不进入综合循环
    // buffered限制并发数且按输入顺序产出，node_id顺序不受完成先后影响
    println!("📚 开始分发 {} 个章节的研究任务...", analyses.len());
    let max_parallels = context.config.llm.max_parallels.max(1);
    let reports: Vec<SectionReport> =
        stream::iter(analyses.iter().map(|analysis| research::run(context, analysis)))
            .buffered(max_parallels)
            .collect()
            .await;
    println!("✅ 全部章节研究完成");

    let system_prompt =
        supervisor_instructions(context.config.target_language.prompt_instruction());
    let mut transcript = Transcript::new(&system_prompt);
    transcript.push_user(render_reports(commit_set, &reports));

    let mut concept: Option<String> = None;
    let mut introduction: Option<String> = None;
    let mut conclusion: Option<String> = None;
    let mut finished = false;

    for _turn in 1..=MAX_SUPERVISOR_TURNS {
        let outcome = next_tool_call(context, &transcript).await?;

        let tool_call = match outcome {
            ValidatedOutcome::Parsed(call) => call,
            ValidatedOutcome::Degraded { .. } => {
                // 模型放弃工具协议，等同于宣告完成，缺失部分用占位填充
                eprintln!("⚠️ [supervisor] 输出无法解析为工具调用，视为FinishReport");
                finished = true;
                break;
            }
        };

        let recorded = ToolCall::new(tool_call.name(), tool_call.arguments());
        let call_id = recorded.call_id.clone();
        transcript.push_assistant_tool_call(recorded);

        match tool_call {
            SupervisorToolCall::DefineSections { .. } => {
                transcript
                    .push_tool_result(
                        &call_id,
                        "DefineSections",
                        "섹션 구성은 커밋 파일에 의해 이미 고정되어 있습니다. WriteConcept부터 진행하세요.",
                    )
                    .map_err(|e| OrchestrationError::fatal(e.to_string()))?;
            }
            SupervisorToolCall::WriteConcept { concept: text } => {
                concept = Some(text);
                transcript
                    .push_tool_result(
                        &call_id,
                        "WriteConcept",
                        "핵심 개념이 저장되었습니다. 다음으로 WriteIntroduction을 호출하세요.",
                    )
                    .map_err(|e| OrchestrationError::fatal(e.to_string()))?;
            }
            SupervisorToolCall::WriteIntroduction { introduction: text } => {
                if concept.is_none() {
                    transcript
                        .push_tool_result(
                            &call_id,
                            "WriteIntroduction",
                            "아직 핵심 개념이 없습니다. 먼저 WriteConcept를 호출하세요.",
                        )
                        .map_err(|e| OrchestrationError::fatal(e.to_string()))?;
                    continue;
                }
                introduction = Some(text);
                transcript
                    .push_tool_result(
                        &call_id,
                        "WriteIntroduction",
                        "소개가 저장되었습니다. 다음으로 WriteConclusion을 호출하세요.",
                    )
                    .map_err(|e| OrchestrationError::fatal(e.to_string()))?;
            }
            SupervisorToolCall::WriteConclusion { conclusion: text } => {
                if introduction.is_none() {
                    transcript
                        .push_tool_result(
                            &call_id,
                            "WriteConclusion",
                            "아직 소개가 없습니다. 먼저 WriteIntroduction을 호출하세요.",
                        )
                        .map_err(|e| OrchestrationError::fatal(e.to_string()))?;
                    continue;
                }
                conclusion = Some(text);
                transcript
                    .push_tool_result(
                        &call_id,
                        "WriteConclusion",
                        "회고가 저장되었습니다. 작업을 마치려면 FinishReport를 호출하세요.",
                    )
                    .map_err(|e| OrchestrationError::fatal(e.to_string()))?;
            }
            SupervisorToolCall::FinishReport => {
                finished = true;
                break;
            }
        }
    }

    if !finished {
        return Err(OrchestrationError::fatal(format!(
            "Supervisor在 {} 轮内未宣告完成",
            MAX_SUPERVISOR_TURNS
        )));
    }

    let concept = concept.unwrap_or_else(|| {
        eprintln!("⚠️ [supervisor] 核心概念缺失，使用占位内容");
        CONCEPT_PLACEHOLDER.to_string()
    });
    let introduction = introduction.unwrap_or_else(|| {
        eprintln!("⚠️ [supervisor] 引言缺失，使用占位内容");
        INTRODUCTION_PLACEHOLDER.to_string()
    });
    let conclusion = conclusion.unwrap_or_else(|| {
        eprintln!("⚠️ [supervisor] 回顾缺失，使用占位内容");
        CONCLUSION_PLACEHOLDER.to_string()
    });

    let keywords = extract_keywords(context, &reports).await;

    Ok(FinalDocument {
        title: format!("📅 {} TIL", commit_set.date),
        concept,
        introduction,
        body_sections: reports,
        conclusion,
        keywords,
    })
}

/// 渲染交给Supervisor的章节汇总
fn render_reports(commit_set: &CommitSet, reports: &[SectionReport]) -> String {
    let mut text = format!(
        "Date: {}\nRepository: {}/{}\n\nSection reports:\n\n",
        commit_set.date, commit_set.username, commit_set.repo
    );
    for report in reports {
        text.push_str(&format!(
            "## {}\nKeywords: {}\n{}\n\n",
            report.filename,
            report.research_keywords.join(", "),
            report.report_body
        ));
    }
    text
}

async fn next_tool_call(
    context: &GeneratorContext,
    transcript: &Transcript,
) -> Result<ValidatedOutcome<SupervisorToolCall>, OrchestrationError> {
    let gateway = context.gateway.clone();
    let system_prompt = transcript.system_prompt().to_string();
    let user_prompt = transcript.render();
    let options = SamplingOptions::synthesis();
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
            let raw_call = crate::parser::parse_tool_call(raw)?;
            SupervisorToolCall::decode(&raw_call)
        },
        attempts,
        retry_delay,
        "supervisor",
    )
    .await
    .map_err(OrchestrationError::generation)
}

/// 提取文档关键词
///
/// 解析失败换一轮重新生成；重试耗尽后把清洗后的原文整段作为
/// 单个关键词降级使用，生成本身全部失败时才返回空列表。
async fn extract_keywords(context: &GeneratorContext, reports: &[SectionReport]) -> Vec<String> {
    let body: String = reports
        .iter()
        .map(|r| r.report_body.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let gateway = context.gateway.clone();
    let options = SamplingOptions::analysis();
    let attempts = context.config.llm.retry_attempts;
    let retry_delay = Duration::from_millis(context.config.llm.retry_delay_ms);

    let outcome = generate_validated(
        || {
            let gateway = gateway.clone();
            let body = body.clone();
            let options = options.clone();
            async move { gateway.generate(KEYWORD_INSTRUCTIONS, &body, &options).await }
        },
        parse_keywords,
        attempts,
        retry_delay,
        "keywords",
    )
    .await;

    match outcome {
        Ok(ValidatedOutcome::Parsed(keywords)) => keywords,
        Ok(ValidatedOutcome::Degraded { raw }) => {
            if raw.trim().is_empty() {
                Vec::new()
            } else {
                vec![raw]
            }
        }
        Err(e) => {
            eprintln!("⚠️ 文档关键词提取失败: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, LLMConfig};
    use crate::generator::test_support::{RouteGateway, StaticSearch};
    use std::sync::Arc;

    fn analyses(filenames: &[&str]) -> Vec<SectionAnalysis> {
        filenames
            .iter()
            .enumerate()
            .map(|(idx, name)| SectionAnalysis {
                filename: name.to_string(),
                code_review_text: "review".to_string(),
                code: "code".to_string(),
                patches: Vec::new(),
                node_id: idx + 1,
            })
            .collect()
    }

    fn commit_set() -> CommitSet {
        CommitSet {
            username: "tester".to_string(),
            repo: "demo".to_string(),
            date: "2025-06-01".to_string(),
            files: Vec::new(),
        }
    }

    fn context_with(gateway: RouteGateway) -> GeneratorContext {
        let config = Config {
            llm: LLMConfig {
                retry_delay_ms: 0,
                ..LLMConfig::default()
            },
            ..Config::default()
        };
        GeneratorContext::with_dependencies(
            config,
            Arc::new(gateway),
            Arc::new(StaticSearch::new("", Vec::new())),
            None,
        )
        .unwrap()
    }

    fn research_script(report: &str) -> Vec<String> {
        vec![
            format!(
                r#"{{"tool": "WriteSectionReport", "arguments": {{"keywords": ["k"], "report": "{report}"}}}}"#
            ),
            r#"{"tool": "FinishResearch", "arguments": {}}"#.to_string(),
        ]
    }

    #[tokio::test]
    async fn test_full_supervisor_flow() {
        // 关键词与Supervisor路由必须先注册，避免被含文件名的研究路由抢占
        let gateway = RouteGateway::new()
            .route("Extract the core keywords", [r#"["tokio", "async"]"#])
            .route(
                "supervisor",
                [
                    r#"{"tool": "DefineSections", "arguments": {"sections": ["x"]}}"#,
                    r#"{"tool": "WriteConcept", "arguments": {"concept": "Async orchestration"}}"#,
                    r#"{"tool": "WriteIntroduction", "arguments": {"introduction": "Today I studied async."}}"#,
                    r#"{"tool": "WriteConclusion", "arguments": {"conclusion": "More practice needed."}}"#,
                    r#"{"tool": "FinishReport", "arguments": {}}"#,
                ],
            )
            .route("alpha.rs", research_script("alpha body"))
            .route("beta.rs", research_script("beta body"));
        let context = context_with(gateway);

        let document = run(&context, &commit_set(), &analyses(&["alpha.rs", "beta.rs"]))
            .await
            .unwrap();

        assert_eq!(document.title, "📅 2025-06-01 TIL");
        assert_eq!(document.concept, "Async orchestration");
        assert_eq!(document.introduction, "Today I studied async.");
        assert_eq!(document.conclusion, "More practice needed.");
        assert_eq!(document.body_sections.len(), 2);
        assert_eq!(document.body_sections[0].filename, "alpha.rs");
        assert_eq!(document.body_sections[0].node_id, 1);
        assert_eq!(document.body_sections[1].filename, "beta.rs");
        assert_eq!(document.keywords, vec!["tokio", "async"]);
    }

    #[tokio::test]
    async fn test_gating_rejects_out_of_order_synthesis() {
        let gateway = RouteGateway::new()
            .route("Extract the core keywords", [r#"[]"#])
            .route(
                "supervisor",
                [
                    // 引言先于概念，应被拒绝并引导
                    r#"{"tool": "WriteIntroduction", "arguments": {"introduction": "too early"}}"#,
                    r#"{"tool": "WriteConcept", "arguments": {"concept": "C"}}"#,
                    r#"{"tool": "WriteIntroduction", "arguments": {"introduction": "I"}}"#,
                    r#"{"tool": "WriteConclusion", "arguments": {"conclusion": "Z"}}"#,
                    r#"{"tool": "FinishReport", "arguments": {}}"#,
                ],
            )
            .route("alpha.rs", research_script("alpha body"));
        let context = context_with(gateway);

        let document = run(&context, &commit_set(), &analyses(&["alpha.rs"]))
            .await
            .unwrap();

        assert_eq!(document.concept, "C");
        assert_eq!(document.introduction, "I");
        assert_eq!(document.conclusion, "Z");
    }

    #[tokio::test]
    async fn test_degraded_output_finishes_with_placeholders() {
        let gateway = RouteGateway::new()
            .route("Extract the core keywords", [r#"[]"#])
            .route("supervisor", ["prose", "prose", "prose"])
            .route("alpha.rs", research_script("alpha body"));
        let context = context_with(gateway);

        let document = run(&context, &commit_set(), &analyses(&["alpha.rs"]))
            .await
            .unwrap();

        assert_eq!(document.concept, CONCEPT_PLACEHOLDER);
        assert_eq!(document.introduction, INTRODUCTION_PLACEHOLDER);
        assert_eq!(document.conclusion, CONCLUSION_PLACEHOLDER);
    }

    #[tokio::test]
    async fn test_keyword_extraction_retries_until_array() {
        // 前两轮输出散文，第三轮才给出合法数组
        let gateway = RouteGateway::new()
            .route(
                "Extract the core keywords",
                ["그냥 설명문입니다", "아직도 설명문입니다", r#"["tokio"]"#],
            )
            .route(
                "supervisor",
                [
                    r#"{"tool": "WriteConcept", "arguments": {"concept": "C"}}"#,
                    r#"{"tool": "WriteIntroduction", "arguments": {"introduction": "I"}}"#,
                    r#"{"tool": "WriteConclusion", "arguments": {"conclusion": "Z"}}"#,
                    r#"{"tool": "FinishReport", "arguments": {}}"#,
                ],
            )
            .route("alpha.rs", research_script("alpha body"));
        let context = context_with(gateway);

        let document = run(&context, &commit_set(), &analyses(&["alpha.rs"]))
            .await
            .unwrap();

        assert_eq!(document.keywords, vec!["tokio"]);
    }

    #[tokio::test]
    async fn test_keyword_extraction_degrades_to_single_element() {
        // 重试耗尽后，含逗号的散文不能被切成多个假关键词，
        // 清洗后的原文整段作为唯一关键词
        let prose = "죄송합니다, 키워드를 찾을 수 없습니다";
        let gateway = RouteGateway::new()
            .route("Extract the core keywords", [prose, prose, prose])
            .route(
                "supervisor",
                [
                    r#"{"tool": "WriteConcept", "arguments": {"concept": "C"}}"#,
                    r#"{"tool": "WriteIntroduction", "arguments": {"introduction": "I"}}"#,
                    r#"{"tool": "WriteConclusion", "arguments": {"conclusion": "Z"}}"#,
                    r#"{"tool": "FinishReport", "arguments": {}}"#,
                ],
            )
            .route("alpha.rs", research_script("alpha body"));
        let context = context_with(gateway);

        let document = run(&context, &commit_set(), &analyses(&["alpha.rs"]))
            .await
            .unwrap();

        assert_eq!(document.keywords, vec![prose.to_string()]);
    }

    #[tokio::test]
    async fn test_turn_overrun_is_fatal() {
        let replies: Vec<String> = (0..MAX_SUPERVISOR_TURNS + 1)
            .map(|_| r#"{"tool": "DefineSections", "arguments": {"sections": []}}"#.to_string())
            .collect();
        let gateway = RouteGateway::new()
            .route("supervisor", replies)
            .route("alpha.rs", research_script("alpha body"));
        let context = context_with(gateway);

        let result = run(&context, &commit_set(), &analyses(&["alpha.rs"])).await;
        assert!(matches!(
            result,
            Err(OrchestrationError::FatalOrchestration(_))
        ));
    }
}
