//! 提交文件的fan-out分析
//!
//! 每个文件派生一个独立的分析任务并发执行，
//! node_id按输入顺序分配，结果顺序与输入顺序一致，与完成先后无关。

use futures::stream::{self, StreamExt};
use std::time::Duration;

use crate::error::OrchestrationError;
use crate::generator::context::GeneratorContext;
use crate::generator::prompts::COMMIT_REVIEW_INSTRUCTIONS;
use crate::llm::client::types::SamplingOptions;
use crate::parser::{ValidatedOutcome, generate_validated};
use crate::types::commit::{CommitFile, CommitSet};
use crate::types::section::SectionAnalysis;

/// 单日TIL覆盖的最大文件数，超出部分丢弃
pub const MAX_FANOUT_FILES: usize = 5;

/// 分析失败时填入的章节占位文本
const ANALYSIS_PLACEHOLDER: &str = "이 파일의 변경 사항 분석에 실패했습니다.";

/// 对提交集合执行fan-out分析
///
/// 文件数为0是致命错误；单个文件失败只影响该文件的章节，
/// 对应位置填入占位分析，其余文件不受影响。
pub async fn analyze(
    context: &GeneratorContext,
    commit_set: &CommitSet,
) -> Result<Vec<SectionAnalysis>, OrchestrationError> {
    if commit_set.files.is_empty() {
        return Err(OrchestrationError::fatal("提交集合中没有任何文件"));
    }

    if commit_set.files.len() > MAX_FANOUT_FILES {
        println!(
            "⚠️ 提交文件数 {} 超过上限 {}，仅分析前 {} 个",
            commit_set.files.len(),
            MAX_FANOUT_FILES,
            MAX_FANOUT_FILES
        );
    }

    let files: Vec<&CommitFile> = commit_set.files.iter().take(MAX_FANOUT_FILES).collect();
    println!("🔎 开始分析 {} 个提交文件...", files.len());

    let tasks = files
        .iter()
        .enumerate()
        .map(|(idx, file)| analyze_file(context, file, idx + 1));

    // buffered限制并发数且按输入顺序产出，与各任务完成先后无关
    let max_parallels = context.config.llm.max_parallels.max(1);
    let analyses = stream::iter(tasks).buffered(max_parallels).collect().await;
    println!("✅ 提交文件分析完成");
    Ok(analyses)
}

/// 分析单个文件，永不失败，失败时返回占位分析
async fn analyze_file(
    context: &GeneratorContext,
    file: &CommitFile,
    node_id: usize,
) -> SectionAnalysis {
    let user_prompt = format!(
        "[file name]\n{}\n\n[code]\n{}\n\n[patches]\n{}",
        file.filepath,
        file.latest_code,
        file.render_patches()
    );

    let gateway = context.gateway.clone();
    let options = SamplingOptions::analysis();
    let attempts = context.config.llm.retry_attempts;
    let retry_delay = Duration::from_millis(context.config.llm.retry_delay_ms);

    let outcome = generate_validated(
        || {
            let gateway = gateway.clone();
            let user_prompt = user_prompt.clone();
            let options = options.clone();
            async move {
                gateway
                    .generate(COMMIT_REVIEW_INSTRUCTIONS, &user_prompt, &options)
                    .await
            }
        },
        |raw| {
            let text = raw.trim();
            if text.is_empty() {
                Err(anyhow::anyhow!("分析输出为空"))
            } else {
                Ok(text.to_string())
            }
        },
        attempts,
        retry_delay,
        &format!("analysis:{}", file.filepath),
    )
    .await;

    let code_review_text = match outcome {
        Ok(ValidatedOutcome::Parsed(text)) => text,
        Ok(ValidatedOutcome::Degraded { raw }) => raw,
        Err(e) => {
            let failure = OrchestrationError::PartialSectionFailure {
                filename: file.filepath.clone(),
                reason: e.to_string(),
            };
            eprintln!("⚠️ {}", failure);
            ANALYSIS_PLACEHOLDER.to_string()
        }
    };

    SectionAnalysis {
        filename: file.filepath.clone(),
        code_review_text,
        code: file.latest_code.clone(),
        patches: file.patches.clone(),
        node_id,
    }
}
