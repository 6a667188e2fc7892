use crate::config::Config;
use crate::generator::context::GeneratorContext;
use crate::generator::{analysis, assemble, supervisor};
use crate::types::commit::CommitSet;
use crate::types::section::FinalDocument;

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::time::Duration;

/// 时间跟踪作用域
pub struct TimingScope {
    start_time: Option<std::time::Instant>,
    phase_start_times: HashMap<String, std::time::Instant>,
    phase_durations: HashMap<String, Duration>,
}

impl Default for TimingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingScope {
    pub fn new() -> Self {
        Self {
            start_time: Some(std::time::Instant::now()),
            phase_start_times: HashMap::new(),
            phase_durations: HashMap::new(),
        }
    }

    /// 开始一个新的阶段计时
    pub fn start_phase(&mut self, phase_name: &str) {
        self.phase_start_times
            .insert(phase_name.to_string(), std::time::Instant::now());
    }

    /// 结束一个阶段的计时
    pub fn end_phase(&mut self, phase_name: &str) -> Option<Duration> {
        if let Some(start_time) = self.phase_start_times.remove(phase_name) {
            let duration = start_time.elapsed();
            self.phase_durations
                .insert(phase_name.to_string(), duration);
            Some(duration)
        } else {
            None
        }
    }

    /// 获取总执行时间
    pub fn get_total_duration(&self) -> Option<Duration> {
        self.start_time.map(|start| start.elapsed())
    }

    /// 获取格式化的执行时间报告
    pub fn generate_timing_report(&self) -> String {
        let mut report = String::new();

        if let Some(total_duration) = self.get_total_duration() {
            report.push_str(&format!(
                "总执行时间: {:.2}秒\n",
                total_duration.as_secs_f64()
            ));
        }

        if !self.phase_durations.is_empty() {
            report.push_str("\n各阶段执行时间:\n");
            for (phase, duration) in &self.phase_durations {
                report.push_str(&format!("- {}: {:.3}秒\n", phase, duration.as_secs_f64()));
            }
        }

        report
    }
}

/// 时间跟踪常量
pub struct TimingKeys;

impl TimingKeys {
    pub const ANALYSIS: &'static str = "analysis";
    pub const SUPERVISION: &'static str = "supervision";
    pub const OUTPUT: &'static str = "output";
}

/// 执行TIL生成管线：fan-out分析、章节研究与Supervisor综合
///
/// 组装留给调用方，方便测试与嵌入场景直接检查FinalDocument。
pub async fn run_pipeline(
    context: &GeneratorContext,
    commit_set: &CommitSet,
) -> Result<FinalDocument> {
    let mut timing = TimingScope::new();

    timing.start_phase(TimingKeys::ANALYSIS);
    let analyses = analysis::analyze(context, commit_set).await?;
    timing.end_phase(TimingKeys::ANALYSIS);

    timing.start_phase(TimingKeys::SUPERVISION);
    let document = supervisor::run(context, commit_set, &analyses).await?;
    timing.end_phase(TimingKeys::SUPERVISION);

    if context.config.verbose {
        println!("{}", timing.generate_timing_report());
    }

    Ok(document)
}

/// 启动TIL文档生成工作流
pub async fn launch(config: &Config) -> Result<()> {
    let commit_set = load_commit_set(config)?;
    println!(
        "🚀 开始生成TIL: {}/{} @ {}（{} 个文件）",
        commit_set.username,
        commit_set.repo,
        commit_set.date,
        commit_set.files.len()
    );

    let context = GeneratorContext::new(config.clone())?;

    // 启动时检查模型连接
    context.gateway.check_connection().await?;

    let document = run_pipeline(&context, &commit_set).await?;
    let rendered = assemble::render(&document);

    // 落盘
    let output_path = config.output_path.join(format!("TIL-{}.md", commit_set.date));
    if let Some(parent) = output_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&output_path, &rendered).await?;
    println!("📄 TIL文档已保存: {:?}", output_path);

    // 尽力而为的后处理：向量库写入、完成通知、后台评估
    let evaluation_task = context.evaluation.clone().record_in_background(serde_json::json!({
        "username": commit_set.username,
        "repo": commit_set.repo,
        "date": commit_set.date,
        "keywords": document.keywords,
        "document": rendered,
    }));
    persist_to_vector_store(&context, &commit_set, &document, &rendered).await;
    context.notifier.post(&rendered).await;

    // 评估上报失败只记录日志，但进程退出前必须等它跑完
    if let Some(task) = evaluation_task {
        if let Err(e) = task.await {
            eprintln!("⚠️ 评估后台任务异常退出: {}", e);
        }
    }

    Ok(())
}

/// 读取提交集合描述文件，日期缺失时补当天
fn load_commit_set(config: &Config) -> Result<CommitSet> {
    let content = std::fs::read_to_string(&config.input_path)
        .context(format!("Failed to read commit set: {:?}", config.input_path))?;
    let mut commit_set: CommitSet =
        serde_json::from_str(&content).context("Failed to parse commit set JSON")?;
    if commit_set.date.trim().is_empty() {
        commit_set.date = chrono::Local::now().format("%Y-%m-%d").to_string();
    }
    Ok(commit_set)
}

/// 向量库写入失败不影响主流程
async fn persist_to_vector_store(
    context: &GeneratorContext,
    commit_set: &CommitSet,
    document: &FinalDocument,
    rendered: &str,
) {
    let Some(store) = &context.vector_store else {
        return;
    };

    let vector = match context.gateway.embed(rendered).await {
        Ok(v) => v,
        Err(e) => {
            eprintln!("⚠️ 文档向量化失败，跳过向量库写入: {}", e);
            return;
        }
    };

    let id = uuid::Uuid::new_v4().to_string();
    let payload = serde_json::json!({
        "username": commit_set.username,
        "repo": commit_set.repo,
        "date": commit_set.date,
        "title": document.title,
        "keywords": document.keywords,
        "document": rendered,
    });

    match store.upsert(&id, vector, payload).await {
        Ok(()) => println!("🗄️ TIL文档已写入向量库"),
        Err(e) => eprintln!("⚠️ 向量库写入失败: {}", e),
    }
}
