use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use til_agent_rs::config::{Config, LLMConfig};
use til_agent_rs::generator::assemble;
use til_agent_rs::generator::context::GeneratorContext;
use til_agent_rs::generator::workflow::run_pipeline;
use til_agent_rs::llm::ModelGateway;
use til_agent_rs::llm::client::types::SamplingOptions;
use til_agent_rs::search::{SearchOutcome, SearchProvider};
use til_agent_rs::types::commit::CommitSet;

/// 按prompt片段路由的脚本化网关，集成测试自带一份
struct ScriptedGateway {
    routes: Vec<(String, Mutex<VecDeque<String>>)>,
}

impl ScriptedGateway {
    fn new(routes: Vec<(&str, Vec<&str>)>) -> Self {
        Self {
            routes: routes
                .into_iter()
                .map(|(needle, replies)| {
                    (
                        needle.to_string(),
                        Mutex::new(replies.into_iter().map(String::from).collect()),
                    )
                })
                .collect(),
        }
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        _options: &SamplingOptions,
    ) -> Result<String> {
        for (needle, replies) in &self.routes {
            if system_prompt.contains(needle) || user_prompt.contains(needle) {
                return replies
                    .lock()
                    .unwrap()
                    .pop_front()
                    .ok_or_else(|| anyhow!("路由{}的脚本回复已耗尽", needle));
            }
        }
        Err(anyhow!("没有匹配的脚本路由"))
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![0.0; 8])
    }
}

/// 固定结果的检索实现
struct FixedSearch;

#[async_trait]
impl SearchProvider for FixedSearch {
    async fn search(&self, _queries: &[String]) -> Result<SearchOutcome> {
        Ok(SearchOutcome {
            formatted: "- **Tokio docs**\n  https://tokio.rs\n  async runtime...".to_string(),
            source_lines: vec!["- [Tokio docs](https://tokio.rs)".to_string()],
        })
    }
}

/// 写出一份提交集合描述文件
fn create_commit_set_file(dir: &Path) -> std::path::PathBuf {
    let commits = r#"{
  "username": "tester",
  "repo": "demo",
  "date": "2025-06-01",
  "files": [
    {
      "filepath": "src/service.rs",
      "latest_code": "pub fn serve() {}",
      "patches": [
        { "commit_message": "add service entry", "patch": "+pub fn serve() {}" }
      ]
    }
  ]
}"#;
    let path = dir.join("commits.json");
    fs::write(&path, commits).unwrap();
    path
}

fn scripted_gateway() -> ScriptedGateway {
    ScriptedGateway::new(vec![
        ("Extract the core keywords", vec![r#"["tokio", "서비스"]"#]),
        (
            "supervisor",
            vec![
                r#"{"tool": "WriteConcept", "arguments": {"concept": "서비스 계층"}}"#,
                r#"{"tool": "WriteIntroduction", "arguments": {"introduction": "오늘은 서비스 진입점을 공부했다."}}"#,
                r#"{"tool": "WriteConclusion", "arguments": {"conclusion": "내일은 테스트를 보강하자."}}"#,
                r#"{"tool": "FinishReport", "arguments": {}}"#,
            ],
        ),
        ("code reviewer", vec!["Adds a service entry point."]),
        (
            "src/service.rs",
            vec![
                r#"{"tool": "WebSearch", "arguments": {"queries": ["rust service layer"]}}"#,
                r#"{"tool": "WriteSectionReport", "arguments": {"keywords": ["service"], "report": "서비스 계층의 진입점을 정리했다."}}"#,
                r#"{"tool": "FinishResearch", "arguments": {}}"#,
            ],
        ),
    ])
}

#[tokio::test]
async fn test_end_to_end_til_generation() {
    let temp_dir = TempDir::new().unwrap();
    let input_path = create_commit_set_file(temp_dir.path());

    let config = Config {
        input_path: input_path.clone(),
        output_path: temp_dir.path().join("til.docs"),
        llm: LLMConfig {
            retry_delay_ms: 0,
            ..LLMConfig::default()
        },
        ..Default::default()
    };

    let commit_set: CommitSet =
        serde_json::from_str(&fs::read_to_string(&input_path).unwrap()).unwrap();

    let context = GeneratorContext::with_dependencies(
        config.clone(),
        Arc::new(scripted_gateway()),
        Arc::new(FixedSearch),
        None,
    )
    .unwrap();

    let document = run_pipeline(&context, &commit_set).await.unwrap();

    assert_eq!(document.title, "📅 2025-06-01 TIL");
    assert_eq!(document.concept, "서비스 계층");
    assert_eq!(document.body_sections.len(), 1);
    assert_eq!(document.body_sections[0].filename, "src/service.rs");
    assert_eq!(
        document.body_sections[0].sources,
        vec!["- [Tokio docs](https://tokio.rs)"]
    );
    assert_eq!(document.keywords, vec!["tokio", "서비스"]);

    // 渲染并落盘，验证输出文件的形态
    let rendered = assemble::render(&document);
    fs::create_dir_all(&config.output_path).unwrap();
    let output_file = config.output_path.join("TIL-2025-06-01.md");
    fs::write(&output_file, &rendered).unwrap();

    let saved = fs::read_to_string(&output_file).unwrap();
    assert!(saved.starts_with("# 📅 2025-06-01 TIL\n"));
    assert!(saved.contains("# src/service.rs\n서비스 계층의 진입점을 정리했다."));
    assert!(saved.contains("**참고 자료**\n- [Tokio docs](https://tokio.rs)"));
    assert!(saved.contains("# 회고\n내일은 테스트를 보강하자."));
}

#[tokio::test]
async fn test_pipeline_survives_unscripted_model() {
    // 所有生成都失败时，分析与研究降级为占位章节，Supervisor失败上抛
    let temp_dir = TempDir::new().unwrap();
    let input_path = create_commit_set_file(temp_dir.path());

    let config = Config {
        input_path: input_path.clone(),
        output_path: temp_dir.path().join("til.docs"),
        llm: LLMConfig {
            retry_delay_ms: 0,
            ..LLMConfig::default()
        },
        ..Default::default()
    };

    let commit_set: CommitSet =
        serde_json::from_str(&fs::read_to_string(&input_path).unwrap()).unwrap();

    let context = GeneratorContext::with_dependencies(
        config,
        Arc::new(ScriptedGateway::new(vec![])),
        Arc::new(FixedSearch),
        None,
    )
    .unwrap();

    let result = run_pipeline(&context, &commit_set).await;
    assert!(result.is_err());
}
