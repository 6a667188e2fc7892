//! 文档组装器
//!
//! 纯函数：同一份FinalDocument总是渲染出字节级相同的markdown，
//! 不做任何IO，也不再调用模型。

use crate::types::section::FinalDocument;

/// 将最终文档渲染为markdown文本
pub fn render(document: &FinalDocument) -> String {
    let mut output = format!("# {}\n\n", document.title);

    output.push_str(&format!("**핵심 개념**: {}\n\n", document.concept));
    output.push_str(&format!("{}\n\n", document.introduction));

    // 章节按node_id排序，与提交文件的输入顺序一致
    let mut sections: Vec<_> = document.body_sections.iter().collect();
    sections.sort_by_key(|s| s.node_id);

    for section in sections {
        output.push_str(&format!("# {}\n", section.filename));
        output.push_str(&format!("{}\n", section.report_body));
        if !section.sources.is_empty() {
            output.push_str("\n**참고 자료**\n");
            for line in &section.sources {
                output.push_str(line);
                output.push('\n');
            }
        }
        output.push_str("\n---\n\n");
    }

    output.push_str("# 회고\n");
    output.push_str(&format!("{}\n", document.conclusion));

    if !document.keywords.is_empty() {
        output.push_str(&format!("\n**키워드**: {}\n", document.keywords.join(", ")));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::section::SectionReport;

    fn document() -> FinalDocument {
        FinalDocument {
            title: "📅 2025-06-01 TIL".to_string(),
            concept: "Async orchestration".to_string(),
            introduction: "Today I studied async.".to_string(),
            body_sections: vec![
                SectionReport {
                    filename: "beta.rs".to_string(),
                    research_keywords: vec!["b".to_string()],
                    report_body: "beta body".to_string(),
                    sources: Vec::new(),
                    node_id: 2,
                },
                SectionReport {
                    filename: "alpha.rs".to_string(),
                    research_keywords: vec!["a".to_string()],
                    report_body: "alpha body".to_string(),
                    sources: vec!["- [doc](https://docs.rs)".to_string()],
                    node_id: 1,
                },
            ],
            conclusion: "More practice needed.".to_string(),
            keywords: vec!["tokio".to_string(), "async".to_string()],
        }
    }

    #[test]
    fn test_render_layout_and_section_order() {
        let rendered = render(&document());

        assert!(rendered.starts_with("# 📅 2025-06-01 TIL\n\n"));
        // 乱序传入的章节按node_id排回
        let alpha = rendered.find("# alpha.rs").unwrap();
        let beta = rendered.find("# beta.rs").unwrap();
        assert!(alpha < beta);
        assert!(rendered.contains("**참고 자료**\n- [doc](https://docs.rs)\n"));
        assert!(rendered.contains("# 회고\nMore practice needed.\n"));
        assert!(rendered.ends_with("**키워드**: tokio, async\n"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let doc = document();
        assert_eq!(render(&doc), render(&doc));
    }

    #[test]
    fn test_render_omits_empty_trailers() {
        let mut doc = document();
        doc.keywords.clear();
        for section in &mut doc.body_sections {
            section.sources.clear();
        }
        let rendered = render(&doc);
        assert!(!rendered.contains("**키워드**"));
        assert!(!rendered.contains("**참고 자료**"));
    }
}
