use serde::{Deserialize, Serialize};

/// TIL文档的目标语言类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum TargetLanguage {
    #[serde(rename = "ko")]
    #[default]
    Korean,
    #[serde(rename = "en")]
    English,
    #[serde(rename = "zh")]
    Chinese,
    #[serde(rename = "ja")]
    Japanese,
}

impl std::fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetLanguage::Korean => write!(f, "ko"),
            TargetLanguage::English => write!(f, "en"),
            TargetLanguage::Chinese => write!(f, "zh"),
            TargetLanguage::Japanese => write!(f, "ja"),
        }
    }
}

impl std::str::FromStr for TargetLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ko" | "korean" | "한국어" | "韩文" => Ok(TargetLanguage::Korean),
            "en" | "english" | "英文" => Ok(TargetLanguage::English),
            "zh" | "chinese" | "中文" => Ok(TargetLanguage::Chinese),
            "ja" | "japanese" | "日本語" | "日文" => Ok(TargetLanguage::Japanese),
            _ => Err(format!("Unknown target language: {}", s)),
        }
    }
}

impl TargetLanguage {
    /// 获取语言的描述性名称
    pub fn display_name(&self) -> &'static str {
        match self {
            TargetLanguage::Korean => "한국어",
            TargetLanguage::English => "English",
            TargetLanguage::Chinese => "中文",
            TargetLanguage::Japanese => "日本語",
        }
    }

    /// 获取语言的提示词指令，附加在每个agent的system prompt之后
    pub fn prompt_instruction(&self) -> &'static str {
        match self {
            TargetLanguage::Korean => {
                "TIL 문서는 한국어로 작성해 주세요. 기술 용어는 원문을 유지해도 됩니다."
            }
            TargetLanguage::English => {
                "Please write the TIL document in English, keeping the wording accurate and easy to understand."
            }
            TargetLanguage::Chinese => "请使用中文编写TIL文档，技术术语可保留原文。",
            TargetLanguage::Japanese => {
                "TILドキュメントは日本語で作成してください。技術用語は原文のままで構いません。"
            }
        }
    }
}
