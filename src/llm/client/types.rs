use serde::{Deserialize, Serialize};

/// 模型档位
///
/// Efficient用于逐文件分析与研究子代理的常规推理，
/// Powerful用于Supervisor的决策与最终综合。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelTier {
    #[default]
    Efficient,
    Powerful,
}

/// 单次生成调用的采样参数
///
/// 温度与最大tokens未设置时回落到LLMConfig中的全局默认值；
/// top_p、重复惩罚与停止序列按原样透传，provider不支持时忽略。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingOptions {
    /// 模型档位
    pub tier: ModelTier,
    /// 温度
    pub temperature: Option<f64>,
    /// 最大tokens
    pub max_tokens: Option<u32>,
    /// 核采样阈值
    pub top_p: Option<f64>,
    /// 重复惩罚系数
    pub repetition_penalty: Option<f64>,
    /// 停止序列
    pub stop_sequences: Vec<String>,
}

impl SamplingOptions {
    /// 分析与研究任务的默认采样参数，温度压到0以保证可复现
    pub fn analysis() -> Self {
        Self {
            tier: ModelTier::Efficient,
            temperature: Some(0.0),
            max_tokens: Some(2048),
            ..Self::default()
        }
    }

    /// Supervisor决策与综合任务的默认采样参数
    pub fn synthesis() -> Self {
        Self {
            tier: ModelTier::Powerful,
            ..Self::default()
        }
    }

    /// 将透传类采样参数渲染为请求级附加参数
    pub fn additional_params(&self) -> Option<serde_json::Value> {
        let mut params = serde_json::Map::new();
        if let Some(top_p) = self.top_p {
            params.insert("top_p".to_string(), serde_json::json!(top_p));
        }
        if let Some(penalty) = self.repetition_penalty {
            params.insert("repetition_penalty".to_string(), serde_json::json!(penalty));
        }
        if !self.stop_sequences.is_empty() {
            params.insert("stop".to_string(), serde_json::json!(self.stop_sequences));
        }
        if params.is_empty() {
            None
        } else {
            Some(serde_json::Value::Object(params))
        }
    }
}
