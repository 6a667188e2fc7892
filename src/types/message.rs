use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// 对话消息角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// LLM在assistant消息中发起的工具调用
///
/// 编排引擎完全由`name`驱动路由，等价于状态机事件的带标签变体。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            call_id: Uuid::new_v4().to_string(),
            name: name.into(),
            arguments,
        }
    }
}

/// 会话转录中的一条消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    pub role: Role,
    pub content: String,
    /// assistant消息携带的工具调用
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// tool消息回应的调用ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// 单个agent的会话转录，追加写入、严格有序
///
/// 这是Supervisor与研究子代理每轮循环中唯一的可变共享状态，
/// 各agent各持一份，互不共享。
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    system_prompt: String,
    messages: Vec<AgentMessage>,
}

impl Transcript {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            messages: Vec::new(),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn messages(&self) -> &[AgentMessage] {
        &self.messages
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(AgentMessage {
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        });
    }

    /// 记录一条携带工具调用的assistant消息
    pub fn push_assistant_tool_call(&mut self, tool_call: ToolCall) {
        self.messages.push(AgentMessage {
            role: Role::Assistant,
            content: String::new(),
            tool_calls: vec![tool_call],
            tool_call_id: None,
        });
    }

    /// 追加工具执行结果
    ///
    /// 不变式：tool消息必须紧跟在发起该调用的assistant消息之后，
    /// 且call_id与工具名都与assistant消息中请求的调用一致。
    pub fn push_tool_result(
        &mut self,
        call_id: &str,
        name: &str,
        content: impl Into<String>,
    ) -> Result<()> {
        let valid = match self.messages.last() {
            Some(last) if last.role == Role::Assistant => last
                .tool_calls
                .iter()
                .any(|c| c.call_id == call_id && c.name == name),
            _ => false,
        };
        if !valid {
            return Err(anyhow!(
                "tool消息必须紧跟请求该调用的assistant消息: call_id={} name={}",
                call_id,
                name
            ));
        }

        self.messages.push(AgentMessage {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.to_string()),
        });
        Ok(())
    }

    /// 将转录渲染为传给模型网关的user prompt
    pub fn render(&self) -> String {
        let mut prompt = String::new();
        for message in &self.messages {
            match message.role {
                Role::Assistant if !message.tool_calls.is_empty() => {
                    for call in &message.tool_calls {
                        prompt.push_str(&format!(
                            "[assistant] 工具调用: {}({})\n\n",
                            call.name, call.arguments
                        ));
                    }
                }
                _ => {
                    prompt.push_str(&format!("[{}] {}\n\n", message.role, message.content));
                }
            }
        }
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_result_must_follow_matching_assistant() {
        let mut transcript = Transcript::new("system");
        transcript.push_user("hello");

        // 没有assistant消息时不允许追加tool结果
        assert!(transcript.push_tool_result("id-1", "WebSearch", "result").is_err());

        let call = ToolCall::new("WebSearch", json!({"queries": ["rust"]}));
        let call_id = call.call_id.clone();
        transcript.push_assistant_tool_call(call);

        // call_id不匹配时拒绝
        assert!(transcript.push_tool_result("wrong-id", "WebSearch", "result").is_err());

        // 工具名不匹配时同样拒绝
        assert!(transcript.push_tool_result(&call_id, "FinishResearch", "result").is_err());

        assert!(transcript.push_tool_result(&call_id, "WebSearch", "result").is_ok());
        assert_eq!(transcript.messages().len(), 3);
        assert_eq!(transcript.messages()[2].role, Role::Tool);
        assert_eq!(transcript.messages()[2].tool_call_id.as_deref(), Some(call_id.as_str()));
    }

    #[test]
    fn test_render_is_append_ordered() {
        let mut transcript = Transcript::new("sys");
        transcript.push_user("first");
        let call = ToolCall::new("FinishResearch", json!({}));
        let id = call.call_id.clone();
        transcript.push_assistant_tool_call(call);
        transcript.push_tool_result(&id, "FinishResearch", "done").unwrap();

        let rendered = transcript.render();
        let first = rendered.find("first").unwrap();
        let call_pos = rendered.find("FinishResearch").unwrap();
        let done = rendered.find("done").unwrap();
        assert!(first < call_pos && call_pos < done);
    }
}
