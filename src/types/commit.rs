use serde::{Deserialize, Serialize};

/// 单次提交的补丁信息，按约定最新的排在最前
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patch {
    /// 提交信息
    pub commit_message: String,
    /// 提交的代码变更diff
    #[serde(alias = "patch")]
    pub diff_text: String,
}

/// 提交涉及的单个文件
///
/// `node_id`在fan-out阶段按索引分配一次（1..N），用于把分析结果路由回对应文件，
/// 分配后不再改变。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitFile {
    /// 文件路径
    pub filepath: String,
    /// 提交后最新版本的代码
    pub latest_code: String,
    /// 该文件的补丁历史
    pub patches: Vec<Patch>,
    /// fan-out阶段分配的节点ID
    #[serde(default)]
    pub node_id: Option<usize>,
}

/// 一次TIL生成请求的提交集合
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitSet {
    /// GitHub用户名
    pub username: String,
    /// 仓库名称
    pub repo: String,
    /// 提交日期，缺省时由工作流补当天
    #[serde(default)]
    pub date: String,
    /// 各文件的提交信息
    pub files: Vec<CommitFile>,
}

impl CommitFile {
    /// 渲染补丁历史，用于拼接分析prompt
    pub fn render_patches(&self) -> String {
        let mut rendered = String::new();
        for (i, patch) in self.patches.iter().enumerate() {
            rendered.push_str(&format!("[commit message {}]: {}\n", i + 1, patch.commit_message));
            rendered.push_str("[code diff]:\n");
            rendered.push_str(&patch.diff_text);
            rendered.push_str("\n--------------------------------\n");
        }
        rendered
    }
}
