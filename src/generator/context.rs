use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::llm::{LLMClient, ModelGateway};
use crate::notify::{EvaluationSink, NotificationSink};
use crate::search::{DisabledSearch, SearchProvider, TavilySearch};
use crate::vector::{QdrantStore, VectorStore};

/// 生成器上下文
///
/// 所有外部依赖都以trait对象注入，agent只依赖接口，
/// 测试中可整体替换为脚本化实现。
#[derive(Clone)]
pub struct GeneratorContext {
    /// 配置
    pub config: Arc<Config>,
    /// 模型网关
    pub gateway: Arc<dyn ModelGateway>,
    /// 网络检索
    pub search: Arc<dyn SearchProvider>,
    /// 向量库，未启用时为None
    pub vector_store: Option<Arc<dyn VectorStore>>,
    /// 完成通知
    pub notifier: Arc<NotificationSink>,
    /// 质量评估上报
    pub evaluation: Arc<EvaluationSink>,
}

impl GeneratorContext {
    /// 按配置创建真实依赖的上下文
    pub fn new(config: Config) -> Result<Self> {
        let gateway: Arc<dyn ModelGateway> = Arc::new(LLMClient::new(config.clone())?);

        let search: Arc<dyn SearchProvider> = if config.search.enabled {
            Arc::new(TavilySearch::new(config.search.clone())?)
        } else {
            Arc::new(DisabledSearch)
        };

        let vector_store: Option<Arc<dyn VectorStore>> = if config.vector_store.enabled {
            Some(Arc::new(QdrantStore::new(config.vector_store.clone())?))
        } else {
            None
        };

        let notifier = Arc::new(NotificationSink::new(&config.notify)?);
        let evaluation = Arc::new(EvaluationSink::new(&config.notify)?);

        Ok(Self {
            config: Arc::new(config),
            gateway,
            search,
            vector_store,
            notifier,
            evaluation,
        })
    }

    /// 用注入的依赖组装上下文，测试与嵌入场景使用
    pub fn with_dependencies(
        config: Config,
        gateway: Arc<dyn ModelGateway>,
        search: Arc<dyn SearchProvider>,
        vector_store: Option<Arc<dyn VectorStore>>,
    ) -> Result<Self> {
        let notifier = Arc::new(NotificationSink::new(&config.notify)?);
        let evaluation = Arc::new(EvaluationSink::new(&config.notify)?);
        Ok(Self {
            config: Arc::new(config),
            gateway,
            search,
            vector_store,
            notifier,
            evaluation,
        })
    }
}
