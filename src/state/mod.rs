use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::core::config::{AppPaths, ConfigService, EngineConfig};
use crate::core::errors::EngineError;
use crate::core::logging;
use crate::llm::TextGenerator;
use crate::query::QueryEnhancer;
use crate::rag::{CorpusProvider, HybridRetriever, LexicalIndex, SemanticSearcher};
use crate::sql::ExecutionGateway;

pub mod error;

use error::InitializationError;

/// External collaborators the engine is wired to.
#[derive(Clone)]
pub struct Collaborators {
    pub corpus: Arc<dyn CorpusProvider>,
    /// Identifier passed to the corpus provider on every (re)build.
    pub corpus_id: String,
    /// `None` runs retrieval lexical-only.
    pub semantic: Option<SemanticSearcher>,
    pub generator: Arc<dyn TextGenerator>,
}

/// Engine state shared by the services.
///
/// Contains:
/// - the loaded configuration
/// - the current lexical index snapshot
/// - the semantic adapter, enhancer, generator and SQL gateway
///
/// The lexical index is replaced wholesale by [`EngineContext::rebuild_index`];
/// searches that already hold a snapshot keep using it.
pub struct EngineContext {
    config: EngineConfig,
    corpus: Arc<dyn CorpusProvider>,
    corpus_id: String,
    lexical: RwLock<Arc<LexicalIndex>>,
    rebuild_lock: Mutex<()>,
    semantic: Option<SemanticSearcher>,
    generator: Arc<dyn TextGenerator>,
    enhancer: QueryEnhancer,
    gateway: ExecutionGateway,
}

impl EngineContext {
    /// Initializes the engine from discovered paths.
    ///
    /// This process includes:
    /// 1. Installing logging under the data directory
    /// 2. Loading and validating `config.yml` over the defaults
    /// 3. Building the lexical index from the corpus provider
    pub async fn initialize(
        paths: Arc<AppPaths>,
        collaborators: Collaborators,
    ) -> Result<Arc<Self>, InitializationError> {
        logging::init(&paths);

        let config_service = ConfigService::new(paths.clone());
        let config = config_service
            .load_config()
            .map_err(|e| InitializationError::Config(e.into()))?;
        tracing::info!(
            "Loaded configuration from {}",
            config_service.config_path().display()
        );

        Self::with_config(config, collaborators).await
    }

    pub async fn with_config(
        config: EngineConfig,
        collaborators: Collaborators,
    ) -> Result<Arc<Self>, InitializationError> {
        let gateway = ExecutionGateway::from_config(&config.sql)
            .map_err(|e| InitializationError::Sql(e.into()))?;
        let enhancer = QueryEnhancer::from_config(&config.enhancer);

        let index = build_index(
            collaborators.corpus.as_ref(),
            &collaborators.corpus_id,
            &config,
        )
        .await
        .map_err(|e| InitializationError::Index(e.into()))?;

        Ok(Arc::new(EngineContext {
            config,
            corpus: collaborators.corpus,
            corpus_id: collaborators.corpus_id,
            lexical: RwLock::new(Arc::new(index)),
            rebuild_lock: Mutex::new(()),
            semantic: collaborators.semantic,
            generator: collaborators.generator,
            enhancer,
            gateway,
        }))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn enhancer(&self) -> &QueryEnhancer {
        &self.enhancer
    }

    pub fn generator(&self) -> &dyn TextGenerator {
        self.generator.as_ref()
    }

    pub fn gateway(&self) -> &ExecutionGateway {
        &self.gateway
    }

    pub async fn lexical_snapshot(&self) -> Arc<LexicalIndex> {
        self.lexical.read().await.clone()
    }

    /// A retriever bound to the current index snapshot.
    pub async fn retriever(&self) -> HybridRetriever {
        HybridRetriever::new(
            self.lexical_snapshot().await,
            self.semantic.clone(),
            self.config.retrieval.clone(),
        )
    }

    /// Reloads the corpus and swaps in a fresh index. On failure the current
    /// snapshot keeps serving. Concurrent rebuilds run one at a time.
    pub async fn rebuild_index(&self) -> Result<usize, EngineError> {
        let _rebuilding = self.rebuild_lock.lock().await;

        let index = match build_index(self.corpus.as_ref(), &self.corpus_id, &self.config).await {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!("Index rebuild failed, keeping the current snapshot: {}", e);
                return Err(e);
            }
        };

        let documents = index.len();
        *self.lexical.write().await = Arc::new(index);
        tracing::info!("Lexical index swapped: {} documents", documents);
        Ok(documents)
    }
}

async fn build_index(
    corpus: &dyn CorpusProvider,
    corpus_id: &str,
    config: &EngineConfig,
) -> Result<LexicalIndex, EngineError> {
    let documents = corpus
        .load(corpus_id)
        .await
        .map_err(|e| EngineError::IndexBuild(format!("corpus '{}': {}", corpus_id, e)))?;

    let params = config.lexical.clone();
    tokio::task::spawn_blocking(move || LexicalIndex::build_with(documents, params))
        .await
        .map_err(EngineError::internal)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::{Document, DocumentKind, StaticCorpus};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Echo;

    #[async_trait]
    impl TextGenerator for Echo {
        async fn complete(&self, prompt: &str) -> Result<String, EngineError> {
            Ok(prompt.to_string())
        }
    }

    /// Serves one corpus until `broken` is set.
    struct SwitchableCorpus {
        documents: std::sync::Mutex<Vec<Document>>,
        broken: AtomicBool,
    }

    #[async_trait]
    impl CorpusProvider for SwitchableCorpus {
        async fn load(&self, _corpus_id: &str) -> Result<Vec<Document>, EngineError> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(EngineError::collaborator("corpus share unavailable"));
            }
            Ok(self.documents.lock().unwrap().clone())
        }
    }

    fn doc(id: &str, text: &str) -> Document {
        Document::new(id, text, DocumentKind::Doc, format!("{}.md", id))
    }

    fn collaborators(corpus: Arc<dyn CorpusProvider>) -> Collaborators {
        Collaborators {
            corpus,
            corpus_id: "kb".to_string(),
            semantic: None,
            generator: Arc::new(Echo),
        }
    }

    #[tokio::test]
    async fn builds_index_from_corpus() {
        let corpus = Arc::new(StaticCorpus::new(vec![doc("users", "Table users")]));
        let ctx = EngineContext::with_config(EngineConfig::default(), collaborators(corpus))
            .await
            .unwrap();

        assert_eq!(ctx.lexical_snapshot().await.len(), 1);
        assert_eq!(ctx.gateway().row_cap(), 100);
    }

    #[tokio::test]
    async fn duplicate_ids_fail_initialization() {
        let corpus = Arc::new(StaticCorpus::new(vec![doc("a", "one"), doc("a", "two")]));
        let result =
            EngineContext::with_config(EngineConfig::default(), collaborators(corpus)).await;
        assert!(matches!(result, Err(InitializationError::Index(_))));
    }

    #[tokio::test]
    async fn rebuild_swaps_snapshot_and_keeps_old_one_on_failure() {
        let corpus = Arc::new(SwitchableCorpus {
            documents: std::sync::Mutex::new(vec![doc("users", "Table users")]),
            broken: AtomicBool::new(false),
        });
        let ctx =
            EngineContext::with_config(EngineConfig::default(), collaborators(corpus.clone()))
                .await
                .unwrap();

        let before = ctx.lexical_snapshot().await;
        corpus
            .documents
            .lock()
            .unwrap()
            .push(doc("orders", "Table orders"));
        assert_eq!(ctx.rebuild_index().await.unwrap(), 2);

        // The snapshot taken before the rebuild is unchanged.
        assert_eq!(before.len(), 1);
        assert_eq!(ctx.lexical_snapshot().await.len(), 2);

        corpus.broken.store(true, Ordering::SeqCst);
        let err = ctx.rebuild_index().await.unwrap_err();
        assert!(matches!(err, EngineError::IndexBuild(_)));
        assert_eq!(ctx.lexical_snapshot().await.len(), 2);
    }
}
