//! Startup wiring shared by every command that touches the agent or the
//! document store.

use std::sync::Arc;

use async_trait::async_trait;
use optimus_agent::{AgentService, ProviderLoopFactory};
use optimus_config::AppConfig;
use optimus_core::capability::CapabilityRegistry;
use optimus_core::error::StoreError;
use optimus_core::store::{ChunkStore, Embedder, RelationalStore};
use optimus_gateway::{GatewayState, SharedState};
use optimus_providers::{ProviderEmbedder, ProviderFactory};
use optimus_rag::{Chunker, RetrievalEngine, ensure_seed_document};
use optimus_store::{InMemoryChunkStore, NoDatabase, PgStore};
use tracing::{info, warn};

/// Everything a command needs, built once from configuration.
pub struct Runtime {
    pub config: AppConfig,
    pub retrieval: Arc<RetrievalEngine>,
    pub registry: Arc<CapabilityRegistry>,
    pub agent: Arc<AgentService>,
}

impl Runtime {
    pub async fn build(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let providers = ProviderFactory::from_config(&config);
        let embedder = embedder(&providers, &config);
        let (chunks, relational) = stores(&config).await?;

        let retrieval = Arc::new(RetrievalEngine::new(
            chunks,
            embedder,
            Chunker::from_config(&config.rag),
        ));

        if config.rag.seed_documents {
            // A missing embedding key should not keep the server from starting.
            if let Err(e) = ensure_seed_document(&retrieval).await {
                warn!(error = %e, "Could not index the seed document");
            }
        }

        let transport = optimus_tools::http_transport(&config.tools)?;
        let registry = Arc::new(optimus_tools::default_registry(
            &config,
            relational,
            retrieval.clone(),
            transport,
        ));
        info!(capabilities = ?registry.names(), "Capabilities registered");

        let factory = ProviderLoopFactory::new(providers, registry.clone(), &config.agent);
        let agent = Arc::new(AgentService::new(Arc::new(factory), &config.agent));

        Ok(Self {
            config,
            retrieval,
            registry,
            agent,
        })
    }

    pub fn gateway_state(&self) -> SharedState {
        Arc::new(GatewayState {
            agent: self.agent.clone(),
            retrieval: self.retrieval.clone(),
            default_provider: self.config.default_provider.clone(),
            default_model: self.config.default_model.clone(),
        })
    }
}

fn embedder(providers: &ProviderFactory, config: &AppConfig) -> Arc<dyn Embedder> {
    match providers.create(&config.rag.embedding_provider) {
        Ok(provider) => Arc::new(ProviderEmbedder::new(provider, &config.rag.embedding_model)),
        Err(e) => {
            warn!(
                provider = %config.rag.embedding_provider,
                error = %e,
                "Embedding provider unavailable; ingestion and retrieval will fail"
            );
            Arc::new(UnavailableEmbedder {
                reason: e.to_string(),
            })
        }
    }
}

async fn stores(
    config: &AppConfig,
) -> Result<(Arc<dyn ChunkStore>, Arc<dyn RelationalStore>), StoreError> {
    let Some(url) = config.database.url.as_deref() else {
        warn!("DATABASE_URL not set; using in-memory document store and no relational database");
        let chunks: Arc<dyn ChunkStore> = Arc::new(InMemoryChunkStore::new());
        let relational: Arc<dyn RelationalStore> = Arc::new(NoDatabase);
        return Ok((chunks, relational));
    };

    let store = PgStore::connect(url, config.database.max_connections)
        .await?
        .with_embedding_dim(config.rag.embedding_dim);
    if config.database.run_migrations {
        store.migrate().await?;
    }
    info!("Connected to PostgreSQL");

    let store = Arc::new(store);
    let chunks: Arc<dyn ChunkStore> = store.clone();
    let relational: Arc<dyn RelationalStore> = store;
    Ok((chunks, relational))
}

/// Stands in for an embedder whose provider could not be built.
struct UnavailableEmbedder {
    reason: String,
}

#[async_trait]
impl Embedder for UnavailableEmbedder {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError> {
        Err(StoreError::EmbeddingFailed(self.reason.clone()))
    }
}
