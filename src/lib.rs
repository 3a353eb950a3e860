pub mod api;
pub mod config;
pub mod domain;
pub mod executor;
pub mod extraction;
pub mod graph_store;
pub mod http;
pub mod neo4j;
pub mod queries;

#[derive(Clone)]
pub struct AppState {
    pub cfg: config::Config,
    pub executor: executor::DynExecutor,
    pub queries: queries::QueryRegistry,
    pub extractor: extraction::DynExtractor,
    pub products: graph_store::ProductStore,
}

impl AppState {
    /// Wires the product store onto the shared executor so every request sees the same pool.
    pub fn new(
        cfg: config::Config,
        executor: executor::DynExecutor,
        queries: queries::QueryRegistry,
        extractor: extraction::DynExtractor,
    ) -> Self {
        let products = graph_store::ProductStore::new(
            executor.clone(),
            queries.clone(),
            cfg.neo4j_write_timeout,
        );
        Self {
            cfg,
            executor,
            queries,
            extractor,
            products,
        }
    }
}
