use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use neo4rs::Graph;
use serde_json::Value;

use crate::neo4j::{self, Neo4jError};

/// One result row, projected to the requested columns.
pub type Row = HashMap<String, Value>;
pub type Params = HashMap<String, Value>;

/// Seam between the service and the graph database. Handlers and the product store only
/// ever see this trait, so tests can swap in an in-memory graph.
#[async_trait]
pub trait GraphExecutor: Send + Sync {
    async fn healthcheck(&self) -> Result<(), Neo4jError>;

    /// Schema and maintenance statements; whatever they return is discarded.
    async fn run(&self, cypher: &str, params: Params) -> Result<(), Neo4jError>;

    /// Mutating statement whose `RETURN` clause is read back. The stream is drained so
    /// the write has completed before the rows are handed out.
    async fn write_returning(
        &self,
        cypher: &str,
        params: Params,
        fields: &[&str],
    ) -> Result<Vec<Row>, Neo4jError>;

    async fn read_rows(
        &self,
        cypher: &str,
        params: Params,
        fields: &[&str],
        max_rows: usize,
    ) -> Result<Vec<Row>, Neo4jError>;
}

#[derive(Clone)]
pub struct Neo4rsExecutor {
    graph: Graph,
}

impl Neo4rsExecutor {
    pub fn new(graph: Graph) -> Self {
        Self { graph }
    }
}

#[async_trait]
impl GraphExecutor for Neo4rsExecutor {
    async fn healthcheck(&self) -> Result<(), Neo4jError> {
        neo4j::healthcheck(&self.graph).await
    }

    async fn run(&self, cypher: &str, params: Params) -> Result<(), Neo4jError> {
        neo4j::run(&self.graph, cypher, params).await
    }

    async fn write_returning(
        &self,
        cypher: &str,
        params: Params,
        fields: &[&str],
    ) -> Result<Vec<Row>, Neo4jError> {
        neo4j::write_returning(&self.graph, cypher, params, fields).await
    }

    async fn read_rows(
        &self,
        cypher: &str,
        params: Params,
        fields: &[&str],
        max_rows: usize,
    ) -> Result<Vec<Row>, Neo4jError> {
        neo4j::read_rows(&self.graph, cypher, params, fields, max_rows).await
    }
}

pub type DynExecutor = Arc<dyn GraphExecutor>;
