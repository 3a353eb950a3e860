use std::collections::HashMap;

use neo4rs::{
    BoltBoolean, BoltFloat, BoltInteger, BoltList, BoltMap, BoltNull, BoltString, BoltType,
    ConfigBuilder, Graph, Query, query,
};
use serde_json::Value;
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum Neo4jError {
    #[error("neo4j error: {0}")]
    Neo4rs(#[from] neo4rs::Error),
    #[error("neo4j connect timeout after {0:?}")]
    ConnectTimeout(std::time::Duration),
}

pub async fn connect(cfg: &Config) -> Result<Graph, Neo4jError> {
    let config = ConfigBuilder::default()
        .uri(cfg.neo4j_uri.clone())
        .user(cfg.neo4j_username.clone())
        .password(cfg.neo4j_password.clone())
        .db(cfg.neo4j_database.clone())
        .max_connections(cfg.neo4j_max_connections)
        .build()?;

    let graph = match tokio::time::timeout(cfg.neo4j_connect_timeout, Graph::connect(config)).await
    {
        Ok(r) => r?,
        Err(_) => return Err(Neo4jError::ConnectTimeout(cfg.neo4j_connect_timeout)),
    };
    Ok(graph)
}

pub async fn healthcheck(graph: &Graph) -> Result<(), Neo4jError> {
    let mut result = graph.execute(query("RETURN 1 as n")).await?;
    while let Some(_row) = result.next().await? {}
    Ok(())
}

/// Runs a statement whose rows are irrelevant (schema changes, maintenance).
pub async fn run(
    graph: &Graph,
    cypher: &str,
    params: HashMap<String, Value>,
) -> Result<(), Neo4jError> {
    let mut result = graph.execute(bind(cypher, params)).await?;
    while let Some(_row) = result.next().await? {}
    Ok(())
}

/// Auto-commit write that hands back its `RETURN` rows once the stream is exhausted.
pub async fn write_returning(
    graph: &Graph,
    cypher: &str,
    params: HashMap<String, Value>,
    fields: &[&str],
) -> Result<Vec<HashMap<String, Value>>, Neo4jError> {
    let mut result = graph.execute(bind(cypher, params)).await?;
    let mut rows_out = Vec::new();
    while let Some(row) = result.next().await? {
        rows_out.push(project(&row, fields));
    }
    Ok(rows_out)
}

pub async fn read_rows(
    graph: &Graph,
    cypher: &str,
    params: HashMap<String, Value>,
    fields: &[&str],
    max_rows: usize,
) -> Result<Vec<HashMap<String, Value>>, Neo4jError> {
    let mut result = graph.execute(bind(cypher, params)).await?;
    let mut rows_out = Vec::new();

    while let Some(row) = result.next().await? {
        rows_out.push(project(&row, fields));
        if rows_out.len() >= max_rows {
            break;
        }
    }

    // The pooled connection goes back when `result` is dropped, on every exit path.
    Ok(rows_out)
}

fn project(row: &neo4rs::Row, fields: &[&str]) -> HashMap<String, Value> {
    fields
        .iter()
        .map(|field| {
            // Missing columns and unsupported bolt types both surface as null.
            let v = row.get::<Value>(*field).unwrap_or(Value::Null);
            ((*field).to_string(), v)
        })
        .collect()
}

fn bind(cypher: &str, params: HashMap<String, Value>) -> Query {
    let mut q = query(cypher);
    for (k, v) in params {
        q = q.param(k.as_str(), json_to_bolt(&v));
    }
    q
}

fn json_to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => BoltType::Boolean(BoltBoolean::new(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => BoltType::Integer(BoltInteger::new(i)),
            None => BoltType::Float(BoltFloat::new(n.as_f64().unwrap_or(0.0))),
        },
        Value::String(s) => BoltType::String(BoltString::from(s.clone())),
        Value::Array(arr) => {
            let list = arr.iter().map(json_to_bolt).collect::<Vec<_>>();
            BoltType::List(BoltList::from(list))
        }
        Value::Object(obj) => {
            let map: BoltMap = obj
                .iter()
                .map(|(k, v)| (BoltString::from(k.clone()), json_to_bolt(v)))
                .collect();
            BoltType::Map(map)
        }
    }
}
