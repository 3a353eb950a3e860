use std::{
    collections::HashMap,
    ffi::OsStr,
    path::{Path, PathBuf},
};

use thiserror::Error;

pub const UPSERT_PRODUCT: &str = "product/upsert_product";
pub const GET_PRODUCT: &str = "product/get_product";
pub const COUNT_PRODUCTS: &str = "product/count_by_source_url";

/// Keys the product pipeline cannot run without.
pub const REQUIRED_KEYS: [&str; 3] = [UPSERT_PRODUCT, GET_PRODUCT, COUNT_PRODUCTS];

const SCHEMA_PREFIX: &str = "schema/";

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("queries dir does not exist: {0}")]
    QueriesDirMissing(String),
    #[error("failed to read query file {path}: {source}")]
    ReadFailed {
        path: String,
        source: std::io::Error,
    },
    #[error("query not found: {0}")]
    NotFound(String),
}

/// Cypher statements loaded from `*.cypher` files, keyed by their path relative to the
/// queries dir without extension (`product/upsert_product`).
#[derive(Clone, Debug, Default)]
pub struct QueryRegistry {
    queries: HashMap<String, String>,
}

impl QueryRegistry {
    pub fn load_from_dir(dir: &str) -> Result<Self, QueryError> {
        let root = PathBuf::from(dir);
        if !root.exists() {
            return Err(QueryError::QueriesDirMissing(dir.to_string()));
        }
        let mut queries = HashMap::new();
        Self::walk(&root, &root, &mut queries)?;
        Ok(Self { queries })
    }

    /// Same as `load_from_dir`, but refuses to start when a statement the pipeline
    /// depends on is absent.
    pub fn load_required(dir: &str) -> Result<Self, QueryError> {
        let registry = Self::load_from_dir(dir)?;
        for key in REQUIRED_KEYS {
            registry.get(key)?;
        }
        Ok(registry)
    }

    fn walk(
        root: &Path,
        current: &Path,
        out: &mut HashMap<String, String>,
    ) -> Result<(), QueryError> {
        let read_failed = |path: &Path, source: std::io::Error| QueryError::ReadFailed {
            path: path.display().to_string(),
            source,
        };

        let entries = std::fs::read_dir(current).map_err(|e| read_failed(current, e))?;
        for entry in entries {
            let path = entry.map_err(|e| read_failed(current, e))?.path();

            if path.is_dir() {
                Self::walk(root, &path, out)?;
                continue;
            }
            if path.extension() != Some(OsStr::new("cypher")) {
                continue;
            }

            let content = std::fs::read_to_string(&path).map_err(|e| read_failed(&path, e))?;
            out.insert(Self::key_for_path(root, &path), content.trim().to_string());
        }

        Ok(())
    }

    fn key_for_path(root: &Path, file: &Path) -> String {
        let rel = file.strip_prefix(root).unwrap_or(file);
        rel.with_extension("")
            .to_string_lossy()
            .replace('\\', "/")
    }

    pub fn get(&self, key: &str) -> Result<&str, QueryError> {
        self.queries
            .get(key)
            .map(|s| s.as_str())
            .ok_or_else(|| QueryError::NotFound(key.to_string()))
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.queries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Schema statements (constraints, indexes) in the order they must run.
    pub fn schema_keys(&self) -> Vec<String> {
        self.keys()
            .into_iter()
            .filter(|k| k.starts_with(SCHEMA_PREFIX))
            .collect()
    }
}
