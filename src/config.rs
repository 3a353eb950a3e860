use std::{env, net::SocketAddr, time::Duration};

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub queries_dir: String,
    pub neo4j_uri: String,
    pub neo4j_username: String,
    pub neo4j_password: String,
    pub neo4j_database: String,
    pub neo4j_max_connections: usize,
    pub neo4j_connect_timeout: Duration,
    pub neo4j_write_timeout: Duration,
    pub renderer_url: Option<String>,
    pub detector_url: Option<String>,
    pub ocr_url: Option<String>,
    pub collaborator_timeout: Duration,
    pub persistence_enabled: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_port: u16 = env::var("API_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080);
        let bind_host = env::var("BIND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let bind_addr: SocketAddr = format!("{bind_host}:{api_port}").parse()?;

        let queries_dir = env::var("QUERIES_DIR").unwrap_or_else(|_| "queries".to_string());

        let neo4j_uri =
            env::var("NEO4J_URI").unwrap_or_else(|_| "bolt://localhost:7687".to_string());
        let neo4j_username = env::var("NEO4J_USERNAME").unwrap_or_else(|_| "neo4j".to_string());
        let neo4j_password = env::var("NEO4J_PASSWORD").unwrap_or_else(|_| {
            tracing::warn!("NEO4J_PASSWORD not set, using the development default");
            "password".to_string()
        });
        let neo4j_database = env::var("NEO4J_DATABASE").unwrap_or_else(|_| "neo4j".to_string());

        let neo4j_max_connections: usize = env::var("NEO4J_MAX_CONNECTION_POOL_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(50);

        Ok(Self {
            bind_addr,
            queries_dir,
            neo4j_uri,
            neo4j_username,
            neo4j_password,
            neo4j_database,
            neo4j_max_connections,
            neo4j_connect_timeout: millis_from_env("NEO4J_CONNECT_TIMEOUT_MS", 30_000),
            neo4j_write_timeout: millis_from_env("NEO4J_WRITE_TIMEOUT_MS", 10_000),
            renderer_url: url_from_env("RENDERER_URL"),
            detector_url: url_from_env("DETECTOR_URL"),
            ocr_url: url_from_env("OCR_URL"),
            collaborator_timeout: millis_from_env("COLLABORATOR_TIMEOUT_MS", 30_000),
            persistence_enabled: env::var("EXTRACT_ENABLE_PERSISTENCE")
                .ok()
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
        })
    }
}

fn millis_from_env(key: &str, default_ms: u64) -> Duration {
    Duration::from_millis(
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default_ms),
    )
}

fn url_from_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
}

fn parse_flag(raw: &str) -> bool {
    let v = raw.trim();
    v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes")
}
