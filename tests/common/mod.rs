use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use vision_scraper_service::{
    AppState,
    config::Config,
    domain::{DetectionElement, ExtractedRecord, PageType},
    executor::{DynExecutor, GraphExecutor, Params, Row},
    extraction::{
        Collaborators, DynExtractor, ExtractionError, ExtractionStrategy, PipelineExtractor,
        RenderedPage, Stage,
        collaborators::{Detector, Renderer},
        simulated::{SimulatedDetector, SimulatedRenderer},
    },
    graph_store::ProductStore,
    http, neo4j,
    queries::{self, QueryRegistry},
};

#[allow(dead_code)]
#[derive(Clone, Debug)]
pub enum Call {
    Read { cypher: String, params: Params },
    Write { cypher: String, params: Params },
    Run { cypher: String },
    Healthcheck,
}

/// In-memory stand-in for Neo4j. It understands the product statements by their text
/// and applies MERGE semantics keyed on `source_url`; other statements answer from
/// `canned`.
#[derive(Clone)]
pub struct FakeGraph {
    upsert_cypher: String,
    get_cypher: String,
    count_cypher: String,
    pub nodes: Arc<Mutex<BTreeMap<String, Row>>>,
    pub canned: Arc<Mutex<HashMap<String, Vec<Row>>>>,
    pub calls: Arc<Mutex<Vec<Call>>>,
    pub fail_upserts: Arc<AtomicBool>,
    clock: Arc<AtomicU64>,
}

impl FakeGraph {
    pub fn new(queries: &QueryRegistry) -> Self {
        Self {
            upsert_cypher: queries.get(queries::UPSERT_PRODUCT).unwrap().to_string(),
            get_cypher: queries.get(queries::GET_PRODUCT).unwrap().to_string(),
            count_cypher: queries.get(queries::COUNT_PRODUCTS).unwrap().to_string(),
            nodes: Arc::default(),
            canned: Arc::default(),
            calls: Arc::default(),
            fail_upserts: Arc::default(),
            clock: Arc::default(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.lock().unwrap().len()
    }

    pub fn upsert_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, Call::Write { cypher, .. } if *cypher == self.upsert_cypher))
            .count()
    }

    fn tick(&self) -> String {
        let n = self.clock.fetch_add(1, Ordering::SeqCst);
        format!("2026-10-18T12:{:02}:{:02}Z", (n / 60) % 60, n % 60)
    }

    fn upsert(&self, params: &Params) -> Row {
        let url = params["source_url"].as_str().unwrap().to_string();
        let mut nodes = self.nodes.lock().unwrap();
        let created = !nodes.contains_key(&url);

        let mut node = Row::new();
        for key in ["source_url", "name", "price", "currency", "images", "attributes_json"] {
            let v = params.get(key).cloned().unwrap_or(Value::Null);
            assert!(!v.is_object(), "graph properties cannot hold maps ({key})");
            node.insert(key.to_string(), v);
        }
        node.insert("extracted_at".to_string(), json!(self.tick()));
        let extracted_at = node["extracted_at"].clone();
        nodes.insert(url.clone(), node);

        Row::from([
            ("source_url".to_string(), json!(url)),
            ("extracted_at".to_string(), extracted_at),
            ("created".to_string(), json!(created)),
        ])
    }
}

fn project(row: &Row, fields: &[&str]) -> Row {
    fields
        .iter()
        .map(|f| ((*f).to_string(), row.get(*f).cloned().unwrap_or(Value::Null)))
        .collect()
}

#[async_trait]
impl GraphExecutor for FakeGraph {
    async fn healthcheck(&self) -> Result<(), neo4j::Neo4jError> {
        self.calls.lock().unwrap().push(Call::Healthcheck);
        Ok(())
    }

    async fn run(&self, cypher: &str, _params: Params) -> Result<(), neo4j::Neo4jError> {
        self.calls.lock().unwrap().push(Call::Run {
            cypher: cypher.to_string(),
        });
        Ok(())
    }

    async fn write_returning(
        &self,
        cypher: &str,
        params: Params,
        fields: &[&str],
    ) -> Result<Vec<Row>, neo4j::Neo4jError> {
        self.calls.lock().unwrap().push(Call::Write {
            cypher: cypher.to_string(),
            params: params.clone(),
        });

        assert_eq!(cypher, self.upsert_cypher, "unexpected write statement");
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(neo4j::Neo4jError::ConnectTimeout(Duration::from_millis(1)));
        }
        Ok(vec![project(&self.upsert(&params), fields)])
    }

    async fn read_rows(
        &self,
        cypher: &str,
        params: Params,
        fields: &[&str],
        max_rows: usize,
    ) -> Result<Vec<Row>, neo4j::Neo4jError> {
        self.calls.lock().unwrap().push(Call::Read {
            cypher: cypher.to_string(),
            params: params.clone(),
        });

        let url = params.get("source_url").and_then(Value::as_str).unwrap_or("");
        let rows = if cypher == self.get_cypher {
            self.nodes.lock().unwrap().get(url).cloned().into_iter().collect()
        } else if cypher == self.count_cypher {
            let n = i64::from(self.nodes.lock().unwrap().contains_key(url));
            vec![Row::from([("n".to_string(), json!(n))])]
        } else {
            self.canned
                .lock()
                .unwrap()
                .get(cypher.trim())
                .cloned()
                .unwrap_or_default()
        };

        Ok(rows
            .iter()
            .take(max_rows)
            .map(|r| project(r, fields))
            .collect())
    }
}

#[derive(Clone, Default)]
pub struct CollaboratorCalls {
    pub render: Arc<AtomicUsize>,
    pub detect: Arc<AtomicUsize>,
}

impl CollaboratorCalls {
    pub fn total(&self) -> usize {
        self.render.load(Ordering::SeqCst) + self.detect.load(Ordering::SeqCst)
    }
}

struct CountingRenderer(Arc<AtomicUsize>);

#[async_trait]
impl Renderer for CountingRenderer {
    async fn render(&self, url: &str) -> Result<RenderedPage, ExtractionError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        SimulatedRenderer.render(url).await
    }
}

struct CountingDetector(Arc<AtomicUsize>);

#[async_trait]
impl Detector for CountingDetector {
    async fn detect(&self, screenshot_path: &str) -> Result<Vec<DetectionElement>, ExtractionError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        SimulatedDetector.detect(screenshot_path).await
    }
}

/// Always fails as if the renderer were down.
#[allow(dead_code)]
pub struct FailingExtractor;

#[async_trait]
impl ExtractionStrategy for FailingExtractor {
    async fn extract(
        &self,
        _url: &str,
        _page_type: &PageType,
    ) -> Result<ExtractedRecord, ExtractionError> {
        Err(ExtractionError::collaborator(Stage::Render, "renderer unreachable"))
    }
}

pub fn test_config() -> Config {
    Config {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        queries_dir: "queries".to_string(),
        neo4j_uri: "".to_string(),
        neo4j_username: "".to_string(),
        neo4j_password: "".to_string(),
        neo4j_database: "".to_string(),
        neo4j_max_connections: 1,
        neo4j_connect_timeout: Duration::from_secs(1),
        neo4j_write_timeout: Duration::from_secs(1),
        renderer_url: None,
        detector_url: None,
        ocr_url: None,
        collaborator_timeout: Duration::from_secs(1),
        persistence_enabled: true,
    }
}

pub fn load_queries() -> QueryRegistry {
    QueryRegistry::load_required("queries").unwrap()
}

#[allow(dead_code)]
pub struct Harness {
    pub state: AppState,
    pub graph: FakeGraph,
    pub calls: CollaboratorCalls,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(cfg: Config) -> Self {
        let queries = load_queries();
        let graph = FakeGraph::new(&queries);
        let calls = CollaboratorCalls::default();

        let mut collaborators = Collaborators::simulated();
        collaborators.renderer = Arc::new(CountingRenderer(calls.render.clone()));
        collaborators.detector = Arc::new(CountingDetector(calls.detect.clone()));
        let extractor: DynExtractor = Arc::new(PipelineExtractor::new(
            collaborators,
            cfg.collaborator_timeout,
        ));

        let executor: DynExecutor = Arc::new(graph.clone());
        let state = AppState::new(cfg, executor, queries, extractor);
        Self {
            state,
            graph,
            calls,
        }
    }

    pub fn with_extractor(mut self, extractor: DynExtractor) -> Self {
        self.state.extractor = extractor;
        self
    }

    pub fn app(&self) -> Router {
        http::router().with_state(self.state.clone())
    }
}

#[allow(dead_code)]
pub fn product_store(graph: &FakeGraph) -> ProductStore {
    ProductStore::new(
        Arc::new(graph.clone()),
        load_queries(),
        Duration::from_secs(1),
    )
}

#[allow(dead_code)]
pub async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let v = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, v)
}

#[allow(dead_code)]
pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}
