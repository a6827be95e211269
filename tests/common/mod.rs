//! Shared helpers for integration tests: tool project fixtures and a mock
//! embedding endpoint.

#![allow(dead_code)]

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// Embedding endpoint stand-in answering every request with a fixed reply.
pub struct MockEmbeddingServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Value>>>,
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    body: Value,
    requests: Arc<Mutex<Vec<Value>>>,
}

async fn embeddings_handler(
    State(state): State<MockState>,
    Json(request): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.requests.lock().unwrap().push(request);
    (state.status, Json(state.body.clone()))
}

impl MockEmbeddingServer {
    pub async fn start(status: StatusCode, body: Value) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            status,
            body,
            requests: requests.clone(),
        };
        let app = Router::new()
            .route("/api/embeddings", post(embeddings_handler))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            requests,
        }
    }

    /// Server answering `{"embedding": vector}`.
    pub async fn with_vector(vector: Vec<f64>) -> Self {
        Self::start(StatusCode::OK, json!({ "embedding": vector })).await
    }

    /// JSON bodies received so far, in arrival order.
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

/// A 384-dimension vector that differs from the debug stub.
pub fn sample_vector() -> Vec<f64> {
    (0..384).map(|i| i as f64 / 1000.0).collect()
}

pub fn definition_source(id: &str, name: &str, keywords: &[&str]) -> String {
    let keywords = keywords
        .iter()
        .map(|k| format!("'{}'", k))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"export const definition = {{
  id: '{id}',
  name: '{name}',
  description: 'd',
  author: 'a',
  keywords: [{keywords}],
  configurations: {{ type: 'object', properties: {{}}, required: [] }},
  parameters: {{
    type: 'object',
    properties: {{ message: {{ type: 'string' }} }},
    required: ['message'],
  }},
  result: {{ type: 'object', properties: {{}}, required: [] }},
}};
"#
    )
}

/// Write a tool project `apps/<folder>/src/` with an entry that imports a
/// local helper and an external package.
pub fn write_tool_project(apps_dir: &Path, folder: &str, id: &str, keywords: &[&str]) -> PathBuf {
    let src = apps_dir.join(folder).join("src");
    std::fs::create_dir_all(&src).unwrap();
    std::fs::write(
        src.join("helper.ts"),
        "export function shout(s: string): string {\n  return s.toUpperCase();\n}\n",
    )
    .unwrap();
    let entry = src.join("index.ts");
    std::fs::write(
        &entry,
        format!(
            "import axios from 'axios';\nimport {{ shout }} from './helper';\n\n{}\nexport async function run(c: any, p: {{ message: string }}) {{\n  return {{ message: shout(p.message) }};\n}}\n",
            definition_source(id, &id.to_uppercase(), keywords)
        ),
    )
    .unwrap();
    entry
}
