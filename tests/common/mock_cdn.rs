//! Mock CDN invalidation API
//!
//! Records every invalidation request it receives and answers like the real
//! API, or with a configured error status.

use super::constants::*;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// One request observed by the mock.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub distribution_id: String,
    pub body: Value,
}

impl RecordedRequest {
    /// Paths listed in the request, in the order sent.
    pub fn items(&self) -> Vec<String> {
        self.body["invalidation_batch"]["paths"]["items"]
            .as_array()
            .expect("items should be an array")
            .iter()
            .map(|v| v.as_str().expect("item should be a string").to_string())
            .collect()
    }

    pub fn quantity(&self) -> u64 {
        self.body["invalidation_batch"]["paths"]["quantity"]
            .as_u64()
            .expect("quantity should be a number")
    }

    pub fn caller_reference(&self) -> String {
        self.body["invalidation_batch"]["caller_reference"]
            .as_str()
            .expect("caller_reference should be a string")
            .to_string()
    }
}

#[derive(Clone, Default)]
struct MockState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    fail_with: Arc<Mutex<Option<StatusCode>>>,
}

async fn create_invalidation(
    State(state): State<MockState>,
    Path(distribution_id): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let request_number = {
        let mut requests = state.requests.lock().unwrap();
        requests.push(RecordedRequest {
            distribution_id,
            body,
        });
        requests.len()
    };

    if let Some(status) = *state.fail_with.lock().unwrap() {
        return (status, Json(json!({ "error": "mock CDN failure" })));
    }

    (
        StatusCode::CREATED,
        Json(json!({ "id": format!("I{}", request_number), "status": "InProgress" })),
    )
}

/// Mock CDN instance listening on a random local port
///
/// When dropped, the server shuts down.
pub struct MockCdn {
    /// Base URL to configure the backend with (includes the API prefix)
    pub base_url: String,

    state: MockState,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MockCdn {
    /// Spawns a new mock CDN on a random port
    pub async fn spawn() -> Self {
        let state = MockState::default();

        let app = Router::new()
            .route(
                &format!("{}/distributions/{{id}}/invalidations", API_PREFIX),
                post(create_invalidation),
            )
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Mock CDN failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}{}", port, API_PREFIX),
            state,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Make every following request fail with `status`.
    pub fn fail_with(&self, status: StatusCode) {
        *self.state.fail_with.lock().unwrap() = Some(status);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Waits until at least `count` requests were received
    ///
    /// # Panics
    ///
    /// Panics if they don't arrive within `REQUEST_WAIT_TIMEOUT_MS`.
    pub async fn wait_for_requests(&self, count: usize) -> Vec<RecordedRequest> {
        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(REQUEST_WAIT_TIMEOUT_MS);

        loop {
            let requests = self.requests();
            if requests.len() >= count {
                return requests;
            }
            if start.elapsed() > timeout {
                panic!(
                    "Mock CDN received {} requests, expected {} within {}ms",
                    requests.len(),
                    count,
                    REQUEST_WAIT_TIMEOUT_MS
                );
            }
            tokio::time::sleep(Duration::from_millis(REQUEST_POLL_INTERVAL_MS)).await;
        }
    }
}
