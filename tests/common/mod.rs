//! In-process study backend for integration tests.

#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

#[derive(Default)]
pub struct Recorded {
    pub surveys: Vec<Value>,
    pub prompts: Vec<Value>,
    pub ratings: Vec<Value>,
    pub timings: Vec<Value>,
    pub completions: Vec<HashMap<String, String>>,
    pub status_checks: Vec<String>,
    /// Replies for successive status checks; "pending" once exhausted.
    pub statuses: VecDeque<String>,
    pub images: Vec<Value>,
    /// The next save answers 500 instead of recording.
    pub fail_next_save: bool,
}

pub type Shared = Arc<Mutex<Recorded>>;

pub struct FakeBackend {
    pub addr: SocketAddr,
    pub state: Shared,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let state: Shared = Arc::default();
        let app = Router::new()
            .route("/api/test", get(|| async { Json(json!({ "status": "ok" })) }))
            .route("/api/save-survey", post(save_survey))
            .route("/api/save-prompts", post(save_prompts))
            .route("/api/save-ratings", post(save_ratings))
            .route("/api/save-timing", post(save_timing))
            .route("/api/mark-completion", post(mark_completion))
            .route(
                "/api/check-generation-status/:participant_id",
                get(check_generation_status),
            )
            .route("/api/get-all-images/:participant_id", get(get_all_images))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut Recorded) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }
}

fn save_into(state: &Shared, pick: impl FnOnce(&mut Recorded) -> &mut Vec<Value>, body: Value) -> StatusCode {
    let mut recorded = state.lock().unwrap();
    if recorded.fail_next_save {
        recorded.fail_next_save = false;
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    pick(&mut recorded).push(body);
    StatusCode::OK
}

async fn save_survey(State(state): State<Shared>, Json(body): Json<Value>) -> StatusCode {
    save_into(&state, |r| &mut r.surveys, body)
}

async fn save_prompts(State(state): State<Shared>, Json(body): Json<Value>) -> StatusCode {
    save_into(&state, |r| &mut r.prompts, body)
}

async fn save_ratings(State(state): State<Shared>, Json(body): Json<Value>) -> StatusCode {
    save_into(&state, |r| &mut r.ratings, body)
}

async fn save_timing(State(state): State<Shared>, Json(body): Json<Value>) -> StatusCode {
    state.lock().unwrap().timings.push(body);
    StatusCode::OK
}

async fn mark_completion(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    state.lock().unwrap().completions.push(query);
    Json(json!({ "status": "success" }))
}

async fn check_generation_status(
    State(state): State<Shared>,
    Path(participant_id): Path<String>,
) -> Json<Value> {
    let mut recorded = state.lock().unwrap();
    recorded.status_checks.push(participant_id);
    let status = recorded
        .statuses
        .pop_front()
        .unwrap_or_else(|| "pending".to_string());
    Json(json!({ "status": status, "completedTrials": 6 }))
}

async fn get_all_images(State(state): State<Shared>, Path(_participant_id): Path<String>) -> Json<Value> {
    let images = state.lock().unwrap().images.clone();
    Json(json!({ "images": images }))
}

pub fn image(trial_index: usize, condition: &str) -> Value {
    json!({
        "imagePath": format!("/data/R7X9/images/trial_{trial_index}.png"),
        "trialIndex": trial_index,
        "theme": format!("theme {trial_index}"),
        "condition": condition,
        "prompt": format!("prompt {trial_index}"),
    })
}
