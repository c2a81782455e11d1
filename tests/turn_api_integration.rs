//! Integration tests for the run API.
//!
//! Each test spins up an Axum server on a random port and drives the real
//! HTTP contract with reqwest.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use neta_assist::api::{AppState, TurnService, api_routes};
use neta_assist::discovery::AccountLookup;
use neta_assist::error::LookupError;
use neta_assist::store::{InMemorySessionStore, LibSqlSessionStore, SessionStore};
use neta_assist::workflow::{Collaborators, DiscoveredAccount, HandlerSet, Orchestrator};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Lookup that never answers in time.
struct StalledLookup;

#[async_trait]
impl AccountLookup for StalledLookup {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn lookup(&self, _subject: &str) -> Result<Vec<DiscoveredAccount>, LookupError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Vec::new())
    }
}

/// Start an Axum server on a random port, return its base URL.
async fn start_server(store: Arc<dyn SessionStore>, collaborators: Collaborators) -> String {
    let orchestrator = Orchestrator::new(HandlerSet::standard(&collaborators));
    let app = api_routes(AppState {
        service: Arc::new(TurnService::new(store, orchestrator)),
        assistant_id: "neta-social-assistant".to_string(),
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("http://127.0.0.1:{port}")
}

async fn post(client: &reqwest::Client, url: &str, body: Value) -> Value {
    let response = client.post(url).json(&body).send().await.unwrap();
    assert!(response.status().is_success(), "POST {url}: {}", response.status());
    response.json().await.unwrap()
}

fn messages(response: &Value) -> &Vec<Value> {
    response["output"]["message_log"].as_array().unwrap()
}

#[tokio::test]
async fn full_conversation_over_http() {
    timeout(TEST_TIMEOUT, async {
        let base = start_server(Arc::new(InMemorySessionStore::new()), Collaborators::default()).await;
        let client = reqwest::Client::new();
        let runs = format!("{base}/threads/pizza/runs");

        let greeting = post(&client, &runs, json!({})).await;
        assert_eq!(greeting["session_id"], "pizza");
        assert_eq!(greeting["output"]["current_step"], "greeting");
        assert_eq!(greeting["output"]["pending_actions"][0]["id"], "provide_business_name");

        let discovery = post(&client, &runs, json!({"message": "Mike's Pizza"})).await;
        assert_eq!(discovery["output"]["current_step"], "social_discovery");
        assert_eq!(discovery["output"]["subject_name"], "Mike's Pizza");
        assert_eq!(
            discovery["output"]["discovered_resources"][0]["name"],
            "Mike's Pizza Official"
        );

        let analysis = post(&client, &runs, json!({"action_id": "analyze_accounts"})).await;
        assert_eq!(analysis["output"]["current_step"], "content_analysis");
        assert_eq!(analysis["output"]["data_bag"]["content_analysis_source"], "fallback");

        let creation = post(&client, &runs, json!({"action_id": "approve_strategy"})).await;
        assert_eq!(creation["output"]["current_step"], "content_creation");
        assert_eq!(
            creation["output"]["data_bag"]["content_creation_drafts"]
                .as_array()
                .unwrap()
                .len(),
            2
        );

        let done = post(&client, &runs, json!({"action_id": "approve_all"})).await;
        assert_eq!(done["output"]["current_step"], "terminal");
        assert!(done["output"]["pending_actions"].as_array().unwrap().is_empty());
        assert_eq!(
            done["output"]["data_bag"]["completion_schedule"][1]["time"],
            "2:05 PM"
        );

        // The log only ever grows, and earlier entries never change.
        let turns = [&greeting, &discovery, &analysis, &creation, &done];
        for pair in turns.windows(2) {
            let (before, after) = (messages(pair[0]), messages(pair[1]));
            assert!(after.len() > before.len());
            assert_eq!(&after[..before.len()], &before[..]);
        }

        // A finished conversation stays finished.
        let again = post(&client, &runs, json!({})).await;
        assert_eq!(messages(&again), messages(&done));

        let state: Value = client
            .get(format!("{base}/threads/pizza/state"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(state["current_step"], "terminal");
        assert_eq!(state["subject_name"], "Mike's Pizza");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn resubmitting_output_verbatim_stays_in_one_session() {
    timeout(TEST_TIMEOUT, async {
        let store = Arc::new(InMemorySessionStore::new());
        let base = start_server(store.clone(), Collaborators::default()).await;
        let client = reqwest::Client::new();
        let url = format!("{base}/runs");

        let first = post(
            &client,
            &url,
            json!({"input": {"business_name": "Mike's Pizza", "current_step": "greeting"}}),
        )
        .await;
        assert_eq!(first["output"]["data_bag"]["social_discovery_completed"], true);
        assert_eq!(first["output"]["session_id"], first["session_id"]);

        let mut latest = first.clone();
        for _ in 0..3 {
            latest = post(&client, &url, json!({"input": latest["output"]})).await;
            assert_eq!(latest["session_id"], first["session_id"]);
            assert_eq!(latest["output"], first["output"]);
        }

        assert_eq!(store.count().await.unwrap(), 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn snapshot_for_another_thread_is_rejected() {
    timeout(TEST_TIMEOUT, async {
        let base = start_server(Arc::new(InMemorySessionStore::new()), Collaborators::default()).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{base}/threads/t1/runs"))
            .json(&json!({"input": {"session_id": "X", "subject_name": "Acme"}}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        let missing = client
            .get(format!("{base}/threads/X/state"))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn stalled_lookup_falls_back_within_timeout() {
    timeout(TEST_TIMEOUT, async {
        let collaborators = Collaborators::default()
            .with_lookup(Arc::new(StalledLookup))
            .with_timeout(Duration::from_millis(100));
        let base = start_server(Arc::new(InMemorySessionStore::new()), collaborators).await;
        let client = reqwest::Client::new();

        let out = post(
            &client,
            &format!("{base}/threads/slow/runs"),
            json!({"input": {"subject_name": "Corner Cafe"}}),
        )
        .await;

        assert_eq!(out["output"]["current_step"], "social_discovery");
        assert_eq!(out["output"]["data_bag"]["social_discovery_source"], "fallback");
        assert_eq!(out["output"]["discovered_resources"][1]["name"], "@cornercafe");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn unknown_step_is_echoed_back() {
    timeout(TEST_TIMEOUT, async {
        let base = start_server(Arc::new(InMemorySessionStore::new()), Collaborators::default()).await;
        let client = reqwest::Client::new();

        let out = post(
            &client,
            &format!("{base}/threads/odd/runs"),
            json!({"input": {"subject_name": "Acme", "current_step": "not_a_real_step"}}),
        )
        .await;

        assert_eq!(out["output"]["current_step"], "not_a_real_step");
        assert!(messages(&out).is_empty());
        assert!(out["output"]["pending_actions"].as_array().unwrap().is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn sessions_persist_in_libsql() {
    timeout(TEST_TIMEOUT, async {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        let store = Arc::new(LibSqlSessionStore::new_local(&path).await.unwrap());
        let base = start_server(store, Collaborators::default()).await;
        let client = reqwest::Client::new();

        post(
            &client,
            &format!("{base}/threads/persisted/runs"),
            json!({"message": "Corner Cafe"}),
        )
        .await;

        let reopened = LibSqlSessionStore::new_local(&path).await.unwrap();
        let stored = reopened.load("persisted").await.unwrap().unwrap();
        assert_eq!(stored.subject_name(), "Corner Cafe");
        assert_eq!(stored.current_step.as_str(), "social_discovery");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn bad_body_and_missing_thread() {
    timeout(TEST_TIMEOUT, async {
        let base = start_server(Arc::new(InMemorySessionStore::new()), Collaborators::default()).await;
        let client = reqwest::Client::new();

        let bad = client
            .post(format!("{base}/runs"))
            .header("content-type", "application/json")
            .body("{\"input\": 42}")
            .send()
            .await
            .unwrap();
        assert_eq!(bad.status(), reqwest::StatusCode::BAD_REQUEST);

        let missing = client
            .get(format!("{base}/threads/ghost/state"))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

        let health: Value = client
            .get(format!("{base}/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "healthy");
    })
    .await
    .expect("test timed out");
}
