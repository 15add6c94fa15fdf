use std::sync::Arc;

use courtside_back::{
    config::AppConfig,
    dao::match_store::MemoryMatchStore,
    routes,
    services::{persistence, storage_supervisor},
    state::AppState,
};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tokio::net::TcpListener;

async fn spawn_server() -> String {
    let state = AppState::new(AppConfig::default());
    storage_supervisor::attach(&state, Arc::new(MemoryMatchStore::new())).await;
    tokio::spawn(persistence::run(state.clone()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = routes::router(state);
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });
    format!("http://{addr}")
}

async fn post(client: &Client, url: String) -> (StatusCode, Value) {
    let response = client.post(url).send().await.unwrap();
    let status = response.status();
    (status, response.json().await.unwrap_or(Value::Null))
}

#[tokio::test]
async fn golden_point_match_is_scored_over_http() {
    let base = spawn_server().await;
    let client = Client::new();

    let response = client
        .post(format!("{base}/api/matches"))
        .json(&json!({
            "name": "Club final",
            "team_a": "Ruiz/Paz",
            "team_b": "Lima/Mota",
            "stage": "Final",
            "rules": { "best_of_sets": 1, "no_advantage": true }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = response.json::<Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();
    let matches = format!("{base}/api/matches/{id}");

    let (status, snapshot) = post(&client, format!("{matches}/start")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["status"], "running");

    for side in ["A", "B", "A", "B", "A", "B"] {
        post(&client, format!("{matches}/point/{side}")).await;
    }
    let (_, snapshot) = post(&client, format!("{matches}/point/B")).await;
    assert_eq!(snapshot["sets"][0]["games_b"], 1);
    assert_eq!(snapshot["current_game"]["call_a"], "0");
    assert_eq!(snapshot["server"], "B");

    let (status, body) = post(&client, format!("{matches}/point/C")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());

    let response = client.delete(&matches).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let (status, snapshot) = post(&client, format!("{matches}/finish")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["status"], "finished");
    assert!(snapshot["ended_at"].is_string());

    let (status, _) = post(&client, format!("{matches}/point/A")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let listing: Value = client
        .get(format!("{base}/api/matches?status=finished&q=lima"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["finished"][0]["id"], id.as_str());

    let snapshot: Value = client.get(&matches).send().await.unwrap().json().await.unwrap();
    assert_eq!(snapshot["name"], "Club final");
}

#[tokio::test]
async fn invalid_rules_and_unknown_stages_are_rejected() {
    let base = spawn_server().await;
    let client = Client::new();

    for body in [
        json!({ "rules": { "best_of_sets": 2 } }),
        json!({ "rules": { "tie_break_points": 0 } }),
        json!({ "stage": "Playoffs" }),
    ] {
        let response = client
            .post(format!("{base}/api/matches"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
    }

    let response = client
        .post(format!("{base}/api/matches"))
        .json(&json!({ "rules": { "tie_break_at": "7-7" } }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn stages_and_health_are_exposed() {
    let base = spawn_server().await;
    let client = Client::new();

    let stages: Value = client
        .get(format!("{base}/api/meta/stages"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stages["default_stage"], "Friendly");
    assert!(
        stages["stages"]
            .as_array()
            .unwrap()
            .iter()
            .any(|stage| stage == "Semi-final")
    );

    let health: Value = client
        .get(format!("{base}/healthcheck"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["active_matches"], 0);
}
