mod support;

use support::{TestServer, sample_config};

#[tokio::test]
async fn when_round_is_ready_then_every_pickup_spawn_point_is_seeded() {
    let config = sample_config();
    let expected = config.session.pickup_spawn_points.len();
    let server = TestServer::start(config);

    let res = reqwest::Client::new()
        .post(format!("{}/internal/pickups", server.http_url()))
        .json(&serde_json::json!({}))
        .send()
        .await
        .expect("request should succeed");

    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.expect("json body");
    let ids = body["pickup_ids"].as_array().expect("pickup ids");
    assert_eq!(ids.len(), expected);
}

#[tokio::test]
async fn when_positions_are_given_then_only_those_pickups_are_seeded() {
    let server = TestServer::start(sample_config());
    let payload = serde_json::json!({ "positions": [[1.0, 0.5], [-1.0, 0.5]] });

    let res = reqwest::Client::new()
        .post(format!("{}/internal/pickups", server.http_url()))
        .json(&payload)
        .send()
        .await
        .expect("request should succeed");

    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.expect("json body");
    assert_eq!(body["pickup_ids"], serde_json::json!(["1", "2"]));
}
