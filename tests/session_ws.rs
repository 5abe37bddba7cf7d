mod support;

use futures_util::{SinkExt, StreamExt};
use glam::Vec2;
use serde_json::Value;
use std::time::Duration;
use support::{TestServer, sample_config};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

async fn connect(server: &TestServer) -> Client {
    let (client, _) = connect_async(server.ws_url())
        .await
        .expect("websocket handshake");
    client
}

// Read text messages until one satisfies `pred`.
async fn next_json_where(client: &mut Client, pred: impl Fn(&Value) -> bool) -> Value {
    timeout(WAIT, async {
        loop {
            let msg = client
                .next()
                .await
                .expect("stream ended")
                .expect("websocket error");
            if let Message::Text(text) = msg {
                let value: Value = serde_json::from_str(text.as_str()).expect("server sent JSON");
                if pred(&value) {
                    return value;
                }
            }
        }
    })
    .await
    .expect("expected message in time")
}

async fn next_json(client: &mut Client) -> Value {
    next_json_where(client, |_| true).await
}

fn player<'a>(update: &'a Value, id: &str) -> Option<&'a Value> {
    update["data"]["players"]
        .as_array()?
        .iter()
        .find(|p| p["id"] == id)
}

#[tokio::test]
async fn when_client_connects_then_identity_state_and_world_updates_arrive() {
    let server = TestServer::start(sample_config());
    let mut client = connect(&server).await;

    let identity = next_json(&mut client).await;
    assert_eq!(identity["type"], "Identity");
    let player_id = identity["data"]["player_id"]
        .as_str()
        .expect("player id")
        .to_string();
    assert_eq!(
        identity["data"]["display_name"],
        format!("Player_{player_id}")
    );

    let state = next_json(&mut client).await;
    assert_eq!(state["type"], "GameState");

    let update = next_json_where(&mut client, |v| {
        v["type"] == "WorldUpdate" && player(v, &player_id).is_some()
    })
    .await;
    let spawn_x = player(&update, &player_id).expect("player")["x"]
        .as_f64()
        .expect("x");

    // MoveRight only.
    client
        .send(Message::Text(r#"{"type":"Input","data":{"buttons":2}}"#.into()))
        .await
        .expect("send input");

    let moved = next_json_where(&mut client, |v| {
        v["type"] == "WorldUpdate"
            && player(v, &player_id)
                .and_then(|p| p["x"].as_f64())
                .is_some_and(|x| x > spawn_x)
    })
    .await;
    assert!(moved["data"]["tick"].as_u64().expect("tick") > 0);
}

#[tokio::test]
async fn when_session_is_full_then_next_client_is_closed_with_policy() {
    let mut config = sample_config();
    config.session.player_spawn_points = vec![Vec2::new(0.0, 0.5)];
    let server = TestServer::start(config);

    let mut first = connect(&server).await;
    assert_eq!(next_json(&mut first).await["type"], "Identity");

    let mut second = connect(&server).await;
    let frame = timeout(WAIT, async {
        loop {
            match second.next().await {
                Some(Ok(Message::Close(frame))) => return frame,
                Some(Ok(Message::Text(text))) => {
                    panic!("rejected client received {text}");
                }
                Some(Ok(_)) => continue,
                other => panic!("expected close frame, got {other:?}"),
            }
        }
    })
    .await
    .expect("close in time")
    .expect("close frame carries a reason");

    assert_eq!(frame.code, CloseCode::Policy);
    assert_eq!(frame.reason.as_str(), "session full");
}

#[tokio::test]
async fn when_last_client_leaves_then_server_shuts_down() {
    let server = TestServer::start(sample_config());
    let mut client = connect(&server).await;
    assert_eq!(next_json(&mut client).await["type"], "Identity");

    client.close(None).await.expect("close");
    drop(client);

    let exited = tokio::task::spawn_blocking(move || server.wait_for_exit(WAIT))
        .await
        .expect("join wait");
    assert!(exited, "server should stop once the session terminates");
}
