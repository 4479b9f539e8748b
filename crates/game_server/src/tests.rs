//! End-to-end tests over real loopback sockets.

use crate::*;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpSocket, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{client_async, connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

struct TestServer {
    addr: SocketAddr,
    shutdown: ShutdownState,
    handle: JoinHandle<Result<(), ServerError>>,
}

async fn start_server(config: ServerConfig) -> TestServer {
    let server = create_server_with_config(ServerConfig {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        ..config
    });
    let listener = server.bind().await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let shutdown = ShutdownState::new();
    let handle = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { server.serve(listener, shutdown).await })
    };
    TestServer {
        addr,
        shutdown,
        handle,
    }
}

async fn connect(addr: SocketAddr) -> Client {
    let (ws, _) = connect_async(format!("ws://{addr}/ws/"))
        .await
        .expect("connect failed");
    ws
}

async fn next_message<S>(ws: &mut WebSocketStream<S>) -> Message
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let message = tokio::time::timeout(WAIT, ws.next())
            .await
            .expect("timed out waiting for a message")
            .expect("stream ended")
            .expect("websocket error");
        if !matches!(message, Message::Ping(_) | Message::Pong(_)) {
            return message;
        }
    }
}

async fn next_json<S>(ws: &mut WebSocketStream<S>) -> Value
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match next_message(ws).await {
        Message::Text(text) => serde_json::from_str(text.as_str()).expect("invalid json"),
        other => panic!("expected a text frame, got {other:?}"),
    }
}

async fn send_json(ws: &mut Client, value: Value) {
    ws.send(Message::text(value.to_string())).await.unwrap();
}

/// Connects and consumes the snapshot plus the client's own `player_added`.
async fn join(addr: SocketAddr) -> (Client, Value, u64) {
    let mut ws = connect(addr).await;
    let snapshot = next_json(&mut ws).await;
    let added = next_json(&mut ws).await;
    assert_eq!(added["type"], "player_added");
    let id = added["data"]["id"].as_u64().unwrap();
    (ws, snapshot, id)
}

fn move_to(x: i64, y: i64) -> Value {
    json!({"message": "MoveTo", "pos": {"x": x, "y": y}})
}

/// Reads until `mover`'s next `set_movement`, returning how many
/// `player_removed` events for `departed` arrived first.
async fn read_until_movement(ws: &mut Client, mover: u64, departed: u64) -> usize {
    let mut removed = 0;
    loop {
        let update = next_json(ws).await;
        match update["type"].as_str() {
            Some("set_movement") if update["data"]["id"] == mover => return removed,
            Some("player_removed") if update["data"]["id"] == departed => removed += 1,
            _ => panic!("unexpected update {update}"),
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_first_client_gets_empty_snapshot() {
    let server = start_server(ServerConfig::default()).await;
    let mut c1 = connect(server.addr).await;

    assert_eq!(next_json(&mut c1).await, json!({"players": []}));
    let added = next_json(&mut c1).await;
    assert_eq!(added["type"], "player_added");
    assert_eq!(added["data"]["pos"], json!({"x": 0, "y": 0}));
    assert_eq!(added["data"]["health"], json!({"max": 10, "current": 10}));
    assert_eq!(added["data"]["pending_turn"], Value::Null);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_move_is_broadcast_to_every_client() {
    let server = start_server(ServerConfig::default()).await;
    let (mut c1, _, id1) = join(server.addr).await;
    let (mut c2, snapshot, id2) = join(server.addr).await;

    assert_eq!(snapshot["players"].as_array().unwrap().len(), 1);
    assert_eq!(snapshot["players"][0]["id"], id1);
    let seen = next_json(&mut c1).await;
    assert_eq!(seen["type"], "player_added");
    assert_eq!(seen["data"]["id"], id2);

    send_json(&mut c1, move_to(1, 1)).await;
    let expected = json!({"type": "set_movement", "data": {"id": id1, "movement": {"x": 1, "y": 1}}});
    assert_eq!(next_json(&mut c1).await, expected);
    assert_eq!(next_json(&mut c2).await, expected);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_snapshot_lists_players_in_id_order() {
    let server = start_server(ServerConfig::default()).await;
    let (_c1, _, id1) = join(server.addr).await;
    let (_c2, _, id2) = join(server.addr).await;
    let (_c3, snapshot, _) = join(server.addr).await;

    let ids: Vec<u64> = snapshot["players"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![id1, id2]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_disconnect_publishes_player_removed() {
    let server = start_server(ServerConfig::default()).await;
    let (mut c1, _, _) = join(server.addr).await;
    let (mut c2, _, id2) = join(server.addr).await;
    next_json(&mut c1).await; // player_added for c2

    c2.close(None).await.unwrap();
    assert_eq!(
        next_json(&mut c1).await,
        json!({"type": "player_removed", "data": {"id": id2}})
    );

    // a later joiner no longer sees the departed player
    let (_c3, snapshot, _) = join(server.addr).await;
    assert_eq!(snapshot["players"].as_array().unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_moves_are_rejected_to_sender_only() {
    let server = start_server(ServerConfig::default()).await;
    let (mut c1, _, id1) = join(server.addr).await;
    let (mut c2, _, _) = join(server.addr).await;
    next_json(&mut c1).await;

    send_json(&mut c1, move_to(100, 100)).await;
    let rejected = next_json(&mut c1).await;
    assert_eq!(rejected["type"], "rejected");
    assert_eq!(rejected["data"]["kind"], "validation");

    // the connection stays usable and c2 saw nothing in between
    send_json(&mut c1, move_to(2, 2)).await;
    assert_eq!(next_json(&mut c1).await["type"], "set_movement");
    let seen = next_json(&mut c2).await;
    assert_eq!(seen["type"], "set_movement");
    assert_eq!(seen["data"]["id"], id1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_protocol_errors_keep_connection_open() {
    let server = start_server(ServerConfig {
        max_message_size: 256,
        ..ServerConfig::default()
    })
    .await;
    let (mut c1, _, _) = join(server.addr).await;

    c1.send(Message::text("{not json")).await.unwrap();
    let rejected = next_json(&mut c1).await;
    assert_eq!(rejected["data"]["kind"], "protocol");

    send_json(&mut c1, json!({"message": "Teleport"})).await;
    assert_eq!(next_json(&mut c1).await["data"]["kind"], "protocol");

    c1.send(Message::binary(vec![1u8, 2, 3])).await.unwrap();
    assert_eq!(next_json(&mut c1).await["data"]["kind"], "protocol");

    c1.send(Message::text("x".repeat(1024))).await.unwrap();
    assert_eq!(next_json(&mut c1).await["data"]["kind"], "protocol");

    send_json(&mut c1, move_to(0, 1)).await;
    assert_eq!(next_json(&mut c1).await["type"], "set_movement");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_server_full_closes_new_connections() {
    let server = start_server(ServerConfig {
        max_connections: 1,
        ..ServerConfig::default()
    })
    .await;
    let (_c1, _, _) = join(server.addr).await;

    let mut c2 = connect(server.addr).await;
    match next_message(&mut c2).await {
        Message::Close(Some(frame)) => {
            assert_eq!(frame.code, CloseCode::Again);
            assert_eq!(frame.reason.as_str(), "Server full");
        }
        other => panic!("expected a close frame, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_turn_tick_commits_pending_moves() {
    let server = start_server(ServerConfig {
        turn_interval_ms: 50,
        ..ServerConfig::default()
    })
    .await;
    let (mut c1, _, id1) = join(server.addr).await;

    send_json(&mut c1, move_to(2, 3)).await;
    assert_eq!(next_json(&mut c1).await["type"], "set_movement");
    assert_eq!(
        next_json(&mut c1).await,
        json!({"type": "player_moved", "data": {"id": id1, "pos": {"x": 2, "y": 3}}})
    );

    let (_c2, snapshot, _) = join(server.addr).await;
    assert_eq!(snapshot["players"][0]["pos"], json!({"x": 2, "y": 3}));
    assert_eq!(snapshot["players"][0]["pending_turn"], Value::Null);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_shutdown_closes_sessions() {
    let server = start_server(ServerConfig::default()).await;
    let (mut c1, _, _) = join(server.addr).await;

    server.shutdown.initiate_shutdown();
    match next_message(&mut c1).await {
        Message::Close(Some(frame)) => assert_eq!(frame.code, CloseCode::Away),
        other => panic!("expected a close frame, got {other:?}"),
    }

    let result = tokio::time::timeout(WAIT, server.handle)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
    assert!(server.shutdown.is_shutdown_complete());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_serve_refuses_queues_too_small_for_a_join() {
    for capacity in [0, 1] {
        let server = create_server_with_config(ServerConfig {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            outbound_queue_capacity: capacity,
            ..ServerConfig::default()
        });
        let listener = server.bind().await.unwrap();
        let result = tokio::time::timeout(WAIT, server.serve(listener, ShutdownState::new()))
            .await
            .expect("serve should fail immediately");
        assert!(matches!(result, Err(ServerError::Config(_))));
    }

    // the smallest accepted queue still delivers the snapshot and own player_added
    let server = start_server(ServerConfig {
        outbound_queue_capacity: 2,
        ..ServerConfig::default()
    })
    .await;
    let (mut c1, snapshot, _) = join(server.addr).await;
    assert_eq!(snapshot, json!({"players": []}));
    send_json(&mut c1, move_to(1, 0)).await;
    assert_eq!(next_json(&mut c1).await["type"], "set_movement");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stalled_client_is_disconnected() {
    let server = start_server(ServerConfig {
        outbound_queue_capacity: 8,
        ..ServerConfig::default()
    })
    .await;
    let (mut driver, _, driver_id) = join(server.addr).await;
    let (mut observer, _, observer_id) = join(server.addr).await;
    assert_eq!(next_json(&mut driver).await["data"]["id"], observer_id);

    // A small receive window makes the server's socket back up quickly once
    // this client stops reading.
    let socket = TcpSocket::new_v4().unwrap();
    socket.set_recv_buffer_size(4096).unwrap();
    let stream = socket.connect(server.addr).await.unwrap();
    let (mut stalled, _) = client_async(format!("ws://{}/ws/", server.addr), stream)
        .await
        .expect("connect failed");
    next_json(&mut stalled).await;
    let stalled_id = next_json(&mut stalled).await["data"]["id"].as_u64().unwrap();
    assert_eq!(next_json(&mut driver).await["data"]["id"], stalled_id);
    assert_eq!(next_json(&mut observer).await["data"]["id"], stalled_id);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(60);
    let mut moves: i64 = 0;
    let (mut driver_removed, mut observer_removed) = (0, 0);
    while driver_removed == 0 {
        assert!(
            tokio::time::Instant::now() < deadline,
            "stalled client was never disconnected after {moves} moves"
        );
        send_json(&mut driver, move_to(moves % 16, moves / 16 % 16)).await;
        moves += 1;
        driver_removed += read_until_movement(&mut driver, driver_id, stalled_id).await;
        observer_removed += read_until_movement(&mut observer, driver_id, stalled_id).await;
    }
    assert_eq!(observer_removed, 1);

    // healthy clients keep receiving, and the removal is never repeated
    for x in 0..3 {
        send_json(&mut driver, move_to(x, 15)).await;
        assert_eq!(read_until_movement(&mut driver, driver_id, stalled_id).await, 0);
        assert_eq!(read_until_movement(&mut observer, driver_id, stalled_id).await, 0);
    }

    // the stalled socket was closed by the server
    let closed = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match stalled.next().await {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "stalled connection was left open");

    let (_late, snapshot, _) = join(server.addr).await;
    let ids: Vec<u64> = snapshot["players"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![driver_id, observer_id]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_interleaved_moves_arrive_in_commit_order_everywhere() {
    const MOVES: i64 = 20;

    let server = start_server(ServerConfig::default()).await;
    let (mut c1, _, id1) = join(server.addr).await;
    let (mut c2, _, id2) = join(server.addr).await;
    let (mut c3, _, id3) = join(server.addr).await;
    assert_eq!(next_json(&mut c1).await["data"]["id"], id2);
    assert_eq!(next_json(&mut c1).await["data"]["id"], id3);
    assert_eq!(next_json(&mut c2).await["data"]["id"], id3);

    tokio::join!(
        async {
            for x in 0..MOVES {
                send_json(&mut c1, move_to(x % 16, 1)).await;
            }
        },
        async {
            for x in 0..MOVES {
                send_json(&mut c2, move_to(x % 16, 2)).await;
            }
        },
    );

    async fn movements(ws: &mut Client) -> Vec<Value> {
        let mut seen = Vec::new();
        for _ in 0..2 * MOVES {
            let update = next_json(ws).await;
            assert_eq!(update["type"], "set_movement");
            seen.push(update["data"].clone());
        }
        seen
    }
    let seen1 = movements(&mut c1).await;
    let seen2 = movements(&mut c2).await;
    let seen3 = movements(&mut c3).await;

    assert_eq!(seen1, seen3);
    assert_eq!(seen2, seen3);

    // each sender's own moves keep their send order within the shared order
    for (id, row) in [(id1, 1), (id2, 2)] {
        let xs: Vec<i64> = seen3
            .iter()
            .filter(|m| m["id"] == id)
            .map(|m| {
                assert_eq!(m["movement"]["y"], row);
                m["movement"]["x"].as_i64().unwrap()
            })
            .collect();
        let expected: Vec<i64> = (0..MOVES).map(|x| x % 16).collect();
        assert_eq!(xs, expected);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ping_is_answered_once() {
    let server = start_server(ServerConfig::default()).await;
    let (mut c1, _, _) = join(server.addr).await;

    c1.send(Message::Ping(b"hi".to_vec().into())).await.unwrap();
    let mut pongs = 0;
    for x in 0..2 {
        send_json(&mut c1, move_to(x, 0)).await;
        loop {
            let message = tokio::time::timeout(WAIT, c1.next())
                .await
                .expect("timed out")
                .expect("stream ended")
                .expect("websocket error");
            match message {
                Message::Pong(data) => {
                    assert_eq!(&data[..], b"hi");
                    pongs += 1;
                }
                Message::Text(text) => {
                    let update: Value = serde_json::from_str(text.as_str()).unwrap();
                    assert_eq!(update["type"], "set_movement");
                    break;
                }
                other => panic!("unexpected message {other:?}"),
            }
        }
    }
    assert_eq!(pongs, 1);
}
