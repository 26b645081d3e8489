//! Drives the chat socket over a real connection: serve the router on an
//! ephemeral port, sign a user in through the session layer, then speak the
//! wire protocol with a plain websocket client and watch the event sequence.

use std::time::Duration;

use axum::{extract::Path, routing::get, Router};
use futures_util::{SinkExt, StreamExt};
use spothub::{
    auth,
    config::CapacityPolicy,
    db::{self, SpotKind},
    notify::ChangeHub,
    session::USER_ID,
    spots::{
        self,
        repo::{self, SpotDraft},
    },
    AppState,
};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, http::header, Message},
    MaybeTlsStream, WebSocketStream,
};
use tower_sessions::{cookie::SameSite, MemoryStore, Session, SessionManagerLayer};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// test-only shortcut past the oauth dance: whoever you name is signed in
async fn login_as(Path(user_id): Path<String>, session: Session) -> &'static str {
    session.insert(USER_ID, user_id).await.unwrap();
    "ok"
}

async fn serve() -> (std::net::SocketAddr, AppState) {
    let db_pool = db::connect("sqlite::memory:").await.unwrap();
    db::migrate(&db_pool).await.unwrap();

    let state = AppState {
        db_pool,
        clients: auth::Clients::default(),
        changes: ChangeHub::new(64),
        capacity_policy: CapacityPolicy::Advisory,
    };

    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_same_site(SameSite::Lax);

    let app = Router::new()
        .route("/login-as/{user_id}", get(login_as))
        .nest("/s", spots::router())
        .with_state(state.clone())
        .layer(session_layer);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state)
}

async fn session_cookie(addr: std::net::SocketAddr, user_id: &str) -> String {
    let resp = reqwest::get(format!("http://{addr}/login-as/{user_id}"))
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let set_cookie = resp
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .expect("login set no session cookie")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_owned()
}

async fn connect(addr: std::net::SocketAddr, spot_id: &str, cookie: &str) -> WsStream {
    let mut request = format!("ws://{addr}/s/{spot_id}/ws")
        .into_client_request()
        .unwrap();
    request
        .headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    let (ws, _) = connect_async(request).await.expect("upgrade refused");
    ws
}

async fn send_json(ws: &mut WsStream, event: serde_json::Value) {
    ws.send(Message::text(event.to_string())).await.unwrap();
}

async fn recv_event(ws: &mut WsStream) -> serde_json::Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("no event within two seconds")
            .expect("socket closed early")
            .expect("socket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

fn history_contents(event: &serde_json::Value) -> Vec<String> {
    assert_eq!(event["kind"], "history");
    event["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap().to_owned())
        .collect()
}

#[tokio::test]
async fn socket_walks_a_non_member_through_join_and_chat() {
    let (addr, state) = serve().await;
    auth::ensure_profile(&state.db_pool, "alice", Some("Alice")).await.unwrap();
    auth::ensure_profile(&state.db_pool, "bob", Some("Bob")).await.unwrap();

    let spot = repo::create_spot(
        &state.db_pool,
        &state.changes,
        "alice",
        SpotDraft {
            name: "Study Hall".into(),
            description: String::new(),
            location: "Building A".into(),
            is_online: false,
            category: "General".into(),
            kind: SpotKind::Study,
            capacity: 10,
            amenities: vec![],
        },
    )
    .await
    .unwrap();
    repo::send_message(&state.db_pool, &state.changes, "alice", &spot.id, "welcome")
        .await
        .unwrap();

    let cookie = session_cookie(addr, "bob").await;
    let mut ws = connect(addr, &spot.id, &cookie).await;

    // a non-member gets no history on connect; his premature send is the
    // first thing answered, with an error
    send_json(&mut ws, serde_json::json!({ "kind": "send", "content": "too early" })).await;
    let event = recv_event(&mut ws).await;
    assert_eq!(event["kind"], "error");

    // joining flips the view to member: a joined ack, then the history
    send_json(&mut ws, serde_json::json!({ "kind": "join" })).await;
    assert_eq!(recv_event(&mut ws).await["kind"], "joined");
    assert_eq!(history_contents(&recv_event(&mut ws).await), ["welcome"]);

    // his own send comes back through the change feed as a fresh history
    send_json(&mut ws, serde_json::json!({ "kind": "send", "content": "Hi" })).await;
    assert_eq!(history_contents(&recv_event(&mut ws).await), ["welcome", "Hi"]);

    // so does anyone else's
    repo::send_message(&state.db_pool, &state.changes, "alice", &spot.id, "glad you made it")
        .await
        .unwrap();
    assert_eq!(
        history_contents(&recv_event(&mut ws).await),
        ["welcome", "Hi", "glad you made it"]
    );
}

#[tokio::test]
async fn socket_requires_a_signed_in_user() {
    let (addr, state) = serve().await;
    let spot = repo::create_spot(
        &state.db_pool,
        &state.changes,
        "alice",
        SpotDraft {
            name: "Members Only".into(),
            description: String::new(),
            location: "Building B".into(),
            is_online: false,
            category: "General".into(),
            kind: SpotKind::Study,
            capacity: 10,
            amenities: vec![],
        },
    )
    .await
    .unwrap();

    let request = format!("ws://{addr}/s/{}/ws", spot.id)
        .into_client_request()
        .unwrap();
    assert!(connect_async(request).await.is_err());
}
