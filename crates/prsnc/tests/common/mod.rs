//! Shared test harness: a gateway on an ephemeral port plus token and
//! WebSocket client helpers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use futures::StreamExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use prsnc::api::{AppState, build_router};
use prsnc::auth::{Claims, TokenVerifier};
use prsnc::config::DirectoryUser;
use prsnc::directory::StaticDirectory;
use prsnc_protocol::ServerEvent;

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn test_users() -> Vec<DirectoryUser> {
    vec![
        DirectoryUser {
            id: "u1".to_string(),
            display_name: "Alice".to_string(),
            is_active: true,
        },
        DirectoryUser {
            id: "u2".to_string(),
            display_name: "Bob".to_string(),
            is_active: true,
        },
        DirectoryUser {
            id: "u3".to_string(),
            display_name: "Carol".to_string(),
            is_active: false,
        },
    ]
}

/// Router over the standard test directory, for in-process `oneshot` tests.
pub fn test_router() -> Router {
    let state = AppState::new(
        TokenVerifier::new(TEST_SECRET),
        Arc::new(StaticDirectory::new(&test_users())),
        Duration::from_secs(5),
    );
    build_router(state, &[])
}

/// Serve the gateway on an ephemeral port; returns its address.
pub async fn spawn_gateway() -> SocketAddr {
    let app = test_router();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Mint an HS256 session token for `subject`.
pub fn token_for(subject: &str, ttl_secs: i64) -> String {
    encode(
        &Header::default(),
        &Claims::for_subject(subject, ttl_secs),
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap()
}

/// Open a WebSocket to the gateway with the token in the handshake headers.
pub async fn connect(addr: SocketAddr, token: &str) -> WsClient {
    let mut request = format!("ws://{addr}/ws").into_client_request().unwrap();
    request
        .headers_mut()
        .insert(AUTHORIZATION, token.parse().unwrap());
    let (ws, _) = connect_async(request).await.unwrap();
    ws
}

/// Next decoded server event, or `None` once the connection closes.
pub async fn next_event(ws: &mut WsClient) -> Option<ServerEvent> {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a server event")?
            .ok()?;
        match msg {
            Message::Text(text) => return serde_json::from_str(text.as_str()).ok(),
            Message::Close(_) => return None,
            _ => continue,
        }
    }
}

/// Next presence announcement, skipping everything else.
pub async fn next_presence(ws: &mut WsClient) -> Option<Vec<String>> {
    loop {
        match next_event(ws).await? {
            ServerEvent::PresenceUpdated { connection_ids } => return Some(connection_ids),
            _ => continue,
        }
    }
}

/// Next chat envelope, skipping presence announcements.
pub async fn next_chat(ws: &mut WsClient) -> Option<(String, String)> {
    loop {
        match next_event(ws).await? {
            ServerEvent::ChatMessage { display_name, text } => return Some((display_name, text)),
            _ => continue,
        }
    }
}
