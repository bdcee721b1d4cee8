//! WebSocket gateway: the per-connection protocol state machine.
//!
//! A connection moves through `Connecting -> Authenticating -> Active ->
//! Closed`. The token travels in the `Authorization` header of the upgrade
//! request; verification and the directory lookup both happen before the
//! session touches the registry, so the registry's critical sections stay
//! pure in-memory work. A connection that fails authentication is closed
//! without any diagnostic payload and never becomes observable to others.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::time::timeout;
use uuid::Uuid;

use prsnc_protocol::ClientEvent;

use crate::api::state::AppState;
use crate::auth::{AuthError, token_from_header};
use crate::directory::{DirectoryError, UserRecord};

use super::registry::{ConnectedSession, ConnectionHandle, SessionMessage};

/// `GET /ws` upgrade handler.
pub async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    headers: HeaderMap,
) -> Response {
    let token = token_from_header(&headers).map(str::to_owned);
    ws.on_upgrade(move |socket| handle_socket(state, socket, token))
}

async fn handle_socket(state: AppState, mut socket: WebSocket, token: Result<String, AuthError>) {
    let user = match authenticate(&state, token).await {
        Ok(user) => user,
        Err(err) => {
            // Fail closed: no error payload, just the close frame.
            debug!("rejecting connection: {}", err);
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    let connection_id = Uuid::new_v4().to_string();
    let (handle, mut outbound) = ConnectionHandle::channel();
    info!(
        "connection {} authenticated as user {}",
        connection_id, user.id
    );

    state
        .hub
        .admit(ConnectedSession::new(
            connection_id.clone(),
            user.id,
            user.display_name,
            handle,
        ))
        .await;

    let (mut sink, mut stream) = socket.split();

    // Drains the outbound queue into the socket. A Close item (eviction) or a
    // dropped queue ends the task after a close frame.
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            match msg {
                SessionMessage::Event(event) => {
                    let frame = match serde_json::to_string(&event) {
                        Ok(frame) => frame,
                        Err(err) => {
                            warn!("failed to encode event: {}", err);
                            continue;
                        }
                    };
                    if sink.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                SessionMessage::Close => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    let hub = state.hub.clone();
    let sender_id = connection_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = stream.next().await {
            match msg {
                Message::Text(raw) => match serde_json::from_str::<ClientEvent>(raw.as_str()) {
                    Ok(ClientEvent::ChatMessage { text }) => hub.relay(&sender_id, text).await,
                    Err(err) => debug!("ignoring malformed frame from {}: {}", sender_id, err),
                },
                Message::Close(_) => break,
                // Binary frames are not part of the protocol; pings are
                // answered by axum itself.
                _ => {}
            }
        }
    });

    // Whichever side finishes first (client close, transport error, or
    // eviction through the send task) tears the other down.
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.hub.disconnect(&connection_id).await;
    info!("connection {} closed", connection_id);
}

/// Run the authentication phase: token verification, directory lookup, and
/// the active-flag check, all bounded by the handshake timeout.
async fn authenticate(
    state: &AppState,
    token: Result<String, AuthError>,
) -> Result<UserRecord, AuthError> {
    let token = token?;

    let lookup = async {
        let claims = state.verifier.verify(&token)?;
        let user = state
            .directory
            .get_user_by_id(&claims.sub)
            .await
            .map_err(|err| match err {
                DirectoryError::NotFound => AuthError::UserNotFound,
                DirectoryError::Internal(msg) => AuthError::Internal(msg),
            })?;
        if !user.is_active {
            return Err(AuthError::UserInactive);
        }
        Ok(user)
    };

    timeout(state.handshake_timeout, lookup)
        .await
        .map_err(|_| AuthError::HandshakeTimeout)?
}
