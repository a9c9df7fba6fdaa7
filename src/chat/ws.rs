use std::time::Duration;

use axum::{
    debug_handler,
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{CloseFrame, Message, WebSocket, close_code},
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use futures_util::{
    SinkExt, StreamExt,
    stream::SplitSink,
};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tracing::Instrument;

use crate::{
    AppError, AppResult, AppState,
    auth::{JwtKeys, bearer_token},
    db::Identity,
    registry::Connection,
    store::Store,
};

use super::{
    msg,
    protocol::{ClientEvent, ServerEvent},
    typing,
};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WsQuery {
    token: Option<String>,
}

/// `GET /ws`. The token is checked before the upgrade: a bad one gets a
/// plain 401 and no socket.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn chat_ws(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let token = bearer_token(&headers).or(query.token.as_deref());
    let identity = admit(&state.keys, &state.store, token).await?;

    Ok(ws
        .on_upgrade(move |socket| {
            let span = tracing::info_span!("ws", user_id = identity.id);
            run(state, identity, socket).instrument(span)
        })
        .into_response())
}

/// Resolve a credential to a known identity.
pub(crate) async fn admit(keys: &JwtKeys, store: &Store, token: Option<&str>) -> AppResult<Identity> {
    let token = token.filter(|t| !t.is_empty()).ok_or(AppError::Auth)?;
    let claims = keys.verify(token).map_err(|e| {
        tracing::debug!(error = %e, "connection refused");
        AppError::Auth
    })?;

    store.find_identity(claims.user_id).await?.ok_or_else(|| {
        tracing::debug!(user_id = claims.user_id, "token for unknown identity");
        AppError::Auth
    })
}

async fn run(state: AppState, identity: Identity, socket: WebSocket) {
    let (conn, rx) = Connection::new(identity);
    let registry = state.registry.clone();
    registry.register(&conn);

    let (sink, mut stream) = socket.split();
    let mut writer = tokio::spawn(write_loop(sink, rx, state.ping_interval, registry.subscribe_shutdown()));

    match state.store.conversation_ids_for(conn.user_id()).await {
        Ok(ids) => {
            for id in ids {
                registry.join_room(id, &conn);
            }
        }
        Err(e) => {
            conn.send(AppError::from(e).into());
        }
    }
    match state.notifier.unread_snapshot(conn.user_id()).await {
        Ok(snapshot) => {
            conn.send(snapshot);
        }
        Err(e) => {
            conn.send(e.into());
        }
    }
    tracing::info!(connection_id = %conn.id(), online = registry.online_count(), "connected");

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => handle_frame(&state, &conn, text.as_str()).await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "socket error");
                    break;
                }
            },
            _ = &mut writer => break,
        }
    }

    writer.abort();
    let _ = writer.await;
    registry.disconnect(&conn);
    tracing::info!(connection_id = %conn.id(), online = registry.online_count(), "disconnected");
}

async fn handle_frame(state: &AppState, conn: &Connection, text: &str) {
    let result = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => dispatch(state, conn, event).await,
        Err(e) => {
            tracing::debug!(error = %e, "malformed event");
            Err(AppError::InvalidInput("malformed event"))
        }
    };
    if let Err(err) = result {
        conn.send(err.into());
    }
}

async fn dispatch(state: &AppState, conn: &Connection, event: ClientEvent) -> AppResult<()> {
    match event {
        ClientEvent::SendMessage { conversation_id, content } => {
            msg::send_message(&state.store, &state.registry, conn.user_id(), conversation_id, &content).await?;
        }
        ClientEvent::Typing { conversation_id } => {
            typing::relay(&state.registry, conn, conversation_id, true);
        }
        ClientEvent::StopTyping { conversation_id } => {
            typing::relay(&state.registry, conn, conversation_id, false);
        }
        ClientEvent::MarkAsRead { conversation_id } => {
            msg::mark_read(&state.store, &state.registry, conn.user_id(), conversation_id).await?;
        }
        ClientEvent::JoinConversation { conversation_id } => {
            msg::join_conversation(&state.store, &state.registry, conn, conversation_id).await?;
        }
    }
    Ok(())
}

/// Drain the connection's queue into the socket, pinging on an interval.
/// Returns when the socket fails or the server shuts down.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<ServerEvent>,
    ping_every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ping = tokio::time::interval(ping_every.max(Duration::from_secs(1)));
    ping.tick().await;

    loop {
        let frame = tokio::select! {
            event = rx.recv() => match event {
                Some(event) => match serde_json::to_string(&event) {
                    Ok(json) => Message::Text(json.into()),
                    Err(e) => {
                        tracing::error!(error = %e, event = event.name(), "failed to encode event");
                        continue;
                    }
                },
                None => break,
            },
            _ = ping.tick() => Message::Ping(Default::default()),
            _ = shutdown.recv() => {
                let _ = sink
                    .send(Message::Close(Some(CloseFrame {
                        code: close_code::NORMAL,
                        reason: "server shutting down".into(),
                    })))
                    .await;
                break;
            }
        };

        if sink.send(frame).await.is_err() {
            break;
        }
    }
}
