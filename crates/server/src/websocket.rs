//! WebSocket entry point (§6): the speaker/listener roles share one socket
//! type, the role decided by the first inbound action (teacher's
//! `WebSocketHandler` shape, generalized to this system's action set).

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use futures::{SinkExt, StreamExt};
use relay_core::{CoreError, Role};
use relay_pipeline::HeartbeatSignal;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use crate::error::ServerError;
use crate::protocol::{ClientMessage, ControlCommand, ServerMessage};
use crate::state::AppState;

type WsSink = Arc<AsyncMutex<futures::stream::SplitSink<WebSocket, Message>>>;

struct ConnState {
    session_id: String,
    connection_id: String,
    role: Role,
}

pub struct WebSocketHandler;

impl WebSocketHandler {
    pub async fn handle(
        ws: WebSocketUpgrade,
        State(state): State<AppState>,
        Path(session_id): Path<String>,
    ) -> Result<Response, axum::http::StatusCode> {
        Ok(ws.on_upgrade(move |socket| Self::handle_socket(socket, state, session_id)))
    }

    async fn handle_socket(socket: WebSocket, state: AppState, _path_session_id: String) {
        let (sink, mut stream) = socket.split();
        let sink: WsSink = Arc::new(AsyncMutex::new(sink));

        let mut conn: Option<ConnState> = None;

        while let Some(msg) = stream.next().await {
            let msg = match msg {
                Ok(m) => m,
                Err(err) => {
                    tracing::warn!(error = %err, "websocket receive error");
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    let parsed: Result<ClientMessage, _> = serde_json::from_str(&text);
                    match parsed {
                        Ok(client_msg) => {
                            if let Some(reason) = dispatch(&state, &sink, &mut conn, client_msg).await
                            {
                                tracing::info!(reason, "closing connection");
                                break;
                            }
                        }
                        Err(err) => {
                            send_error(&sink, &ServerError::InvalidAction(err.to_string())).await;
                        }
                    }
                }
                Message::Ping(data) => {
                    let mut s = sink.lock().await;
                    let _ = s.send(Message::Pong(data)).await;
                }
                Message::Pong(_) | Message::Binary(_) => {}
                Message::Close(_) => break,
            }
        }

        if let Some(conn) = conn {
            state.transport.unregister(&conn.connection_id);
            match conn.role {
                Role::Speaker => {
                    state.sessions.mark_inactive(&conn.session_id).await;
                    state.end_session(&conn.session_id);
                }
                Role::Listener => {
                    state.sessions.decrement_listener_count(&conn.session_id).await;
                }
            }
            state.connections.delete_connection(&conn.connection_id).await;
        }

        tracing::info!("websocket connection closed");
    }
}

/// Dispatches one inbound frame, driving `conn` through its role/session
/// lifecycle and writing any resulting frames back to `sink`. Returns
/// `Some(reason)` if the socket should close.
async fn dispatch(
    state: &AppState,
    sink: &WsSink,
    conn: &mut Option<ConnState>,
    message: ClientMessage,
) -> Option<String> {
    match message {
        ClientMessage::CreateSession {
            source_language,
            quality_tier,
            partial_results,
            min_stability,
            max_buffer_timeout,
        } => {
            if conn.is_some() {
                send_error(sink, &ServerError::InvalidAction("session already established".into())).await;
                return None;
            }
            match state
                .create_session(source_language.clone(), quality_tier, partial_results, min_stability, max_buffer_timeout)
                .await
            {
                Ok((session, connection_id)) => {
                    register_transport(state, sink.clone(), &connection_id);
                    *conn = Some(ConnState {
                        session_id: session.session_id.clone(),
                        connection_id,
                        role: Role::Speaker,
                    });
                    crate::metrics::record_session_created();
                    send(
                        sink,
                        &ServerMessage::SessionCreated {
                            session_id: session.session_id,
                            source_language,
                            expires_at_secs: session.expires_at_secs,
                        },
                    )
                    .await;
                }
                Err(err) => send_error(sink, &err).await,
            }
            None
        }

        ClientMessage::JoinSession { session_id, target_language } => {
            if conn.is_some() {
                send_error(sink, &ServerError::InvalidAction("session already established".into())).await;
                return None;
            }
            match state.join_session(&session_id, &target_language).await {
                Ok((session, connection_id, listener_count)) => {
                    register_transport(state, sink.clone(), &connection_id);
                    *conn = Some(ConnState {
                        session_id: session.session_id.clone(),
                        connection_id,
                        role: Role::Listener,
                    });
                    crate::metrics::record_listener_joined();
                    send(
                        sink,
                        &ServerMessage::SessionJoined { session_id: session.session_id, target_language, listener_count },
                    )
                    .await;
                }
                Err(err) => send_error(sink, &err).await,
            }
            None
        }

        ClientMessage::SendAudio { data } => {
            let Some(c) = require_role(sink, conn, Role::Speaker, "sendAudio").await else {
                return None;
            };
            match BASE64.decode(&data) {
                Ok(bytes) => {
                    if let Err(err) = state.submit_audio(&c.session_id, &bytes).await {
                        send_error(sink, &err).await;
                    }
                }
                Err(err) => {
                    send_error(sink, &ServerError::Core(CoreError::Validation(format!("invalid base64 audio: {err}")))).await;
                }
            }
            None
        }

        ClientMessage::Heartbeat => {
            let Some(c) = conn.as_ref() else {
                send_error(sink, &ServerError::UnauthorizedAction("heartbeat requires an active session".into())).await;
                return None;
            };
            let signals = state.heartbeat.handle_heartbeat(&c.connection_id, relay_core::now_ms()).await;
            for signal in signals {
                let out = match signal {
                    HeartbeatSignal::Ack => ServerMessage::HeartbeatAck,
                    HeartbeatSignal::RefreshRequired { .. } => ServerMessage::ConnectionRefreshRequired,
                    HeartbeatSignal::Warning { remaining_minutes } => {
                        ServerMessage::ConnectionWarning { remaining_minutes }
                    }
                };
                send(sink, &out).await;
            }
            None
        }

        ClientMessage::ControlSession { command } => {
            let Some(c) = require_role(sink, conn, Role::Speaker, "controlSession").await else {
                return None;
            };
            let pause = matches!(command, ControlCommand::Pause);
            match state.control_session(&c.session_id, pause).await {
                Ok(listener_ids) => {
                    let notice = if pause { ServerMessage::SessionPaused } else { ServerMessage::SessionResumed };
                    let payload = notice.to_json();
                    for listener_id in listener_ids {
                        state.transport.send_json(&listener_id, payload.clone());
                    }
                    send(sink, &notice).await;
                }
                Err(err) => send_error(sink, &err).await,
            }
            None
        }

        ClientMessage::GetSessionStatus => {
            let Some(c) = require_role(sink, conn, Role::Speaker, "getSessionStatus").await else {
                return None;
            };
            match state.session_status(&c.session_id).await {
                Ok(status) => {
                    send(
                        sink,
                        &ServerMessage::SessionStatus {
                            listener_count: status.listener_count,
                            language_distribution: status.language_distribution,
                            session_duration_secs: status.session_duration_secs,
                            broadcast_state: status.broadcast_state,
                            timestamp_ms: status.timestamp_ms,
                        },
                    )
                    .await;
                }
                Err(err) => send_error(sink, &err).await,
            }
            None
        }

        ClientMessage::ChangeLanguage { target_language } => {
            let Some(c) = require_role(sink, conn, Role::Listener, "changeLanguage").await else {
                return None;
            };
            if let Err(err) = state.change_language(&c.connection_id, &target_language).await {
                send_error(sink, &err).await;
            }
            None
        }
    }
}

/// Validates `conn` exists and holds `expected` role; emits `UNAUTHORIZED_ACTION`
/// and returns `None` otherwise.
async fn require_role<'a>(
    sink: &WsSink,
    conn: &'a Option<ConnState>,
    expected: Role,
    action: &str,
) -> Option<&'a ConnState> {
    match conn {
        Some(c) if c.role == expected => Some(c),
        Some(_) => {
            send_error(sink, &ServerError::UnauthorizedAction(format!("{action} requires the other role"))).await;
            None
        }
        None => {
            send_error(sink, &ServerError::UnauthorizedAction(format!("{action} requires an active session"))).await;
            None
        }
    }
}

/// Registers a bridging task that forwards `Transport`-originated frames for
/// `connection_id` onto this socket's outbound sink. Frames arrive
/// pre-formatted (`audioData` JSON from `send_to`, control notices from
/// `send_json`) so this task only relays them.
fn register_transport(state: &AppState, sink: WsSink, connection_id: &str) {
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    state.transport.register(connection_id.to_string(), tx);

    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let mut s = sink.lock().await;
            if s.send(message).await.is_err() {
                break;
            }
        }
    });
}

async fn send(sink: &WsSink, message: &ServerMessage) {
    let mut s = sink.lock().await;
    let _ = s.send(Message::Text(message.to_json())).await;
}

async fn send_error(sink: &WsSink, err: &ServerError) {
    send(sink, &ServerMessage::from_error(err)).await;
}
