//! WebSocket surface: authenticated session actor, room join/leave, the
//! send/typing protocol.

use actix::{
    Actor, ActorContext, ActorFutureExt, AsyncContext, Handler, Message as ActixMessage,
    StreamHandler,
};
use actix_web::{get, web, Error, HttpRequest, HttpResponse, ResponseError};
use actix_web_actors::ws;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::{bearer_token, verify_jwt};
use crate::services::MessageService;
use crate::state::AppState;
use crate::websocket::events::{ClientEvent, ServerEvent, PROTOCOL_VERSION};
use crate::websocket::{ConnectionId, RoomRegistry};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

// Outbound text scheduled onto the session actor (fan-out deliveries and
// replies produced off-actor).
#[derive(ActixMessage)]
#[rtype(result = "()")]
struct Outbound(String);

/// One actor per live connection. The connection starts room-agnostic and
/// joins any number of rooms over its life; all room state lives in the
/// shared [`RoomRegistry`], keyed by this session's `ConnectionId`.
pub struct WsSession {
    conn_id: ConnectionId,
    user_id: Uuid,
    state: AppState,
    hb: Instant,
    /// Sender registered into rooms on join; everything sent here reaches
    /// the socket via the mailbox bridge.
    outbox: UnboundedSender<String>,
    mailbox: Option<UnboundedReceiver<String>>,
}

impl WsSession {
    fn new(user_id: Uuid, state: AppState) -> Self {
        let (outbox, mailbox) = unbounded_channel();
        Self {
            conn_id: ConnectionId::new(),
            user_id,
            state,
            hb: Instant::now(),
            outbox,
            mailbox: Some(mailbox),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                tracing::warn!(user_id = %act.user_id, "websocket heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(user_id = %self.user_id, "websocket session started");

        ctx.text(
            ServerEvent::Connected {
                protocol: PROTOCOL_VERSION,
                user_id: self.user_id,
            }
            .to_json(),
        );

        self.hb(ctx);

        // Bridge room fan-out into the socket.
        if let Some(mut mailbox) = self.mailbox.take() {
            let addr = ctx.address();
            actix::spawn(async move {
                while let Some(payload) = mailbox.recv().await {
                    addr.do_send(Outbound(payload));
                }
            });
        }
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(user_id = %self.user_id, "websocket session stopped");

        // Leave every room this connection joined.
        let registry = self.state.registry.clone();
        let conn_id = self.conn_id;
        actix::spawn(async move {
            registry.disconnect(conn_id).await;
        });
    }
}

impl Handler<Outbound> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: Outbound, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => {
                    let state = self.state.clone();
                    let conn_id = self.conn_id;
                    let user_id = self.user_id;
                    let outbox = self.outbox.clone();

                    // Processed under ctx.wait so one connection's events
                    // are handled strictly in arrival order.
                    let fut = actix::fut::wrap_future::<_, Self>(handle_client_event(
                        state, conn_id, user_id, outbox, event,
                    ))
                    .map(|replies, _act, ctx| {
                        for reply in replies {
                            ctx.text(reply);
                        }
                    });
                    ctx.wait(fut);
                }
                Err(e) => {
                    let err = AppError::Validation(format!("malformed event: {e}"));
                    ctx.text(ServerEvent::from_error(&err).to_json());
                }
            },
            Ok(ws::Message::Binary(_)) => {
                let err = AppError::Validation("binary frames are not supported".into());
                ctx.text(ServerEvent::from_error(&err).to_json());
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::debug!(?reason, "websocket close received");
                ctx.stop();
            }
            Err(e) => {
                tracing::warn!(error = %e, "websocket protocol error");
                ctx.stop();
            }
            _ => {}
        }
    }
}

/// Handle one client event. Returns the serialized events owed to the
/// originating connection; fan-out to other room members happens through
/// the registry. Failures are terminal for this event only; they never
/// take down the connection or other rooms.
async fn handle_client_event(
    state: AppState,
    conn_id: ConnectionId,
    user_id: Uuid,
    outbox: UnboundedSender<String>,
    event: ClientEvent,
) -> Vec<String> {
    match event {
        ClientEvent::Join { chat_id } => {
            // Participation is re-checked here, not trusted from any prior
            // step: membership-bearing requests can arrive at any point in
            // the connection's life.
            match crate::services::ChatService::require_participant(&state.db, chat_id, user_id)
                .await
            {
                Ok(_) => {
                    state.registry.join(chat_id, conn_id, user_id, outbox).await;
                    vec![ServerEvent::Joined { chat_id }.to_json()]
                }
                Err(err) => {
                    tracing::debug!(%chat_id, %user_id, error = %err, "join rejected");
                    vec![ServerEvent::from_error(&err).to_json()]
                }
            }
        }

        ClientEvent::Leave { chat_id } => {
            state.registry.leave(chat_id, conn_id).await;
            Vec::new()
        }

        ClientEvent::Send { chat_id, content } => {
            send_message(&state, conn_id, user_id, chat_id, &content).await
        }

        ClientEvent::Typing { chat_id } => {
            typing_broadcast(&state.registry, chat_id, conn_id, ServerEvent::UserTyping {
                chat_id,
                user_id,
            })
            .await;
            Vec::new()
        }

        ClientEvent::StopTyping { chat_id } => {
            typing_broadcast(&state.registry, chat_id, conn_id, ServerEvent::UserStopTyping {
                chat_id,
                user_id,
            })
            .await;
            Vec::new()
        }
    }
}

/// Persist-then-broadcast under the chat's send lock, so broadcast order
/// matches persistence order for the room. The sender receives an ack with
/// the persisted message instead of an echo.
async fn send_message(
    state: &AppState,
    conn_id: ConnectionId,
    user_id: Uuid,
    chat_id: Uuid,
    content: &str,
) -> Vec<String> {
    let lock = state.registry.send_lock(chat_id).await;
    let _guard = lock.lock().await;

    match MessageService::record_message(&state.db, chat_id, user_id, content).await {
        Ok(message) => {
            let push = ServerEvent::Message {
                message: message.clone(),
            }
            .to_json();
            state.registry.broadcast_except(chat_id, conn_id, push).await;
            vec![ServerEvent::MessageAck { message }.to_json()]
        }
        Err(err) => {
            tracing::debug!(%chat_id, %user_id, error = %err, "send rejected");
            vec![ServerEvent::from_error(&err).to_json()]
        }
    }
}

/// Typing indicators are fire-and-forget: routed purely by live room
/// membership, never persisted, and failures are not surfaced.
async fn typing_broadcast(
    registry: &RoomRegistry,
    chat_id: Uuid,
    conn_id: ConnectionId,
    event: ServerEvent,
) {
    if registry.is_joined(chat_id, conn_id).await {
        registry.broadcast_except(chat_id, conn_id, event.to_json()).await;
    }
}

#[get("/ws")]
pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
    query: web::Query<WsParams>,
) -> Result<HttpResponse, Error> {
    // Identity verification runs before any other handling; a failed
    // handshake is answered with a structured error, never a silent close.
    let token = query.into_inner().token.or_else(|| bearer_token(&req));
    let claims = match token {
        Some(token) => match verify_jwt(&token, &state.config.jwt_secret) {
            Ok(claims) => claims,
            Err(err) => {
                tracing::warn!("websocket connection rejected: invalid token");
                return Ok(err.error_response());
            }
        },
        None => {
            tracing::warn!("websocket connection rejected: no token provided");
            return Ok(AppError::Unauthorized.error_response());
        }
    };

    let session = WsSession::new(claims.sub, state.as_ref().clone());
    ws::start(session, &req, stream)
}
