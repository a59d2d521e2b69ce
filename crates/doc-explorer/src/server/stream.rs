//! Streaming query channel over WebSocket

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::server::state::AppState;
use crate::types::{QueryRequest, StreamMessage};

pub const EXPLORING_MESSAGE: &str = "RLM is exploring your document...";
pub const MISSING_FIELDS_MESSAGE: &str = "Both document_id and question are required";
pub const NOT_FOUND_MESSAGE: &str = "Document not found";

/// Transport failure on a query channel
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Client went away
    #[error("client disconnected")]
    Disconnected,

    /// Message could not be encoded or delivered
    #[error("{0}")]
    Transport(String),
}

/// Bidirectional message channel carrying one query session
#[async_trait]
pub trait QueryChannel: Send {
    /// Next text message; `None` once the client has closed
    async fn recv(&mut self) -> Result<Option<String>, ChannelError>;

    /// Send one message
    async fn send(&mut self, message: &StreamMessage) -> Result<(), ChannelError>;

    /// Close the channel
    async fn close(&mut self);
}

/// Query channel over an axum WebSocket
pub struct WsChannel {
    socket: WebSocket,
}

impl WsChannel {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl QueryChannel for WsChannel {
    async fn recv(&mut self) -> Result<Option<String>, ChannelError> {
        loop {
            match self.socket.recv().await {
                None | Some(Ok(Message::Close(_))) => return Ok(None),
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(String::from_utf8_lossy(&data).into_owned()))
                }
                // Pings are answered by the socket itself
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Err(_)) => return Err(ChannelError::Disconnected),
            }
        }
    }

    async fn send(&mut self, message: &StreamMessage) -> Result<(), ChannelError> {
        let text =
            serde_json::to_string(message).map_err(|e| ChannelError::Transport(e.to_string()))?;
        self.socket
            .send(Message::Text(text))
            .await
            .map_err(|_| ChannelError::Disconnected)
    }

    async fn close(&mut self) {
        let _ = self.socket.send(Message::Close(None)).await;
    }
}

/// GET /ws/query - Upgrade to a streaming query session
pub async fn query_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| async move {
        let mut channel = WsChannel::new(socket);
        run_session(&state, &mut channel).await;
    })
}

/// How a session ended early
#[derive(Debug)]
enum SessionEnd {
    Disconnected,
    Failed(String),
}

impl From<ChannelError> for SessionEnd {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::Disconnected => Self::Disconnected,
            ChannelError::Transport(message) => Self::Failed(message),
        }
    }
}

/// Serve one query: request, status, replayed iterations, then a terminal message.
///
/// Every path except a client disconnect ends with a `result` or `error` message.
pub async fn run_session<C: QueryChannel>(state: &AppState, channel: &mut C) {
    match serve(state, channel).await {
        Ok(()) => {}
        Err(SessionEnd::Disconnected) => tracing::info!("WebSocket client disconnected"),
        Err(SessionEnd::Failed(message)) => {
            tracing::error!("WebSocket session failed: {}", message);
            // The socket may already be gone
            let _ = channel.send(&StreamMessage::error(message)).await;
        }
    }
    channel.close().await;
}

async fn serve<C: QueryChannel>(state: &AppState, channel: &mut C) -> Result<(), SessionEnd> {
    let raw = channel.recv().await?.ok_or(SessionEnd::Disconnected)?;
    let request: QueryRequest = serde_json::from_str(&raw)
        .map_err(|e| SessionEnd::Failed(format!("Invalid request: {}", e)))?;

    let document_id = request.document_id.trim();
    let question = request.question.trim();
    if document_id.is_empty() || question.is_empty() {
        channel.send(&StreamMessage::error(MISSING_FIELDS_MESSAGE)).await?;
        return Ok(());
    }

    let Ok(doc) = state.documents().get(document_id) else {
        channel.send(&StreamMessage::error(NOT_FOUND_MESSAGE)).await?;
        return Ok(());
    };

    let invocation = state
        .invoker()
        .prepare(question, request.model(), request.api_key())
        .map_err(|e| SessionEnd::Failed(e.to_string()))?;

    channel.send(&StreamMessage::status(EXPLORING_MESSAGE)).await?;
    tracing::info!("Streaming query on {} ({})", doc.id, doc.filename);

    // The worker keeps running if the client leaves; its result is dropped
    let result = tokio::select! {
        result = state.invoker().run(invocation, Arc::clone(&doc.text)) => {
            result.map_err(|e| SessionEnd::Failed(e.to_string()))?
        }
        _ = closed(channel) => return Err(SessionEnd::Disconnected),
    };

    let delay = Duration::from_millis(state.config().agent.replay_delay_ms);
    for step in &result.trajectory {
        channel.send(&StreamMessage::Iteration(step.clone())).await?;
        tokio::time::sleep(delay).await;
    }

    channel.send(&StreamMessage::result(&result)).await?;
    Ok(())
}

/// Resolves once the client closes; extra client messages are ignored
async fn closed<C: QueryChannel>(channel: &mut C) {
    loop {
        match channel.recv().await {
            Ok(Some(_)) => continue,
            Ok(None) | Err(_) => return,
        }
    }
}
