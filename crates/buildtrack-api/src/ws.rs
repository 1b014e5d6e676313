//! WebSocket delivery of the build change feed.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use buildtrack_core::BuildChange;
use buildtrack_db::ChangeFeed;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::AppState;

/// The only channel currently published.
pub const BUILDS_CHANNEL: &str = "builds";

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let feed = state.repo.changes().clone();
    ws.on_upgrade(move |socket| handle_socket(socket, feed))
}

async fn handle_socket(mut socket: WebSocket, feed: ChangeFeed) {
    info!("WebSocket connection established");
    let mut changes: Option<broadcast::Receiver<BuildChange>> = None;

    loop {
        tokio::select! {
            msg = socket.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let reply = match serde_json::from_str::<WsCommand>(&text) {
                        Ok(cmd) => handle_command(cmd, &feed, &mut changes),
                        Err(e) => Some(WsMessage::Error {
                            message: format!("invalid command: {}", e),
                        }),
                    };
                    if let Some(reply) = reply
                        && send(&mut socket, &reply).await.is_err()
                    {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("WebSocket connection closed");
                    break;
                }
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket error");
                    break;
                }
                Some(Ok(_)) => {}
            },
            change = next_change(&mut changes) => {
                let message = match change {
                    Ok(event) => WsMessage::BuildChange { event },
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "WebSocket subscriber lagged behind the change feed");
                        WsMessage::Lagged { skipped }
                    }
                    Err(RecvError::Closed) => break,
                };
                if send(&mut socket, &message).await.is_err() {
                    break;
                }
            }
        }
    }
}

fn handle_command(
    cmd: WsCommand,
    feed: &ChangeFeed,
    changes: &mut Option<broadcast::Receiver<BuildChange>>,
) -> Option<WsMessage> {
    match cmd {
        WsCommand::Subscribe { channel } if channel == BUILDS_CHANNEL => {
            info!(channel = %channel, "Client subscribed");
            if changes.is_none() {
                *changes = Some(feed.subscribe());
            }
            Some(WsMessage::Subscribed { channel })
        }
        WsCommand::Unsubscribe { channel } if channel == BUILDS_CHANNEL => {
            info!(channel = %channel, "Client unsubscribed");
            *changes = None;
            Some(WsMessage::Unsubscribed { channel })
        }
        WsCommand::Subscribe { channel } | WsCommand::Unsubscribe { channel } => {
            debug!(channel = %channel, "Unknown channel");
            Some(WsMessage::Error {
                message: format!("unknown channel: {}", channel),
            })
        }
    }
}

/// Next change for a subscribed client; pends forever otherwise.
async fn next_change(
    changes: &mut Option<broadcast::Receiver<BuildChange>>,
) -> Result<BuildChange, RecvError> {
    match changes {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn send(socket: &mut WebSocket, message: &WsMessage) -> Result<(), axum::Error> {
    let Ok(json) = serde_json::to_string(message) else {
        return Ok(());
    };
    socket.send(Message::Text(json.into())).await
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsCommand {
    Subscribe { channel: String },
    Unsubscribe { channel: String },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsMessage {
    Subscribed { channel: String },
    Unsubscribed { channel: String },
    BuildChange { event: BuildChange },
    Lagged { skipped: u64 },
    Error { message: String },
}
