//! Follow the change feed over WebSocket.

use anyhow::{Context, Result, bail};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::client::ApiClient;

pub async fn watch(api_url: &str) -> Result<()> {
    let url = ApiClient::new(api_url)?.ws_url()?;
    let (mut socket, _) = connect_async(url.as_str())
        .await
        .with_context(|| format!("failed to connect to {}", url))?;

    let subscribe = json!({ "type": "subscribe", "channel": "builds" });
    socket
        .send(Message::Text(subscribe.to_string().into()))
        .await?;
    eprintln!("Watching builds on {} (Ctrl+C to stop)", url);

    while let Some(msg) = socket.next().await {
        match msg? {
            Message::Text(text) => {
                let value: Value = serde_json::from_str(&text.to_string())?;
                if let Some(line) = describe(&value) {
                    println!("{}", line);
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    bail!("connection closed by server")
}

/// One line per server message; `None` for acknowledgements.
fn describe(message: &Value) -> Option<String> {
    match message["type"].as_str()? {
        "build_change" => {
            let event = &message["event"];
            let kind = event["type"].as_str().unwrap_or("?");
            let build = if kind == "delete" {
                &event["old_record"]
            } else {
                &event["record"]
            };
            Some(format!(
                "{:<6} {} {} {}/{} {}%",
                kind,
                build["id"].as_str().unwrap_or("?"),
                build["environment"].as_str().unwrap_or("?"),
                build["status"].as_str().unwrap_or("?"),
                build["stage"].as_str().unwrap_or("?"),
                build["progress"],
            ))
        }
        "lagged" => Some(format!("... missed {} changes", message["skipped"])),
        "error" => Some(format!(
            "error: {}",
            message["message"].as_str().unwrap_or("?")
        )),
        _ => None,
    }
}
