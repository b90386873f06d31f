// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Live booking event consumers.
//!
//! Both consumers subscribe to the in-process broadcast publisher and are
//! strictly downstream of it: events are facts about committed transitions,
//! never commands, and a slow consumer only loses its own backlog.
//!
//! - `spawn_event_logger` writes every event to the log.
//! - `live_events_handler` streams events to WebSocket clients. Clients must
//!   still read bookings over HTTP for authoritative data.

use axum::{
    extract::{
        State as AxumState, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, stream::StreamExt};
use repairhub_api::{BookingEvent, BroadcastPublisher};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::AppState;

/// Frames sent to live clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveFrame {
    /// Connection confirmation (sent on initial connect).
    Connected {
        /// Server timestamp (ISO 8601).
        timestamp: String,
    },
    /// A booking transition.
    Booking {
        event: Box<BookingEvent>,
    },
    /// The client fell behind and `skipped` events were dropped.
    Lagged { skipped: u64 },
}

/// Logs every published booking event until the publisher goes away.
pub fn spawn_event_logger(events: &BroadcastPublisher) -> JoinHandle<()> {
    let mut rx: broadcast::Receiver<BookingEvent> = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => info!(
                    kind = event.kind.as_str(),
                    booking_id = event.booking.booking_id,
                    user_id = event.user_id,
                    technician_user_id = ?event.technician_user_id,
                    changed_by = event.changed_by,
                    previous_status = ?event.previous_status,
                    new_status = %event.new_status,
                    "Booking event"
                ),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event logger fell behind");
                }
                Err(RecvError::Closed) => {
                    debug!("Event stream closed");
                    break;
                }
            }
        }
    })
}

/// Upgrades the connection and streams booking events to the client.
pub async fn live_events_handler(
    ws: WebSocketUpgrade,
    AxumState(app_state): AxumState<AppState>,
) -> Response {
    let rx: broadcast::Receiver<BookingEvent> = app_state.events.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, rx))
}

async fn handle_socket(socket: WebSocket, mut rx: broadcast::Receiver<BookingEvent>) {
    info!("Client connected to live event stream");

    let (mut sender, mut receiver) = socket.split();

    let connected = LiveFrame::Connected {
        timestamp: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Iso8601::DEFAULT)
            .unwrap_or_else(|_| String::from("unknown")),
    };
    if let Ok(json) = serde_json::to_string(&connected)
        && sender.send(Message::Text(json.into())).await.is_err()
    {
        warn!("Failed to send connection confirmation");
        return;
    }

    let mut send_task = tokio::spawn(async move {
        loop {
            let frame: LiveFrame = match rx.recv().await {
                Ok(event) => LiveFrame::Booking {
                    event: Box::new(event),
                },
                Err(RecvError::Lagged(skipped)) => LiveFrame::Lagged { skipped },
                Err(RecvError::Closed) => break,
            };
            match serde_json::to_string(&frame) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!(?e, "Failed to serialize live frame");
                }
            }
        }
    });

    // The stream is one-way; inbound frames are only watched for close.
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(_) | Message::Binary(_)) => {
                    warn!("Received unexpected message from client, ignoring");
                }
                Ok(Message::Close(_)) => {
                    debug!("Client sent close frame");
                    break;
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {}
                Err(e) => {
                    error!(?e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    info!("Client disconnected from live event stream");
}
