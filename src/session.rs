//! WebSocket session transport.
//!
//! One task per connected session plus an unbounded event channel. The
//! session pushes a readiness status the moment it opens; each well-formed
//! query event spawns its own turn task and owes exactly one answer event.
//! Answers land on the channel in the order turns complete, never crossing
//! between sessions because the channel is per-session.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use crate::models::{Answer, STATUS_READY, STATUS_UNREADY};
use crate::pipeline::Pipeline;

/// Server-to-client events, serialized as JSON text frames.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Status { text: String },
    Answer { text: String },
}

/// Client-to-server events.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    Query { text: String },
}

/// Session state behind one WebSocket connection. Created per connection,
/// discarded on disconnect; shares nothing with other sessions beyond the
/// read-only pipeline.
pub struct Session {
    id: Uuid,
    pipeline: Option<Arc<Pipeline>>,
    outbound: UnboundedSender<ServerEvent>,
}

impl Session {
    /// Open a session and immediately queue its readiness status event.
    pub fn open(pipeline: Option<Arc<Pipeline>>) -> (Self, UnboundedReceiver<ServerEvent>) {
        let (outbound, events) = mpsc::unbounded_channel();
        let ready = pipeline.is_some();
        let session = Self {
            id: Uuid::new_v4(),
            pipeline,
            outbound,
        };

        let status = if ready { STATUS_READY } else { STATUS_UNREADY };
        let _ = session.outbound.send(ServerEvent::Status {
            text: status.to_string(),
        });
        tracing::info!(session = %session.id, ready, "session connected");

        (session, events)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Handle one inbound text frame. Malformed frames are logged and
    /// ignored; only well-formed query events enter the one-answer-per-query
    /// contract.
    pub fn handle_frame(&self, raw: &str) {
        match serde_json::from_str::<ClientEvent>(raw) {
            Ok(ClientEvent::Query { text }) => self.submit(text),
            Err(err) => {
                tracing::warn!(session = %self.id, error = %err, "ignoring malformed client frame");
            }
        }
    }

    /// Queue one turn. With the pipeline absent every query short-circuits
    /// to the fixed unready answer. Otherwise the turn runs in its own task;
    /// a client that keeps several queries in flight receives the answers in
    /// completion order.
    pub fn submit(&self, text: String) {
        let Some(pipeline) = self.pipeline.clone() else {
            let _ = self.outbound.send(ServerEvent::Answer {
                text: Answer::unready().text,
            });
            return;
        };

        let outbound = self.outbound.clone();
        let session_id = self.id;
        tokio::spawn(async move {
            let answer = pipeline.answer(&text).await;
            // Send fails only when the session is gone; the answer is
            // discarded, never redirected.
            if outbound
                .send(ServerEvent::Answer { text: answer.text })
                .is_err()
            {
                tracing::debug!(session = %session_id, "session closed before answer delivery");
            }
        });
    }
}

/// Drive one WebSocket connection to completion.
pub async fn run_session(socket: WebSocket, pipeline: Option<Arc<Pipeline>>) {
    let (session, mut events) = Session::open(pipeline);
    let session_id = session.id();
    let (mut sink, mut stream) = socket.split();

    // Outbound pump: everything the session queues goes out as one JSON
    // text frame.
    let pump = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let frame = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    tracing::error!(error = %err, "failed to encode server event");
                    continue;
                }
            };
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => session.handle_frame(&text),
            Message::Close(_) => break,
            // Ping/Pong are answered by the protocol layer.
            _ => {}
        }
    }

    tracing::info!(session = %session_id, "session disconnected");
    pump.abort();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::STATUS_UNREADY;

    #[test]
    fn test_server_event_wire_shape() {
        let status = ServerEvent::Status {
            text: "ready".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&status).unwrap(),
            r#"{"type":"status","text":"ready"}"#
        );

        let answer = ServerEvent::Answer {
            text: "hello".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&answer).unwrap(),
            r#"{"type":"answer","text":"hello"}"#
        );
    }

    #[test]
    fn test_client_event_wire_shape() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"query","text":"What services?"}"#).unwrap();
        let ClientEvent::Query { text } = event;
        assert_eq!(text, "What services?");
    }

    #[test]
    fn test_unknown_client_event_rejected() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"type":"subscribe"}"#).is_err());
        assert!(serde_json::from_str::<ClientEvent>("not json").is_err());
    }

    #[tokio::test]
    async fn test_unready_session_status_then_short_circuit() {
        let (session, mut events) = Session::open(None);

        let first = events.recv().await.unwrap();
        assert_eq!(
            first,
            ServerEvent::Status {
                text: STATUS_UNREADY.to_string()
            }
        );

        session.handle_frame(r#"{"type":"query","text":"anyone home?"}"#);
        let second = events.recv().await.unwrap();
        let ServerEvent::Answer { text } = second else {
            panic!("expected answer event");
        };
        assert!(text.contains("currently unavailable"));
    }

    #[tokio::test]
    async fn test_malformed_frame_owes_no_answer() {
        let (session, mut events) = Session::open(None);
        let _status = events.recv().await.unwrap();

        session.handle_frame("garbage");
        session.handle_frame(r#"{"type":"noise","text":"x"}"#);

        // Nothing queued: a well-formed query still gets through after.
        session.handle_frame(r#"{"type":"query","text":"q"}"#);
        let next = events.recv().await.unwrap();
        assert!(matches!(next, ServerEvent::Answer { .. }));
        assert!(events.try_recv().is_err());
    }
}
