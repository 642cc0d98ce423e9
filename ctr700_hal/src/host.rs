//! Host side of the pipeline: outbound events and inbound messages.
//!
//! Nodes hand every emitted message and status change to a [`HostSink`].
//! The binary writes them as JSON lines to stdout; tests collect them in a
//! `Vec`.

use std::io::Write;

use serde::{Deserialize, Serialize};
use tracing::warn;

use ctr700_common::node::payload::{Message, Payload};

use crate::status::NodeStatus;

/// Something a node hands to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum HostEvent {
    /// Outbound message.
    Message {
        /// Emitting node.
        node: String,
        /// Topic and payload.
        #[serde(flatten)]
        message: Message,
    },
    /// Status display change; `None` clears the display.
    Status {
        /// Node whose display changed.
        node: String,
        /// New display.
        status: Option<NodeStatus>,
    },
}

impl HostEvent {
    /// Message carried by this event, if any.
    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Self::Message { message, .. } => Some(message),
            Self::Status { .. } => None,
        }
    }

    /// Name of the node that produced this event.
    pub fn node(&self) -> &str {
        match self {
            Self::Message { node, .. } | Self::Status { node, .. } => node,
        }
    }
}

/// Receiver of host events.
pub trait HostSink: Send {
    /// Deliver one event.
    fn emit(&mut self, event: HostEvent);
}

impl HostSink for Vec<HostEvent> {
    fn emit(&mut self, event: HostEvent) {
        self.push(event);
    }
}

impl HostSink for crossbeam_channel::Sender<HostEvent> {
    fn emit(&mut self, event: HostEvent) {
        // Receiver gone means the host is shutting down.
        let _ = self.send(event);
    }
}

/// Writes each event as one JSON line.
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    fn write_event(&mut self, event: &HostEvent) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

impl<W: Write + Send> HostSink for JsonLinesSink<W> {
    fn emit(&mut self, event: HostEvent) {
        if let Err(e) = self.write_event(&event) {
            warn!("Failed to write host event: {}", e);
        }
    }
}

/// Message arriving from the host.
///
/// Without `node`, the message is offered to every output node and topic
/// matching decides; with `node`, only the named node sees it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundMessage {
    /// Target node name.
    #[serde(default)]
    pub node: Option<String>,
    /// Topic; missing means empty.
    #[serde(default)]
    pub topic: String,
    /// Value.
    pub payload: Payload,
}

impl InboundMessage {
    /// Broadcast message.
    pub fn new(topic: impl Into<String>, payload: Payload) -> Self {
        Self {
            node: None,
            topic: topic.into(),
            payload,
        }
    }

    /// Message addressed to one node.
    pub fn to_node(node: impl Into<String>, topic: impl Into<String>, payload: Payload) -> Self {
        Self {
            node: Some(node.into()),
            topic: topic.into(),
            payload,
        }
    }
}
