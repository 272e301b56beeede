//! Live broadcast: "send to group" plus scoped client access.
//!
//! Messages are passed straight through. There is no buffering, ordering
//! or retry here.

pub mod in_process;
pub mod web_pubsub;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use brigade_core::UserId;

pub use in_process::InProcessBroadcaster;
pub use web_pubsub::WebPubSubClient;

/// What a connecting client may do in its group.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientScope {
    /// Receive only.
    #[default]
    Viewer,
    /// Send to and join/leave the group.
    Broadcaster,
}

impl ClientScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientScope::Viewer => "viewer",
            ClientScope::Broadcaster => "broadcaster",
        }
    }
}

/// Connection details handed to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientAccess {
    pub url: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BroadcastError {
    #[error("invalid pub/sub connection string: {0}")]
    InvalidConnectionString(String),

    #[error("failed to sign pub/sub token: {0}")]
    Token(String),

    #[error("pub/sub request failed: {0}")]
    Transport(String),

    #[error("pub/sub service rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn send_to_group(&self, group: &str, message: &Value) -> Result<(), BroadcastError>;

    async fn client_access(
        &self,
        user: &UserId,
        group: &str,
        scope: ClientScope,
    ) -> Result<ClientAccess, BroadcastError>;
}
