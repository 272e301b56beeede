use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::broadcast;

use brigade_core::UserId;

use super::{BroadcastError, Broadcaster, ClientAccess, ClientScope};

const CHANNEL_CAPACITY: usize = 256;
const TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// Single-process broadcaster for local development and tests.
///
/// Each group is a tokio broadcast channel. Messages sent to a group nobody
/// subscribes to are dropped.
#[derive(Debug, Default)]
pub struct InProcessBroadcaster {
    groups: Mutex<HashMap<String, broadcast::Sender<Value>>>,
}

impl InProcessBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, group: &str) -> Result<broadcast::Receiver<Value>, BroadcastError> {
        let mut groups = self.groups.lock().map_err(|_| Self::poisoned())?;
        Ok(groups
            .entry(group.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe())
    }

    fn poisoned() -> BroadcastError {
        BroadcastError::Transport("in-process broadcaster lock poisoned".into())
    }
}

#[async_trait]
impl Broadcaster for InProcessBroadcaster {
    async fn send_to_group(&self, group: &str, message: &Value) -> Result<(), BroadcastError> {
        let groups = self.groups.lock().map_err(|_| Self::poisoned())?;
        let delivered = groups
            .get(group)
            .and_then(|tx| tx.send(message.clone()).ok())
            .unwrap_or(0);
        tracing::debug!(group, delivered, "in-process broadcast");
        Ok(())
    }

    async fn client_access(
        &self,
        user: &UserId,
        group: &str,
        scope: ClientScope,
    ) -> Result<ClientAccess, BroadcastError> {
        let expires_at = Utc::now()
            + chrono::Duration::from_std(TOKEN_TTL).map_err(|e| BroadcastError::Token(e.to_string()))?;
        let token = format!("{}:{}:{}", scope.as_str(), group, user);
        Ok(ClientAccess {
            url: format!("inproc://groups/{group}"),
            token,
            expires_at,
        })
    }
}
