//! Managed Web PubSub service over its REST API.
//!
//! Both the service calls and the client access tokens are HS256 JWTs
//! signed with the hub's access key; `aud` is the URL they are used against.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{EncodingKey, Header};
use serde::Serialize;
use serde_json::Value;

use brigade_core::UserId;

use super::{BroadcastError, Broadcaster, ClientAccess, ClientScope};

const API_VERSION: &str = "2024-01-01";
const SERVICE_TOKEN_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_CLIENT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct ServiceClaims<'a> {
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Serialize)]
struct ClientClaims<'a> {
    aud: &'a str,
    iat: i64,
    exp: i64,
    sub: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    role: Vec<String>,
    #[serde(rename = "webpubsub.group")]
    groups: [&'a str; 1],
}

#[derive(Clone)]
pub struct WebPubSubClient {
    endpoint: String,
    access_key: String,
    hub: String,
    http: reqwest::Client,
}

impl std::fmt::Debug for WebPubSubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebPubSubClient")
            .field("endpoint", &self.endpoint)
            .field("hub", &self.hub)
            .finish_non_exhaustive()
    }
}

impl WebPubSubClient {
    /// Parse `Endpoint=https://...;AccessKey=...;Version=1.0;`.
    pub fn from_connection_string(connection: &str, hub: &str) -> Result<Self, BroadcastError> {
        let mut endpoint = None;
        let mut access_key = None;
        let mut port = None;

        for part in connection.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| BroadcastError::InvalidConnectionString(format!("segment without '=': {part}")))?;
            match key.trim().to_ascii_lowercase().as_str() {
                "endpoint" => endpoint = Some(value.trim().trim_end_matches('/').to_string()),
                "accesskey" => access_key = Some(value.trim().to_string()),
                "port" => port = Some(value.trim().to_string()),
                _ => {}
            }
        }

        let mut endpoint = endpoint
            .filter(|e| e.starts_with("https://") || e.starts_with("http://"))
            .ok_or_else(|| BroadcastError::InvalidConnectionString("missing http(s) Endpoint".into()))?;
        let access_key = access_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| BroadcastError::InvalidConnectionString("missing AccessKey".into()))?;
        if let Some(port) = port {
            endpoint = format!("{endpoint}:{port}");
        }

        let hub = hub.trim();
        if hub.is_empty() || !hub.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(BroadcastError::InvalidConnectionString(format!("invalid hub name '{hub}'")));
        }

        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BroadcastError::Transport(format!("failed to build http client: {e}")))?;

        Ok(Self {
            endpoint,
            access_key,
            hub: hub.to_ascii_lowercase(),
            http,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn hub(&self) -> &str {
        &self.hub
    }

    fn send_url(&self, group: &str) -> String {
        format!("{}/api/hubs/{}/groups/{}/:send", self.endpoint, self.hub, group)
    }

    fn client_audience(&self) -> String {
        format!("{}/client/hubs/{}", self.endpoint, self.hub)
    }

    fn client_url(&self, token: &str) -> String {
        let ws = if let Some(rest) = self.endpoint.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.endpoint.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.endpoint.clone()
        };
        format!("{ws}/client/hubs/{}?access_token={token}", self.hub)
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, BroadcastError> {
        jsonwebtoken::encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(self.access_key.as_bytes()),
        )
        .map_err(|e| BroadcastError::Token(e.to_string()))
    }

    fn expiry(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, BroadcastError> {
        chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| BroadcastError::Token("token lifetime out of range".into()))
    }
}

fn validate_group(group: &str) -> Result<(), BroadcastError> {
    if group.is_empty()
        || group.len() > 1024
        || !group.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(BroadcastError::Transport(format!("invalid group name '{group}'")));
    }
    Ok(())
}

#[async_trait]
impl Broadcaster for WebPubSubClient {
    async fn send_to_group(&self, group: &str, message: &Value) -> Result<(), BroadcastError> {
        validate_group(group)?;
        let url = self.send_url(group);
        let now = Utc::now();
        let token = self.sign(&ServiceClaims {
            aud: &url,
            iat: now.timestamp(),
            exp: Self::expiry(now, SERVICE_TOKEN_TTL)?.timestamp(),
        })?;

        let response = self
            .http
            .post(&url)
            .query(&[("api-version", API_VERSION)])
            .bearer_auth(token)
            .json(message)
            .send()
            .await
            .map_err(|e| BroadcastError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(group, status = status.as_u16(), "pub/sub send rejected");
            return Err(BroadcastError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        tracing::debug!(group, "pub/sub message sent");
        Ok(())
    }

    async fn client_access(
        &self,
        user: &UserId,
        group: &str,
        scope: ClientScope,
    ) -> Result<ClientAccess, BroadcastError> {
        validate_group(group)?;
        let audience = self.client_audience();
        let now = Utc::now();
        let expires_at = Self::expiry(now, DEFAULT_CLIENT_TOKEN_TTL)?;

        let role = match scope {
            ClientScope::Viewer => Vec::new(),
            ClientScope::Broadcaster => vec![
                format!("webpubsub.sendToGroup.{group}"),
                format!("webpubsub.joinLeaveGroup.{group}"),
            ],
        };

        let token = self.sign(&ClientClaims {
            aud: &audience,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            sub: user.as_str(),
            role,
            groups: [group],
        })?;

        Ok(ClientAccess {
            url: self.client_url(&token),
            token,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use jsonwebtoken::{Algorithm, DecodingKey, Validation};

    const CONN: &str = "Endpoint=https://brigades.webpubsub.azure.com/;AccessKey=c2VjcmV0LWtleQ==;Version=1.0;";

    fn decode(client: &WebPubSubClient, token: &str) -> Value {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[client.client_audience()]);
        jsonwebtoken::decode::<Value>(
            token,
            &DecodingKey::from_secret(b"c2VjcmV0LWtleQ=="),
            &validation,
        )
        .unwrap()
        .claims
    }

    #[test]
    fn parses_connection_string() {
        let c = WebPubSubClient::from_connection_string(CONN, "Brigades").unwrap();
        assert_eq!(c.endpoint(), "https://brigades.webpubsub.azure.com");
        assert_eq!(c.hub(), "brigades");
        assert_eq!(
            c.send_url("brigade-1"),
            "https://brigades.webpubsub.azure.com/api/hubs/brigades/groups/brigade-1/:send"
        );
    }

    #[test]
    fn port_is_appended_to_endpoint() {
        let c = WebPubSubClient::from_connection_string("Endpoint=http://localhost;Port=8080;AccessKey=k", "h").unwrap();
        assert_eq!(c.endpoint(), "http://localhost:8080");
        assert!(c.client_url("t").starts_with("ws://localhost:8080/client/hubs/h?access_token=t"));
    }

    #[test]
    fn rejects_incomplete_connection_strings() {
        for bad in ["", "AccessKey=k", "Endpoint=ftp://x;AccessKey=k", "Endpoint=https://x", "Endpoint"] {
            assert!(
                matches!(
                    WebPubSubClient::from_connection_string(bad, "hub"),
                    Err(BroadcastError::InvalidConnectionString(_))
                ),
                "{bad}"
            );
        }
        assert!(WebPubSubClient::from_connection_string(CONN, "bad hub").is_err());
    }

    #[tokio::test]
    async fn viewer_token_joins_group_without_roles() {
        let c = WebPubSubClient::from_connection_string(CONN, "brigades").unwrap();
        let user = UserId::composite("oid", Some("tid"));
        let access = c.client_access(&user, "brigade-42", ClientScope::Viewer).await.unwrap();

        assert!(access.url.starts_with("wss://brigades.webpubsub.azure.com/client/hubs/brigades?access_token="));
        assert!(access.url.ends_with(&access.token));

        let claims = decode(&c, &access.token);
        assert_eq!(claims["sub"], "oid.tid");
        assert_eq!(claims["webpubsub.group"], serde_json::json!(["brigade-42"]));
        assert!(claims.get("role").is_none());
        assert_eq!(claims["exp"].as_i64(), Some(access.expires_at.timestamp()));
    }

    #[tokio::test]
    async fn broadcaster_token_can_send_and_join() {
        let c = WebPubSubClient::from_connection_string(CONN, "brigades").unwrap();
        let user = UserId::composite("oid", None);
        let access = c.client_access(&user, "brigade-42", ClientScope::Broadcaster).await.unwrap();

        let claims = decode(&c, &access.token);
        assert_eq!(
            claims["role"],
            serde_json::json!([
                "webpubsub.sendToGroup.brigade-42",
                "webpubsub.joinLeaveGroup.brigade-42"
            ])
        );
    }

    #[tokio::test]
    async fn odd_group_names_are_refused() {
        let c = WebPubSubClient::from_connection_string(CONN, "brigades").unwrap();
        let user = UserId::composite("oid", None);
        assert!(c.client_access(&user, "a/b", ClientScope::Viewer).await.is_err());
        assert!(c.send_to_group("", &serde_json::json!({})).await.is_err());
    }
}
