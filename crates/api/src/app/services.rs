//! Service wiring: storage, repositories, membership lookup, broadcaster.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;

use brigade_auth::{HttpKeySource, JwksCache, TokenValidator};
use brigade_core::UserId;
use brigade_domain::{Brigade, Invitation, Member, Route, Station, Verification};
use brigade_infra::{
    Broadcaster, InMemoryTableStore, InProcessBroadcaster, PostgresTableStore, Repository, StoreError,
    StoreMembershipLookup, TableStore, WebPubSubClient, import_brigades, load_seed_file,
};

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppServices {
    pub brigades: Repository<Brigade>,
    pub members: Repository<Member>,
    pub routes: Repository<Route>,
    pub invitations: Repository<Invitation>,
    pub verifications: Repository<Verification>,
    pub stations: Repository<Station>,
    pub lookup: StoreMembershipLookup,
    pub broadcaster: Arc<dyn Broadcaster>,
    reviewers: Arc<HashSet<UserId>>,
}

impl AppServices {
    pub fn new(
        store: Arc<dyn TableStore>,
        broadcaster: Arc<dyn Broadcaster>,
        reviewers: impl IntoIterator<Item = UserId>,
    ) -> Self {
        let members = Repository::new(store.clone());
        Self {
            brigades: Repository::new(store.clone()),
            lookup: StoreMembershipLookup::new(members.clone()),
            members,
            routes: Repository::new(store.clone()),
            invitations: Repository::new(store.clone()),
            verifications: Repository::new(store.clone()),
            stations: Repository::new(store),
            broadcaster,
            reviewers: Arc::new(reviewers.into_iter().collect()),
        }
    }

    /// In-memory storage and in-process broadcast (dev/test).
    pub fn in_memory(reviewers: impl IntoIterator<Item = UserId>) -> Self {
        Self::new(
            Arc::new(InMemoryTableStore::new()),
            Arc::new(InProcessBroadcaster::new()),
            reviewers,
        )
    }

    pub fn is_reviewer(&self, user: &UserId) -> bool {
        self.reviewers.contains(user)
    }

    pub async fn ensure_tables(&self) -> Result<(), StoreError> {
        self.brigades.ensure_table().await?;
        self.members.ensure_table().await?;
        self.routes.ensure_table().await?;
        self.invitations.ensure_table().await?;
        self.verifications.ensure_table().await?;
        self.stations.ensure_table().await
    }
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let store: Arc<dyn TableStore> = match &config.database_url {
        Some(url) => {
            tracing::info!("using Postgres table store");
            Arc::new(PostgresTableStore::connect(url).await.context("connecting to Postgres")?)
        }
        None => {
            tracing::warn!("BRIGADE_DATABASE_URL not set; rows are kept in memory and lost on restart");
            Arc::new(InMemoryTableStore::new())
        }
    };

    let broadcaster: Arc<dyn Broadcaster> = match &config.pubsub_connection {
        Some(conn) => {
            let client = WebPubSubClient::from_connection_string(conn, &config.pubsub_hub)?;
            tracing::info!(endpoint = client.endpoint(), hub = client.hub(), "using Web PubSub broadcaster");
            Arc::new(client)
        }
        None => {
            tracing::warn!("BRIGADE_PUBSUB_CONNECTION not set; live updates stay in-process");
            Arc::new(InProcessBroadcaster::new())
        }
    };

    let services = AppServices::new(store, broadcaster, config.reviewers.iter().cloned());
    services.ensure_tables().await.context("preparing tables")?;

    if let Some(path) = &config.seed_file {
        let entries = load_seed_file(path).await?;
        import_brigades(&services.brigades, entries).await?;
    }

    Ok(services)
}

pub fn build_validator(config: &AppConfig) -> anyhow::Result<TokenValidator> {
    let Some(validator_config) = config.auth.validator_config() else {
        return Ok(TokenValidator::dev_bypass());
    };
    let jwks_uri = config
        .auth
        .jwks_uri()
        .context("no key set URI could be derived from the auth settings")?;
    tracing::info!(issuer = %validator_config.issuer, jwks_uri, "token validation enabled");
    let source = HttpKeySource::new(jwks_uri).context("building key set client")?;
    let keys = JwksCache::new(Arc::new(source));
    Ok(TokenValidator::new(validator_config, Arc::new(keys)))
}
