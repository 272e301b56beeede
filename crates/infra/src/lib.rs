//! Infrastructure layer: table storage, entity mapping, live broadcast.

pub mod entity;
pub mod membership;
pub mod pubsub;
pub mod seed;
pub mod table_store;

pub use entity::{BRIGADE_PARTITION, Repository, TableEntity, VERIFICATION_ROW};
pub use membership::StoreMembershipLookup;
pub use pubsub::{BroadcastError, Broadcaster, ClientAccess, ClientScope, InProcessBroadcaster, WebPubSubClient};
pub use seed::{SeedReport, import_brigades, load_seed_file};
pub use table_store::{InMemoryTableStore, KeyFilter, PostgresTableStore, Row, StoreError, TableQuery, TableStore};
