mod ipstack_client;
mod sqlite_store;

pub use ipstack_client::{IpstackClient, IpstackConfig};
pub use sqlite_store::SqliteGeolocationStore;
