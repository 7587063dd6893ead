pub mod connector;
pub mod manager;
pub mod models;
pub mod repository;

pub use connector::{Connector, PgConnector, PgDatabase, TransportEvent};
pub use manager::{ConnectError, ConnectionManager, DatabaseError, HealthState, HealthStatus, RetryPolicy};
pub use repository::{AccountStore, PgAccountStore};
