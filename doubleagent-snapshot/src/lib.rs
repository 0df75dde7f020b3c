pub mod connector;
pub mod filter;
pub mod manifest;
pub mod readonly_http;
pub mod store;

pub use connector::{ConnectorRuntime, StreamInfo, StreamSource};
pub use filter::{apply_relational_filter, FollowRule, SeedStreamConfig, SeedingConfig};
pub use manifest::SnapshotManifest;
pub use readonly_http::{ReadOnlyHttpClient, ReadOnlyViolation};
pub use store::SnapshotStore;
