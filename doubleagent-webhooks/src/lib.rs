pub mod allowlist;
pub mod delivery;
pub mod engine;
pub mod signature;

pub use allowlist::Allowlist;
pub use delivery::{DeliveryStatus, WebhookDelivery};
pub use engine::WebhookEngine;
pub use signature::{canonical_json, compute_signature};
