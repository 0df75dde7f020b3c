pub mod baseline;
pub mod namespace;
pub mod overlay;

pub use baseline::Baseline;
pub use namespace::NamespaceRouter;
pub use overlay::{Overlay, OverlayStats};
