pub mod policy;
pub mod redactor;

pub use policy::{AvatarStrategy, EmailStrategy, NameStrategy, RedactionPolicy};
pub use redactor::PiiRedactor;
