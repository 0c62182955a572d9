pub mod base;
pub mod discord;

// Re-export the primary provider items so code outside can do
// "use crate::provider::{IdentityProvider, create_provider};".
pub use base::{create_provider, IdentityProvider};
