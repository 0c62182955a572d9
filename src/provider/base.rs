use std::sync::Arc;

use async_trait::async_trait;

use super::discord::DiscordProvider;
use crate::config::ProviderConfig;
use crate::models::GuildMembership;

/// The IdentityProvider trait abstracts the external identity service:
/// the OAuth code exchange, the profile + membership snapshot fetch, and
/// the service-credential guild listing used by the mutual-guild
/// resolver.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchanges an authorization code for an access token. A failed
    /// exchange is terminal for the attempt; callers do not retry.
    async fn exchange_code(&self, code: &str) -> Result<String, String>;

    /// Fetches the profile (id, username) and the guild-membership
    /// snapshot for the holder of `access_token`.
    async fn fetch_identity(
        &self,
        access_token: &str,
    ) -> Result<(String, String, Vec<GuildMembership>), String>;

    /// Fetches the automation actor's own guild list using the
    /// service-level bot credential, not a user token.
    async fn fetch_bot_guilds(&self) -> Result<Vec<GuildMembership>, String>;

    /// The browser-facing authorize URL for the given state nonce.
    fn authorize_redirect(&self, state: &str) -> String;
}

/// Creates the concrete provider from configuration.
pub fn create_provider(config: &ProviderConfig) -> Arc<dyn IdentityProvider> {
    Arc::new(DiscordProvider::new(config))
}
