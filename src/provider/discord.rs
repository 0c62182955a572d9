use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::ProviderConfig;
use crate::models::GuildMembership;
use crate::provider::IdentityProvider;

/// Identity provider speaking the Discord OAuth2 + REST API.
///
/// The API base is configurable so tests can point it at a local mock
/// server.
pub struct DiscordProvider {
    config: ProviderConfig,
    authorize_url: reqwest::Url,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct Profile {
    id: String,
    username: String,
}

impl DiscordProvider {
    /// Panics when the configured authorize URL is malformed, so a bad
    /// config fails at startup rather than inside a request handler.
    pub fn new(config: &ProviderConfig) -> Self {
        info!(
            "Creating Discord identity provider, api_base='{}'",
            config.api_base
        );
        let authorize_url = reqwest::Url::parse(&config.authorize_url).unwrap_or_else(|e| {
            panic!(
                "Invalid provider.authorize_url '{}': {}",
                config.authorize_url, e
            )
        });
        Self {
            config: config.clone(),
            authorize_url,
            client: reqwest::Client::new(),
        }
    }

    /// GET {api_base}/users/@me/guilds with the given Authorization
    /// header value, returning the membership list.
    async fn fetch_guilds(&self, authorization: &str) -> Result<Vec<GuildMembership>, String> {
        let url = format!("{}/users/@me/guilds", self.config.api_base);
        debug!("Fetching guild list from: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", authorization)
            .send()
            .await
            .map_err(|e| format!("Error sending guild-list request: {}", e))?;

        if !response.status().is_success() {
            return Err(format!(
                "Guild-list request returned status {}",
                response.status()
            ));
        }

        response
            .json::<Vec<GuildMembership>>()
            .await
            .map_err(|e| format!("Error parsing guild list: {}", e))
    }
}

#[async_trait]
impl IdentityProvider for DiscordProvider {
    async fn exchange_code(&self, code: &str) -> Result<String, String> {
        let url = format!("{}/oauth2/token", self.config.api_base);
        debug!("Exchanging authorization code at: {}", url);

        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| format!("Error sending token request: {}", e))?;

        if !response.status().is_success() {
            return Err(format!(
                "Token exchange returned status {}",
                response.status()
            ));
        }

        let token = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| format!("Error parsing token response: {}", e))?;

        Ok(token.access_token)
    }

    async fn fetch_identity(
        &self,
        access_token: &str,
    ) -> Result<(String, String, Vec<GuildMembership>), String> {
        let authorization = format!("Bearer {}", access_token);

        let url = format!("{}/users/@me", self.config.api_base);
        debug!("Fetching profile from: {}", url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", &authorization)
            .send()
            .await
            .map_err(|e| format!("Error sending profile request: {}", e))?;

        if !response.status().is_success() {
            return Err(format!(
                "Profile request returned status {}",
                response.status()
            ));
        }

        let profile = response
            .json::<Profile>()
            .await
            .map_err(|e| format!("Error parsing profile: {}", e))?;

        let memberships = self.fetch_guilds(&authorization).await?;
        Ok((profile.id, profile.username, memberships))
    }

    async fn fetch_bot_guilds(&self) -> Result<Vec<GuildMembership>, String> {
        let authorization = format!("Bot {}", self.config.bot_token);
        self.fetch_guilds(&authorization).await
    }

    fn authorize_redirect(&self, state: &str) -> String {
        let mut url = self.authorize_url.clone();
        url.query_pairs_mut().extend_pairs([
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", "identify guilds"),
            ("state", state),
        ]);
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use tokio;

    fn provider_config(api_base: String) -> ProviderConfig {
        ProviderConfig {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "http://localhost:8080/auth/callback".to_string(),
            bot_token: "bot-token".to_string(),
            authorize_url: format!("{}/oauth2/authorize", api_base),
            api_base,
        }
    }

    /// A successful code exchange yields the access token from the body.
    #[tokio::test]
    async fn test_exchange_code_success() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/oauth2/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "tok-123", "token_type": "Bearer"}"#)
            .create_async()
            .await;

        let provider = DiscordProvider::new(&provider_config(server.url()));
        let token = provider.exchange_code("the-code").await;
        m.assert_async().await;
        assert_eq!(token.unwrap(), "tok-123");
    }

    /// A provider rejection (400) is a terminal error for the attempt.
    #[tokio::test]
    async fn test_exchange_code_rejected() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/oauth2/token")
            .with_status(400)
            .with_body(r#"{"error": "invalid_grant"}"#)
            .create_async()
            .await;

        let provider = DiscordProvider::new(&provider_config(server.url()));
        let result = provider.exchange_code("bad-code").await;
        m.assert_async().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_fetch_identity_profile_and_guilds() {
        let mut server = Server::new_async().await;
        let profile = server
            .mock("GET", "/users/@me")
            .match_header("authorization", "Bearer tok-123")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "42", "username": "tester"}"#)
            .create_async()
            .await;
        let guilds = server
            .mock("GET", "/users/@me/guilds")
            .match_header("authorization", "Bearer tok-123")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id": "G1", "name": "First", "icon": null, "permissions": "40"}]"#)
            .create_async()
            .await;

        let provider = DiscordProvider::new(&provider_config(server.url()));
        let (id, username, memberships) = provider.fetch_identity("tok-123").await.unwrap();
        profile.assert_async().await;
        guilds.assert_async().await;

        assert_eq!(id, "42");
        assert_eq!(username, "tester");
        assert_eq!(memberships.len(), 1);
        assert_eq!(memberships[0].guild_id, "G1");
        assert_eq!(memberships[0].permissions, 40);
    }

    /// Bot guild listing uses the service credential, not a user token.
    #[tokio::test]
    async fn test_fetch_bot_guilds_uses_bot_credential() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/users/@me/guilds")
            .match_header("authorization", "Bot bot-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id": "G2", "name": "Second", "icon": "abc", "permissions": 8}]"#)
            .create_async()
            .await;

        let provider = DiscordProvider::new(&provider_config(server.url()));
        let guilds = provider.fetch_bot_guilds().await.unwrap();
        m.assert_async().await;
        assert_eq!(guilds[0].guild_id, "G2");
    }

    #[tokio::test]
    async fn test_fetch_bot_guilds_upstream_error() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/users/@me/guilds")
            .with_status(502)
            .create_async()
            .await;

        let provider = DiscordProvider::new(&provider_config(server.url()));
        let result = provider.fetch_bot_guilds().await;
        m.assert_async().await;
        assert!(result.is_err());
    }

    /// A malformed authorize URL must fail when the provider is built,
    /// not when the first login request comes in.
    #[test]
    #[should_panic(expected = "Invalid provider.authorize_url")]
    fn test_malformed_authorize_url_fails_at_construction() {
        let mut config = provider_config("http://example.test".to_string());
        config.authorize_url = "not a url".to_string();
        DiscordProvider::new(&config);
    }

    #[test]
    fn test_authorize_redirect_carries_state() {
        let provider = DiscordProvider::new(&provider_config("http://example.test".to_string()));
        let url = provider.authorize_redirect("nonce-1");
        assert!(url.starts_with("http://example.test/oauth2/authorize?"));
        assert!(url.contains("client_id=client"));
        assert!(url.contains("state=nonce-1"));
        assert!(url.contains("scope=identify+guilds") || url.contains("scope=identify%20guilds"));
    }
}
