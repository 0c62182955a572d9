use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::Store;
use crate::models::{
    DashboardWelcomeEntry, GuildConfiguration, LegacyWelcomeMap, SettingsPatch,
};

/// An in-process store keeping both schemas in memory. Used by tests and
/// available as the `memory` backend for local development.
///
/// A single lock per schema mirrors the store-level atomicity the Mongo
/// backend gets per update operation.
#[derive(Default)]
pub struct MemoryStore {
    guilds: RwLock<HashMap<String, GuildConfiguration>>,
    legacy: RwLock<LegacyWelcomeMap>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_or_create_guild_config(
        &self,
        guild_id: &str,
        fallback_name: &str,
        fallback_icon: Option<&str>,
    ) -> Result<GuildConfiguration, String> {
        let mut guilds = self.guilds.write().await;
        let config = guilds.entry(guild_id.to_string()).or_insert_with(|| {
            GuildConfiguration::new(
                guild_id.to_string(),
                fallback_name.to_string(),
                fallback_icon.map(str::to_string),
            )
        });
        Ok(config.clone())
    }

    async fn update_settings(
        &self,
        guild_id: &str,
        fallback_name: &str,
        fallback_icon: Option<&str>,
        patch: &SettingsPatch,
    ) -> Result<GuildConfiguration, String> {
        let mut guilds = self.guilds.write().await;
        let config = guilds.entry(guild_id.to_string()).or_insert_with(|| {
            GuildConfiguration::new(
                guild_id.to_string(),
                fallback_name.to_string(),
                fallback_icon.map(str::to_string),
            )
        });
        patch.apply(&mut config.settings);
        Ok(config.clone())
    }

    async fn set_welcome_channel(&self, guild_id: &str, channel: &str) -> Result<(), String> {
        // Legacy map only; the per-guild document is not touched.
        self.legacy
            .write()
            .await
            .channels
            .insert(guild_id.to_string(), channel.to_string());
        Ok(())
    }

    async fn read_legacy_welcome_map(&self) -> Result<LegacyWelcomeMap, String> {
        Ok(self.legacy.read().await.clone())
    }

    async fn dashboard_welcome_channels(&self) -> Result<Vec<DashboardWelcomeEntry>, String> {
        let guilds = self.guilds.read().await;
        let mut entries: Vec<DashboardWelcomeEntry> = guilds
            .values()
            .map(|c| DashboardWelcomeEntry {
                guild_id: c.guild_id.clone(),
                welcome_channel: c.settings.welcome_channel.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.guild_id.cmp(&b.guild_id));
        Ok(entries)
    }
}
