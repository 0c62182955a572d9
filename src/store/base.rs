use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use super::{memory_store::MemoryStore, mongodb_store::MongoDBStore};
use crate::config::{StoreBackend, StoreConfig};
use crate::models::{DashboardWelcomeEntry, GuildConfiguration, LegacyWelcomeMap, SettingsPatch};

/// The Store trait abstracts guild-configuration persistence across the
/// two physical schemas: per-guild documents and the singleton legacy
/// welcome-channel map.
///
/// The two schemas are written through different operations on purpose.
/// `set_welcome_channel` touches only the legacy map the external worker
/// reads; the per-guild document's `welcome_channel` field moves only
/// through `update_settings`. Nothing links the two transactionally.
#[async_trait]
pub trait Store: Send + Sync {
    /// Reads the per-guild document, creating it with default settings
    /// (seeded from the fallback metadata) if absent. Safe under
    /// concurrent first access: two simultaneous creators for the same
    /// guild_id must converge on one document.
    async fn get_or_create_guild_config(
        &self,
        guild_id: &str,
        fallback_name: &str,
        fallback_icon: Option<&str>,
    ) -> Result<GuildConfiguration, String>;

    /// Upserts only the fields present in `patch` at field granularity;
    /// absent fields are left untouched. Creates the document (seeded
    /// from the fallback metadata) if absent. Returns the post-update
    /// document.
    async fn update_settings(
        &self,
        guild_id: &str,
        fallback_name: &str,
        fallback_icon: Option<&str>,
        patch: &SettingsPatch,
    ) -> Result<GuildConfiguration, String>;

    /// Writes only `LegacyWelcomeMap.channels[guild_id]`, bypassing the
    /// per-guild document entirely. Last write wins.
    async fn set_welcome_channel(&self, guild_id: &str, channel: &str) -> Result<(), String>;

    /// Read-only accessor for the legacy map, for diagnostics.
    async fn read_legacy_welcome_map(&self) -> Result<LegacyWelcomeMap, String>;

    /// The welcome channel of every per-guild document, for the drift
    /// report.
    async fn dashboard_welcome_channels(&self) -> Result<Vec<DashboardWelcomeEntry>, String>;
}

/// Creates a concrete store implementation based on the StoreConfig.
pub async fn create_store(config: &StoreConfig) -> Arc<dyn Store> {
    match &config.backend {
        Some(StoreBackend::MongoDB(mongo_config)) => match MongoDBStore::new(mongo_config).await {
            Ok(store) => {
                info!("Successfully created MongoDB store.");
                Arc::new(store)
            }
            Err(e) => {
                error!("Failed to create MongoDB store: {}", e);
                std::process::exit(1);
            }
        },
        Some(StoreBackend::Memory) => {
            info!("Using in-memory store. Nothing will survive a restart.");
            Arc::new(MemoryStore::new())
        }
        None => {
            error!("No store backend config is provided!");
            std::process::exit(1);
        }
    }
}
