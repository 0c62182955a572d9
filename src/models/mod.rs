pub mod guild_config;
pub mod identity;

// Re-export the primary model types so code outside can do
// "use crate::models::{Identity, GuildConfiguration};".
pub use guild_config::{
    DashboardWelcomeEntry, GuildConfiguration, GuildSettings, LegacyWelcomeMap, SettingsPatch,
    WelcomeDriftReport,
};
pub use identity::{GuildAccess, GuildMembership, Identity, MANAGE_GUILD};
