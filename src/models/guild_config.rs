use std::collections::HashMap;

use serde::{Deserialize, Serialize};

fn default_prefix() -> String {
    "!".to_string()
}

/// Per-guild bot settings. Empty strings are the "unset" sentinel for
/// channel and role references, not errors.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GuildSettings {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub mute_role: String,
    #[serde(default)]
    pub welcome_channel: String,
    #[serde(default)]
    pub leave_channel: String,
    #[serde(default)]
    pub log_channel: String,
}

impl Default for GuildSettings {
    fn default() -> Self {
        GuildSettings {
            prefix: default_prefix(),
            mute_role: String::new(),
            welcome_channel: String::new(),
            leave_channel: String::new(),
            log_channel: String::new(),
        }
    }
}

/// Durable per-guild configuration document, keyed by `guild_id`.
///
/// `display_name` and `icon_ref` are a denormalized snapshot of guild
/// metadata taken at creation time; they are not kept live.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GuildConfiguration {
    pub guild_id: String,
    pub display_name: String,
    pub icon_ref: Option<String>,
    pub settings: GuildSettings,
}

impl GuildConfiguration {
    /// A fresh configuration seeded from guild metadata and defaults.
    pub fn new(guild_id: String, display_name: String, icon_ref: Option<String>) -> Self {
        GuildConfiguration {
            guild_id,
            display_name,
            icon_ref,
            settings: GuildSettings::default(),
        }
    }
}

/// Partial update for guild settings. Absent fields are left untouched;
/// unrecognized fields in the request body are ignored.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mute_role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub welcome_channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leave_channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_channel: Option<String>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.prefix.is_none()
            && self.mute_role.is_none()
            && self.welcome_channel.is_none()
            && self.leave_channel.is_none()
            && self.log_channel.is_none()
    }

    /// Applies the present fields onto `settings`, leaving the rest alone.
    pub fn apply(&self, settings: &mut GuildSettings) {
        if let Some(prefix) = &self.prefix {
            settings.prefix = prefix.clone();
        }
        if let Some(mute_role) = &self.mute_role {
            settings.mute_role = mute_role.clone();
        }
        if let Some(welcome_channel) = &self.welcome_channel {
            settings.welcome_channel = welcome_channel.clone();
        }
        if let Some(leave_channel) = &self.leave_channel {
            settings.leave_channel = leave_channel.clone();
        }
        if let Some(log_channel) = &self.log_channel {
            settings.log_channel = log_channel.clone();
        }
    }
}

/// Singleton aggregate document read by the external worker process.
///
/// Written through a separate code path from GuildConfiguration; the two
/// are not transactionally linked, which is the drift the consistency
/// report exists to surface.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyWelcomeMap {
    #[serde(default)]
    pub channels: HashMap<String, String>,
}

/// One dashboard-schema welcome-channel entry in the drift report.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DashboardWelcomeEntry {
    pub guild_id: String,
    pub welcome_channel: String,
}

/// Side-by-side view of the welcome channel in both schemas. Read-only;
/// reconciliation direction is a product decision outside this service.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WelcomeDriftReport {
    pub legacy: LegacyWelcomeMap,
    pub dashboard: Vec<DashboardWelcomeEntry>,
}
