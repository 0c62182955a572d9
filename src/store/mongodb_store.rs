use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, to_bson, Document};
use mongodb::options::{
    ClientOptions, FindOneAndUpdateOptions, IndexOptions, ReturnDocument, UpdateOptions,
};
use mongodb::{Client, Collection, IndexModel};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::{
    DashboardWelcomeEntry, GuildConfiguration, GuildSettings, LegacyWelcomeMap, SettingsPatch,
};
use crate::store::Store;

/// Fixed key of the singleton legacy welcome-channel document.
const LEGACY_WELCOME_DOC_ID: &str = "welcome_channels";

/// The config struct for MongoDB connections.
/// Contains the URI and database name.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone)]
pub struct MongoDBConfig {
    pub uri: String,
    pub database: String,
}

/// A concrete `Store` implementation that uses MongoDB.
///
/// This struct holds references to two collections:
/// - `guild_collection`: One document per guild, keyed by guild_id
/// - `legacy_collection`: The singleton welcome-channel map the external
///   worker process reads
pub struct MongoDBStore {
    guild_collection: Collection<GuildConfigDocument>,
    legacy_collection: Collection<LegacyWelcomeDocument>,
}

/// Document shape for per-guild configuration in MongoDB.
#[derive(Serialize, Deserialize, Clone, Debug)]
struct GuildConfigDocument {
    guild_id: String,
    display_name: String,
    icon_ref: Option<String>,
    settings: GuildSettings,
}

/// Document shape for the singleton legacy welcome map.
#[derive(Serialize, Deserialize, Clone, Debug)]
struct LegacyWelcomeDocument {
    _id: String,
    #[serde(flatten)]
    map: LegacyWelcomeMap,
}

impl MongoDBStore {
    /// Creates a new `MongoDBStore` from the given config.
    /// It initializes client connections, sets up indexes, etc.
    pub async fn new(config: &MongoDBConfig) -> Result<Self, String> {
        info!("Connecting to MongoDB at URI: {}", config.uri);

        let mut client_options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|e| format!("Failed to parse MongoDB URI: {}", e))?;

        client_options.app_name = Some("guilddash".to_string());

        let client = Client::with_options(client_options)
            .map_err(|e| format!("Failed to create MongoDB client: {}", e))?;

        info!("MongoDB connection established successfully.");

        let database = client.database(&config.database);
        let guild_collection = database.collection::<GuildConfigDocument>("guild_configs");
        let legacy_collection = database.collection::<LegacyWelcomeDocument>("legacy_welcome");

        // Unique index on guild_id. This is what serializes concurrent
        // first-access: two simultaneous upserts for the same absent
        // guild_id cannot produce two documents.
        let mut unique_on_guild_id = IndexModel::default();
        unique_on_guild_id.keys = doc! { "guild_id": 1 };
        unique_on_guild_id.options = Some(IndexOptions::builder().unique(true).build());

        guild_collection
            .create_index(unique_on_guild_id, None)
            .await
            .map_err(|e| format!("Failed to create unique index on guild_id: {}", e))?;

        Ok(Self {
            guild_collection,
            legacy_collection,
        })
    }

    /// Convert a `GuildConfigDocument` back into a `GuildConfiguration`.
    fn doc_to_config(doc: GuildConfigDocument) -> GuildConfiguration {
        GuildConfiguration {
            guild_id: doc.guild_id,
            display_name: doc.display_name,
            icon_ref: doc.icon_ref,
            settings: doc.settings,
        }
    }

    /// `$setOnInsert` seed for a guild document. guild_id itself is
    /// supplied by the filter on upsert, so it must not appear here.
    fn insert_seed(
        fallback_name: &str,
        fallback_icon: Option<&str>,
        defaults: &[(&str, &str)],
    ) -> Document {
        let mut seed = doc! {
            "display_name": fallback_name,
            "icon_ref": fallback_icon,
        };
        for (path, value) in defaults {
            seed.insert(*path, *value);
        }
        seed
    }

    fn upsert_after_options() -> FindOneAndUpdateOptions {
        FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build()
    }
}

/// All settings fields with their default values, as dotted paths.
const SETTINGS_DEFAULTS: [(&str, &str); 5] = [
    ("settings.prefix", "!"),
    ("settings.mute_role", ""),
    ("settings.welcome_channel", ""),
    ("settings.leave_channel", ""),
    ("settings.log_channel", ""),
];

#[async_trait]
impl Store for MongoDBStore {
    async fn get_or_create_guild_config(
        &self,
        guild_id: &str,
        fallback_name: &str,
        fallback_icon: Option<&str>,
    ) -> Result<GuildConfiguration, String> {
        debug!("get_or_create guild config for guild_id='{}'", guild_id);

        let seed = Self::insert_seed(fallback_name, fallback_icon, &SETTINGS_DEFAULTS);
        let updated = self
            .guild_collection
            .find_one_and_update(
                doc! { "guild_id": guild_id },
                doc! { "$setOnInsert": seed },
                Self::upsert_after_options(),
            )
            .await
            .map_err(|e| format!("Failed to upsert guild config: {}", e))?
            .ok_or_else(|| "Upsert returned no document".to_string())?;

        Ok(Self::doc_to_config(updated))
    }

    async fn update_settings(
        &self,
        guild_id: &str,
        fallback_name: &str,
        fallback_icon: Option<&str>,
        patch: &SettingsPatch,
    ) -> Result<GuildConfiguration, String> {
        if patch.is_empty() {
            // Nothing to $set; behaves like a plain read-or-create.
            return self
                .get_or_create_guild_config(guild_id, fallback_name, fallback_icon)
                .await;
        }

        // $set only the fields present in the patch; seed everything
        // else via $setOnInsert so a first write still produces a full
        // document. Field-level $set is what gives concurrent writers
        // to different fields their independence.
        let mut set = Document::new();
        let mut touched = Vec::new();
        let fields = [
            ("settings.prefix", &patch.prefix),
            ("settings.mute_role", &patch.mute_role),
            ("settings.welcome_channel", &patch.welcome_channel),
            ("settings.leave_channel", &patch.leave_channel),
            ("settings.log_channel", &patch.log_channel),
        ];
        for (path, value) in fields {
            if let Some(value) = value {
                set.insert(path, to_bson(value).map_err(|e| e.to_string())?);
                touched.push(path);
            }
        }

        let untouched_defaults: Vec<(&str, &str)> = SETTINGS_DEFAULTS
            .iter()
            .filter(|(path, _)| !touched.contains(path))
            .copied()
            .collect();
        let seed = Self::insert_seed(fallback_name, fallback_icon, &untouched_defaults);

        let updated = self
            .guild_collection
            .find_one_and_update(
                doc! { "guild_id": guild_id },
                doc! { "$set": set, "$setOnInsert": seed },
                Self::upsert_after_options(),
            )
            .await
            .map_err(|e| format!("Failed to update guild settings: {}", e))?
            .ok_or_else(|| "Settings upsert returned no document".to_string())?;

        Ok(Self::doc_to_config(updated))
    }

    async fn set_welcome_channel(&self, guild_id: &str, channel: &str) -> Result<(), String> {
        debug!(
            "Setting legacy welcome channel for guild_id='{}'",
            guild_id
        );

        // Writes the singleton map only. The per-guild document is
        // deliberately left alone; the worker process reads from here.
        self.legacy_collection
            .update_one(
                doc! { "_id": LEGACY_WELCOME_DOC_ID },
                doc! { "$set": { format!("channels.{}", guild_id): channel } },
                UpdateOptions::builder().upsert(true).build(),
            )
            .await
            .map_err(|e| format!("Failed to update legacy welcome map: {}", e))?;

        Ok(())
    }

    async fn read_legacy_welcome_map(&self) -> Result<LegacyWelcomeMap, String> {
        let found = self
            .legacy_collection
            .find_one(doc! { "_id": LEGACY_WELCOME_DOC_ID }, None)
            .await
            .map_err(|e| format!("Failed to read legacy welcome map: {}", e))?;

        Ok(found.map(|d| d.map).unwrap_or_default())
    }

    async fn dashboard_welcome_channels(&self) -> Result<Vec<DashboardWelcomeEntry>, String> {
        let mut cursor = self
            .guild_collection
            .find(doc! {}, None)
            .await
            .map_err(|e| format!("Failed to list guild configs: {}", e))?;

        let mut entries = Vec::new();
        while let Some(config_doc) = cursor
            .try_next()
            .await
            .map_err(|e| format!("Failed to read guild config document: {}", e))?
        {
            entries.push(DashboardWelcomeEntry {
                guild_id: config_doc.guild_id,
                welcome_channel: config_doc.settings.welcome_channel,
            });
        }

        Ok(entries)
    }
}
