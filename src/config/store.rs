use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::store::mongodb_store::MongoDBConfig;

/// Configuration for the guild-configuration store backend.
#[derive(Deserialize, Serialize, Debug, JsonSchema)]
pub struct StoreConfig {
    #[serde(flatten)]
    pub backend: Option<StoreBackend>,
}

/// The available store backends, differentiated via a "type" tag in the
/// YAML. The in-memory backend holds nothing across restarts and exists
/// for tests and local development.
#[derive(Deserialize, Serialize, Debug, JsonSchema)]
#[serde(tag = "type")]
pub enum StoreBackend {
    #[serde(rename = "mongo")]
    MongoDB(MongoDBConfig),
    #[serde(rename = "memory")]
    Memory,
}
