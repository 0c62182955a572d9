use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use super::store::StoreConfig;

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0: store, identity provider, session cookie,
/// bind address and logging.
#[derive(Deserialize, Serialize, Debug, JsonSchema)]
pub struct ConfigV1 {
    pub store: StoreConfig,
    pub provider: ProviderConfig,
    pub bind_address: String,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Load config from a YAML file named "config.yaml" in the current
/// directory, with GUILDDASH_-prefixed env vars taking precedence.
pub fn load_config() -> ConfigV1 {
    let figment = Figment::new()
        .merge(Yaml::file("./config.yaml"))
        .merge(Env::prefixed("GUILDDASH_").split("__"));
    let config = match figment.extract::<Config>() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    };
    match config {
        Config::ConfigV1(c) => c,
    }
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() {
    let schema = schema_for!(Config);
    println!("{}", serde_json::to_string_pretty(&schema).unwrap());
}

/// OAuth2 credentials and endpoints for the external identity provider,
/// plus the service-level bot token used for the mutual-guild fetch.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Callback URL registered with the provider, e.g.
    /// "https://dash.example.com/auth/callback".
    pub redirect_uri: String,
    /// Bot credential for service-level API calls (guild listing).
    pub bot_token: String,
    /// REST API base, e.g. "https://discord.com/api". Overridable so
    /// tests can point at a local mock server.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Browser-facing authorize endpoint.
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
}

fn default_api_base() -> String {
    "https://discord.com/api".to_string()
}

fn default_authorize_url() -> String {
    "https://discord.com/api/oauth2/authorize".to_string()
}

/// Where to send the browser after the OAuth exchange, and what to call
/// the session cookie.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Redirect target after a successful exchange.
    #[serde(default = "default_success_path")]
    pub success_path: String,
    /// Redirect target after a failed exchange.
    #[serde(default = "default_failure_path")]
    pub failure_path: String,
}

fn default_cookie_name() -> String {
    "guilddash_session".to_string()
}

fn default_success_path() -> String {
    "/dashboard".to_string()
}

fn default_failure_path() -> String {
    "/".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            cookie_name: default_cookie_name(),
            success_path: default_success_path(),
            failure_path: default_failure_path(),
        }
    }
}
