//! Guild listing and configuration endpoint handlers.
//!
//! Every configuration operation authorizes first: the caller must hold
//! the manage-guild bit on the target guild before the store is touched.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::models::{GuildAccess, GuildConfiguration, GuildMembership, Identity, SettingsPatch};
use crate::state::AppState;
use crate::utils::http_helpers::HTTPError;

/// Registers guild routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/guilds", get(list_mutual_guilds))
        .route(
            "/api/guilds/:guild_id/config",
            get(get_guild_config).patch(update_guild_config),
        )
        .route(
            "/api/guilds/:guild_id/welcome-channel",
            put(set_welcome_channel),
        )
}

/// Authorizes the identity for a guild, mapping the three-way decision
/// to the HTTP contract: not a member -> 404, member without the
/// manage-guild bit -> 403.
fn require_access<'a>(
    identity: &'a Identity,
    guild_id: &str,
) -> Result<&'a GuildMembership, HTTPError> {
    match identity.guild_access(guild_id) {
        GuildAccess::Granted(membership) => Ok(membership),
        GuildAccess::MissingPermission => Err(HTTPError::forbidden()),
        GuildAccess::NotAMember => Err(HTTPError::not_found("Guild not in your membership list")),
    }
}

/// Guilds shared between the caller and the automation actor. One
/// upstream fetch per request; failures are not retried and not cached.
async fn list_mutual_guilds(
    identity: Identity,
    State(state): State<AppState>,
) -> Result<Json<Vec<GuildMembership>>, HTTPError> {
    let bot_guilds = state.provider.fetch_bot_guilds().await.map_err(|e| {
        error!("Bot guild-list fetch failed: {}", e);
        HTTPError::upstream()
    })?;

    Ok(Json(identity.mutual_guilds(&bot_guilds)))
}

/// Reads the per-guild configuration, creating it on first authorized
/// access seeded from the caller's membership snapshot.
async fn get_guild_config(
    identity: Identity,
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
) -> Result<Json<GuildConfiguration>, HTTPError> {
    let membership = require_access(&identity, &guild_id)?;

    let config = state
        .store
        .get_or_create_guild_config(&guild_id, &membership.name, membership.icon.as_deref())
        .await
        .map_err(|e| {
            error!("Store failure reading config for guild {}: {}", guild_id, e);
            HTTPError::store()
        })?;

    Ok(Json(config))
}

#[derive(Serialize)]
struct UpdateResponse {
    success: bool,
}

/// Applies a partial settings update. Fields absent from the body are
/// left untouched; unknown fields are ignored.
async fn update_guild_config(
    identity: Identity,
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
    Json(patch): Json<SettingsPatch>,
) -> Result<(StatusCode, Json<UpdateResponse>), HTTPError> {
    let membership = require_access(&identity, &guild_id)?;

    state
        .store
        .update_settings(
            &guild_id,
            &membership.name,
            membership.icon.as_deref(),
            &patch,
        )
        .await
        .map_err(|e| {
            error!(
                "Store failure updating settings for guild {}: {}",
                guild_id, e
            );
            HTTPError::store()
        })?;

    Ok((StatusCode::OK, Json(UpdateResponse { success: true })))
}

#[derive(Deserialize)]
struct WelcomeChannelBody {
    channel: String,
}

#[derive(Serialize)]
struct WelcomeChannelResponse {
    success: bool,
    guild_id: String,
    channel: String,
}

/// Sets the welcome channel through the legacy path: this writes only
/// the singleton map the worker process reads. The per-guild document is
/// deliberately not written here; that asymmetry is a cross-process
/// contract, not an oversight.
async fn set_welcome_channel(
    identity: Identity,
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
    Json(body): Json<WelcomeChannelBody>,
) -> Result<(StatusCode, Json<WelcomeChannelResponse>), HTTPError> {
    require_access(&identity, &guild_id)?;

    state
        .store
        .set_welcome_channel(&guild_id, &body.channel)
        .await
        .map_err(|e| {
            error!(
                "Store failure setting welcome channel for guild {}: {}",
                guild_id, e
            );
            HTTPError::store()
        })?;

    Ok((
        StatusCode::OK,
        Json(WelcomeChannelResponse {
            success: true,
            guild_id,
            channel: body.channel,
        }),
    ))
}
