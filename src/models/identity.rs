use serde::{Deserialize, Serialize};

/// Permission bit required to administer a guild's configuration.
pub const MANAGE_GUILD: u64 = 0x20;

/// One guild the identity belongs to, as reported by the identity
/// provider at authentication time. The list is a snapshot; it is not
/// refreshed until the user re-authenticates.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GuildMembership {
    #[serde(rename = "id")]
    pub guild_id: String,
    pub name: String,
    pub icon: Option<String>,
    #[serde(default, deserialize_with = "permissions_from_provider")]
    pub permissions: u64,
}

/// The provider serializes the permission bitmask either as a number or
/// as a decimal string depending on API version.
fn permissions_from_provider<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| D::Error::custom("permissions out of range")),
        serde_json::Value::String(s) => s
            .parse::<u64>()
            .map_err(|e| D::Error::custom(format!("invalid permissions string: {}", e))),
        serde_json::Value::Null => Ok(0),
        other => Err(D::Error::custom(format!(
            "unexpected permissions value: {}",
            other
        ))),
    }
}

/// The authenticated identity attached to a session.
///
/// Exists only for the lifetime of the session; destroying the session
/// destroys this view. The access token is held for provider calls on
/// the user's behalf and is never serialized into a response body or
/// persisted anywhere.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Identity {
    pub id: String,
    pub username: String,
    pub guild_memberships: Vec<GuildMembership>,
    #[serde(skip_serializing)]
    pub access_token: String,
}

/// Three-way access decision for a guild, so handlers can tell "not a
/// member" (404) apart from "member without the manage-guild bit" (403).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuildAccess<'a> {
    Granted(&'a GuildMembership),
    MissingPermission,
    NotAMember,
}

impl Identity {
    /// Locates the membership entry for `guild_id` and checks the
    /// manage-guild bit. Pure lookup, no I/O.
    pub fn guild_access(&self, guild_id: &str) -> GuildAccess<'_> {
        match self
            .guild_memberships
            .iter()
            .find(|m| m.guild_id == guild_id)
        {
            Some(m) if m.permissions & MANAGE_GUILD != 0 => GuildAccess::Granted(m),
            Some(_) => GuildAccess::MissingPermission,
            None => GuildAccess::NotAMember,
        }
    }

    pub fn can_administer(&self, guild_id: &str) -> bool {
        matches!(self.guild_access(guild_id), GuildAccess::Granted(_))
    }

    /// Intersects the identity's memberships with the automation actor's
    /// guild list. Order and entries come from the identity's own list so
    /// the permission bitmask survives for the gate.
    pub fn mutual_guilds(&self, bot_guilds: &[GuildMembership]) -> Vec<GuildMembership> {
        self.guild_memberships
            .iter()
            .filter(|m| bot_guilds.iter().any(|b| b.guild_id == m.guild_id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn membership(guild_id: &str, permissions: u64) -> GuildMembership {
        GuildMembership {
            guild_id: guild_id.to_string(),
            name: format!("guild-{}", guild_id),
            icon: None,
            permissions,
        }
    }

    fn identity(memberships: Vec<GuildMembership>) -> Identity {
        Identity {
            id: "user-1".to_string(),
            username: "tester".to_string(),
            guild_memberships: memberships,
            access_token: "secret".to_string(),
        }
    }

    /// can_administer is true exactly when the 0x20 bit is set, for any
    /// surrounding bits.
    #[test]
    fn test_manage_guild_bit_decides_access() {
        for mask in 0u64..0x100 {
            let id = identity(vec![membership("g", mask)]);
            assert_eq!(
                id.can_administer("g"),
                mask & MANAGE_GUILD != 0,
                "mask {:#x}",
                mask
            );
        }
    }

    #[test]
    fn test_zero_bitmask_denied() {
        let id = identity(vec![membership("g", 0)]);
        assert_eq!(id.guild_access("g"), GuildAccess::MissingPermission);
    }

    #[test]
    fn test_unknown_guild_is_not_a_member() {
        let id = identity(vec![membership("g", MANAGE_GUILD)]);
        assert_eq!(id.guild_access("other"), GuildAccess::NotAMember);
        assert!(!id.can_administer("other"));
    }

    #[test]
    fn test_mutual_guilds_intersection_keeps_identity_order() {
        let id = identity(vec![
            membership("a", 0x20),
            membership("b", 0x8),
            membership("c", 0x28),
        ]);
        let bot = vec![membership("c", 0), membership("a", 0)];

        let mutual = id.mutual_guilds(&bot);
        let ids: Vec<&str> = mutual.iter().map(|m| m.guild_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        // Entries come from the user's list, so the bitmask survives.
        assert_eq!(mutual[0].permissions, 0x20);
        assert_eq!(mutual[1].permissions, 0x28);
    }

    #[test]
    fn test_mutual_guilds_no_overlap_is_empty() {
        let id = identity(vec![membership("a", 0x20)]);
        let bot = vec![membership("z", 0)];
        assert!(id.mutual_guilds(&bot).is_empty());
    }

    /// The access token must never appear in a serialized identity.
    #[test]
    fn test_access_token_not_serialized() {
        let id = identity(vec![]);
        let json = serde_json::to_string(&id).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("access_token"));
    }

    #[test]
    fn test_membership_permissions_accepts_string_and_number() {
        let from_number: GuildMembership =
            serde_json::from_str(r#"{"id":"1","name":"n","icon":null,"permissions":40}"#).unwrap();
        assert_eq!(from_number.permissions, 40);

        let from_string: GuildMembership =
            serde_json::from_str(r#"{"id":"1","name":"n","icon":null,"permissions":"40"}"#)
                .unwrap();
        assert_eq!(from_string.permissions, 40);
    }
}
