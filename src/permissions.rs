//! Per-invocation authorization from platform permissions.
//!
//! Owner-set membership is a static check on [`Config::is_owner`](crate::config::Config::is_owner).

use crate::platform::{ChatPlatform, IncomingMessage};
use log::warn;
use serenity::model::permissions::Permissions;
use std::fmt;

/// Capabilities a command can require
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ManageMessages,
    KickMembers,
}

impl Capability {
    pub fn permission(&self) -> Permissions {
        match self {
            Capability::ManageMessages => Permissions::MANAGE_MESSAGES,
            Capability::KickMembers => Permissions::KICK_MEMBERS,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Capability::ManageMessages => "Manage Messages",
            Capability::KickMembers => "Kick Members",
        };
        write!(f, "{}", s)
    }
}

/// What the invoker of a command is allowed to do
#[derive(Debug, Clone, Copy)]
pub struct AuthorizationContext {
    pub permissions: Permissions,
}

impl AuthorizationContext {
    /// Resolves the invoker's permissions. Outside a guild, or when the lookup
    /// fails, the invoker holds no platform permissions.
    pub async fn resolve(platform: &dyn ChatPlatform, msg: &IncomingMessage) -> Self {
        let permissions = match msg.guild_id {
            Some(guild_id) => match platform.member_permissions(guild_id, msg.author.id).await {
                Ok(permissions) => permissions,
                Err(e) => {
                    warn!(
                        "Permission lookup for {} in guild {} failed: {:#}",
                        msg.author.tag, guild_id, e
                    );
                    Permissions::empty()
                }
            },
            None => Permissions::empty(),
        };

        Self { permissions }
    }

    pub fn allows(&self, capability: Capability) -> bool {
        self.permissions.contains(Permissions::ADMINISTRATOR)
            || self.permissions.contains(capability.permission())
    }
}

/// Combines role permissions into a member's guild-level permissions.
///
/// The guild owner and anyone holding `ADMINISTRATOR` get everything.
pub fn combine_role_permissions<I>(is_guild_owner: bool, everyone: Permissions, member_roles: I) -> Permissions
where
    I: IntoIterator<Item = Permissions>,
{
    if is_guild_owner {
        return Permissions::all();
    }

    let permissions = member_roles
        .into_iter()
        .fold(everyone, |acc, role| acc | role);

    if permissions.contains(Permissions::ADMINISTRATOR) {
        Permissions::all()
    } else {
        permissions
    }
}
