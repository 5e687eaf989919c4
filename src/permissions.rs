use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;

/// PermissionLevel
///
/// The role stored on every user record and the unit of comparison for route
/// authorization. Ordering comes from `RANKS`, never from the string value, so
/// adding or renaming a level cannot silently change who may call a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PermissionLevel {
    #[default]
    User,
    Moderator,
    Admin,
}

/// Minimum level for catalog writes (create/update of categories and products)
/// and for reading user accounts.
pub const MOD_PERMISSION: PermissionLevel = PermissionLevel::Moderator;

/// Minimum level for deletes and for any role or user mutation.
pub const ADMIN_PERMISSION: PermissionLevel = PermissionLevel::Admin;

/// Total order over levels, lowest first.
const RANKS: [(PermissionLevel, u8); 3] = [
    (PermissionLevel::User, 0),
    (PermissionLevel::Moderator, 1),
    (PermissionLevel::Admin, 2),
];

impl PermissionLevel {
    pub fn rank(self) -> u8 {
        RANKS
            .iter()
            .find(|(level, _)| *level == self)
            .map(|(_, rank)| *rank)
            .unwrap_or(0)
    }

    /// Returns true when `self` is at least as privileged as `required`.
    pub fn satisfies(self, required: PermissionLevel) -> bool {
        self.rank() >= required.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PermissionLevel::User => "user",
            PermissionLevel::Moderator => "moderator",
            PermissionLevel::Admin => "admin",
        }
    }
}

impl PartialOrd for PermissionLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PermissionLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role `{0}`, expected one of: user, moderator, admin")]
pub struct RoleParseError(pub String);

impl FromStr for PermissionLevel {
    type Err = RoleParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(PermissionLevel::User),
            "moderator" => Ok(PermissionLevel::Moderator),
            "admin" => Ok(PermissionLevel::Admin),
            other => Err(RoleParseError(other.to_string())),
        }
    }
}

// Lets sqlx decode the TEXT `role` column through `#[sqlx(try_from = "String")]`.
impl TryFrom<String> for PermissionLevel {
    type Error = RoleParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
