//! Host directory user projection.
//!
//! The host application owns authentication and the user directory; this is
//! the read-only view the identity provider consumes. It is recomputed per
//! request and never persisted here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user record as supplied by the host directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryUser {
    /// Directory identifier, the federation subject.
    pub id: i64,

    /// Display name.
    pub name: String,

    /// Whether the user holds the administrator flag.
    pub admin: bool,

    /// Whether the account is active. Deactivated users cannot redeem or
    /// refresh tokens.
    pub active: bool,

    /// Last modification time of the directory record.
    pub updated_at: Option<DateTime<Utc>>,

    /// The user's designated main character, if one is set.
    pub main_character: Option<MainCharacter>,

    /// Names of the squads the user belongs to.
    pub squads: Vec<String>,
}

impl DirectoryUser {
    /// Creates a minimal active user, mostly useful in tests.
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            admin: false,
            active: true,
            updated_at: None,
            main_character: None,
            squads: Vec::new(),
        }
    }
}

/// EVE character data attached to a directory user's main character.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainCharacter {
    /// Character identifier.
    pub character_id: i64,

    /// Character name.
    pub name: String,

    /// Corporation the character belongs to.
    pub corporation_id: i64,

    /// Alliance of the corporation, if any.
    pub alliance_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_is_active_without_character() {
        let user = DirectoryUser::new(7, "pilot");
        assert!(user.active);
        assert!(!user.admin);
        assert!(user.main_character.is_none());
        assert!(user.squads.is_empty());
    }
}
