//! Scopes, claims, and the identity projection.
//!
//! The scope → claim association is a single static table read by the claim
//! filter, the discovery document, and the consent screen alike. Claims
//! whose source value is absent resolve to an explicit JSON null, never an
//! error.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::user::DirectoryUser;

/// Error raised when parsing an unknown scope.
#[derive(Debug, Error)]
#[error("unknown scope: {0}")]
pub struct UnknownScope(pub String);

/// OAuth scopes this provider understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// Base OIDC scope; always present in a client's allowed set.
    #[serde(rename = "openid")]
    OpenId,

    /// Standard OIDC profile claims.
    #[serde(rename = "profile")]
    Profile,

    /// Standard OIDC email claims (the synthetic SeAT address).
    #[serde(rename = "email")]
    Email,

    /// SeAT account claims.
    #[serde(rename = "seat:user")]
    User,

    /// Main character identity.
    #[serde(rename = "seat:character")]
    Character,

    /// Corporation and alliance affiliation.
    #[serde(rename = "seat:corporation")]
    Corporation,

    /// Squad membership names.
    #[serde(rename = "seat:squads")]
    Squads,
}

impl Scope {
    /// Every supported scope.
    pub const ALL: [Self; 7] = [
        Self::OpenId,
        Self::Profile,
        Self::Email,
        Self::User,
        Self::Character,
        Self::Corporation,
        Self::Squads,
    ];

    /// Returns the wire value of this scope.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenId => "openid",
            Self::Profile => "profile",
            Self::Email => "email",
            Self::User => "seat:user",
            Self::Character => "seat:character",
            Self::Corporation => "seat:corporation",
            Self::Squads => "seat:squads",
        }
    }

    /// Parses a scope from its wire value.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownScope`] for values outside the supported set.
    pub fn parse(value: &str) -> Result<Self, UnknownScope> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == value)
            .ok_or_else(|| UnknownScope(value.to_string()))
    }

    /// Claims this scope exposes. The subject and admin-flag claims are not
    /// listed here because they are exposed unconditionally.
    #[must_use]
    pub const fn claims(self) -> &'static [Claim] {
        match self {
            Self::OpenId => &[],
            Self::Profile => &[Claim::Name, Claim::PreferredUsername, Claim::UpdatedAt],
            Self::Email => &[Claim::Email, Claim::EmailVerified],
            Self::User => &[Claim::IsAdmin],
            Self::Character => &[Claim::CharacterId, Claim::CharacterName],
            Self::Corporation => &[Claim::CorporationId, Claim::AllianceId],
            Self::Squads => &[Claim::Squads],
        }
    }

    /// Renders a scope set as the space-separated wire form.
    #[must_use]
    pub fn join(scopes: &[Self]) -> String {
        scopes
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Parses a space-separated scope string, rejecting unknown values.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownScope`] for the first unrecognized entry.
    pub fn parse_list(value: &str) -> Result<Vec<Self>, UnknownScope> {
        let mut scopes = Vec::new();
        for part in value.split_whitespace() {
            let scope = Self::parse(part)?;
            if !scopes.contains(&scope) {
                scopes.push(scope);
            }
        }
        Ok(scopes)
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named facts about the authenticated user exposed to relying parties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Claim {
    /// Subject identifier (always included).
    Sub,
    /// Administrator flag (always included).
    IsAdmin,
    /// Display name.
    Name,
    /// Preferred username.
    PreferredUsername,
    /// Last directory update, as a Unix timestamp.
    UpdatedAt,
    /// Synthetic, non-enumerable email address.
    Email,
    /// Email verification state; always false for synthetic addresses.
    EmailVerified,
    /// Main character id.
    CharacterId,
    /// Main character name.
    CharacterName,
    /// Main character's corporation id.
    CorporationId,
    /// Main character's alliance id.
    AllianceId,
    /// Squad membership names.
    Squads,
}

impl Claim {
    /// Claims included regardless of granted scope.
    pub const ALWAYS: [Self; 2] = [Self::Sub, Self::IsAdmin];

    /// Returns the claim name as it appears in tokens and UserInfo.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sub => "sub",
            Self::IsAdmin => "is_admin",
            Self::Name => "name",
            Self::PreferredUsername => "preferred_username",
            Self::UpdatedAt => "updated_at",
            Self::Email => "email",
            Self::EmailVerified => "email_verified",
            Self::CharacterId => "character_id",
            Self::CharacterName => "character_name",
            Self::CorporationId => "corporation_id",
            Self::AllianceId => "alliance_id",
            Self::Squads => "squads",
        }
    }
}

/// Returns every claim name that can appear in a token, for the discovery
/// document's `claims_supported`.
#[must_use]
pub fn supported_claim_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = Claim::ALWAYS.iter().map(|c| c.name()).collect();
    for scope in Scope::ALL {
        for claim in scope.claims() {
            if !names.contains(&claim.name()) {
                names.push(claim.name());
            }
        }
    }
    names
}

/// The flat claim set derived from one directory user.
///
/// Recomputed per request; not persisted.
#[derive(Debug, Clone)]
pub struct IdentityClaims {
    values: Map<String, Value>,
}

impl IdentityClaims {
    /// Builds the full claim set for a user.
    ///
    /// The email claim is synthesized deterministically from the user id and
    /// the site domain so addresses are valid but not enumerable from the
    /// directory.
    #[must_use]
    pub fn for_user(user: &DirectoryUser, site_domain: &str) -> Self {
        let mut values = Map::new();

        let character = user.main_character.as_ref();

        values.insert(Claim::Sub.name().into(), json!(user.id.to_string()));
        values.insert(Claim::IsAdmin.name().into(), json!(user.admin));
        values.insert(Claim::Name.name().into(), json!(user.name));
        values.insert(Claim::PreferredUsername.name().into(), json!(user.name));
        values.insert(
            Claim::UpdatedAt.name().into(),
            user.updated_at.map_or(Value::Null, |t| json!(t.timestamp())),
        );
        values.insert(
            Claim::Email.name().into(),
            json!(synthetic_email(user.id, site_domain)),
        );
        values.insert(Claim::EmailVerified.name().into(), json!(false));
        values.insert(
            Claim::CharacterId.name().into(),
            character.map_or(Value::Null, |c| json!(c.character_id)),
        );
        values.insert(
            Claim::CharacterName.name().into(),
            character.map_or(Value::Null, |c| json!(c.name)),
        );
        values.insert(
            Claim::CorporationId.name().into(),
            character.map_or(Value::Null, |c| json!(c.corporation_id)),
        );
        values.insert(
            Claim::AllianceId.name().into(),
            character
                .and_then(|c| c.alliance_id)
                .map_or(Value::Null, |id| json!(id)),
        );
        values.insert(Claim::Squads.name().into(), json!(user.squads));

        Self { values }
    }

    /// Returns a single claim value.
    #[must_use]
    pub fn get(&self, claim: Claim) -> Option<&Value> {
        self.values.get(claim.name())
    }

    /// Returns the full, unfiltered claim map.
    #[must_use]
    pub const fn all(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Filters the claim set down to what the granted scopes expose, plus
    /// the always-included subject and admin claims.
    #[must_use]
    pub fn filter(&self, scopes: &[Scope]) -> Map<String, Value> {
        let mut out = Map::new();

        for claim in Claim::ALWAYS {
            if let Some(value) = self.values.get(claim.name()) {
                out.insert(claim.name().into(), value.clone());
            }
        }

        for scope in scopes {
            for claim in scope.claims() {
                if let Some(value) = self.values.get(claim.name()) {
                    out.insert(claim.name().into(), value.clone());
                }
            }
        }

        out
    }
}

/// Builds the deterministic synthetic address for a user id.
#[must_use]
pub fn synthetic_email(user_id: i64, site_domain: &str) -> String {
    format!("seatuser.{user_id}@{site_domain}")
}
