//! Server configuration, loaded from the environment.

use idp_crypto::SignatureAlgorithm;

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to bind.
    pub bind_addr: String,

    /// Public issuer URL.
    pub issuer: String,

    /// Domain used for synthetic email claims; defaults to the issuer's
    /// host.
    pub site_domain: String,

    /// Algorithm for lazily generated signing keys.
    pub default_algorithm: SignatureAlgorithm,

    /// Name of the host application's session cookie.
    pub session_cookie: String,

    /// Access token lifetime in minutes.
    pub access_token_lifetime: i64,

    /// Refresh token lifetime in minutes.
    pub refresh_token_lifetime: i64,

    /// ID token lifetime in minutes.
    pub id_token_lifetime: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            issuer: "http://localhost:8000".to_string(),
            site_domain: "seat.local".to_string(),
            default_algorithm: SignatureAlgorithm::Rs256,
            session_cookie: "seat_session".to_string(),
            access_token_lifetime: 60,
            refresh_token_lifetime: 10_080,
            id_token_lifetime: 60,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from `IDP_*` environment variables, falling
    /// back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let issuer = env_or("IDP_ISSUER", &defaults.issuer);
        let site_domain = std::env::var("IDP_SITE_DOMAIN")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| host_of(&issuer))
            .unwrap_or(defaults.site_domain);

        let default_algorithm = std::env::var("IDP_DEFAULT_ALGORITHM")
            .ok()
            .and_then(|v| SignatureAlgorithm::from_jwa(&v).ok())
            .unwrap_or(defaults.default_algorithm);

        Self {
            bind_addr: env_or("IDP_BIND_ADDR", &defaults.bind_addr),
            issuer,
            site_domain,
            default_algorithm,
            session_cookie: env_or("IDP_SESSION_COOKIE", &defaults.session_cookie),
            access_token_lifetime: env_minutes(
                "IDP_ACCESS_TOKEN_LIFETIME",
                defaults.access_token_lifetime,
            ),
            refresh_token_lifetime: env_minutes(
                "IDP_REFRESH_TOKEN_LIFETIME",
                defaults.refresh_token_lifetime,
            ),
            id_token_lifetime: env_minutes("IDP_ID_TOKEN_LIFETIME", defaults.id_token_lifetime),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_minutes(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

fn host_of(issuer: &str) -> Option<String> {
    url::Url::parse(issuer)
        .ok()?
        .host_str()
        .map(ToString::to_string)
}
