//! SP metadata retrieval with SSRF mitigations.
//!
//! Administrators register a service provider by URL; the fetch runs on
//! the backend (CORS and CSP keep it out of the browser), so it must not
//! become a proxy into the deployment's network: HTTPS only, the host must
//! resolve, and none of its addresses may fall in private, loopback, or
//! link-local ranges. The request carries a short timeout.

use std::net::IpAddr;
use std::time::Duration;

use thiserror::Error;

use idp_protocol_saml::metadata::{parse_sp_metadata, SpMetadata};

/// Timeout for the metadata request.
const FETCH_TIMEOUT: Duration = Duration::from_secs(3);

/// Errors from SP metadata retrieval.
#[derive(Debug, Error)]
pub enum MetadataFetchError {
    /// Only HTTPS URLs are allowed.
    #[error("only HTTPS URLs are allowed")]
    InsecureUrl,

    /// The URL did not parse.
    #[error("invalid URL")]
    InvalidUrl,

    /// The hostname did not resolve.
    #[error("could not resolve hostname")]
    Unresolvable,

    /// The hostname resolves into a private or reserved range.
    #[error("access to private IP ranges is not allowed")]
    PrivateAddress,

    /// The request itself failed.
    #[error("failed to fetch metadata: {0}")]
    Fetch(String),

    /// The response was not parseable metadata.
    #[error("failed to parse metadata: {0}")]
    Parse(String),
}

/// Fetches and parses a service provider's metadata document.
///
/// # Errors
///
/// Returns an error for non-HTTPS URLs, hosts resolving to private
/// ranges, fetch failures, and unparseable documents.
pub async fn fetch_sp_metadata(url: &str) -> Result<SpMetadata, MetadataFetchError> {
    if !url.to_lowercase().starts_with("https://") {
        return Err(MetadataFetchError::InsecureUrl);
    }

    let parsed = url::Url::parse(url).map_err(|_| MetadataFetchError::InvalidUrl)?;
    let host = parsed.host_str().ok_or(MetadataFetchError::InvalidUrl)?;
    let port = parsed.port().unwrap_or(443);

    let addrs: Vec<_> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|_| MetadataFetchError::Unresolvable)?
        .collect();

    if addrs.is_empty() {
        return Err(MetadataFetchError::Unresolvable);
    }
    if addrs.iter().any(|addr| is_private_ip(addr.ip())) {
        return Err(MetadataFetchError::PrivateAddress);
    }

    let client = reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| MetadataFetchError::Fetch(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| MetadataFetchError::Fetch(e.to_string()))?
        .error_for_status()
        .map_err(|e| MetadataFetchError::Fetch(e.to_string()))?;

    let body = response
        .text()
        .await
        .map_err(|e| MetadataFetchError::Fetch(e.to_string()))?;

    parse_sp_metadata(&body).map_err(|e| MetadataFetchError::Parse(e.to_string()))
}

/// Whether an address belongs to a private or reserved range.
fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                // Carrier-grade NAT, 100.64.0.0/10.
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xc0) == 64)
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                // Unique-local, fc00::/7.
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                // Link-local, fe80::/10.
                || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_ranges_are_detected() {
        for addr in [
            "127.0.0.1",
            "10.1.2.3",
            "172.16.0.1",
            "192.168.1.1",
            "169.254.0.1",
            "100.64.0.1",
            "0.0.0.0",
            "::1",
            "fc00::1",
            "fe80::1",
        ] {
            let ip: IpAddr = addr.parse().unwrap();
            assert!(is_private_ip(ip), "{addr} should be private");
        }
    }

    #[test]
    fn public_addresses_pass() {
        for addr in ["1.1.1.1", "93.184.216.34", "2606:4700::1111"] {
            let ip: IpAddr = addr.parse().unwrap();
            assert!(!is_private_ip(ip), "{addr} should be public");
        }
    }

    #[tokio::test]
    async fn http_urls_are_refused() {
        let err = fetch_sp_metadata("http://sp.example.com/metadata")
            .await
            .unwrap_err();
        assert!(matches!(err, MetadataFetchError::InsecureUrl));
    }

    #[tokio::test]
    async fn garbage_urls_are_refused() {
        let err = fetch_sp_metadata("https://").await.unwrap_err();
        assert!(matches!(
            err,
            MetadataFetchError::InvalidUrl | MetadataFetchError::Unresolvable
        ));
    }
}
