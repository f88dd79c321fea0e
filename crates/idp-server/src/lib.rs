//! # idp-server
//!
//! Wires the OIDC and SAML protocol engines, the in-memory stores, and the
//! host-application collaborators into one axum application.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod metadata_fetch;
pub mod router;
pub mod state;

pub use config::ServerConfig;
pub use metadata_fetch::{fetch_sp_metadata, MetadataFetchError};
pub use state::AppState;
