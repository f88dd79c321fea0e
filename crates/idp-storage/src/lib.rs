//! # idp-storage
//!
//! Storage abstraction traits for the identity provider.
//!
//! The protocol engines only ever see these interfaces; a concrete backend
//! (SQL, the host application's database) implements them. The crate ships
//! one implementation, [`MemoryStore`], backing tests and the default
//! server wiring.
//!
//! Two of the traits — [`UserDirectory`] and [`SessionProvider`] — are the
//! host-application collaborators: the directory of authenticated users and
//! the browser session they authenticated in. The identity provider never
//! writes to either.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod clients;
pub mod directory;
pub mod error;
pub mod keypairs;
pub mod memory;
pub mod pending;
pub mod saml;
pub mod tokens;

pub use clients::ClientStore;
pub use directory::{SessionProvider, UserDirectory};
pub use error::{StorageError, StorageResult};
pub use keypairs::KeypairStore;
pub use memory::MemoryStore;
pub use pending::PendingAuthStore;
pub use saml::SamlApplicationStore;
pub use tokens::TokenStore;
