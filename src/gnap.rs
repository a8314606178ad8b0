//! # GNAP
//!
//! The grant-and-token engine: grant lifecycle, continuation, user-code
//! binding, opaque token issuance, and resource-server introspection.
//!
//! Each endpoint is an async handler function taking a [`provider::Provider`]
//! and a typed request, returning a typed response. The HTTP boundary
//! deserializes bodies into the request types, attaches transport-derived
//! context (the verified [`crate::httpsig::RsIdentity`] for introspection,
//! the `Authorization: GNAP` bearer for continuation), and serializes the
//! response or error back out.

pub mod endpoint;
mod error;
mod handlers;
pub mod issuer;
pub mod provider;
pub mod state;
pub mod types;

pub use self::error::Error;
pub use self::handlers::continuation::continue_grant;
pub use self::handlers::device::{decide, verify_code};
pub use self::handlers::discovery::discovery;
pub use self::handlers::grant::create_grant;
pub use self::handlers::introspect::introspect;
pub use self::handlers::jwks::jwks;
pub use self::handlers::rs_keys::{deactivate_key, get_key, list_keys, register_key};
pub use self::types::*;

/// Result type for GNAP endpoint handlers.
pub type Result<T, E = Error> = std::result::Result<T, E>;
