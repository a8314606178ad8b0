//! # JOSE
//!
//! JSON Web Key ([RFC7517]) types used for client key binding, resource
//! server key registration, and the server's published key set.
//!
//! [RFC7517]: https://www.rfc-editor.org/rfc/rfc7517

pub mod jwk;

pub use jwk::{Curve, Jwks, KeyType, KeyUse, PublicKey, PublicKeyJwk};
