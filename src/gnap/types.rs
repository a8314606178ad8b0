//! # GNAP Types
//!
//! Request, response, and record types for the GNAP endpoints. The types
//! serialize to and from the wire JSON defined by RFC 9635 and RFC 9767.

mod access;
mod device;
mod grant;
mod introspection;
mod keys;
mod metadata;
mod token;

pub use access::{AccessItem, AccessTokenRequest, Client, ClientKey, Interact, TokenRequests};
pub use device::{DecideRequest, Decision, GrantSummary, VerifyCodeRequest};
pub use grant::{
    ContinuationRequest, ContinueInfo, ContinueResponse, GrantRequest, GrantResponse,
    InteractResponse, IssuedTokens, LabeledToken, SubjectIds, UserCodeInfo, extract_gnap_token,
};
pub use introspection::{
    IntrospectionRequest, IntrospectionResponse, ResourceServer, ResourceServerRef,
};
pub use keys::{
    DeactivateKeyRequest, GetKeyRequest, ListKeysRequest, ListKeysResponse, RegisterKeyRequest,
    RegisterKeyResponse, RsKeyRecord,
};
pub use metadata::{Config, DiscoveryRequest, DiscoveryResponse, JwksRequest};
pub use token::{BoundKey, TokenRecord, token_hash};
