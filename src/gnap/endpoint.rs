//! # Endpoint
//!
//! `handle` provides a single entry point for GNAP requests: the request is
//! validated, then routed to the handler implementation for its type,
//! returning a reply that can be serialized to a JSON object.

use std::fmt::Debug;
use std::future::Future;

use crate::gnap::Result;
use crate::gnap::provider::Provider;

/// Handle an incoming request.
///
/// # Errors
///
/// This method can fail for a number of reasons related to the incoming
/// request's viability. Expected failures include malformed requests,
/// illegal grant-state transitions, and missing or invalid tokens.
///
/// Implementers should look to the [`crate::gnap::Error`] type and its
/// wire tag for more information on the reason for failure.
pub async fn handle<T>(
    request: impl Handler<Response = T>, provider: &impl Provider,
) -> Result<T> {
    request.validate(provider).await?;
    request.handle(provider).await
}

/// Methods common to all requests.
///
/// The primary role of this trait is to provide a common interface for
/// requests so they can be handled by the [`handle`] method.
pub trait Handler: Clone + Debug + Send + Sync {
    /// The inner reply type specific to the implementing request.
    type Response;

    /// Routes the request to the concrete handler used to process it.
    fn handle(
        self, provider: &impl Provider,
    ) -> impl Future<Output = Result<Self::Response>> + Send;

    /// Perform initial validation of the request.
    ///
    /// Validation undertaken here is common to all requests, with
    /// request-specific validation performed by the request's handler.
    fn validate(
        &self, _provider: &impl Provider,
    ) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }
}
