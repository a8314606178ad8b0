//! An API for building a Grant Negotiation and Authorization Protocol (GNAP)
//! Authorization Server based on the [GNAP] specification (RFC 9635).
//!
//! # [GNAP]
//!
//! This library implements the grant-and-token engine of a GNAP
//! Authorization Server. Autonomous clients request grants accompanied by
//! proof of key possession, an end user binds the request to themselves by
//! entering a short user code on a consent surface, and the server issues
//! opaque, key-bound access tokens. Resource Servers later query the server
//! over [RFC 9767]-style token introspection, authenticating themselves with
//! HTTP Message Signatures ([RFC 9421]).
//!
//! # Design
//!
//! **Endpoints**
//!
//! The library is architected around the GNAP endpoints, each with its own
//! `XxxRequest` and `XxxResponse` types. The types serialize to and from
//! JSON, in accordance with the specification.
//!
//! The endpoints are designed to be used with Rust-based HTTP servers, such
//! as [axum](https://docs.rs/axum/latest/axum/): routing, TLS, CORS, and
//! body limits belong to the embedding server, which calls one handler
//! function per endpoint with a few lines of 'wrapper' code.
//!
//! **Running**
//!
//! In addition, implementors need to implement 'Provider' traits that are
//! responsible for storage and configuration. Filesystem-backed and
//! in-memory providers ship with the crate (see [`store`]).
//!
//! # Example
//!
//! The following example demonstrates how a single endpoint might be
//! surfaced.
//!
//! ```rust,ignore
//! #[tokio::main]
//! async fn main() {
//!     let provider = FsProvider::new(&data_dir, Config::default()).await.unwrap();
//!
//!     let router = Router::new()
//!         // --- other routes ---
//!         .route("/grants", post(grants))
//!         // --- other routes ---
//!         .with_state(provider);
//!
//!     let listener = TcpListener::bind("0.0.0.0:8080").await.expect("should bind");
//!     axum::serve(listener, router).await.expect("server should run");
//! }
//!
//! // Grant request endpoint
//! async fn grants(
//!     State(provider): State<FsProvider>, Json(req): Json<GrantRequest>,
//! ) -> AxResult<GrantResponse> {
//!     gnap_as::gnap::create_grant(provider, req).await.into()
//! }
//! ```
//!
//! [GNAP]: (https://www.rfc-editor.org/rfc/rfc9635.html)
//! [RFC 9421]: (https://www.rfc-editor.org/rfc/rfc9421.html)
//! [RFC 9767]: (https://www.rfc-editor.org/rfc/rfc9767.html)

mod core;
pub mod gnap;
pub mod httpsig;
pub mod jose;
pub mod store;
