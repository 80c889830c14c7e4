//! # fleetsync Endpoint
//!
//! Server endpoint capability interface and panel HTTP adapter.
//!
//! This crate provides:
//! - The [`ServerEndpoint`] trait consumed by the reconciliation engine
//! - The endpoint error taxonomy (unreachable / auth / API)
//! - A panel adapter speaking the JSON management API, generic over an
//!   abstract [`HttpClient`]
//! - A mock endpoint for tests
//!
//! ## Failure Semantics
//!
//! Endpoint calls fail per server and per operation; the engine excludes
//! a failing server from the current run and retries nothing. Re-running
//! the whole reconciliation is the retry mechanism, which is safe because
//! every endpoint write is idempotent with respect to the converged state.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod endpoint;
mod error;
mod http;
mod mock;
mod panel;

pub use endpoint::ServerEndpoint;
pub use error::{EndpointError, EndpointResult};
pub use http::HttpClient;
pub use mock::MockEndpoint;
pub use panel::{PanelCredentials, PanelEndpoint};
