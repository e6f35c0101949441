//! Core library for the `geosearch` location search proxy.
//!
//! This crate defines:
//! - Configuration & API key handling
//! - An abstraction over the outbound search API, with an OS Data Hub client
//! - The lookup handler and its error taxonomy
//! - Shared domain models (requests, responses)
//!
//! It is used by `geosearch-cli`, but has no dependency on any HTTP server framework.

pub mod config;
pub mod error;
pub mod lookup;
pub mod model;
pub mod upstream;

pub use config::Config;
pub use error::LookupError;
pub use lookup::{LocationLookup, extract_location};
pub use model::{ErrorBody, LocationResult, LookupRequest};
pub use upstream::{OsDataHubClient, SearchClient, TransportError, UpstreamReply};
