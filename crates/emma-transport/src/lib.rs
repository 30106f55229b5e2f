//! # emma-transport
//!
//! Transport layer for the Emma marketing email API.
//!
//! ## Features
//!
//! - **Transport contract**: a small synchronous trait ([`Transport`]) with one
//!   method per HTTP verb, consumed by `emma-core` collections and entities
//! - **HTTP adapter**: [`HttpTransport`], a blocking `reqwest` client with basic
//!   authentication against `https://api.e2ma.net/{account_id}`
//! - **Mock adapter**: [`MockTransport`] (feature `mock`) records every call and
//!   answers from scripted responses
//!
//! ## Quick Start
//!
//! ```ignore
//! use emma_transport::{Credentials, HttpTransport, Params, Transport};
//!
//! let credentials = Credentials::new("1234", "public", "private");
//! let transport = HttpTransport::new(credentials, "https://api.e2ma.net", 30)?;
//!
//! let groups = transport.get("/groups", &Params::new())?;
//! println!("{groups}");
//! ```
//!
//! ## Responses
//!
//! Every call yields a decoded `serde_json::Value`. `Null` means "absent": an
//! empty body, or a `404` answer to a `GET`. Whether a mutation succeeded is
//! decided by [`is_truthy`], the single definition of a failure response.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod adapter;
mod error;
#[cfg(feature = "http")]
mod http;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod params;

pub use adapter::{Method, Transport};
pub use error::{Error, Result};
#[cfg(feature = "http")]
pub use http::{Credentials, DEFAULT_BASE_URL, HttpTransport};
#[cfg(any(test, feature = "mock"))]
pub use mock::{Call, MockTransport};
pub use params::{Params, is_truthy, path_segment};
