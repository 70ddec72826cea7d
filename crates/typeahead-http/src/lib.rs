//! HTTP transport for the typeahead engine
//!
//! A small mockable client over reqwest. Every request gets a per-attempt
//! deadline; network-level failures and timeouts are retried with
//! exponential backoff, while server answers (any HTTP status) and aborts
//! are surfaced immediately. Bearer tokens are read from a credential
//! store at call time and never cached here.

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod middleware;

pub use client::{shared_transport, HttpTransport, Transport};
pub use config::TransportConfig;
pub use credentials::{CredentialStore, EnvCredentialStore, StaticCredentialStore};
pub use error::{Result, TransportError};
pub use middleware::{RetryConfig, RetryMiddleware};
pub use reqwest::Method;
