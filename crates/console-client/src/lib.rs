//! Console client for the password-grant sample
//!
//! Logs a user in against the identity server and calls the protected
//! sample API with the resulting bearer token.

pub mod client;
pub mod config;
pub mod error;
pub mod report;
pub mod sample;

pub use client::{AccessToken, ApiClient, TokenClient};
pub use config::ClientConfig;
pub use error::ClientError;
pub use sample::{SampleOutcome, run_sample};
